// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated probe
//!
//! Answers every request with a valid frame whose mean ADC value wanders a little
//! around a configured raw value, as a probe sitting in a stable tank would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ProbeTransport;
use crate::error::ProbeError;
use crate::probe::frame::{encode_frame, FRAME_SIZE};

/// Samples accumulated per simulated frame, as the probe firmware does
const SAMPLES_PER_FRAME: u8 = 20;

/// Maximum deviation of the simulated raw value, in ADC counts
const RAW_JITTER: f64 = 1.5;

/// In-memory probe producing valid frames
pub struct SimulatedProbe {
    raw: f64,
    rng: StdRng,
    reads: Arc<AtomicUsize>,
}

impl SimulatedProbe {
    pub fn new(raw: f64) -> Self {
        Self {
            raw,
            rng: StdRng::from_os_rng(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reproducible simulation
    pub fn with_seed(raw: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(raw)
        }
    }

    /// Shared counter of the requests answered so far
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl ProbeTransport for SimulatedProbe {
    fn exchange(
        &mut self,
        request: u8,
        response: &mut [u8; FRAME_SIZE],
    ) -> Result<usize, ProbeError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let raw = self.raw + self.rng.random_range(-RAW_JITTER..=RAW_JITTER);
        let sum = (raw * f64::from(SAMPLES_PER_FRAME))
            .round()
            .clamp(0.0, f64::from(u16::MAX)) as u16;
        *response = encode_frame(sum, SAMPLES_PER_FRAME);

        trace!(
            "Simulated probe answered request {:?} with sum={} count={}",
            request as char,
            sum,
            SAMPLES_PER_FRAME
        );
        Ok(FRAME_SIZE)
    }

    fn describe(&self) -> String {
        format!("simulated probe around raw {:.1}", self.raw)
    }
}
