// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! pH estimation from raw probe readings
//!
//! [`PhEstimator`] requests frames from the probe, converts the mean ADC value to pH
//! with the two-point calibration and smooths the result with a small ring buffer.
//!
//! The smoothed value returned by [`PhEstimator::average`] is the mean of the buffer
//! *before* the new reading is stored, so it lags one reading behind. Readings above
//! pH 14 are measurement glitches: they are not stored and the previous smoothed value
//! is returned instead.

use log::{debug, warn};

use super::drivers::ProbeTransport;
use super::frame::{decode_frame, FRAME_SIZE};
use crate::error::ProbeError;
use crate::settings::CalibrationTable;

/// Highest pH a reading may have before it is treated as a glitch
pub const MAX_PLAUSIBLE_PH: f64 = 14.0;

/// Convert a raw ADC value to pH with a two-point calibration
///
/// Returns `0.0` when both calibration points share the same raw value.
pub fn calibrate(raw: f64, calibration: &CalibrationTable) -> f64 {
    if calibration.is_degenerate() {
        return 0.0;
    }
    let adc4 = calibration.adc_at_ph4 as f64;
    let adc7 = calibration.adc_at_ph7 as f64;
    (raw - adc4) * 3.0 / (adc7 - adc4) + 4.0
}

/// Fixed-length ring buffer of calibrated pH readings
#[derive(Debug, Clone)]
pub struct AveragingBuffer {
    slots: Vec<f64>,
    len: usize,
    index: usize,
}

impl AveragingBuffer {
    /// Empty buffer; it is filled by the first reading pushed into it
    pub fn new(len: usize) -> Self {
        Self {
            slots: Vec::with_capacity(len.max(1)),
            len: len.max(1),
            index: 0,
        }
    }

    /// Buffer holding `value` in every slot
    pub fn seeded(len: usize, value: f64) -> Self {
        let mut buffer = Self::new(len);
        buffer.seed(value);
        buffer
    }

    pub fn seed(&mut self, value: f64) {
        self.slots = vec![value; self.len];
        self.index = 0;
    }

    pub fn is_seeded(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mean of the stored readings, NaN before seeding
    pub fn mean(&self) -> f64 {
        if self.slots.is_empty() {
            return f64::NAN;
        }
        self.slots.iter().sum::<f64>() / self.slots.len() as f64
    }

    /// Return the current mean, then store `value` at the ring index
    ///
    /// An unseeded buffer is seeded with `value`, which is also returned.
    pub fn push(&mut self, value: f64) -> f64 {
        if !self.is_seeded() {
            self.seed(value);
            return value;
        }
        let mean = self.mean();
        self.slots[self.index] = value;
        self.index = (self.index + 1) % self.len;
        mean
    }
}

/// Reads, calibrates and smooths pH values from a probe transport
pub struct PhEstimator<T: ProbeTransport> {
    transport: T,
    request: u8,
    buffer: AveragingBuffer,
    last_average: f64,
}

impl<T: ProbeTransport> PhEstimator<T> {
    /// Estimator averaging over `window` readings
    pub fn new(transport: T, request: u8, window: usize) -> Self {
        Self {
            transport,
            request,
            buffer: AveragingBuffer::new(window),
            last_average: f64::NAN,
        }
    }

    /// Request one frame and return its mean raw ADC value
    pub fn read_raw(&mut self) -> Result<f64, ProbeError> {
        let mut frame = [0u8; FRAME_SIZE];
        let received = self.transport.exchange(self.request, &mut frame)?;
        Ok(decode_frame(&frame[..received])?)
    }

    /// Single calibrated reading, the averaging buffer is left untouched
    pub fn read_ph(&mut self, calibration: &CalibrationTable) -> Result<f64, ProbeError> {
        if calibration.is_degenerate() {
            return Err(ProbeError::CalibrationDegenerate {
                raw: calibration.adc_at_ph4,
            });
        }
        let raw = self.read_raw()?;
        Ok(calibrate(raw, calibration))
    }

    /// Seed every buffer slot with a fresh plausible reading
    pub fn prime(&mut self, calibration: &CalibrationTable) -> Result<f64, ProbeError> {
        let ph = self.plausible_reading(calibration)?;
        self.buffer.seed(ph);
        self.last_average = ph;
        debug!("Averaging buffer primed with pH {:.2}", ph);
        Ok(ph)
    }

    /// Smoothed pH for this cycle
    ///
    /// Any failure to obtain a plausible reading is logged and the previous smoothed
    /// value is returned; it is NaN until a first reading succeeds.
    pub fn average(&mut self, calibration: &CalibrationTable) -> f64 {
        match self.plausible_reading(calibration) {
            Ok(ph) => {
                self.last_average = self.buffer.push(ph);
            }
            Err(err) => {
                warn!(
                    "{}, reusing previous pH {:.2}",
                    err, self.last_average
                );
            }
        }
        self.last_average
    }

    /// Last value returned by [`PhEstimator::average`]
    pub fn last_average(&self) -> f64 {
        self.last_average
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn plausible_reading(&mut self, calibration: &CalibrationTable) -> Result<f64, ProbeError> {
        let ph = self.read_ph(calibration)?;
        if ph > MAX_PLAUSIBLE_PH || ph.is_nan() {
            return Err(ProbeError::ReadGlitch { ph });
        }
        Ok(ph)
    }
}
