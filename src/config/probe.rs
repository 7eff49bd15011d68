// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! pH probe configuration
//!
//! This module defines the structures for configuring the serial pH probe and the
//! averaging applied to its readings.

use serde::{Deserialize, Serialize};

/// Transport used to talk to the pH probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeDriver {
    /// Real probe on a serial line
    Serial,
    /// Generated frames, for development without hardware
    Simulated,
}

/// Configuration for the pH probe.
///
/// # Example
///
/// ```
/// use rust_aquapi::config::{ProbeConfig, ProbeDriver};
///
/// let probe = ProbeConfig {
///     driver: ProbeDriver::Serial,
///     device: "/dev/ttyUSB0".to_string(),
///     ..ProbeConfig::default()
/// };
/// assert_eq!(probe.baud_rate, 9600);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Probe transport, `serial` or `simulated`
    pub driver: ProbeDriver,

    /// Serial device of the probe. Default is `/dev/ttyS0`.
    pub device: String,

    /// Serial line speed. The probe firmware uses 9600 baud.
    pub baud_rate: u32,

    /// Maximum time in milliseconds to receive a complete frame.
    pub timeout_ms: u64,

    /// Command byte requesting a raw reading. Default is `r`.
    pub request: char,

    /// Number of readings in the averaging ring buffer.
    pub averaging_window: usize,

    /// Raw ADC value produced by the simulated probe.
    pub simulated_raw: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            driver: ProbeDriver::Serial,
            device: "/dev/ttyS0".to_string(),
            baud_rate: 9600,
            timeout_ms: 2000,
            request: 'r',
            averaging_window: 2,
            simulated_raw: 387.0, // about pH 6.9 with the default calibration
        }
    }
}
