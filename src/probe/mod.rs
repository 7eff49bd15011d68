// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! pH probe and water temperature acquisition
//!
//! This module provides:
//! - Probe frame decoding with CRC-16/XMODEM integrity checking
//! - Probe transports (serial line and simulated)
//! - Calibration and smoothing of pH readings
//! - Water temperature sensors

pub mod drivers;
pub mod estimator;
pub mod frame;
pub mod temperature;

use log::info;

pub use drivers::{ProbeTransport, SerialProbe, SimulatedProbe};
pub use estimator::{calibrate, AveragingBuffer, PhEstimator, MAX_PLAUSIBLE_PH};
pub use frame::{decode_frame, decode_raw, encode_frame, RawSample, FRAME_SIZE};
pub use temperature::{SimulatedTemperature, TemperatureSensor, W1Sensor};

use crate::config::{ProbeConfig, ProbeDriver, TemperatureConfig, TemperatureDriver};
use crate::error::ProbeError;

/// Water temperature reported by the simulated sensor at startup
const SIMULATED_WATER_CELSIUS: f64 = 24.5;

/// Create the probe transport selected by the configuration
pub fn create_transport(config: &ProbeConfig) -> Result<Box<dyn ProbeTransport>, ProbeError> {
    let transport: Box<dyn ProbeTransport> = match config.driver {
        ProbeDriver::Serial => Box::new(SerialProbe::open(config)?),
        ProbeDriver::Simulated => Box::new(SimulatedProbe::new(config.simulated_raw)),
    };
    info!("Using {}", transport.describe());
    Ok(transport)
}

/// Create the temperature sensor selected by the configuration
pub fn create_temperature_sensor(config: &TemperatureConfig) -> Box<dyn TemperatureSensor> {
    match config.driver {
        TemperatureDriver::W1 => {
            info!("Reading water temperature from {}", config.path);
            Box::new(W1Sensor::new(&config.path))
        }
        TemperatureDriver::Simulated => {
            info!("Using simulated water temperature");
            Box::new(SimulatedTemperature::new(SIMULATED_WATER_CELSIUS))
        }
    }
}
