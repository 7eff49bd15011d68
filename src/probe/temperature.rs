// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Water temperature sensors

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ProbeError;

/// Source of the water temperature in degrees Celsius
pub trait TemperatureSensor: Send {
    fn read_celsius(&mut self) -> Result<f64, ProbeError>;
}

/// DS18B20 read through the Linux 1-Wire sysfs interface
///
/// The kernel exposes the temperature as an integer number of millidegrees.
pub struct W1Sensor {
    path: PathBuf,
}

impl W1Sensor {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn error(&self, reason: impl ToString) -> ProbeError {
        ProbeError::Temperature {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl TemperatureSensor for W1Sensor {
    fn read_celsius(&mut self) -> Result<f64, ProbeError> {
        let contents = fs::read_to_string(&self.path).map_err(|err| self.error(err))?;
        let millidegrees: i64 = contents
            .trim()
            .parse()
            .map_err(|err| self.error(format!("invalid value {:?}: {}", contents.trim(), err)))?;
        Ok(millidegrees as f64 / 1000.0)
    }
}

/// Slowly drifting synthetic temperature
pub struct SimulatedTemperature {
    celsius: f64,
    rng: StdRng,
}

impl SimulatedTemperature {
    pub fn new(celsius: f64) -> Self {
        Self {
            celsius,
            rng: StdRng::from_os_rng(),
        }
    }
}

impl TemperatureSensor for SimulatedTemperature {
    fn read_celsius(&mut self) -> Result<f64, ProbeError> {
        self.celsius = (self.celsius + self.rng.random_range(-0.05..=0.05)).clamp(22.0, 28.0);
        Ok(self.celsius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_w1_reads_millidegrees() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("temperature");
        fs::write(&path, "24562\n")?;

        let mut sensor = W1Sensor::new(&path);
        assert_eq!(sensor.read_celsius()?, 24.562);
        Ok(())
    }

    #[test]
    fn test_w1_reports_missing_and_garbage() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("temperature");

        let mut sensor = W1Sensor::new(&path);
        assert!(matches!(
            sensor.read_celsius(),
            Err(ProbeError::Temperature { .. })
        ));

        fs::write(&path, "YES\n")?;
        assert!(sensor.read_celsius().is_err());
        Ok(())
    }
}
