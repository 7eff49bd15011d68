// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! GPIO relay through the sysfs interface

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use super::RelayDriver;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::relay::RelayState;

/// Relay driven by a GPIO line exported through sysfs
pub struct SysfsRelay {
    pin: u32,
    active_low: bool,
    line: PathBuf,
}

impl SysfsRelay {
    /// Export the configured pin if needed and make it an output.
    ///
    /// A freshly exported line is configured with an inactive level so the relay
    /// does not switch on while the controller starts.
    pub fn open(config: &RelayConfig) -> Result<Self, RelayError> {
        let root = Path::new(&config.gpio_root);
        let line = root.join(format!("gpio{}", config.gpio_pin));
        let relay = Self {
            pin: config.gpio_pin,
            active_low: config.active_low,
            line,
        };

        if !relay.line.exists() {
            debug!("Exporting GPIO {}", relay.pin);
            relay.write(&root.join("export"), &relay.pin.to_string())?;
            // udev needs a moment to hand the new attributes over
            thread::sleep(Duration::from_millis(100));
        }

        let direction = relay.line.join("direction");
        let current = fs::read_to_string(&direction)
            .map_err(|source| relay.gpio_error(&direction, source))?;
        if current.trim() != "out" {
            let inactive = if relay.active_low { "high" } else { "low" };
            relay.write(&direction, inactive)?;
        }

        info!(
            "CO2 relay on GPIO {} ({})",
            relay.pin,
            if relay.active_low { "active low" } else { "active high" }
        );
        Ok(relay)
    }

    fn gpio_error(&self, path: &Path, source: std::io::Error) -> RelayError {
        RelayError::Gpio {
            pin: self.pin,
            path: path.to_path_buf(),
            source,
        }
    }

    fn write(&self, path: &Path, value: &str) -> Result<(), RelayError> {
        fs::write(path, value).map_err(|source| self.gpio_error(path, source))
    }
}

impl RelayDriver for SysfsRelay {
    fn read_state(&mut self) -> Result<RelayState, RelayError> {
        let path = self.line.join("value");
        let value =
            fs::read_to_string(&path).map_err(|source| self.gpio_error(&path, source))?;
        let high = match value.trim() {
            "0" => false,
            "1" => true,
            other => {
                return Err(RelayError::InvalidLevel {
                    pin: self.pin,
                    value: other.to_string(),
                })
            }
        };
        Ok(RelayState::from_energised(high != self.active_low))
    }

    fn write_state(&mut self, state: RelayState) -> Result<(), RelayError> {
        let high = state.is_on() != self.active_low;
        self.write(&self.line.join("value"), if high { "1" } else { "0" })
    }

    fn describe(&self) -> String {
        format!("sysfs GPIO {}", self.pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_gpio(root: &Path, pin: u32, direction: &str, value: &str) -> anyhow::Result<()> {
        let line = root.join(format!("gpio{}", pin));
        fs::create_dir_all(&line)?;
        fs::write(line.join("direction"), direction)?;
        fs::write(line.join("value"), value)?;
        Ok(())
    }

    fn config(root: &Path) -> RelayConfig {
        RelayConfig {
            gpio_root: root.to_string_lossy().to_string(),
            ..RelayConfig::default()
        }
    }

    #[test]
    fn test_active_low_levels() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fake_gpio(dir.path(), 22, "out\n", "1\n")?;
        let mut relay = SysfsRelay::open(&config(dir.path()))?;

        assert_eq!(relay.read_state()?, RelayState::Off);

        relay.write_state(RelayState::On)?;
        assert_eq!(fs::read_to_string(dir.path().join("gpio22/value"))?, "0");
        assert_eq!(relay.read_state()?, RelayState::On);
        Ok(())
    }

    #[test]
    fn test_input_line_becomes_inactive_output() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fake_gpio(dir.path(), 22, "in\n", "0\n")?;

        SysfsRelay::open(&config(dir.path()))?;

        assert_eq!(fs::read_to_string(dir.path().join("gpio22/direction"))?, "high");
        Ok(())
    }

    #[test]
    fn test_unexpected_level_is_reported() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fake_gpio(dir.path(), 22, "out", "x")?;
        let mut relay = SysfsRelay::open(&config(dir.path()))?;

        assert!(matches!(
            relay.read_state(),
            Err(RelayError::InvalidLevel { pin: 22, .. })
        ));
        Ok(())
    }
}
