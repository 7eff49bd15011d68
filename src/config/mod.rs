// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon configuration management
//!
//! This module provides functionality for loading, validating, and applying the
//! deployment configuration of the pH controller. The configuration is backed by a YAML
//! file and validated against an embedded JSON schema.
//!
//! The daemon configuration describes the hardware and the file locations. It is static
//! for the process lifetime. The operator settings (pH bands, calibration, periods) live
//! in a separate JSON file handled by [`crate::settings`] and are reloaded every cycle.
//!
//! ## Configuration Structure
//!
//! - `settings_path`: location of the operator settings JSON file
//! - `probe`: serial pH probe and averaging window
//! - `temperature`: 1-Wire water temperature sensor
//! - `relay`: GPIO driving the CO2 solenoid relay
//! - `datalog`: append-only measurement log
//! - `ipc`: named pipe used to pause and resume the controller
//! - `uplink`: collector receiving every sample
//!
//! ## Usage
//!
//! ```no_run
//! use rust_aquapi::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("aquapi.yaml")).unwrap();
//!
//! // Run against the simulated hardware
//! config.apply_args(true, None, None, None, None, false);
//!
//! println!("Probe device: {}", config.probe.device);
//! ```

pub mod datalog;
pub mod ipc;
pub mod probe;
pub mod relay;
pub mod temperature;
pub mod uplink;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::utility::atomic_write;

pub use datalog::DatalogConfig;
pub use ipc::IpcConfig;
pub use probe::{ProbeConfig, ProbeDriver};
pub use relay::{RelayConfig, RelayDriverType};
pub use temperature::{TemperatureConfig, TemperatureDriver};
pub use uplink::UplinkConfig;
pub use utils::{output_config_schema, validate_specific_rules};

/// Embedded JSON schema of the YAML configuration
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure of the controller daemon.
///
/// Every section falls back to its defaults when missing from the file, so a file
/// holding only the values that differ from the deployment defaults is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the operator settings JSON file.
    ///
    /// The file is created with default settings when missing.
    #[serde(default = "default_settings_path")]
    pub settings_path: String,

    /// pH probe transport and averaging.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Water temperature sensor.
    #[serde(default)]
    pub temperature: TemperatureConfig,

    /// CO2 relay output.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Measurement log written for the presentation tier.
    #[serde(default)]
    pub datalog: DatalogConfig,

    /// Pause/resume command pipe.
    #[serde(default)]
    pub ipc: IpcConfig,

    /// Sample forwarding to the collector.
    #[serde(default)]
    pub uplink: UplinkConfig,
}

fn default_settings_path() -> String {
    "settings.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            probe: ProbeConfig::default(),
            temperature: TemperatureConfig::default(),
            relay: RelayConfig::default(),
            datalog: DatalogConfig::default(),
            ipc: IpcConfig::default(),
            uplink: UplinkConfig::default(),
        }
    }
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file failing schema
    /// validation, deserialization or the additional rules leaves a `*.sample.yaml`
    /// beside it and returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // An empty document deserializes to YAML null, which stands for "all defaults"
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
        let json_value = match serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })? {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            value => value,
        };

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_json::from_value(json_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Write the configuration as YAML, replacing `path` atomically
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;
        atomic_write(path, yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path))
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only explicitly provided values override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `simulate` - Use the simulated probe, temperature sensor and relay
    /// * `serial_device` - Serial device of the pH probe
    /// * `settings_path` - Operator settings JSON file
    /// * `log_file` - Measurement log file
    /// * `uplink_url` - Collector endpoint
    /// * `no_uplink` - Disable sample forwarding
    pub fn apply_args(
        &mut self,
        simulate: bool,
        serial_device: Option<String>,
        settings_path: Option<PathBuf>,
        log_file: Option<PathBuf>,
        uplink_url: Option<String>,
        no_uplink: bool,
    ) {
        if simulate {
            debug!("Simulated hardware requested from command line");
            self.probe.driver = ProbeDriver::Simulated;
            self.temperature.driver = TemperatureDriver::Simulated;
            self.relay.driver = RelayDriverType::Mock;
        }

        if let Some(device) = serial_device {
            debug!("Overriding serial device from command line: {}", device);
            self.probe.device = device;
        }

        if let Some(path) = settings_path {
            debug!("Overriding settings path from command line: {:?}", path);
            self.settings_path = path.to_string_lossy().to_string();
        }

        if let Some(path) = log_file {
            debug!("Overriding log file from command line: {:?}", path);
            self.datalog.path = path.to_string_lossy().to_string();
        }

        if let Some(url) = uplink_url {
            debug!("Overriding uplink url from command line: {}", url);
            self.uplink.url = url;
        }

        if no_uplink {
            debug!("Uplink disabled from command line");
            self.uplink.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_creates_default() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("aquapi.yaml");

        let config = Config::from_file(&path)?;

        assert!(path.exists());
        assert_eq!(config.relay.gpio_pin, 22);
        assert_eq!(config.ipc.pipe_path, "server_controller.ipc");
        // The written default must load back
        let reloaded = Config::from_file(&path)?;
        assert_eq!(reloaded.probe.device, config.probe.device);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_section_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("aquapi.yaml");
        fs::write(&path, "probe:\n  device: /dev/ttyUSB0\n  averaging_window: 4\n")?;

        let config = Config::from_file(&path)?;

        assert_eq!(config.probe.device, "/dev/ttyUSB0");
        assert_eq!(config.probe.averaging_window, 4);
        assert_eq!(config.probe.baud_rate, 9600);
        assert_eq!(config.datalog.separator, ";");
        Ok(())
    }

    #[test]
    fn test_invalid_file_creates_sample() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("aquapi.yaml");
        fs::write(&path, "probe:\n  baud_rate: fast\n")?;

        assert!(Config::from_file(&path).is_err());
        assert!(dir.path().join("aquapi.sample.yaml").exists());
        Ok(())
    }

    #[test]
    fn test_apply_args_simulate() {
        let mut config = Config::default();
        config.apply_args(
            true,
            Some("/dev/ttyAMA0".to_string()),
            None,
            Some(PathBuf::from("/tmp/ph.csv")),
            None,
            true,
        );

        assert_eq!(config.probe.driver, ProbeDriver::Simulated);
        assert_eq!(config.temperature.driver, TemperatureDriver::Simulated);
        assert_eq!(config.relay.driver, RelayDriverType::Mock);
        assert_eq!(config.probe.device, "/dev/ttyAMA0");
        assert_eq!(config.datalog.path, "/tmp/ph.csv");
        assert!(!config.uplink.enabled);
        assert_eq!(config.settings_path, "settings.json");
    }
}
