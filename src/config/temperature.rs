// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Water temperature sensor configuration

use serde::{Deserialize, Serialize};

/// Source of the water temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureDriver {
    /// DS18B20 exposed by the Linux 1-Wire driver
    W1,
    /// Synthetic values for development
    Simulated,
}

/// Configuration for the water temperature sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    pub driver: TemperatureDriver,

    /// sysfs file holding the temperature in millidegrees Celsius
    pub path: String,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            driver: TemperatureDriver::W1,
            path: "/sys/bus/w1/devices/28-0117c1365eff/temperature".to_string(),
        }
    }
}
