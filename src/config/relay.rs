// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CO2 relay configuration

use serde::{Deserialize, Serialize};

/// Relay driver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayDriverType {
    /// GPIO through `/sys/class/gpio`
    Sysfs,
    /// In-memory relay for development and tests
    Mock,
}

/// Configuration for the CO2 solenoid relay.
///
/// The relay board is active low: driving the GPIO low energises the relay and
/// opens the CO2 valve. Relay #5 of the 8-channel board is wired to BCM GPIO 22.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub driver: RelayDriverType,

    /// BCM GPIO number driving the CO2 relay
    pub gpio_pin: u32,

    /// `true` when a low level switches the relay on
    pub active_low: bool,

    /// Root of the sysfs GPIO interface
    pub gpio_root: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            driver: RelayDriverType::Sysfs,
            gpio_pin: 22,
            active_low: true,
            gpio_root: "/sys/class/gpio".to_string(),
        }
    }
}
