// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CO2 injection relay
//!
//! CO2 lowers the pH of the tank water. The relay opens the CO2 solenoid when the
//! smoothed pH reaches the top of the active band and closes it once the pH falls to
//! the bottom of the band. In between, the relay keeps its current state.
//!
//! The physical state is read back from the hardware every cycle and a write is only
//! issued when the decision differs from it. [`RelayActuator::decide_and_apply`] is the
//! only code path switching the relay.

pub mod drivers;

use std::fmt;

use log::{info, warn};
use serde::{Serialize, Serializer};

pub use drivers::{MockRelay, RelayDriver, SysfsRelay};

use crate::config::{RelayConfig, RelayDriverType};
use crate::error::RelayError;
use crate::settings::PhBand;

/// Relay output state; `On` means CO2 is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn from_energised(energised: bool) -> Self {
        if energised {
            RelayState::On
        } else {
            RelayState::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == RelayState::On
    }

    /// `1` when on, `0` when off, as written to the log
    pub fn as_flag(self) -> u8 {
        u8::from(self.is_on())
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelayState::On => "ON",
            RelayState::Off => "OFF",
        })
    }
}

impl Serialize for RelayState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_flag())
    }
}

/// Hysteresis decision for a smoothed pH
///
/// A NaN pH compares false against both limits and keeps the current state.
pub fn decide(ph: f64, band: &PhBand, current: RelayState) -> RelayState {
    if ph <= band.min {
        RelayState::Off
    } else if ph >= band.max {
        RelayState::On
    } else {
        current
    }
}

/// Applies the hysteresis decision to the relay hardware
pub struct RelayActuator<D: RelayDriver> {
    driver: D,
    last_observed: RelayState,
}

impl<D: RelayDriver> RelayActuator<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            last_observed: RelayState::Off,
        }
    }

    /// Read the relay, decide and write only when the state must change.
    ///
    /// A failed read falls back on the last observed state. Returns the state the
    /// relay is left in.
    pub fn decide_and_apply(&mut self, ph: f64, band: &PhBand) -> Result<RelayState, RelayError> {
        let current = match self.driver.read_state() {
            Ok(state) => state,
            Err(err) => {
                warn!(
                    "Cannot read relay state ({}), assuming {}",
                    err, self.last_observed
                );
                self.last_observed
            }
        };
        self.last_observed = current;

        let desired = decide(ph, band, current);
        if desired != current {
            self.driver.write_state(desired)?;
            self.last_observed = desired;
            info!(
                "pH {:.2} outside [{:.2}, {:.2}]: CO2 relay switched {}",
                ph, band.min, band.max, desired
            );
        }
        Ok(desired)
    }

    /// Last state read from or written to the relay
    pub fn last_observed(&self) -> RelayState {
        self.last_observed
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

/// Create the relay driver selected by the configuration
pub fn create_driver(config: &RelayConfig) -> Result<Box<dyn RelayDriver>, RelayError> {
    let driver: Box<dyn RelayDriver> = match config.driver {
        RelayDriverType::Sysfs => Box::new(SysfsRelay::open(config)?),
        RelayDriverType::Mock => Box::new(MockRelay::default()),
    };
    info!("Using {}", driver.describe());
    Ok(driver)
}
