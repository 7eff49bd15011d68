// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Relay drivers
//!
//! - Sysfs: GPIO line exported through `/sys/class/gpio`
//! - Mock: in-memory relay for development and testing

pub mod mock;
pub mod sysfs;

pub use mock::MockRelay;
pub use sysfs::SysfsRelay;

use super::RelayState;
use crate::error::RelayError;

/// Hardware access to the CO2 relay
pub trait RelayDriver: Send {
    /// Current physical state of the relay output
    fn read_state(&mut self) -> Result<RelayState, RelayError>;

    /// Drive the relay output to `state`
    fn write_state(&mut self, state: RelayState) -> Result<(), RelayError>;

    /// Human readable name of the driver, for logs
    fn describe(&self) -> String;
}

impl<T: RelayDriver + ?Sized> RelayDriver for Box<T> {
    fn read_state(&mut self) -> Result<RelayState, RelayError> {
        (**self).read_state()
    }

    fn write_state(&mut self, state: RelayState) -> Result<(), RelayError> {
        (**self).write_state(state)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
