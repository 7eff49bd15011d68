// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Probe transport drivers
//!
//! This module provides the byte transports able to carry a probe request/response:
//! - Serial: the probe microcontroller on a UART
//! - Simulated: frames generated in memory for development and testing

pub mod serial;
pub mod simulated;

pub use serial::SerialProbe;
pub use simulated::SimulatedProbe;

use crate::error::ProbeError;
use crate::probe::frame::FRAME_SIZE;

/// Byte transport to the pH probe
pub trait ProbeTransport: Send {
    /// Send the `request` byte and read one response frame into `response`.
    ///
    /// Returns the number of bytes received before the transport timeout. A value
    /// lower than [`FRAME_SIZE`] means the frame is truncated.
    fn exchange(
        &mut self,
        request: u8,
        response: &mut [u8; FRAME_SIZE],
    ) -> Result<usize, ProbeError>;

    /// Human readable name of the transport, for logs
    fn describe(&self) -> String;
}

impl<T: ProbeTransport + ?Sized> ProbeTransport for Box<T> {
    fn exchange(
        &mut self,
        request: u8,
        response: &mut [u8; FRAME_SIZE],
    ) -> Result<usize, ProbeError> {
        (**self).exchange(request, response)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
