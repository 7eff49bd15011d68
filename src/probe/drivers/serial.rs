// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial line transport to the probe microcontroller

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use serialport::{ClearBuffer, SerialPort};

use super::ProbeTransport;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::probe::frame::FRAME_SIZE;

/// Probe attached to a serial port
///
/// A transport failure closes the port; the next exchange opens it again, so an
/// unplugged USB adapter is picked up once it is back.
pub struct SerialProbe {
    port: Option<Box<dyn SerialPort>>,
    device: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialProbe {
    /// Open the serial device described by `config`
    pub fn open(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let mut probe = Self {
            port: None,
            device: config.device.clone(),
            baud_rate: config.baud_rate,
            timeout: Duration::from_millis(config.timeout_ms),
        };
        probe.connect()?;
        Ok(probe)
    }

    fn connect(&mut self) -> Result<&mut Box<dyn SerialPort>, ProbeError> {
        if self.port.is_none() {
            debug!(
                "Opening probe serial port {} at {} baud",
                self.device, self.baud_rate
            );
            let port = serialport::new(&self.device, self.baud_rate)
                .timeout(self.timeout)
                .open()?;
            self.port = Some(port);
        }
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected).into())
    }

    fn transact(
        &mut self,
        request: u8,
        response: &mut [u8; FRAME_SIZE],
    ) -> Result<usize, ProbeError> {
        let timeout = self.timeout;
        let port = self.connect()?;
        // Drop the leftovers of an earlier truncated or late frame
        port.clear(ClearBuffer::Input)?;
        port.write_all(&[request])?;
        port.flush()?;

        let deadline = Instant::now() + timeout;
        let mut received = 0;
        while received < FRAME_SIZE {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            port.set_timeout(remaining)?;
            match port.read(&mut response[received..]) {
                Ok(0) => break,
                Ok(n) => received += n,
                Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(received)
    }
}

impl ProbeTransport for SerialProbe {
    fn exchange(
        &mut self,
        request: u8,
        response: &mut [u8; FRAME_SIZE],
    ) -> Result<usize, ProbeError> {
        match self.transact(request, response) {
            Ok(received) => {
                trace!(
                    "Probe {} answered {:02X?}",
                    self.device,
                    &response[..received]
                );
                Ok(received)
            }
            Err(err) => {
                if self.port.take().is_some() {
                    warn!("Closing probe serial port {} after error: {}", self.device, err);
                }
                Err(err)
            }
        }
    }

    fn describe(&self) -> String {
        format!("serial probe on {}", self.device)
    }
}
