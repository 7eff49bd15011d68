// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Probe frame decoding
//!
//! The probe microcontroller accumulates ADC samples and answers each request with a
//! fixed 5-byte frame:
//!
//! ```text
//! +---------+---------+-------+---------+---------+
//! | sum lo  | sum hi  | count | crc lo  | crc hi  |
//! +---------+---------+-------+---------+---------+
//! ```
//!
//! `sum` and the checksum are little-endian `u16`. The checksum is CRC-16/XMODEM over
//! the first three bytes. Framing errors are not resynchronised here; the caller simply
//! issues a new request on the next cycle.

use crc::{Crc, CRC_16_XMODEM};

use crate::error::FrameFault;

/// Size in bytes of a probe response frame
pub const FRAME_SIZE: usize = 5;

/// Number of payload bytes covered by the checksum
const PAYLOAD_SIZE: usize = 3;

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Raw content of a validated probe frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// Sum of the ADC samples accumulated by the probe
    pub sum: u16,
    /// Number of accumulated samples
    pub count: u8,
}

impl RawSample {
    /// Mean ADC value of the accumulated samples
    pub fn average(&self) -> f64 {
        f64::from(self.sum) / f64::from(self.count)
    }
}

/// Compute the CRC-16/XMODEM checksum of `data`
pub fn checksum(data: &[u8]) -> u16 {
    XMODEM.checksum(data)
}

/// Validate a frame and extract its sample sum and count
///
/// # Errors
///
/// * [`FrameFault::ShortFrame`] if `frame` is not exactly [`FRAME_SIZE`] bytes
/// * [`FrameFault::ChecksumMismatch`] if the CRC does not match the payload
/// * [`FrameFault::EmptySampleSet`] if the probe reports zero samples
pub fn decode_raw(frame: &[u8]) -> Result<RawSample, FrameFault> {
    if frame.len() != FRAME_SIZE {
        return Err(FrameFault::ShortFrame {
            expected: FRAME_SIZE,
            received: frame.len(),
        });
    }

    let computed = checksum(&frame[..PAYLOAD_SIZE]);
    let received = u16::from_le_bytes([frame[3], frame[4]]);
    if computed != received {
        return Err(FrameFault::ChecksumMismatch { computed, received });
    }

    let sample = RawSample {
        sum: u16::from_le_bytes([frame[0], frame[1]]),
        count: frame[2],
    };
    if sample.count == 0 {
        return Err(FrameFault::EmptySampleSet);
    }
    Ok(sample)
}

/// Decode a frame into the mean raw ADC value it carries
pub fn decode_frame(frame: &[u8]) -> Result<f64, FrameFault> {
    decode_raw(frame).map(|sample| sample.average())
}

/// Build a valid frame, as the probe firmware would send it
pub fn encode_frame(sum: u16, count: u8) -> [u8; FRAME_SIZE] {
    let [sum_lo, sum_hi] = sum.to_le_bytes();
    let [crc_lo, crc_hi] = checksum(&[sum_lo, sum_hi, count]).to_le_bytes();
    [sum_lo, sum_hi, count, crc_lo, crc_hi]
}
