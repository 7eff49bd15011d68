// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for the pH regulation runtime
//!
//! Each hardware or I/O boundary of the controller has its own error enum so the
//! control loop can decide locally how to recover:
//!
//! - [`ProbeError`]: serial transport failures, corrupt frames, degenerate calibration
//!   and implausible readings. The control loop reuses the last averaged pH.
//! - [`RelayError`]: GPIO access failures.
//! - [`LogError`]: append/rewrite/flush failures of the data log. Only the current
//!   cycle's persistence is lost; the next cycle retries.
//! - [`UplinkError`]: collector POST failures, always swallowed by the publisher.
//! - [`CommandChannelError`]: named pipe failures.
//!
//! Loading of configuration and settings files uses `anyhow` with context instead,
//! as these errors are only reported to the operator.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a probe frame is rejected by the decoder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameFault {
    #[error("expected {expected} bytes, received {received}")]
    ShortFrame { expected: usize, received: usize },

    #[error("checksum mismatch: computed 0x{computed:04X}, received 0x{received:04X}")]
    ChecksumMismatch { computed: u16, received: u16 },

    #[error("frame reports zero samples")]
    EmptySampleSet,
}

/// Errors raised while obtaining a pH reading
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("corrupt probe frame: {0}")]
    FrameCorrupt(#[from] FrameFault),

    #[error("degenerate calibration: pH 4 and pH 7 points share the raw value {raw}")]
    CalibrationDegenerate { raw: i64 },

    #[error("implausible pH reading {ph:.2} (measurement glitch)")]
    ReadGlitch { ph: f64 },

    #[error("temperature sensor error on {path}: {reason}")]
    Temperature { path: PathBuf, reason: String },
}

impl From<serialport::Error> for ProbeError {
    fn from(err: serialport::Error) -> Self {
        ProbeError::Transport(err.into())
    }
}

/// Errors raised by relay drivers
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("GPIO {pin} access failed on {path}: {source}")]
    Gpio {
        pin: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GPIO {pin} returned an unexpected level '{value}'")]
    InvalidLevel { pin: u32, value: String },
}

/// Errors raised by the append-only data log
#[derive(Error, Debug)]
pub enum LogError {
    #[error("log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replace {path} during header repair: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("log file {0} is closed")]
    Closed(PathBuf),
}

/// Errors raised while forwarding a sample to the collector
#[derive(Error, Debug)]
pub enum UplinkError {
    #[error("invalid collector URL '{0}'")]
    InvalidUrl(String),

    #[error("uplink request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("collector answered with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to serialize sample: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised by the inter-process command pipe
#[derive(Error, Debug)]
pub enum CommandChannelError {
    #[error("command pipe I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to create command pipe {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("{0} exists but is not a named pipe")]
    NotAFifo(PathBuf),

    #[error("no controller is listening on {0}")]
    NoReader(PathBuf),
}
