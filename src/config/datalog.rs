// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Data log configuration

use serde::{Deserialize, Serialize};

/// Configuration for the append-only measurement log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatalogConfig {
    /// Path of the delimited log file read by the presentation tier
    pub path: String,

    /// Field delimiter
    pub separator: String,

    /// Seconds to wait before the first periodic flush
    pub flush_delay_s: u64,
}

impl Default for DatalogConfig {
    fn default() -> Self {
        Self {
            path: "log.csv".to_string(),
            separator: ";".to_string(),
            flush_delay_s: 10,
        }
    }
}
