// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sample uplink configuration

use serde::{Deserialize, Serialize};

/// Configuration of the collector receiving every sample.
///
/// # Example
///
/// ```
/// use rust_aquapi::config::UplinkConfig;
///
/// let uplink = UplinkConfig::default();
/// assert_eq!(uplink.url, "http://127.0.0.1:5000/post_data_frame");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Forward samples to the collector
    pub enabled: bool,

    /// Collector endpoint receiving the JSON samples
    pub url: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://127.0.0.1:5000/post_data_frame".to_string(),
            timeout_ms: 5000,
        }
    }
}
