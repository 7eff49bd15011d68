// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Measurement records and their durable log
//!
//! Every sampling cycle produces one [`Sample`]. It is appended to the delimited log
//! file read by the presentation tier and forwarded to the collector as JSON.

pub mod append_log;

pub use append_log::AppendLog;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::relay::RelayState;

/// Timestamp layout shared by the log file and the uplink payload
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record with a fixed, ordered set of fields
pub trait LogRecord {
    /// Column names, in order, forming the log header
    fn field_names() -> &'static [&'static str];

    /// Formatted values, in the order of [`LogRecord::field_names`]
    fn field_values(&self) -> Vec<String>;
}

/// One measurement cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    /// Smoothed pH, rounded to two decimals
    pub ph: f64,
    /// Water temperature in degrees Celsius, NaN if the sensor failed
    pub temperature: f64,
    #[serde(rename = "relay")]
    pub relay_state: RelayState,
}

impl Sample {
    pub fn new(
        timestamp: NaiveDateTime,
        ph: f64,
        temperature: f64,
        relay_state: RelayState,
    ) -> Self {
        Self {
            timestamp,
            ph: (ph * 100.0).round() / 100.0,
            temperature,
            relay_state,
        }
    }
}

impl LogRecord for Sample {
    fn field_names() -> &'static [&'static str] {
        &["timestamp", "ph", "temperature", "relay"]
    }

    fn field_values(&self) -> Vec<String> {
        vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", self.ph),
            format!("{:.2}", self.temperature),
            self.relay_state.as_flag().to_string(),
        ]
    }
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_log_line_fields() {
        let sample = Sample::new(timestamp(), 6.8462, 24.5, RelayState::On);
        assert_eq!(
            sample.field_values(),
            vec!["2024-03-09 14:05:07", "6.85", "24.50", "1"]
        );
    }

    #[test]
    fn test_json_payload() {
        let sample = Sample::new(timestamp(), 6.9, 25.125, RelayState::Off);
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "timestamp": "2024-03-09 14:05:07",
                "ph": 6.9,
                "temperature": 25.125,
                "relay": 0
            })
        );
    }

    #[test]
    fn test_missing_temperature_is_logged_as_nan() {
        let sample = Sample::new(timestamp(), 7.0, f64::NAN, RelayState::Off);
        assert_eq!(sample.field_values()[2], "NaN");
    }
}
