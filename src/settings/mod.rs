// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Operator settings
//!
//! The operator-facing settings live in a JSON file that the web front end edits
//! while the controller is running. The control loop reloads it at the end of every
//! sampling cycle, so band, schedule and calibration changes apply without a restart.
//!
//! ```json
//! {
//!     "day_scheme": { "ph_max": 6.9, "ph_min": 6.8, "start": "07:00", "end": "19:00" },
//!     "night_scheme": { "ph_max": 6.9, "ph_min": 6.8 },
//!     "interval": 5,
//!     "log_flush_period": 600,
//!     "kh": 6,
//!     "ph_calibration": { "4": 337, "7": 394 }
//! }
//! ```
//!
//! A missing file is not an error: [`SettingsStore::load`] writes the defaults and
//! reads them back. The file is only ever rewritten as a whole, through
//! [`SettingsStore::update`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleConfig;
use crate::utility::atomic_write;

/// Acceptable pH range; CO2 injection starts at `max` and stops at `min`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhBand {
    #[serde(rename = "ph_max")]
    pub max: f64,
    #[serde(rename = "ph_min")]
    pub min: f64,
}

/// Day scheme: a pH band active between `start` (inclusive) and `end` (exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayScheme {
    #[serde(flatten)]
    pub band: PhBand,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

/// Two-point probe calibration: raw ADC values measured in pH 4 and pH 7 buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationTable {
    #[serde(rename = "4")]
    pub adc_at_ph4: i64,
    #[serde(rename = "7")]
    pub adc_at_ph7: i64,
}

impl CalibrationTable {
    /// A calibration with identical points cannot be inverted
    pub fn is_degenerate(&self) -> bool {
        self.adc_at_ph4 == self.adc_at_ph7
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            adc_at_ph4: 337,
            adc_at_ph7: 394,
        }
    }
}

/// Operator settings, see the module documentation for the file layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub day_scheme: DayScheme,
    /// Band used outside of the day scheme hours
    pub night_scheme: PhBand,
    /// Sampling period in seconds
    pub interval: u64,
    /// Data log flush period in seconds
    pub log_flush_period: u64,
    /// Carbonate hardness of the tank water (dKH), informational
    pub kh: i64,
    pub ph_calibration: CalibrationTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            day_scheme: DayScheme {
                band: PhBand { max: 6.9, min: 6.8 },
                start: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
                end: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            },
            night_scheme: PhBand { max: 6.9, min: 6.8 },
            interval: 5,
            log_flush_period: 600,
            kh: 6,
            ph_calibration: CalibrationTable::default(),
        }
    }
}

impl Settings {
    /// Schedule view consumed by the schedule engine
    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            day_start: self.day_scheme.start,
            day_end: self.day_scheme.end,
            day_band: self.day_scheme.band,
            night_band: self.night_scheme,
        }
    }

    /// Check the rules serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (name, band) in [
            ("day_scheme", &self.day_scheme.band),
            ("night_scheme", &self.night_scheme),
        ] {
            if !band.min.is_finite() || !band.max.is_finite() {
                anyhow::bail!("{}: pH limits must be finite numbers", name);
            }
            if band.min > band.max {
                anyhow::bail!(
                    "{}: ph_min ({}) is above ph_max ({})",
                    name,
                    band.min,
                    band.max
                );
            }
        }

        if self.day_scheme.start >= self.day_scheme.end {
            warn!(
                "day_scheme: start {} is not before end {}, the night band applies all day",
                self.day_scheme.start.format("%H:%M"),
                self.day_scheme.end.format("%H:%M")
            );
        }

        if self.interval == 0 {
            anyhow::bail!("interval must be at least 1 second");
        }
        if self.log_flush_period == 0 {
            anyhow::bail!("log_flush_period must be at least 1 second");
        }
        Ok(())
    }
}

/// Partial settings update; `None` fields keep their persisted value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub adc_at_ph4: Option<i64>,
    pub adc_at_ph7: Option<i64>,
    pub interval: Option<u64>,
    pub log_flush_period: Option<u64>,
    pub kh: Option<i64>,
}

impl SettingsPatch {
    /// Patch updating only the calibration points
    pub fn calibration(adc_at_ph4: Option<i64>, adc_at_ph7: Option<i64>) -> Self {
        Self {
            adc_at_ph4,
            adc_at_ph7,
            ..Self::default()
        }
    }

    fn apply_to(&self, settings: &mut Settings) {
        if let Some(raw) = self.adc_at_ph4 {
            settings.ph_calibration.adc_at_ph4 = raw;
        }
        if let Some(raw) = self.adc_at_ph7 {
            settings.ph_calibration.adc_at_ph7 = raw;
        }
        if let Some(interval) = self.interval {
            settings.interval = interval;
        }
        if let Some(period) = self.log_flush_period {
            settings.log_flush_period = period;
        }
        if let Some(kh) = self.kh {
            settings.kh = kh;
        }
    }
}

/// JSON-backed settings store
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the settings file, writing the defaults first if it is missing
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            info!(
                "Settings file not found at {:?}, writing defaults",
                self.path
            );
            self.save(&Settings::default())?;
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file at {:?}", self.path))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {:?}", self.path))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {:?}", self.path))?;

        debug!("Settings loaded from {:?}", self.path);
        Ok(settings)
    }

    /// Merge `patch` into the persisted settings and rewrite the whole file
    pub fn update(&self, patch: &SettingsPatch) -> Result<Settings> {
        let mut settings = self.load()?;
        patch.apply_to(&mut settings);
        settings
            .validate()
            .context("Settings update rejected")?;
        self.save(&settings)?;
        info!("Settings updated in {:?}: {:?}", self.path, patch);
        Ok(settings)
    }

    /// Replace the settings file with `settings`
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        atomic_write(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to write settings file at {:?}", self.path))
    }
}

/// `HH:MM` (de)serialization of schedule times
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), FORMAT).map_err(|err| {
            serde::de::Error::custom(format!("invalid time '{}', expected HH:MM: {}", raw, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{determine_band, Scheme};
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_bootstraps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let store = SettingsStore::new(dir.path().join("settings.json"));

        let settings = store.load()?;

        assert!(store.path().exists());
        assert_eq!(settings, Settings::default());
        Ok(())
    }

    #[test]
    fn test_reads_original_file_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "day_scheme": {"ph_max": 7.0, "ph_min": 6.7, "start": "08:30", "end": "20:15"},
                "night_scheme": {"ph_max": 7.2, "ph_min": 7.0},
                "interval": 60,
                "log_flush_period": 300,
                "kh": 4,
                "ph_calibration": {"7": 400, "4": 340}
            }"#,
        )?;

        let settings = SettingsStore::new(&path).load()?;

        assert_eq!(settings.day_scheme.band, PhBand { max: 7.0, min: 6.7 });
        assert_eq!(settings.day_scheme.start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(settings.day_scheme.end, NaiveTime::from_hms_opt(20, 15, 0).unwrap());
        assert_eq!(settings.night_scheme, PhBand { max: 7.2, min: 7.0 });
        assert_eq!(settings.interval, 60);
        assert_eq!(settings.log_flush_period, 300);
        assert_eq!(settings.kh, 4);
        assert_eq!(
            settings.ph_calibration,
            CalibrationTable {
                adc_at_ph4: 340,
                adc_at_ph7: 400
            }
        );
        Ok(())
    }

    #[test]
    fn test_invalid_time_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        let mut value = serde_json::to_value(Settings::default())?;
        value["day_scheme"]["start"] = "7h00".into();
        fs::write(&path, value.to_string())?;

        assert!(SettingsStore::new(&path).load().is_err());
        Ok(())
    }

    #[test]
    fn test_inverted_band_is_rejected() {
        let mut settings = Settings::default();
        settings.night_scheme = PhBand { max: 6.5, min: 7.0 };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_day_window_is_accepted() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        let mut value = serde_json::to_value(Settings::default())?;
        value["day_scheme"]["start"] = "20:00".into();
        value["day_scheme"]["end"] = "08:00".into();
        fs::write(&path, value.to_string())?;

        let settings = SettingsStore::new(&path).load()?;
        let schedule = settings.schedule();
        for hour in [0, 8, 12, 20, 23] {
            let now = NaiveTime::from_hms_opt(hour, 0, 0).unwrap();
            assert_eq!(determine_band(now, &schedule).scheme, Scheme::Night);
        }
        Ok(())
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let settings = Settings {
            interval: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_update_rewrites_calibration_only() -> Result<()> {
        let dir = tempdir()?;
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let mut original = store.load()?;
        original.interval = 42;
        store.save(&original)?;

        let updated = store.update(&SettingsPatch::calibration(Some(330), None))?;

        assert_eq!(updated.ph_calibration.adc_at_ph4, 330);
        assert_eq!(updated.ph_calibration.adc_at_ph7, 394);
        assert_eq!(updated.interval, 42);
        assert_eq!(store.load()?, updated);
        Ok(())
    }

    #[test]
    fn test_rejected_update_leaves_file_untouched() -> Result<()> {
        let dir = tempdir()?;
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let before = store.load()?;

        let patch = SettingsPatch {
            interval: Some(0),
            ..SettingsPatch::default()
        };
        assert!(store.update(&patch).is_err());
        assert_eq!(store.load()?, before);
        Ok(())
    }
}
