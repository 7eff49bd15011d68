// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Day/night pH band selection

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

use crate::settings::PhBand;

/// Schedule part of the operator settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleConfig {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub day_band: PhBand,
    pub night_band: PhBand,
}

/// Which scheme produced the active band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Day,
    Night,
}

/// Band in force at a given time of day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveBand {
    pub scheme: Scheme,
    pub band: PhBand,
}

/// Select the band in force at `now`
///
/// Comparison is done at minute resolution: the day band applies when
/// `day_start <= now < day_end`, the night band otherwise.
pub fn determine_band(now: NaiveTime, config: &ScheduleConfig) -> ActiveBand {
    let minute = |t: NaiveTime| t.hour() * 60 + t.minute();
    let now = minute(now);

    if minute(config.day_start) <= now && now < minute(config.day_end) {
        ActiveBand {
            scheme: Scheme::Day,
            band: config.day_band,
        }
    } else {
        ActiveBand {
            scheme: Scheme::Night,
            band: config.night_band,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn config() -> ScheduleConfig {
        ScheduleConfig {
            day_start: hm(7, 0),
            day_end: hm(19, 0),
            day_band: PhBand { max: 6.9, min: 6.8 },
            night_band: PhBand { max: 7.2, min: 7.1 },
        }
    }

    #[test]
    fn test_day_window_bounds() {
        let config = config();
        assert_eq!(determine_band(hm(6, 59), &config).scheme, Scheme::Night);
        assert_eq!(determine_band(hm(7, 0), &config).scheme, Scheme::Day);
        assert_eq!(determine_band(hm(12, 30), &config).scheme, Scheme::Day);
        assert_eq!(determine_band(hm(18, 59), &config).scheme, Scheme::Day);
        assert_eq!(determine_band(hm(19, 0), &config).scheme, Scheme::Night);
        assert_eq!(determine_band(hm(23, 45), &config).scheme, Scheme::Night);
    }

    #[test]
    fn test_seconds_are_ignored() {
        let config = config();
        let almost_seven = NaiveTime::from_hms_opt(6, 59, 59).unwrap();
        let just_before_end = NaiveTime::from_hms_opt(18, 59, 59).unwrap();
        assert_eq!(determine_band(almost_seven, &config).scheme, Scheme::Night);
        assert_eq!(determine_band(just_before_end, &config).scheme, Scheme::Day);
    }

    #[test]
    fn test_returns_configured_band() {
        let config = config();
        assert_eq!(determine_band(hm(10, 0), &config).band, config.day_band);
        assert_eq!(determine_band(hm(2, 0), &config).band, config.night_band);
    }
}
