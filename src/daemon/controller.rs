// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! One sampling/actuation cycle
//!
//! Every cycle produces a [`Sample`], whatever fails along the way: probe failures
//! reuse the previous smoothed pH, a missing temperature is recorded as NaN and a
//! relay failure records the last observed relay state.

use std::sync::Arc;

use chrono::NaiveDateTime;
use log::{error, info, warn};

use crate::datalog::{AppendLog, Sample};
use crate::probe::{PhEstimator, ProbeTransport, TemperatureSensor};
use crate::relay::{RelayActuator, RelayDriver};
use crate::schedule::determine_band;
use crate::settings::{Settings, SettingsStore};
use crate::uplink::UplinkPublisher;

/// Everything the sampling task needs for one cycle
pub struct ControlLoop<T: ProbeTransport, D: RelayDriver> {
    estimator: PhEstimator<T>,
    actuator: RelayActuator<D>,
    temperature: Box<dyn TemperatureSensor>,
    log: Arc<AppendLog<Sample>>,
    uplink: Option<UplinkPublisher>,
    store: SettingsStore,
    settings: Settings,
}

impl<T: ProbeTransport, D: RelayDriver> ControlLoop<T, D> {
    pub fn new(
        estimator: PhEstimator<T>,
        actuator: RelayActuator<D>,
        temperature: Box<dyn TemperatureSensor>,
        log: Arc<AppendLog<Sample>>,
        uplink: Option<UplinkPublisher>,
        store: SettingsStore,
        settings: Settings,
    ) -> Self {
        Self {
            estimator,
            actuator,
            temperature,
            log,
            uplink,
            store,
            settings,
        }
    }

    /// Settings in force for the next cycle
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Seed the averaging buffer so the first cycles are not biased
    pub fn prime(&mut self) {
        match self.estimator.prime(&self.settings.ph_calibration) {
            Ok(ph) => info!("Initial pH reading {:.2}", ph),
            Err(err) => warn!("Initial pH reading failed: {}", err),
        }
    }

    /// Measure, actuate, record and forward one sample, then reload the settings
    pub fn run_cycle(&mut self, now: NaiveDateTime) -> Sample {
        let ph = self.estimator.average(&self.settings.ph_calibration);
        let active = determine_band(now.time(), &self.settings.schedule());

        let relay = match self.actuator.decide_and_apply(ph, &active.band) {
            Ok(state) => state,
            Err(err) => {
                error!("CO2 relay update failed: {}", err);
                self.actuator.last_observed()
            }
        };

        let temperature = self.temperature.read_celsius().unwrap_or_else(|err| {
            warn!("{}", err);
            f64::NAN
        });

        let sample = Sample::new(now, ph, temperature, relay);
        info!(
            "pH {:.2} ({:?} band {:.2}-{:.2}), {:.2}°C, CO2 {}",
            ph, active.scheme, active.band.min, active.band.max, temperature, relay
        );

        if let Err(err) = self.log.log_data(&sample) {
            error!("Sample not logged: {}", err);
        }
        if let Some(uplink) = &self.uplink {
            uplink.publish(&sample);
        }

        self.reload_settings();
        sample
    }

    /// Pick up settings edited since the last cycle; invalid files keep the current ones
    pub fn reload_settings(&mut self) {
        match self.store.load() {
            Ok(settings) => {
                if settings != self.settings {
                    info!("Settings changed on disk, applying");
                    self.settings = settings;
                }
            }
            Err(err) => warn!("Keeping previous settings: {:#}", err),
        }
    }
}
