// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Operator tool for the pH controller
//!
//! ```bash
//! # Suspend regulation while servicing the tank
//! aquapi_ctl pause
//! aquapi_ctl resume
//!
//! # Calibrate: dip the probe in the pH 4 buffer, read, store
//! aquapi_ctl calibration-reading
//! aquapi_ctl set-calibration --ph4 337
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use rust_aquapi::config::Config;
use rust_aquapi::error::CommandChannelError;
use rust_aquapi::ipc::{CommandChannel, IpcCommand};
use rust_aquapi::probe::{self, PhEstimator};
use rust_aquapi::settings::{SettingsPatch, SettingsStore};

/// Control a running pH controller and calibrate its probe
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long, default_value = "aquapi.yaml")]
    config: PathBuf,

    /// Use the simulated probe
    #[arg(long)]
    simulate: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stop sampling and actuation until resumed
    Pause,
    /// Restart sampling and actuation
    Resume,
    /// Print one raw probe reading and its calibrated pH as JSON
    CalibrationReading,
    /// Store new calibration points in the settings file
    SetCalibration {
        /// Raw ADC value measured in the pH 4 buffer
        #[arg(long)]
        ph4: Option<i64>,
        /// Raw ADC value measured in the pH 7 buffer
        #[arg(long)]
        ph7: Option<i64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.simulate, None, None, None, None, true);

    match args.command {
        Command::Pause => send(&config, IpcCommand::PauseController),
        Command::Resume => send(&config, IpcCommand::ResumeController),
        Command::CalibrationReading => calibration_reading(&config),
        Command::SetCalibration { ph4, ph7 } => {
            if ph4.is_none() && ph7.is_none() {
                anyhow::bail!("Nothing to store: give --ph4 and/or --ph7");
            }
            let store = SettingsStore::new(&config.settings_path);
            let settings = store.update(&SettingsPatch::calibration(ph4, ph7))?;
            println!("{}", serde_json::to_string(&settings.ph_calibration)?);
            Ok(())
        }
    }
}

fn send(config: &Config, command: IpcCommand) -> Result<()> {
    let channel = CommandChannel::new(&config.ipc.pipe_path);
    match channel.try_put(command) {
        Ok(()) => {
            println!("{} sent", command);
            Ok(())
        }
        Err(CommandChannelError::NoReader(path)) => {
            anyhow::bail!("No controller is listening on {}", path.display())
        }
        Err(err) => Err(err).context("Failed to send command"),
    }
}

fn calibration_reading(config: &Config) -> Result<()> {
    let settings = SettingsStore::new(&config.settings_path).load()?;
    let transport = probe::create_transport(&config.probe).context("Failed to open pH probe")?;
    let request = u8::try_from(config.probe.request).context("Invalid probe request byte")?;
    let mut estimator = PhEstimator::new(transport, request, 1);

    let ph_raw = estimator.read_raw().context("Probe reading failed")?;
    let ph = probe::calibrate(ph_raw, &settings.ph_calibration);
    debug!("Raw {} with calibration {:?}", ph_raw, settings.ph_calibration);

    println!("{}", serde_json::json!({ "ph": ph, "ph_raw": ph_raw }));
    Ok(())
}
