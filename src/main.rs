// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the aquarium pH controller

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};

use rust_aquapi::config::{self, Config};
use rust_aquapi::daemon::{Daemon, Hardware};

/// Aquarium pH controller driving a CO2 injection relay
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Use simulated probe, temperature sensor and relay
    #[arg(long)]
    simulate: bool,

    /// Serial device of the pH probe
    #[arg(long)]
    serial_device: Option<String>,

    /// Operator settings file (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Measurement log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Collector URL receiving every sample
    #[arg(long, value_name = "URL")]
    uplink_url: Option<String>,

    /// Do not forward samples to the collector
    #[arg(long)]
    no_uplink: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger with appropriate level based on verbose and quiet flags
    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("aquapi.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.simulate,
        args.serial_device.clone(),
        args.settings.clone(),
        args.log_file.clone(),
        args.uplink_url.clone(),
        args.no_uplink,
    );

    info!("Starting pH controller");
    let hardware = Hardware::from_config(&config)?;
    let mut daemon = Daemon::new();
    daemon.launch(&config, hardware, tokio::runtime::Handle::current())?;

    let mut sigterm = unix_signal(SignalKind::terminate())?;
    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            info!("Received SIGINT, terminating controller");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, terminating controller");
        }
    }

    daemon.shutdown();
    // An in-flight probe read may take up to the serial timeout
    tokio::task::spawn_blocking(move || daemon.join()).await??;
    info!("Controller stopped");
    Ok(())
}
