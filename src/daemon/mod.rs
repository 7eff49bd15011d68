// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon runs the controller as three cooperating periodic tasks, each on its own
//! thread:
//!
//! * **sample**: every `interval` seconds, read the pH, switch the CO2 relay, log and
//!   forward the sample, reload the settings
//! * **log-flush**: every `log_flush_period` seconds, push the data log to disk
//! * **command-poll**: every second, read pause/resume commands from the named pipe
//!   and apply them to the two other tasks
//!
//! ## Usage
//!
//! ```no_run
//! use rust_aquapi::config::Config;
//! use rust_aquapi::daemon::{Daemon, Hardware};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("aquapi.yaml")?;
//!     let hardware = Hardware::from_config(&config)?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config, hardware, tokio::runtime::Handle::current())?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     tokio::task::spawn_blocking(move || daemon.join()).await??;
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod launch_daemon;
pub mod periodic_task;

pub use controller::ControlLoop;
pub use launch_daemon::{Daemon, Hardware, TaskKind, DEFAULT_TICK};
pub use periodic_task::{PeriodicTask, TaskControl, TaskState};
