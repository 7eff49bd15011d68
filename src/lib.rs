// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust AquaPi library
//!
//! This library regulates the pH of an aquarium: it reads a pH probe over a serial
//! link, drives a CO2 injection relay to keep the pH inside a day/night band, logs
//! every measurement and can be paused or resumed by another process.

pub mod config;
pub mod daemon;
pub mod datalog;
pub mod error;
pub mod ipc;
pub mod probe;
pub mod relay;
pub mod schedule;
pub mod settings;
pub mod uplink;
pub mod utility;
