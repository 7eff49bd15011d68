// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_aquapi --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Probe**: the request byte must be ASCII, the averaging window and timeout non-zero
/// - **Data log**: the separator must be a single character that cannot appear in a
///   formatted value (not a digit, `.`, `-`, `:` or whitespace other than tab)
/// - **Uplink**: when enabled, the URL must be an absolute `http`/`https` URL
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if !config.probe.request.is_ascii() {
        anyhow::bail!(
            "Probe request must be a single ASCII character, got {:?}",
            config.probe.request
        );
    }
    if config.probe.averaging_window == 0 {
        anyhow::bail!("Probe averaging window must hold at least one reading");
    }
    if config.probe.timeout_ms == 0 {
        anyhow::bail!("Probe timeout must be greater than zero");
    }

    let mut separator = config.datalog.separator.chars();
    match (separator.next(), separator.next()) {
        (Some(c), None) if c == '\t' || !(c.is_ascii_digit() || ".-: ".contains(c)) => {}
        _ => anyhow::bail!(
            "Invalid data log separator {:?}: expected one character not used in values",
            config.datalog.separator
        ),
    }

    if config.uplink.enabled {
        let url = reqwest::Url::parse(&config.uplink.url)
            .with_context(|| format!("Invalid uplink url {}", config.uplink.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Uplink url must use http or https: {}", config.uplink.url);
        }
    }

    Ok(())
}
