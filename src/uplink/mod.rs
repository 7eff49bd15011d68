// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Best-effort forwarding of samples to the collector
//!
//! Each sample is POSTed once as JSON. The request runs on the tokio runtime, so a
//! slow or absent collector never delays the sampling cycle. Failures are logged and
//! dropped; there is no retry.

use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Url};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::UplinkConfig;
use crate::datalog::Sample;
use crate::error::UplinkError;

/// Forwards samples to the collector endpoint
#[derive(Debug, Clone)]
pub struct UplinkPublisher {
    client: Client,
    url: Url,
    runtime: Handle,
}

impl UplinkPublisher {
    /// Publisher posting to the configured URL from tasks spawned on `runtime`
    pub fn new(config: &UplinkConfig, runtime: Handle) -> Result<Self, UplinkError> {
        let url =
            Url::parse(&config.url).map_err(|_| UplinkError::InvalidUrl(config.url.clone()))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url,
            runtime,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Start forwarding `sample` and return immediately
    ///
    /// The returned handle only matters to callers wanting to wait for the attempt.
    pub fn publish(&self, sample: &Sample) -> JoinHandle<()> {
        let client = self.client.clone();
        let url = self.url.clone();
        let sample = sample.clone();
        self.runtime.spawn(async move {
            match post_sample(&client, url, &sample).await {
                Ok(()) => debug!("Sample {} forwarded", sample.timestamp),
                Err(err) => warn!("Sample {} not forwarded: {}", sample.timestamp, err),
            }
        })
    }
}

/// POST one sample, failing on transport errors and non-success statuses
pub async fn post_sample(client: &Client, url: Url, sample: &Sample) -> Result<(), UplinkError> {
    let body = serde_json::to_vec(sample)?;
    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(UplinkError::Status(response.status()));
    }
    Ok(())
}
