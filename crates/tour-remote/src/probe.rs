//! Connectivity probe.
//!
//! A periodic health request against the backend stands in for the
//! platform's online/offline notifications. Any HTTP response counts as
//! online; a transport failure (DNS, refused, timeout) counts as offline.

use futures::stream::{self, Stream};
use reqwest::Client;
use std::time::Duration;
use tour_common::RemoteConfig;

use crate::error::{normalize_base_url, RemoteResult};

/// Health endpoint of the auth service, cheap and unauthenticated
const HEALTH_PATH: &str = "/auth/v1/health";

#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    client: Client,
    health_url: String,
    api_key: String,
    interval: Duration,
}

impl ConnectivityProbe {
    pub fn new(config: &RemoteConfig, interval: Duration) -> RemoteResult<Self> {
        // A probe slower than its own interval is as good as offline
        let client = Client::builder().timeout(interval.max(Duration::from_secs(1))).build()?;
        Ok(Self {
            client,
            health_url: format!("{}{HEALTH_PATH}", normalize_base_url(&config.url)?),
            api_key: config.api_key.clone(),
            interval,
        })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Probe once
    pub async fn check(&self) -> bool {
        match self
            .client
            .get(&self.health_url)
            .header("apikey", &self.api_key)
            .send()
            .await
        {
            Ok(response) => {
                tracing::trace!(status = %response.status(), "Connectivity probe answered");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Connectivity probe failed");
                false
            }
        }
    }

    /// Probe immediately, then once per interval, forever
    pub fn into_stream(self) -> impl Stream<Item = bool> + Send {
        stream::unfold((self, true), |(probe, first)| async move {
            if !first {
                tokio::time::sleep(probe.interval).await;
            }
            let online = probe.check().await;
            Some((online, (probe, false)))
        })
    }
}
