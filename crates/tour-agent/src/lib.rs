//! # tour-agent
//!
//! Wires the offline sync pieces into a long-running process: a JSON-file
//! document cache, the REST resolver, the sync coordinator, and a network
//! observer fed by a periodic connectivity probe.
//!
//! The agent starts out offline, so the first successful probe runs a pass
//! over whatever was cached while it was not running.

use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tour_cache::FileDocumentCache;
use tour_common::AppConfig;
use tour_core::{DocumentCache, DocumentResolver, SyncReport};
use tour_remote::{ConnectivityProbe, RestDocumentResolver};
use tour_sync::{NetworkObserver, SyncCoordinator, SyncSettings};

pub struct Agent {
    observer: Arc<NetworkObserver>,
    probe: ConnectivityProbe,
}

impl Agent {
    /// Build every component from configuration; requires a Tokio runtime
    pub fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let remote = config
            .require_remote()
            .context("the agent needs the hosted backend")?;

        let cache: Arc<dyn DocumentCache> =
            Arc::new(FileDocumentCache::new(config.offline.cache_path.clone()));
        let resolver: Arc<dyn DocumentResolver> =
            Arc::new(RestDocumentResolver::new(remote).context("building document resolver")?);
        let probe = ConnectivityProbe::new(remote, config.connectivity.probe_interval())
            .context("building connectivity probe")?;

        let coordinator = Arc::new(SyncCoordinator::new(
            cache,
            resolver,
            SyncSettings::from(config),
        ));

        Ok(Self {
            observer: Arc::new(NetworkObserver::new(coordinator, false)),
            probe,
        })
    }

    #[must_use]
    pub fn observer(&self) -> &Arc<NetworkObserver> {
        &self.observer
    }

    /// Probe connectivity and sync on reconnect until `shutdown` completes
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let report_logger = tokio::spawn(log_reports(self.observer.reports()));

        tokio::select! {
            () = self.observer.run(self.probe.into_stream()) => {
                tracing::warn!("Connectivity probe ended");
            }
            () = shutdown => {
                tracing::info!("Shutdown requested");
            }
        }

        self.observer.shutdown();
        report_logger.abort();
        Ok(())
    }
}

async fn log_reports(mut reports: broadcast::Receiver<SyncReport>) {
    loop {
        match reports.recv().await {
            Ok(report) => {
                for failure in &report.result.errors {
                    tracing::warn!(document_id = %failure.id, reason = %failure.reason, "Document not synced");
                }
                tracing::info!(
                    summary = %report.summary(),
                    elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
                    "Sync report"
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Sync reports lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run the agent until Ctrl-C
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let agent = Agent::build(&config)?;
    tracing::info!("Offline sync agent running, press Ctrl-C to stop");
    agent.run_until(shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_requires_backend() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let err = Agent::build(&config).err().unwrap();
        assert!(err.to_string().contains("hosted backend"));
    }

    #[tokio::test]
    async fn test_builds_offline() {
        let config = AppConfig::from_lookup(|key| match key {
            "BACKEND_URL" => Some("http://127.0.0.1:1".to_string()),
            "BACKEND_API_KEY" => Some("anon".to_string()),
            _ => None,
        })
        .unwrap();

        let agent = Agent::build(&config).unwrap();
        assert!(!agent.observer().is_online());
        assert!(!agent.observer().is_syncing());

        // Stops as soon as shutdown resolves
        agent.run_until(async {}).await.unwrap();
    }
}
