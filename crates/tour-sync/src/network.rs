//! Network state observer.
//!
//! Projects platform connectivity notifications onto two flags,
//! `is_online` and `is_syncing`, and starts a settled sync pass on every
//! offline to online edge. Finished passes are broadcast as `SyncReport`s so
//! a UI can show one aggregate notification per pass.

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tour_core::{PassStatus, SyncReport};

use crate::sync::SyncCoordinator;

const REPORT_BUFFER: usize = 16;

/// Snapshot of both observable flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkState {
    pub is_online: bool,
    pub is_syncing: bool,
}

pub struct NetworkObserver {
    coordinator: Arc<SyncCoordinator>,
    online_tx: watch::Sender<bool>,
    state_tx: Arc<watch::Sender<NetworkState>>,
    reports_tx: broadcast::Sender<SyncReport>,
    passes: Mutex<Vec<JoinHandle<()>>>,
    forwarder: JoinHandle<()>,
}

impl NetworkObserver {
    /// Create an observer; must be called inside a Tokio runtime.
    ///
    /// Starting online does not trigger a pass, only a later offline to
    /// online transition does.
    pub fn new(coordinator: Arc<SyncCoordinator>, initially_online: bool) -> Self {
        let (online_tx, _) = watch::channel(initially_online);
        let state_tx = Arc::new(watch::Sender::new(NetworkState {
            is_online: initially_online,
            is_syncing: coordinator.is_syncing(),
        }));
        let (reports_tx, _) = broadcast::channel(REPORT_BUFFER);

        let forwarder = {
            let mut syncing = coordinator.subscribe_syncing();
            let state_tx = state_tx.clone();
            tokio::spawn(async move {
                while syncing.changed().await.is_ok() {
                    let busy = *syncing.borrow_and_update();
                    state_tx.send_if_modified(|state| {
                        let changed = state.is_syncing != busy;
                        state.is_syncing = busy;
                        changed
                    });
                }
            })
        };

        Self {
            coordinator,
            online_tx,
            state_tx,
            reports_tx,
            passes: Mutex::new(Vec::new()),
            forwarder,
        }
    }

    /// Record a connectivity notification
    pub fn set_online(&self, online: bool) {
        let previous = self.online_tx.send_replace(online);
        if previous == online {
            tracing::trace!(online, "Redundant connectivity notification");
            return;
        }

        self.state_tx.send_modify(|state| state.is_online = online);

        if !online {
            // A settling pass sees this through its own receiver and gives up
            tracing::info!("Connectivity lost");
            return;
        }

        tracing::info!("Connectivity restored, syncing offline documents after settle delay");
        let handle = tokio::spawn({
            let coordinator = self.coordinator.clone();
            let online_rx = self.online_tx.subscribe();
            let reports_tx = self.reports_tx.clone();
            async move {
                let Some(report) = coordinator.sync_after_settle(online_rx).await else {
                    return;
                };
                match &report.status {
                    PassStatus::Aborted { reason } => {
                        tracing::error!(reason = %reason, "Offline sync failed");
                    }
                    PassStatus::AlreadyRunning => {
                        tracing::debug!("Offline sync already running");
                        return;
                    }
                    PassStatus::Completed | PassStatus::NothingToSync => {
                        tracing::info!(summary = %report.summary(), "Offline sync pass finished");
                    }
                }
                // Nobody listening is fine
                let _ = reports_tx.send(report);
            }
        });

        let mut passes = self.passes.lock();
        passes.retain(|pass| !pass.is_finished());
        passes.push(handle);
    }

    /// Drive `set_online` from a stream of connectivity readings until it ends
    pub async fn run<S>(&self, signals: S)
    where
        S: Stream<Item = bool>,
    {
        futures::pin_mut!(signals);
        while let Some(online) = signals.next().await {
            self.set_online(online);
        }
        tracing::debug!("Connectivity signal stream ended");
    }

    #[must_use]
    pub fn state(&self) -> NetworkState {
        *self.state_tx.borrow()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state().is_online
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.state().is_syncing
    }

    /// Observe both flags
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.state_tx.subscribe()
    }

    /// Reports of every finished pass started by this observer
    #[must_use]
    pub fn reports(&self) -> broadcast::Receiver<SyncReport> {
        self.reports_tx.subscribe()
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Abort settling and running passes started by this observer
    pub fn shutdown(&self) {
        for pass in self.passes.lock().drain(..) {
            pass.abort();
        }
        self.forwarder.abort();
        tracing::debug!("Network observer shut down");
    }
}

impl Drop for NetworkObserver {
    fn drop(&mut self) {
        for pass in self.passes.get_mut().drain(..) {
            pass.abort();
        }
        self.forwarder.abort();
    }
}
