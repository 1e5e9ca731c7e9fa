//! Polling coordinator: the data source the host observes.
//!
//! Holds the latest [`DataState`] in a [`watch`] channel so readers always
//! see a whole snapshot. Refresh runs are serialized behind a mutex; a
//! refresh request made while one is running coalesces into the next run.

use std::sync::Arc;
use std::time::Duration;

use evnex_bridge_domain::snapshot::Snapshot;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::refresh::{RefreshError, RefreshService};
use crate::ports::{EvnexApi, TokenStore};

/// Outcome of the latest refresh, as seen by the host.
#[derive(Debug, Clone, Default)]
pub enum DataState {
    /// No refresh has succeeded yet.
    #[default]
    Pending,
    Ready(Arc<Snapshot>),
    /// The latest refresh failed; the previous snapshot, if any, is kept.
    Failed {
        error: String,
        last_good: Option<Arc<Snapshot>>,
    },
}

impl DataState {
    /// Latest successful snapshot, including the one kept after a failure.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        match self {
            Self::Pending => None,
            Self::Ready(snapshot) => Some(Arc::clone(snapshot)),
            Self::Failed { last_good, .. } => last_good.clone(),
        }
    }
}

/// Runs the refresh routine on an interval or on request.
pub struct Coordinator<A, T> {
    refresh: Mutex<RefreshService<A, T>>,
    state: watch::Sender<DataState>,
    requested: Notify,
    interval: Duration,
}

impl<A, T> Coordinator<A, T>
where
    A: EvnexApi + 'static,
    T: TokenStore + 'static,
{
    /// Create a coordinator polling every `interval`.
    pub fn new(refresh: RefreshService<A, T>, interval: Duration) -> Self {
        let (state, _) = watch::channel(DataState::Pending);
        Self {
            refresh: Mutex::new(refresh),
            state,
            requested: Notify::new(),
            interval,
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DataState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> DataState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.borrow().snapshot()
    }

    /// Initial refresh; setup must fail when it does.
    ///
    /// # Errors
    ///
    /// Returns the [`RefreshError`] of the failed run.
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        info!("Running first refresh");
        self.refresh_now().await
    }

    /// Run one refresh and publish its outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`RefreshError`] of the failed run after publishing
    /// [`DataState::Failed`].
    pub async fn refresh_now(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let service = self.refresh.lock().await;
        match service.refresh().await {
            Ok(snapshot) => {
                debug!(
                    chargers = snapshot.charge_points.len(),
                    orgs = snapshot.org_briefs.len(),
                    "Refresh succeeded"
                );
                self.state.send_replace(DataState::Ready(Arc::clone(&snapshot)));
                Ok(snapshot)
            }
            Err(err) => {
                let last_good = self.snapshot();
                self.state.send_replace(DataState::Failed {
                    error: err.to_string(),
                    last_good,
                });
                Err(err)
            }
        }
    }

    /// Ask for a refresh soon; never blocks.
    pub fn request_refresh(&self) {
        self.requested.notify_one();
    }

    /// Poll forever, on every tick or request.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately; setup already refreshed
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => debug!("Scheduled refresh"),
                () = self.requested.notified() => {
                    debug!("Requested refresh");
                    ticker.reset();
                }
            }
            if let Err(err) = self.refresh_now().await {
                error!(error = %err, "Refresh failed");
            }
        }
    }
}
