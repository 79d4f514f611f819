//! Today's schedule as served by `/schedule`, and the task that keeps it fresh.

use crate::error::{Result, ScheduleError};
use crate::models::ScheduleEntry;
use crate::scrapers::cpbl::CpblScraper;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

/// An immutable, complete result of one current-day fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub games: Vec<ScheduleEntry>,
    /// `None` for the empty snapshot the store starts with
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(games: Vec<ScheduleEntry>) -> Self {
        Self {
            games,
            fetched_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshFailure {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Shared handle to the published snapshot.
///
/// The lock only guards swapping an `Arc`, so readers never wait on a fetch
/// and always see one whole snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Arc<RwLock<Arc<Snapshot>>>,
    failure: Arc<RwLock<Option<RefreshFailure>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Publish a new snapshot in full and clear any recorded failure
    pub async fn replace(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = snapshot;
        *self.failure.write().await = None;
    }

    pub async fn record_failure(&self, err: &ScheduleError) {
        *self.failure.write().await = Some(RefreshFailure {
            message: err.to_string(),
            at: Utc::now(),
        });
    }

    pub async fn last_failure(&self) -> Option<RefreshFailure> {
        self.failure.read().await.clone()
    }
}

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Time between successful refreshes; `None` refreshes only until the first success
    pub interval: Option<Duration>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Some(Duration::from_secs(600)),
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl RefreshPolicy {
    /// How long to wait before the next attempt, doubling `backoff` after
    /// failures. `None` means stop.
    pub fn next_delay(&self, succeeded: bool, backoff: &mut Duration) -> Option<Duration> {
        if succeeded {
            *backoff = self.initial_backoff;
            return self.interval;
        }
        let delay = *backoff;
        *backoff = backoff.saturating_mul(2).min(self.max_backoff);
        Some(delay)
    }
}

/// Fetches today's schedule into the store, retrying failures with backoff
pub struct Refresher {
    store: SnapshotStore,
    scraper: Arc<CpblScraper>,
    policy: RefreshPolicy,
}

impl Refresher {
    pub fn new(store: SnapshotStore, scraper: Arc<CpblScraper>, policy: RefreshPolicy) -> Self {
        Self {
            store,
            scraper,
            policy,
        }
    }

    /// One fetch. On failure the previous snapshot stays published.
    pub async fn refresh(&self) -> Result<usize> {
        match self.scraper.fetch_current().await {
            Ok(games) => {
                let count = games.len();
                self.store.replace(Snapshot::new(games)).await;
                info!(games = count, "published today's schedule");
                Ok(count)
            }
            Err(err) => {
                error!(error = %err, "failed to refresh today's schedule");
                self.store.record_failure(&err).await;
                Err(err)
            }
        }
    }

    /// Keep refreshing, given whether the latest attempt succeeded
    pub async fn run(self, mut succeeded: bool) {
        let mut backoff = self.policy.initial_backoff;
        while let Some(delay) = self.policy.next_delay(succeeded, &mut backoff) {
            if !succeeded {
                match self.store.last_failure().await {
                    Some(failure) => info!(
                        retry_in = ?delay,
                        last_error = %failure.message,
                        failed_at = %failure.at,
                        "scheduling retry"
                    ),
                    None => info!(retry_in = ?delay, "scheduling retry"),
                }
            }
            tokio::time::sleep(delay).await;
            succeeded = self.refresh().await.is_ok();
        }
        info!("periodic refresh disabled, refresher stopping");
    }
}
