//! The poll cycle: fetch, diff, apply, publish, persist.

use crate::changelog::ChangeLog;
use crate::config::interval::DEFAULT_INTERVAL;
use crate::differ;
use crate::error::{FetchError, PersistError};
use crate::poller::FacilitySource;
use crate::publisher::Publisher;
use crate::record::Record;
use crate::simulator::{QuietCycle, Silent};
use crate::snapshot::SnapshotFile;
use crate::store::StateStore;
use chrono::{DateTime, DurationRound, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};


/// A poll cycle that failed; broadcast to error subscribers
#[derive(Clone, Debug, Serialize)]
pub struct FeedError {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// What one poll cycle did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Records returned by the source
    pub fetched: usize,
    /// Real changes applied and published
    pub changed: usize,
    /// A simulated record was published instead of real changes
    pub synthetic: bool,
    /// A state file write was scheduled
    pub persisted: bool,
}

/// Owns the poll loop and everything it writes to.
///
/// `run_cycle` is the only code path that mutates the store. The timer task
/// runs cycles one after another, so there is a single writer.
pub struct Feed {
    store: Arc<StateStore>,
    publisher: Arc<Publisher>,
    source: Box<dyn FacilitySource>,
    quiet_cycle: Box<dyn QuietCycle>,
    snapshot: Option<SnapshotFile>,
    changelog: Option<ChangeLog>,
    interval: Duration,
    error_tx: broadcast::Sender<FeedError>,
    /// Latest scheduled state file write; each write waits for the previous one
    last_write: Mutex<Option<JoinHandle<()>>>,
}

impl Feed {
    pub fn new(
        store: Arc<StateStore>,
        publisher: Arc<Publisher>,
        source: Box<dyn FacilitySource>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            warn!("Poll interval must be positive, using default");
            DEFAULT_INTERVAL
        } else {
            interval
        };
        let (error_tx, _) = broadcast::channel(16);
        Self {
            store,
            publisher,
            source,
            quiet_cycle: Box::new(Silent),
            snapshot: None,
            changelog: None,
            interval,
            error_tx,
            last_write: Mutex::new(None),
        }
    }

    pub fn with_quiet_cycle(mut self, quiet_cycle: Box<dyn QuietCycle>) -> Self {
        self.quiet_cycle = quiet_cycle;
        self
    }

    pub fn with_snapshot(mut self, snapshot: SnapshotFile) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_changelog(mut self, changelog: ChangeLog) -> Self {
        self.changelog = Some(changelog);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// Subscribe to failed poll cycles
    pub fn subscribe_errors(&self) -> broadcast::Receiver<FeedError> {
        self.error_tx.subscribe()
    }

    /// Run one fetch-diff-apply-publish iteration.
    ///
    /// A fetch failure is reported to error subscribers and returned; the
    /// store is left untouched and the next tick simply tries again.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, FetchError> {
        let fetched = match self.source.fetch().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Could not retrieve facilities");
                let _ = self.error_tx.send(FeedError {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        };

        let mut outcome = CycleOutcome {
            fetched: fetched.len(),
            ..Default::default()
        };

        let now = observation_time();
        let changes = differ::diff(&self.store, fetched, now);

        if changes.is_empty() {
            if let Some(record) = self.quiet_cycle.on_quiet_cycle(now) {
                debug!(state = %record.state, "Publishing simulated change");
                self.publish(&record);
                outcome.synthetic = true;
            } else {
                debug!(facilities = outcome.fetched, "No changes");
            }
            return Ok(outcome);
        }

        for record in &changes {
            self.store.apply(record.id, record.clone());
            self.publish(record);
        }
        outcome.changed = changes.len();

        info!(
            changed = outcome.changed,
            facilities = self.store.len(),
            subscribers = self.publisher.subscriber_count(),
            "Published changes"
        );

        if let Some(changelog) = &self.changelog {
            changelog.append(&changes).await;
        }

        outcome.persisted = self.persist().await;
        Ok(outcome)
    }

    fn publish(&self, record: &Record) {
        if let Err(e) = self.publisher.publish(record) {
            error!(facility = record.id, error = %e, "Failed to encode record");
        }
    }

    /// Schedule a write of the whole store; returns false if none was scheduled
    async fn persist(&self) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return false;
        };

        let bytes = match self.store.serialize().map_err(PersistError::from) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "Failed to persist state");
                return false;
            }
        };

        let mut last_write = self.last_write.lock().await;
        let previous = last_write.take();
        let snapshot = snapshot.clone();
        *last_write = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let _ = snapshot.persist_in_background(bytes).await;
        }));
        true
    }

    /// Wait for scheduled state file writes to finish
    pub async fn flush(&self) {
        let pending = self.last_write.lock().await.take();
        if let Some(handle) = pending {
            let _ = handle.await;
        }
    }

    /// Start the poll loop (non-blocking).
    ///
    /// The first poll runs immediately. Cycles never overlap: a tick that
    /// comes due while a poll is still running is skipped.
    pub fn start(self: Arc<Self>) -> FeedHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let feed = self;

        let task = tokio::spawn(async move {
            info!(interval_secs = feed.interval.as_secs_f64(), "Starting feed");

            let mut ticker = interval(feed.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                // A pending stop wins over a tick that came due meanwhile
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                // Failures are already logged and broadcast
                let _ = feed.run_cycle().await;
            }

            feed.flush().await;
            info!("Feed stopped");
        });

        FeedHandle { stop_tx, task }
    }
}

/// Current time at the millisecond precision records are stored with
fn observation_time() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(chrono::Duration::milliseconds(1))
        .unwrap_or(now)
}

/// Control handle for a running feed. Dropping it also stops the loop.
pub struct FeedHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Stop after the current cycle (if any) and wait for pending writes
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Feed task failed");
        }
    }
}
