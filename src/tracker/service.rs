//! Tracker runtime
//!
//! Runs a `FormTracker` on a single tokio task that owns all of its state.
//! The task selects over host commands, the earliest debounce deadline and a
//! maintenance interval. Closing the command channel is page teardown.

use super::{FormTracker, TrackerCommand};
use crate::config::TrackerConfig;
use crate::sync::RemoteSync;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub struct TrackerService {
    tracker: FormTracker,
    sync: Option<RemoteSync>,
    maintenance_interval: Duration,
}

impl TrackerService {
    pub fn new(tracker: FormTracker, config: &TrackerConfig) -> Self {
        Self {
            tracker,
            sync: None,
            maintenance_interval: config.maintenance_interval,
        }
    }

    /// Enable best-effort remote sync
    pub fn with_sync(mut self, sync: RemoteSync) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Process commands until the channel closes, then run teardown
    ///
    /// Returns the tracker so callers can inspect the final state.
    pub async fn run(mut self, mut commands: mpsc::Receiver<TrackerCommand>) -> FormTracker {
        // First maintenance round runs one period after start
        let mut maintenance = interval_at(
            Instant::now() + self.maintenance_interval,
            self.maintenance_interval,
        );
        maintenance.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Tracker session {} started", self.tracker.session_id());

        loop {
            let next_save = self.tracker.next_save_deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.tracker.apply(command, Instant::now()),
                    None => {
                        debug!("Command channel closed, tearing down");
                        break;
                    }
                },
                _ = wait_until(next_save) => {
                    let saved = self.tracker.flush_due(Instant::now());
                    if !saved.is_empty() {
                        debug!("Debounced save wrote {} entries", saved.len());
                    }
                }
                _ = maintenance.tick() => {
                    let report = self.tracker.maintenance(Utc::now());
                    debug!(
                        "Maintenance: flushed {}, evicted {}, purged {}",
                        report.flushed, report.evicted, report.purged
                    );
                    self.sync_pending();
                }
            }
        }

        let abandoned = self.tracker.teardown(Utc::now());
        self.sync_pending_now().await;

        info!(
            "Tracker session {} ended ({} entries abandoned)",
            self.tracker.session_id(),
            abandoned.len()
        );
        self.tracker
    }

    fn sync_pending(&mut self) {
        let now = Instant::now();
        let Some(sync) = self.sync.as_mut() else {
            return;
        };
        if !self.tracker.has_unsynced() || !sync.ready(now) {
            return;
        }
        let entries = self.tracker.take_unsynced();
        sync.dispatch(entries, now);
    }

    /// Teardown pushes bypass the rate limit and are awaited before returning
    async fn sync_pending_now(&mut self) {
        let Some(sync) = self.sync.as_mut() else {
            return;
        };
        if self.tracker.has_unsynced() {
            let entries = self.tracker.take_unsynced();
            let handles = sync.dispatch(entries, Instant::now());
            sync.drain(handles).await;
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
