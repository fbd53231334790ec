//! Entry store
//!
//! Holds the authoritative in-memory set of backup entries for a tracking
//! session and mirrors it to local key-value storage. Storage failures are
//! logged and swallowed: the in-memory set stays authoritative and later
//! writes are attempted as usual.

use crate::config::TrackerConfig;
use crate::storage::{self, KeyValueStore};
use crate::types::{BackupEntry, EntryId, EntryStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    /// Entries written during the flush
    pub flushed: usize,

    /// Expired entries dropped from the in-memory set
    pub evicted: usize,

    /// Expired entries removed from storage
    pub purged: usize,
}

/// Expired entries dropped by a retention purge, counted per side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub evicted: usize,
    pub purged: usize,
}

pub struct EntryStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    cap: usize,
    retention: chrono::Duration,
    entries: BTreeMap<EntryId, BackupEntry>,
    writes: u64,
}

impl EntryStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: &TrackerConfig) -> Self {
        Self {
            storage,
            key: config.storage_key.clone(),
            cap: config.max_entries,
            retention: config.retention(),
            entries: BTreeMap::new(),
            writes: 0,
        }
    }

    /// Load persisted entries into memory, replacing same-id entries
    ///
    /// Read failures and malformed data leave the in-memory set unchanged.
    pub fn load(&mut self) -> usize {
        match storage::read_entries(self.storage.as_ref(), &self.key) {
            Ok(entries) => {
                let count = entries.len();
                for entry in entries {
                    self.entries.insert(entry.id.clone(), entry);
                }
                debug!("Loaded {} persisted entries from '{}'", count, self.key);
                count
            }
            Err(e) => {
                warn!("Failed to read persisted entries from '{}': {}", self.key, e);
                0
            }
        }
    }

    pub fn get(&self, id: &EntryId) -> Option<&BackupEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &EntryId) -> Option<&mut BackupEntry> {
        self.entries.get_mut(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BackupEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful writes to durable storage
    pub fn persisted_writes(&self) -> u64 {
        self.writes
    }

    /// Add or replace an entry in memory without touching storage
    pub fn insert(&mut self, entry: BackupEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Upsert in memory and merge into durable storage
    ///
    /// Returns whether the durable write succeeded.
    pub fn save(&mut self, entry: BackupEntry) -> bool {
        let id = entry.id.clone();
        self.entries.insert(id.clone(), entry);
        self.persist(&id)
    }

    /// Merge the in-memory copy of `id` into durable storage
    pub fn persist(&mut self, id: &EntryId) -> bool {
        let Some(entry) = self.entries.get(id) else {
            warn!("Asked to persist unknown entry {}", id);
            return false;
        };

        match storage::merge_entries(
            self.storage.as_ref(),
            &self.key,
            std::slice::from_ref(entry),
            self.cap,
        ) {
            Ok(total) => {
                self.writes += 1;
                debug!("Persisted entry {} ({} stored)", id, total);
                true
            }
            Err(e) => {
                warn!("Failed to persist entry {}: {}", id, e);
                false
            }
        }
    }

    /// Write every persistable entry to durable storage in one merge
    pub fn flush(&mut self) -> usize {
        let pending: Vec<BackupEntry> = self
            .entries
            .values()
            .filter(|e| e.is_persistable())
            .cloned()
            .collect();

        if pending.is_empty() {
            return 0;
        }

        match storage::merge_entries(self.storage.as_ref(), &self.key, &pending, self.cap) {
            Ok(_) => {
                self.writes += 1;
                pending.len()
            }
            Err(e) => {
                warn!("Failed to flush {} entries: {}", pending.len(), e);
                0
            }
        }
    }

    /// Drop entries last updated before `now - retention`, in memory and storage
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> PurgeReport {
        let cutoff = now - self.retention;

        let before = self.entries.len();
        self.entries.retain(|_, e| e.last_updated >= cutoff);
        let mut report = PurgeReport {
            evicted: before - self.entries.len(),
            purged: 0,
        };

        match storage::read_entries(self.storage.as_ref(), &self.key) {
            Ok(stored) => {
                let stored_before = stored.len();
                let kept: Vec<BackupEntry> =
                    stored.into_iter().filter(|e| e.last_updated >= cutoff).collect();
                let removed = stored_before - kept.len();
                if removed > 0 {
                    match storage::write_entries(self.storage.as_ref(), &self.key, kept, self.cap) {
                        Ok(_) => report.purged = removed,
                        Err(e) => warn!("Failed to rewrite storage after purge: {}", e),
                    }
                }
            }
            Err(e) => warn!("Failed to read storage for purge: {}", e),
        }

        if report.evicted > 0 || report.purged > 0 {
            info!(
                "Purged entries older than {} days ({} from memory, {} from storage)",
                self.retention.num_days(),
                report.evicted,
                report.purged
            );
        }
        report
    }

    /// Flush, then purge expired entries
    pub fn maintenance(&mut self, now: DateTime<Utc>) -> MaintenanceReport {
        let flushed = self.flush();
        let PurgeReport { evicted, purged } = self.purge_expired(now);
        MaintenanceReport {
            flushed,
            evicted,
            purged,
        }
    }

    /// Unload handling: abandon every active, unsubmitted, unattempted entry
    ///
    /// Each abandoned entry records its time on page and is written to storage
    /// regardless of the valuable-data gate.
    pub fn abandon_active(&mut self, now: DateTime<Utc>) -> Vec<EntryId> {
        let ids: Vec<EntryId> = self
            .entries
            .values()
            .filter(|e| {
                e.status == EntryStatus::Active && !e.submitted && !e.submission_attempted
            })
            .map(|e| e.id.clone())
            .collect();

        for id in &ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.status = EntryStatus::Abandoned;
                let elapsed = (now - entry.created_at).num_milliseconds().max(0);
                entry.environment.time_on_page = Some(elapsed as u64);
                entry.last_updated = now;
            }
            self.persist(id);
        }

        if !ids.is_empty() {
            info!("Marked {} entries abandoned on teardown", ids.len());
        }
        ids
    }
}
