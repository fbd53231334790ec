//! Local persistent key-value storage
//!
//! Backup entries are persisted as one JSON array under a single storage key.
//! Writers never blind-overwrite that array: they read it, merge their entries
//! by identifier, apply the capacity cap and write the result back.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::BackupEntry;
use tracing::warn;

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "formkeep_backups";

/// Key-value storage backend holding string values
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value under `key`
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read the entry array under `key`
///
/// Missing data and malformed JSON both yield an empty set; the latter is
/// logged.
pub fn read_entries(store: &dyn KeyValueStore, key: &str) -> Result<Vec<BackupEntry>> {
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Vec<BackupEntry>>(&raw) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!("Stored backups under '{}' are malformed, starting empty: {}", key, e);
            Ok(Vec::new())
        }
    }
}

/// Merge `updates` into the persisted array and write it back
///
/// Entries are upserted by identifier (later wins), sorted by `last_updated`
/// descending, and truncated to the `cap` most recent. Returns the number of
/// entries written.
pub fn merge_entries(
    store: &dyn KeyValueStore,
    key: &str,
    updates: &[BackupEntry],
    cap: usize,
) -> Result<usize> {
    let mut entries = read_entries(store, key)?;
    for update in updates {
        upsert(&mut entries, update.clone());
    }
    write_entries(store, key, entries, cap)
}

/// Sort, cap and write the full entry array
pub fn write_entries(
    store: &dyn KeyValueStore,
    key: &str,
    mut entries: Vec<BackupEntry>,
    cap: usize,
) -> Result<usize> {
    sort_recent_first(&mut entries);
    entries.truncate(cap);
    let json = serde_json::to_string(&entries)?;
    store.set(key, &json)?;
    Ok(entries.len())
}

/// Insert or replace by identifier
pub fn upsert(entries: &mut Vec<BackupEntry>, entry: BackupEntry) {
    match entries.iter_mut().find(|e| e.id == entry.id) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

pub fn sort_recent_first(entries: &mut [BackupEntry]) {
    entries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
}
