//! Dashboard reader
//!
//! Reads the persisted entry array for display, filtering, aggregation and
//! export, and accepts entries pushed by remote trackers. The reader is given
//! its storage handle at construction; there is no shared global store.

pub mod export;

pub use export::{ExportFormat, ExportRow};

use crate::config::TrackerConfig;
use crate::error::{FormKeepError, Result};
use crate::storage::{self, KeyValueStore};
use crate::types::{BackupEntry, BackupStats, EntryStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupFilter {
    pub status: Option<EntryStatus>,

    /// Case-insensitive text matched against title, form id and field data
    pub search: Option<String>,

    pub form_id: Option<String>,
}

impl BackupFilter {
    pub fn matches(&self, entry: &BackupEntry) -> bool {
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }

        if let Some(form_id) = &self.form_id {
            if &entry.form_id != form_id {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => search_matches(entry, &term.to_lowercase()),
        }
    }
}

fn search_matches(entry: &BackupEntry, term: &str) -> bool {
    if entry.form_title.to_lowercase().contains(term) || entry.form_id.to_lowercase().contains(term) {
        return true;
    }
    serde_json::to_string(&entry.fields)
        .map(|json| json.to_lowercase().contains(term))
        .unwrap_or(false)
}

pub struct DashboardReader {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    cap: usize,
    retention: Duration,
    write_lock: Mutex<()>,
}

impl DashboardReader {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: &TrackerConfig) -> Self {
        Self {
            storage,
            key: config.storage_key.clone(),
            cap: config.max_entries,
            retention: config.retention(),
            write_lock: Mutex::new(()),
        }
    }

    /// Load persisted entries; read failures yield an empty set
    fn load(&self) -> Vec<BackupEntry> {
        match storage::read_entries(self.storage.as_ref(), &self.key) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read backups for dashboard: {}", e);
                Vec::new()
            }
        }
    }

    /// Every entry, most recently updated first
    pub fn get_all_backups(&self) -> Vec<BackupEntry> {
        let mut entries = self.load();
        storage::sort_recent_first(&mut entries);
        entries
    }

    pub fn get_backups_by_form(&self, form_id: &str) -> Vec<BackupEntry> {
        self.filter(&BackupFilter {
            form_id: Some(form_id.to_string()),
            ..BackupFilter::default()
        })
    }

    /// Abandoned entries updated within the last `hours_back` hours
    pub fn get_abandoned_forms(&self, hours_back: i64) -> Vec<BackupEntry> {
        let cutoff = window_cutoff(Utc::now(), hours_back);
        self.get_all_backups()
            .into_iter()
            .filter(|e| e.status == EntryStatus::Abandoned && e.last_updated >= cutoff)
            .collect()
    }

    /// Failed or attempted-but-unsubmitted entries within the last `hours_back` hours
    pub fn get_failed_submissions(&self, hours_back: i64) -> Vec<BackupEntry> {
        let cutoff = window_cutoff(Utc::now(), hours_back);
        self.get_all_backups()
            .into_iter()
            .filter(|e| {
                let failed = e.status == EntryStatus::Failed
                    || (e.submission_attempted && !e.submitted);
                failed && e.last_updated >= cutoff
            })
            .collect()
    }

    pub fn filter(&self, filter: &BackupFilter) -> Vec<BackupEntry> {
        self.get_all_backups()
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect()
    }

    pub fn get_backup_stats(&self) -> BackupStats {
        stats_for(&self.load())
    }

    /// Render entries (optionally one form's) as JSON or CSV
    pub fn export_backup_data(&self, form_id: Option<&str>, format: ExportFormat) -> Result<String> {
        let entries = match form_id {
            Some(form_id) => self.get_backups_by_form(form_id),
            None => self.get_all_backups(),
        };
        debug!("Exporting {} entries as {:?}", entries.len(), format);
        export::render(&entries, format)
    }

    /// Upsert an entry pushed by a tracker; returns the stored entry count
    pub fn receive_backup_data(&self, entry: BackupEntry) -> Result<usize> {
        if entry.form_id.trim().is_empty() {
            return Err(FormKeepError::Other("received entry has no form id".to_string()));
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| FormKeepError::Storage("dashboard write lock poisoned".to_string()))?;

        debug!("Received entry {} for form {}", entry.id, entry.form_id);
        storage::merge_entries(self.storage.as_ref(), &self.key, &[entry], self.cap)
    }

    /// Remove entries outside the retention window
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| FormKeepError::Storage("dashboard write lock poisoned".to_string()))?;

        let cutoff = now - self.retention;
        let entries = storage::read_entries(self.storage.as_ref(), &self.key)?;
        let before = entries.len();
        let kept: Vec<BackupEntry> = entries.into_iter().filter(|e| e.last_updated >= cutoff).collect();
        let purged = before - kept.len();

        if purged > 0 {
            storage::write_entries(self.storage.as_ref(), &self.key, kept, self.cap)?;
            info!("Purged {} expired entries", purged);
        }
        Ok(purged)
    }
}

/// Start of a lookback window of `hours_back` hours ending at `now`
///
/// Windows reaching past the representable range cover everything.
pub fn window_cutoff(now: DateTime<Utc>, hours_back: i64) -> DateTime<Utc> {
    Duration::try_hours(hours_back.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Per-status counts plus recoverable abandoned entries
pub fn stats_for(entries: &[BackupEntry]) -> BackupStats {
    let mut stats = BackupStats {
        total: entries.len(),
        ..BackupStats::default()
    };

    for entry in entries {
        match entry.status {
            EntryStatus::Active => stats.active += 1,
            EntryStatus::Submitted => stats.submitted += 1,
            EntryStatus::Abandoned => {
                stats.abandoned += 1;
                if entry.completion_percentage > 50 {
                    stats.recoverable += 1;
                }
            }
            EntryStatus::Failed => stats.failed += 1,
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::{EntryEnvironment, EntryId, FieldDescriptor, FieldValue};

    fn entry(id: &str, form_id: &str, status: EntryStatus, completion: u8, age_hours: i64) -> BackupEntry {
        let mut e = BackupEntry::new(
            form_id,
            format!("{} form", form_id),
            "s1",
            &[FieldDescriptor::new("email", "email")],
            EntryEnvironment::default(),
        );
        e.id = EntryId::from(id);
        e.status = status;
        e.completion_percentage = completion;
        e.last_updated = Utc::now() - Duration::hours(age_hours);
        e
    }

    fn reader_with(entries: Vec<BackupEntry>) -> DashboardReader {
        let reader = DashboardReader::new(Arc::new(MemoryStore::new()), &TrackerConfig::default());
        for e in entries {
            reader.receive_backup_data(e).unwrap();
        }
        reader
    }

    #[test]
    fn test_all_backups_sorted_recent_first() {
        let reader = reader_with(vec![
            entry("old", "a", EntryStatus::Active, 0, 10),
            entry("new", "a", EntryStatus::Active, 0, 1),
            entry("mid", "b", EntryStatus::Active, 0, 5),
        ]);
        let ids: Vec<_> = reader.get_all_backups().into_iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(reader.get_backups_by_form("a").len(), 2);
    }

    #[test]
    fn test_stats_and_recoverable() {
        let reader = reader_with(vec![
            entry("1", "a", EntryStatus::Abandoned, 80, 1),
            entry("2", "a", EntryStatus::Abandoned, 50, 1),
            entry("3", "a", EntryStatus::Submitted, 100, 1),
            entry("4", "a", EntryStatus::Failed, 60, 1),
            entry("5", "a", EntryStatus::Active, 10, 1),
        ]);
        let stats = reader.get_backup_stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.abandoned, 2);
        assert_eq!(stats.recoverable, 1);
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.active, 1);
    }

    #[test]
    fn test_time_windows() {
        let mut attempted = entry("attempted", "a", EntryStatus::Active, 40, 2);
        attempted.submission_attempted = true;
        let reader = reader_with(vec![
            entry("recent", "a", EntryStatus::Abandoned, 40, 2),
            entry("stale", "a", EntryStatus::Abandoned, 40, 48),
            entry("failed", "a", EntryStatus::Failed, 40, 3),
            attempted,
        ]);

        let abandoned: Vec<_> = reader.get_abandoned_forms(24).into_iter().map(|e| e.id.0).collect();
        assert_eq!(abandoned, vec!["recent"]);

        let failed: Vec<_> = reader.get_failed_submissions(24).into_iter().map(|e| e.id.0).collect();
        assert_eq!(failed, vec!["attempted", "failed"]);
    }

    #[test]
    fn test_huge_window_covers_everything() {
        let reader = reader_with(vec![
            entry("abandoned", "a", EntryStatus::Abandoned, 40, 24 * 3),
            entry("failed", "a", EntryStatus::Failed, 40, 24 * 3),
        ]);

        assert_eq!(reader.get_abandoned_forms(i64::MAX).len(), 1);
        assert_eq!(reader.get_failed_submissions(i64::MAX).len(), 1);
        assert_eq!(reader.get_abandoned_forms(10_000_000_000).len(), 1);

        let now = Utc::now();
        assert_eq!(window_cutoff(now, i64::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_cutoff(now, -5), now);
        assert_eq!(window_cutoff(now, 2), now - Duration::hours(2));
    }

    #[test]
    fn test_search_covers_field_data() {
        let mut e = entry("1", "enquiry", EntryStatus::Abandoned, 40, 1);
        e.fields
            .get_mut("email")
            .unwrap()
            .apply(FieldValue::Text("Jane@School.edu".to_string()), Utc::now());
        let reader = reader_with(vec![e, entry("2", "tour", EntryStatus::Active, 0, 1)]);

        let by_field = reader.filter(&BackupFilter {
            search: Some("jane@school".to_string()),
            ..BackupFilter::default()
        });
        assert_eq!(by_field.len(), 1);

        let by_title = reader.filter(&BackupFilter {
            search: Some("TOUR FORM".to_string()),
            ..BackupFilter::default()
        });
        assert_eq!(by_title.len(), 1);

        let by_status = reader.filter(&BackupFilter {
            status: Some(EntryStatus::Active),
            search: Some("enquiry".to_string()),
            ..BackupFilter::default()
        });
        assert!(by_status.is_empty());
    }

    #[test]
    fn test_receive_is_idempotent() {
        let e = entry("1", "a", EntryStatus::Abandoned, 40, 1);
        let reader = reader_with(vec![e.clone()]);
        assert_eq!(reader.receive_backup_data(e).unwrap(), 1);
        assert_eq!(reader.get_all_backups().len(), 1);
    }

    #[test]
    fn test_receive_rejects_missing_form_id() {
        let reader = reader_with(vec![]);
        let e = entry("1", "", EntryStatus::Active, 0, 1);
        assert!(reader.receive_backup_data(e).is_err());
    }

    #[test]
    fn test_export_by_form() {
        let reader = reader_with(vec![
            entry("1", "a", EntryStatus::Abandoned, 40, 1),
            entry("2", "b", EntryStatus::Abandoned, 40, 1),
        ]);
        let csv = reader.export_backup_data(Some("a"), ExportFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_purge_expired() {
        let reader = reader_with(vec![
            entry("fresh", "a", EntryStatus::Abandoned, 40, 1),
            entry("expired", "a", EntryStatus::Abandoned, 40, 24 * 8),
        ]);
        assert_eq!(reader.purge_expired(Utc::now()).unwrap(), 1);
        assert_eq!(reader.get_all_backups().len(), 1);
    }
}
