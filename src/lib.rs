//! FormKeep - Form Backup Tracking
//!
//! Tracks in-progress form fills so that abandoned or failed submissions can
//! be recovered later:
//! - Per-field tracking with completion percentage
//! - A contact-data heuristic that gates persistence
//! - Debounced, capped, retention-limited local storage
//! - A dashboard reader with filtering, statistics and JSON/CSV export
//!
//! # Architecture
//!
//! - **Types**: Core data structures (BackupEntry, FieldState, EntryStatus)
//! - **Storage**: Key-value backends (file, in-memory) holding the entry array
//! - **Tracker**: Field events, debounced saves, teardown and remote sync
//! - **Dashboard**: Read-side views over persisted entries, plus the HTTP API
//!
//! # Example
//!
//! ```ignore
//! use formkeep_core::{FormTracker, MemoryStore, TrackerConfig};
//! use formkeep_core::tracker::{FieldEvent, FormObservation};
//!
//! let config = TrackerConfig::default();
//! let mut tracker = FormTracker::new(Arc::new(MemoryStore::new()), &config);
//!
//! tracker.observe_form(observation);
//! tracker.handle_field_event(FieldEvent::input("enquiry", "email", "jane@school.edu"), Instant::now())?;
//! ```

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod heuristic;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use config::{SyncConfig, TrackerConfig};
pub use dashboard::{BackupFilter, DashboardReader, ExportFormat};
pub use error::{FormKeepError, Result};
pub use heuristic::has_valuable_data;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::EntryStore;
pub use tracker::{FormTracker, TrackerCommand, TrackerService};
pub use types::{
    BackupEntry, BackupStats, EntryEnvironment, EntryId, EntryStatus, FieldDescriptor, FieldState,
    FieldValue,
};
