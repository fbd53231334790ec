//! Common test utilities and helpers

#![allow(dead_code)]

use formkeep_core::tracker::{FieldEvent, FormObservation};
use formkeep_core::{
    BackupEntry, EntryEnvironment, FieldDescriptor, FileStore, TrackerCommand, TrackerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// File-backed storage in a fresh temporary directory
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn create_test_storage() -> (TempDir, Arc<FileStore>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = FileStore::open(temp_dir.path()).expect("Failed to open file store");
    (temp_dir, Arc::new(storage))
}

/// Default configuration with maintenance pushed out of the way
pub fn test_config() -> TrackerConfig {
    TrackerConfig {
        maintenance_interval: Duration::from_secs(3600),
        ..TrackerConfig::default()
    }
}

/// The enquiry form used across tests
pub fn enquiry_observation() -> FormObservation {
    FormObservation {
        form_id: "enquiry".to_string(),
        title: "Enrolment Enquiry".to_string(),
        fields: vec![
            FieldDescriptor::new("email", "email"),
            FieldDescriptor::new("parent_name", "text"),
            FieldDescriptor::new("phone", "tel"),
            FieldDescriptor::new("message", "textarea"),
        ],
        environment: EntryEnvironment {
            user_agent: "Mozilla/5.0 (test)".to_string(),
            referrer: String::new(),
            url: "https://school.example/enquire".to_string(),
            time_on_page: None,
        },
    }
}

pub fn observe_enquiry() -> TrackerCommand {
    TrackerCommand::ObserveForm(enquiry_observation())
}

pub fn input(field: &str, value: &str) -> TrackerCommand {
    TrackerCommand::Field(FieldEvent::input("enquiry", field, value))
}

/// Find an entry by form id in a persisted snapshot
pub fn find_form<'a>(entries: &'a [BackupEntry], form_id: &str) -> Option<&'a BackupEntry> {
    entries.iter().find(|e| e.form_id == form_id)
}
