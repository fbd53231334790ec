//! Field tracker
//!
//! Maintains field state for every tracked form, gates persistence on the
//! valuable-data heuristic, and debounces saves. `FormTracker` is a plain state
//! machine driven by explicit timestamps; `TrackerService` runs it on a tokio
//! task with real timers.

pub mod debounce;
pub mod events;
pub mod service;

pub use debounce::SaveDebouncer;
pub use events::{FieldEvent, FieldEventKind, FormObservation, TrackerCommand};
pub use service::TrackerService;

use crate::config::TrackerConfig;
use crate::error::{FormKeepError, Result};
use crate::heuristic::has_valuable_data;
use crate::storage::KeyValueStore;
use crate::store::{EntryStore, MaintenanceReport};
use crate::types::{BackupEntry, EntryId, EntryStatus, FieldDescriptor, FieldState, FieldValue};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result of applying one field event
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub entry_id: EntryId,

    /// Whether the stored value changed
    pub changed: bool,

    pub completion_percentage: u8,

    /// Heuristic result after the update
    pub valuable: bool,

    /// Deadline of the debounced save, when one was (re)scheduled
    pub save_at: Option<Instant>,
}

pub struct FormTracker {
    store: EntryStore,
    debouncer: SaveDebouncer,
    session_id: String,
    forms: HashMap<String, EntryId>,
    unsynced: BTreeSet<EntryId>,
}

impl FormTracker {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: &TrackerConfig) -> Self {
        Self {
            store: EntryStore::new(storage, config),
            debouncer: SaveDebouncer::new(config.debounce),
            session_id: uuid::Uuid::new_v4().to_string(),
            forms: HashMap::new(),
            unsynced: BTreeSet::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntryStore {
        &mut self.store
    }

    /// Entry currently tracking `form_id`
    pub fn entry_for_form(&self, form_id: &str) -> Option<&BackupEntry> {
        self.forms.get(form_id).and_then(|id| self.store.get(id))
    }

    pub fn next_save_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    pub fn pending_saves(&self) -> usize {
        self.debouncer.pending_count()
    }

    /// Start tracking a form
    ///
    /// Observing a form that already has an active entry returns that entry.
    pub fn observe_form(&mut self, observation: FormObservation) -> EntryId {
        if let Some(existing) = self.forms.get(&observation.form_id) {
            if let Some(entry) = self.store.get(existing) {
                if entry.status == EntryStatus::Active {
                    debug!("Form {} already tracked as {}", observation.form_id, existing);
                    return existing.clone();
                }
            }
        }

        let entry = BackupEntry::new(
            observation.form_id.clone(),
            observation.title,
            self.session_id.clone(),
            &observation.fields,
            observation.environment,
        );
        let id = entry.id.clone();

        info!(
            "Tracking form {} as {} ({} fields)",
            observation.form_id,
            id,
            entry.fields.len()
        );

        self.forms.insert(observation.form_id, id.clone());
        self.store.insert(entry);
        id
    }

    fn entry_id(&self, form_id: &str) -> Result<EntryId> {
        self.forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| FormKeepError::FormNotTracked(form_id.to_string()))
    }

    fn entry_mut(&mut self, id: &EntryId) -> Result<&mut BackupEntry> {
        self.store
            .get_mut(id)
            .ok_or_else(|| FormKeepError::EntryNotFound(id.to_string()))
    }

    /// Apply an input/change/blur event to its field
    pub fn handle_field_event(&mut self, event: FieldEvent, now: Instant) -> Result<FieldUpdate> {
        let id = self.entry_id(&event.form_id)?;
        let entry = self.entry_mut(&id)?;

        if entry.status.is_terminal() {
            debug!("Ignoring {:?} on {} after it became {}", event.kind, id, entry.status);
            return Ok(FieldUpdate {
                entry_id: id,
                changed: false,
                completion_percentage: entry.completion_percentage,
                valuable: entry.has_valuable_data,
                save_at: None,
            });
        }

        let field = entry.fields.entry(event.field.clone()).or_insert_with(|| {
            let descriptor = FieldDescriptor::new(
                event.field.clone(),
                event.field_type.clone().unwrap_or_else(|| "text".to_string()),
            );
            debug!("Registering field {} discovered after observation", descriptor.name);
            FieldState::from_descriptor(&descriptor)
        });

        let value = normalize_value(field, event.value);
        let now_utc = Utc::now();
        let changed = field.apply(value, now_utc);

        if !changed {
            return Ok(FieldUpdate {
                entry_id: id,
                changed: false,
                completion_percentage: entry.completion_percentage,
                valuable: has_valuable_data(&entry.fields),
                save_at: None,
            });
        }

        entry.last_updated = now_utc;
        entry.recompute_completion();
        let completion_percentage = entry.completion_percentage;

        let valuable = has_valuable_data(&entry.fields);
        let save_at = if valuable {
            entry.has_valuable_data = true;
            Some(self.debouncer.schedule(id.clone(), now))
        } else {
            None
        };

        debug!(
            "Field {} on {} changed ({}% complete, valuable: {})",
            event.field, id, completion_percentage, valuable
        );

        Ok(FieldUpdate {
            entry_id: id,
            changed: true,
            completion_percentage,
            valuable,
            save_at,
        })
    }

    /// The form's submit handler ran; the outcome is not yet known
    pub fn record_submit_attempt(&mut self, form_id: &str) -> Result<EntryId> {
        let id = self.entry_id(form_id)?;
        let entry = self.entry_mut(&id)?;

        if entry.status.is_terminal() {
            debug!("Ignoring submit attempt on {} after it became {}", id, entry.status);
            return Ok(id);
        }

        entry.submission_attempted = true;
        entry.last_updated = Utc::now();
        Ok(id)
    }

    /// The form was submitted: finalize and force-save
    pub fn submit(&mut self, form_id: &str) -> Result<EntryId> {
        self.finalize(form_id, EntryStatus::Submitted)
    }

    /// Submission failed: finalize as failed and force-save
    pub fn fail_submission(&mut self, form_id: &str) -> Result<EntryId> {
        self.finalize(form_id, EntryStatus::Failed)
    }

    fn finalize(&mut self, form_id: &str, status: EntryStatus) -> Result<EntryId> {
        let id = self.entry_id(form_id)?;
        let entry = self.entry_mut(&id)?;

        entry.transition(status)?;
        entry.submission_attempted = true;
        if status == EntryStatus::Submitted {
            entry.submitted = true;
        }

        info!("Entry {} for form {} is now {}", id, form_id, status);

        self.debouncer.cancel(&id);
        self.store.persist(&id);
        self.unsynced.insert(id.clone());
        Ok(id)
    }

    /// Perform every debounced save whose deadline has passed
    pub fn flush_due(&mut self, now: Instant) -> Vec<EntryId> {
        let mut saved = Vec::new();
        for id in self.debouncer.take_due(now) {
            let persistable = self.store.get(&id).is_some_and(|e| e.is_persistable());
            if !persistable {
                continue;
            }
            if self.store.persist(&id) {
                saved.push(id.clone());
            }
            self.unsynced.insert(id);
        }
        saved
    }

    /// Periodic flush and retention purge
    pub fn maintenance(&mut self, now: DateTime<Utc>) -> MaintenanceReport {
        let report = self.store.maintenance(now);
        if report.evicted > 0 {
            let store = &self.store;
            self.forms.retain(|_, id| store.get(id).is_some());
            self.unsynced.retain(|id| store.get(id).is_some());
        }
        report
    }

    pub fn has_unsynced(&self) -> bool {
        !self.unsynced.is_empty()
    }

    /// Drain entries saved since the last sync round
    pub fn take_unsynced(&mut self) -> Vec<BackupEntry> {
        let ids = std::mem::take(&mut self.unsynced);
        ids.iter()
            .filter_map(|id| self.store.get(id).cloned())
            .collect()
    }

    /// Page teardown: drop pending saves, abandon and force-save active entries
    pub fn teardown(&mut self, now: DateTime<Utc>) -> Vec<EntryId> {
        let dropped = self.debouncer.clear();
        if dropped > 0 {
            debug!("Dropped {} pending saves on teardown", dropped);
        }

        let abandoned = self.store.abandon_active(now);
        for id in &abandoned {
            self.unsynced.insert(id.clone());
        }
        if abandoned.is_empty() {
            debug!("Teardown found no active entries");
        }
        abandoned
    }

    /// Apply a host command, logging rather than propagating failures
    pub fn apply(&mut self, command: TrackerCommand, now: Instant) {
        let result = match command {
            TrackerCommand::ObserveForm(observation) => {
                self.observe_form(observation);
                Ok(())
            }
            TrackerCommand::Field(event) => self.handle_field_event(event, now).map(|_| ()),
            TrackerCommand::SubmitAttempt { form_id } => {
                self.record_submit_attempt(&form_id).map(|_| ())
            }
            TrackerCommand::Submit { form_id } => self.submit(&form_id).map(|_| ()),
            TrackerCommand::SubmissionFailed { form_id } => {
                self.fail_submission(&form_id).map(|_| ())
            }
        };

        if let Err(e) = result {
            warn!("Tracker command failed: {}", e);
        }
    }
}

/// Checkbox fields hold a boolean; everything else holds raw text
fn normalize_value(field: &FieldState, value: FieldValue) -> FieldValue {
    if field.field_type.eq_ignore_ascii_case("checkbox") {
        FieldValue::Checked(value.truthy())
    } else {
        match value {
            FieldValue::Text(text) => FieldValue::Text(text),
            FieldValue::Checked(checked) => FieldValue::Text(checked.to_string()),
        }
    }
}
