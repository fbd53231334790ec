//! Core data types for the formkeep backup tracker
//!
//! This module defines the backup entry, the per-field state it carries, and
//! the lifecycle status of an entry. The serialized form uses camelCase keys
//! because the persisted JSON array is shared with the dashboard reader and the
//! remote sync endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for backup entries
///
/// Entries created locally get a random UUID. Entries received from other
/// sources keep whatever identifier they arrived with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    /// Create a new random entry ID
    pub fn new() -> Self {
        Self(format!("backup_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a backup entry
///
/// Status only moves forward: `Active` may become any of the terminal states,
/// and terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Form is still being filled in
    Active,

    /// Page was left without submitting
    Abandoned,

    /// Form was submitted
    Submitted,

    /// Submission was attempted and failed
    Failed,
}

impl EntryStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EntryStatus::Active)
    }

    /// Check whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(self, EntryStatus::Active) && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Active => "active",
            EntryStatus::Abandoned => "abandoned",
            EntryStatus::Submitted => "submitted",
            EntryStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(EntryStatus::Active),
            "abandoned" => Ok(EntryStatus::Abandoned),
            "submitted" => Ok(EntryStatus::Submitted),
            "failed" => Ok(EntryStatus::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Current value of a tracked field
///
/// Checkboxes carry a boolean; every other input carries its raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Checked(bool),
    Text(String),
}

impl FieldValue {
    /// A value is empty when it is the empty string or `false`
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Checked(checked) => !checked,
            FieldValue::Text(text) => text.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Checked(_) => None,
        }
    }

    /// Interpret the value as a checkbox state
    pub fn truthy(&self) -> bool {
        match self {
            FieldValue::Checked(checked) => *checked,
            FieldValue::Text(text) => {
                let t = text.trim();
                !(t.is_empty() || t.eq_ignore_ascii_case("false") || t == "0" || t.eq_ignore_ascii_case("off"))
            }
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Checked(checked) => write!(f, "{}", checked),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

/// Static description of a form field, as observed when the form is discovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Element id (may be empty)
    #[serde(default)]
    pub id: String,

    /// Field name; used as the key in the entry's field map
    pub name: String,

    /// Input type ("text", "email", "tel", "checkbox", "select", ...)
    #[serde(default = "default_field_type", rename = "type")]
    pub field_type: String,

    /// Human-readable label
    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub required: bool,
}

fn default_field_type() -> String {
    "text".to_string()
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            label: name.clone(),
            name,
            field_type: field_type.into(),
            required: false,
        }
    }

    /// Key used in the entry's field map: the name, or the id when unnamed
    pub fn key(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn is_checkbox(&self) -> bool {
        self.field_type.eq_ignore_ascii_case("checkbox")
    }
}

/// Tracked state of one input/textarea/select element within an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldState {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub required: bool,

    pub value: FieldValue,

    pub is_empty: bool,

    /// First time the field went from empty to non-empty
    pub first_filled: Option<DateTime<Utc>>,

    pub last_modified: Option<DateTime<Utc>>,

    /// Number of observed value changes (monotonic)
    pub change_count: u32,
}

impl FieldState {
    /// Create an empty field state from its descriptor
    pub fn from_descriptor(descriptor: &FieldDescriptor) -> Self {
        let value = if descriptor.is_checkbox() {
            FieldValue::Checked(false)
        } else {
            FieldValue::Text(String::new())
        };

        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            field_type: descriptor.field_type.clone(),
            label: descriptor.label.clone(),
            required: descriptor.required,
            is_empty: value.is_empty(),
            value,
            first_filled: None,
            last_modified: None,
            change_count: 0,
        }
    }

    /// Apply a new value, returning true when it differed from the stored one
    pub fn apply(&mut self, value: FieldValue, now: DateTime<Utc>) -> bool {
        if value == self.value {
            return false;
        }

        let was_empty = self.is_empty;
        self.is_empty = value.is_empty();
        self.value = value;
        self.last_modified = Some(now);
        self.change_count = self.change_count.saturating_add(1);

        if was_empty && !self.is_empty && self.first_filled.is_none() {
            self.first_filled = Some(now);
        }

        true
    }
}

/// Page environment captured when a form is first observed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryEnvironment {
    #[serde(default)]
    pub user_agent: String,

    #[serde(default)]
    pub referrer: String,

    #[serde(default)]
    pub url: String,

    /// Milliseconds between entry creation and page teardown
    #[serde(default)]
    pub time_on_page: Option<u64>,
}

/// One tracked form-filling session's backup record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    // === Identity ===
    pub id: EntryId,

    pub form_id: String,

    #[serde(default)]
    pub form_title: String,

    #[serde(default)]
    pub session_id: String,

    pub created_at: DateTime<Utc>,

    pub last_updated: DateTime<Utc>,

    // === Content ===
    #[serde(default)]
    pub fields: BTreeMap<String, FieldState>,

    // === Lifecycle ===
    #[serde(default)]
    pub submitted: bool,

    #[serde(default)]
    pub submission_attempted: bool,

    #[serde(default)]
    pub completion_percentage: u8,

    pub status: EntryStatus,

    /// Set once the entry has satisfied the valuable-data heuristic
    #[serde(default)]
    pub has_valuable_data: bool,

    #[serde(default)]
    pub environment: EntryEnvironment,
}

impl BackupEntry {
    /// Create a fresh active entry for a form
    pub fn new(
        form_id: impl Into<String>,
        form_title: impl Into<String>,
        session_id: impl Into<String>,
        fields: &[FieldDescriptor],
        environment: EntryEnvironment,
    ) -> Self {
        let now = Utc::now();
        let fields = fields
            .iter()
            .map(|d| (d.key().to_string(), FieldState::from_descriptor(d)))
            .collect();

        let mut entry = Self {
            id: EntryId::new(),
            form_id: form_id.into(),
            form_title: form_title.into(),
            session_id: session_id.into(),
            created_at: now,
            last_updated: now,
            fields,
            submitted: false,
            submission_attempted: false,
            completion_percentage: 0,
            status: EntryStatus::Active,
            has_valuable_data: false,
            environment,
        };
        entry.recompute_completion();
        entry
    }

    /// Recompute `completion_percentage` from the field map
    pub fn recompute_completion(&mut self) {
        self.completion_percentage = completion_percentage(&self.fields);
    }

    /// Number of non-empty fields
    pub fn filled_count(&self) -> usize {
        self.fields.values().filter(|f| !f.is_empty).count()
    }

    /// Whether the store may write this entry to durable storage
    pub fn is_persistable(&self) -> bool {
        self.has_valuable_data || self.status.is_terminal()
    }

    /// Move to a terminal status, rejecting backwards transitions
    pub fn transition(&mut self, next: EntryStatus) -> crate::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::FormKeepError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.last_updated = Utc::now();
        Ok(())
    }
}

/// round(100 × filled / total), 0 for an empty map
pub fn completion_percentage(fields: &BTreeMap<String, FieldState>) -> u8 {
    let total = fields.len();
    if total == 0 {
        return 0;
    }
    let filled = fields.values().filter(|f| !f.is_empty).count();
    ((filled as f64 * 100.0) / total as f64).round() as u8
}

/// Aggregate counts shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    pub total: usize,
    pub active: usize,
    pub submitted: usize,
    pub abandoned: usize,
    pub failed: usize,
    /// Abandoned entries more than half complete
    pub recoverable: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("email", "email"),
            FieldDescriptor::new("first_name", "text"),
            FieldDescriptor::new("consent", "checkbox"),
        ]
    }

    #[test]
    fn test_entry_id_creation() {
        let id1 = EntryId::new();
        let id2 = EntryId::new();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("backup_"));
    }

    #[test]
    fn test_status_transitions_only_forward() {
        assert!(EntryStatus::Active.can_transition_to(EntryStatus::Submitted));
        assert!(EntryStatus::Active.can_transition_to(EntryStatus::Abandoned));
        assert!(EntryStatus::Active.can_transition_to(EntryStatus::Failed));
        assert!(!EntryStatus::Active.can_transition_to(EntryStatus::Active));
        assert!(!EntryStatus::Abandoned.can_transition_to(EntryStatus::Active));
        assert!(!EntryStatus::Submitted.can_transition_to(EntryStatus::Abandoned));
    }

    #[test]
    fn test_new_entry_fields() {
        let entry = BackupEntry::new("contact", "Contact Us", "s1", &descriptors(), EntryEnvironment::default());
        assert_eq!(entry.fields.len(), 3);
        assert_eq!(entry.status, EntryStatus::Active);
        assert_eq!(entry.completion_percentage, 0);
        assert_eq!(entry.fields["consent"].value, FieldValue::Checked(false));
        assert!(entry.fields.values().all(|f| f.is_empty));
    }

    #[test]
    fn test_field_apply_tracks_changes() {
        let mut field = FieldState::from_descriptor(&FieldDescriptor::new("email", "email"));
        let t1 = Utc::now();

        assert!(field.apply(FieldValue::Text("a".into()), t1));
        assert_eq!(field.change_count, 1);
        assert_eq!(field.first_filled, Some(t1));

        // Same value is not a change
        assert!(!field.apply(FieldValue::Text("a".into()), Utc::now()));
        assert_eq!(field.change_count, 1);

        // Clearing and refilling keeps the original first_filled
        let t2 = t1 + chrono::Duration::seconds(5);
        assert!(field.apply(FieldValue::Text(String::new()), t2));
        assert!(field.is_empty);
        assert!(field.apply(FieldValue::Text("b".into()), t2));
        assert_eq!(field.first_filled, Some(t1));
        assert_eq!(field.last_modified, Some(t2));
        assert_eq!(field.change_count, 3);
    }

    #[test]
    fn test_completion_rounds() {
        let mut entry = BackupEntry::new("contact", "", "s1", &descriptors(), EntryEnvironment::default());
        let now = Utc::now();
        entry
            .fields
            .get_mut("email")
            .unwrap()
            .apply(FieldValue::Text("a@b.com".into()), now);
        entry.recompute_completion();
        assert_eq!(entry.completion_percentage, 33);

        entry
            .fields
            .get_mut("consent")
            .unwrap()
            .apply(FieldValue::Checked(true), now);
        entry.recompute_completion();
        assert_eq!(entry.completion_percentage, 67);
    }

    #[test]
    fn test_transition_rejects_backwards() {
        let mut entry = BackupEntry::new("contact", "", "s1", &[], EntryEnvironment::default());
        entry.transition(EntryStatus::Submitted).unwrap();
        assert!(entry.transition(EntryStatus::Abandoned).is_err());
        assert_eq!(entry.status, EntryStatus::Submitted);
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let entry = BackupEntry::new("contact", "Contact", "s1", &descriptors(), EntryEnvironment::default());
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("formId").is_some());
        assert!(json.get("lastUpdated").is_some());
        assert!(json.get("completionPercentage").is_some());
        assert_eq!(json["status"], "active");
        assert_eq!(json["fields"]["email"]["type"], "email");
        assert_eq!(json["fields"]["consent"]["value"], false);
    }
}
