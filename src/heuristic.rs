//! Valuable-data heuristic
//!
//! Decides whether an entry's fields hold real contact information worth
//! persisting. Matching is loose and case-insensitive on the field key and
//! type; dashboard classification depends on these exact rules.

use crate::types::FieldState;
use std::collections::BTreeMap;

const OTHER_CONTACT_KEYS: [&str; 3] = ["phone", "company", "organization"];

/// Contact signals found in a field map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactSignals {
    pub has_email: bool,
    pub has_name: bool,
    pub has_other_contact: bool,
}

impl ContactSignals {
    /// Scan the non-empty fields of an entry
    pub fn scan(fields: &BTreeMap<String, FieldState>) -> Self {
        let mut signals = Self::default();

        for (key, field) in fields.iter().filter(|(_, f)| !f.is_empty) {
            let key = key.to_lowercase();
            let field_type = field.field_type.to_lowercase();

            if is_email_like(&key, &field_type, field) {
                signals.has_email = true;
            }
            if key.contains("name") {
                signals.has_name = true;
            }
            if field_type == "tel" || OTHER_CONTACT_KEYS.iter().any(|k| key.contains(k)) {
                signals.has_other_contact = true;
            }
        }

        signals
    }

    pub fn is_valuable(&self) -> bool {
        self.has_email && (self.has_name || self.has_other_contact)
    }
}

fn is_email_like(key: &str, field_type: &str, field: &FieldState) -> bool {
    field_type == "email"
        || key.contains("email")
        || field.value.as_text().is_some_and(|v| v.contains('@'))
}

/// Email present AND (name OR phone/company/organization present)
pub fn has_valuable_data(fields: &BTreeMap<String, FieldState>) -> bool {
    ContactSignals::scan(fields).is_valuable()
}
