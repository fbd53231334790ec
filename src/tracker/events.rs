//! Commands delivered to the tracker by its host
//!
//! The host (a browser bridge, a test, or an event log replay) translates DOM
//! activity into these values. They serialize as JSON objects tagged by `type`
//! so event logs can be replayed line by line.

use crate::types::{EntryEnvironment, FieldDescriptor, FieldValue};
use serde::{Deserialize, Serialize};

/// A tracked form was discovered on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormObservation {
    pub form_id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    #[serde(default)]
    pub environment: EntryEnvironment,
}

/// DOM event kinds the tracker listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldEventKind {
    Input,
    Change,
    Blur,
}

/// One DOM event on a tracked field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEvent {
    pub form_id: String,

    /// Field key (name, or id for unnamed elements)
    pub field: String,

    pub kind: FieldEventKind,

    /// Raw element value; checkboxes may send a boolean or "on"/"off"
    pub value: FieldValue,

    /// Input type, used when the field was not declared at observation time
    #[serde(default)]
    pub field_type: Option<String>,
}

impl FieldEvent {
    pub fn input(form_id: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            field: field.into(),
            kind: FieldEventKind::Input,
            value: FieldValue::Text(value.into()),
            field_type: None,
        }
    }
}

/// Everything the tracker runtime can be told
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerCommand {
    ObserveForm(FormObservation),
    Field(FieldEvent),
    SubmitAttempt {
        #[serde(rename = "formId")]
        form_id: String,
    },
    Submit {
        #[serde(rename = "formId")]
        form_id: String,
    },
    SubmissionFailed {
        #[serde(rename = "formId")]
        form_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_log_lines() {
        let observe: TrackerCommand = serde_json::from_str(
            r#"{"type":"observe_form","formId":"enquiry","title":"Enquiry",
                "fields":[{"name":"email","type":"email"},{"name":"consent","type":"checkbox","required":true}]}"#,
        )
        .unwrap();
        match observe {
            TrackerCommand::ObserveForm(obs) => {
                assert_eq!(obs.form_id, "enquiry");
                assert_eq!(obs.fields.len(), 2);
                assert!(obs.fields[1].required);
                assert_eq!(obs.fields[0].id, "");
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let field: TrackerCommand = serde_json::from_str(
            r#"{"type":"field","formId":"enquiry","field":"consent","kind":"change","value":true}"#,
        )
        .unwrap();
        assert!(matches!(
            field,
            TrackerCommand::Field(FieldEvent { value: FieldValue::Checked(true), kind: FieldEventKind::Change, .. })
        ));

        let submit: TrackerCommand =
            serde_json::from_str(r#"{"type":"submit","formId":"enquiry"}"#).unwrap();
        assert_eq!(submit, TrackerCommand::Submit { form_id: "enquiry".to_string() });
    }
}
