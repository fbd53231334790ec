//! Dashboard export formats
//!
//! Both formats carry the same fixed column set. CSV wraps every field in
//! double quotes and doubles embedded quotes.

use crate::error::{FormKeepError, Result};
use crate::types::BackupEntry;
use serde::Serialize;

/// CSV header, in column order
pub const CSV_HEADER: [&str; 10] = [
    "ID",
    "Form ID",
    "Form Title",
    "Timestamp",
    "Status",
    "Completion",
    "Email",
    "Name",
    "Phone",
    "Submitted",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = FormKeepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(FormKeepError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// One exported entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub id: String,
    pub form_id: String,
    pub form_title: String,
    pub timestamp: String,
    pub status: String,
    pub completion: u8,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub submitted: bool,
}

impl ExportRow {
    pub fn from_entry(entry: &BackupEntry) -> Self {
        let contact = ContactColumns::extract(entry);
        Self {
            id: entry.id.to_string(),
            form_id: entry.form_id.clone(),
            form_title: entry.form_title.clone(),
            timestamp: entry.last_updated.to_rfc3339(),
            status: entry.status.to_string(),
            completion: entry.completion_percentage,
            email: contact.email,
            name: contact.name,
            phone: contact.phone,
            submitted: entry.submitted,
        }
    }

    fn csv_fields(&self) -> [String; 10] {
        [
            self.id.clone(),
            self.form_id.clone(),
            self.form_title.clone(),
            self.timestamp.clone(),
            self.status.clone(),
            self.completion.to_string(),
            self.email.clone(),
            self.name.clone(),
            self.phone.clone(),
            self.submitted.to_string(),
        ]
    }
}

/// Contact values derived from an entry's fields
#[derive(Debug, Default)]
struct ContactColumns {
    email: String,
    name: String,
    phone: String,
}

impl ContactColumns {
    fn extract(entry: &BackupEntry) -> Self {
        let mut email = None;
        let mut at_sign = None;
        let mut names = Vec::new();
        let mut phone = None;

        for (key, field) in entry.fields.iter().filter(|(_, f)| !f.is_empty) {
            let key = key.to_lowercase();
            let field_type = field.field_type.to_lowercase();
            let value = field.value.to_string();

            if email.is_none() && (field_type == "email" || key.contains("email")) {
                email = Some(value.clone());
            }
            if at_sign.is_none() && value.contains('@') {
                at_sign = Some(value.clone());
            }
            if key.contains("name") {
                names.push(value.clone());
            }
            if phone.is_none() && (field_type == "tel" || key.contains("phone")) {
                phone = Some(value);
            }
        }

        Self {
            email: email.or(at_sign).unwrap_or_default(),
            name: names.join(" "),
            phone: phone.unwrap_or_default(),
        }
    }
}

/// Quote a CSV field, doubling embedded quotes
pub fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub fn to_csv(rows: &[ExportRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        CSV_HEADER
            .iter()
            .map(|h| csv_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            row.csv_fields()
                .iter()
                .map(|f| csv_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

pub fn to_json(rows: &[ExportRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Render entries in the requested format
pub fn render(entries: &[BackupEntry], format: ExportFormat) -> Result<String> {
    let rows: Vec<ExportRow> = entries.iter().map(ExportRow::from_entry).collect();
    match format {
        ExportFormat::Json => to_json(&rows),
        ExportFormat::Csv => Ok(to_csv(&rows)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryEnvironment, FieldDescriptor, FieldValue};
    use chrono::Utc;

    fn entry_with(values: &[(&str, &str, &str)]) -> BackupEntry {
        let descriptors: Vec<_> = values
            .iter()
            .map(|(name, ty, _)| FieldDescriptor::new(*name, *ty))
            .collect();
        let mut entry = BackupEntry::new("enquiry", "Enquiry", "s1", &descriptors, EntryEnvironment::default());
        for (name, _, value) in values {
            entry
                .fields
                .get_mut(*name)
                .unwrap()
                .apply(FieldValue::Text(value.to_string()), Utc::now());
        }
        entry.recompute_completion();
        entry
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(FormKeepError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_csv_field_quotes_and_escapes() {
        assert_eq!(csv_field("plain"), "\"plain\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field(""), "\"\"");
    }

    #[test]
    fn test_contact_columns() {
        let entry = entry_with(&[
            ("email", "email", "jane@school.edu"),
            ("first_name", "text", "Jane"),
            ("last_name", "text", "Doe"),
            ("mobile", "tel", "0400 000 000"),
        ]);
        let row = ExportRow::from_entry(&entry);
        assert_eq!(row.email, "jane@school.edu");
        assert_eq!(row.name, "Jane Doe");
        assert_eq!(row.phone, "0400 000 000");
        assert_eq!(row.completion, 100);
        assert_eq!(row.status, "active");
    }

    #[test]
    fn test_csv_row_count_and_quote_escaping() {
        let entries = vec![
            entry_with(&[("name", "text", "Jane \"JJ\" Doe")]),
            entry_with(&[("email", "email", "a@b.com")]),
        ];
        let csv = render(&entries, ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), entries.len() + 1);
        assert!(lines[0].starts_with("\"ID\",\"Form ID\""));
        assert!(csv.contains("\"Jane \"\"JJ\"\" Doe\""));
    }

    #[test]
    fn test_json_is_pretty_array() {
        let entries = vec![entry_with(&[("email", "email", "a@b.com")])];
        let json = render(&entries, ExportFormat::Json).unwrap();
        assert!(json.starts_with("[\n"));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["email"], "a@b.com");
        assert_eq!(parsed[0]["formId"], "enquiry");
    }
}
