//! Canonical document record
//!
//! The reports backend returns documents with several alias fields for the
//! same value. They are resolved here, once, so the rest of the viewer only
//! sees one field per concept.

use serde_json::Value;

const URL_FIELDS: &[&str] = &["file_url", "url", "document_url", "blob_url"];
const ID_FIELDS: &[&str] = &["id", "_id", "document_id"];
const NAME_FIELDS: &[&str] = &["name", "filename", "original_filename"];
const VITALS_FLAG_FIELDS: &[&str] = &["vital_extracted", "vitals_extracted"];

/// A document as handed to the viewer by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: Option<String>,
    pub content_url: Option<String>,
    pub display_name: Option<String>,
    pub vitals_available: bool,
}

impl DocumentRecord {
    #[must_use]
    pub fn new(id: Option<&str>, content_url: Option<&str>) -> Self {
        Self {
            id: id.map(str::to_string),
            content_url: content_url.map(str::to_string),
            display_name: None,
            vitals_available: false,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_vitals(mut self, available: bool) -> Self {
        self.vitals_available = available;
        self
    }

    /// Normalize a raw backend document, taking the first non-empty alias
    #[must_use]
    pub fn from_json(raw: &Value) -> Self {
        Self {
            id: first_string(raw, ID_FIELDS),
            content_url: first_string(raw, URL_FIELDS),
            display_name: first_string(raw, NAME_FIELDS),
            vitals_available: VITALS_FLAG_FIELDS
                .iter()
                .any(|field| raw.get(field).is_some_and(is_truthy)),
        }
    }

    /// Name shown on placeholders
    #[must_use]
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Document Preview")
    }
}

fn first_string(raw: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match raw.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        // Mongo-style ids sometimes arrive as numbers
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}
