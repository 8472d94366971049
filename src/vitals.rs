//! Extracted clinical parameters shown next to the document
//!
//! The vitals endpoint returns a mapping keyed by parameter id, for example
//! `{"c-reactive_protein": {"value": "4.8", "unit": "mg/dL"}}`, sometimes
//! wrapped in `parameters`, `vitals_data` or `data`. Key order is preserved.

use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::ReportsApi;
use crate::record::DocumentRecord;

static WORD_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w").expect("Failed to compile word start regex"));

const WRAPPER_FIELDS: &[&str] = &["parameters", "vitals_data", "data"];

pub const NO_PARAMETERS_MESSAGE: &str = "No extracted parameters available";
pub const NOT_AVAILABLE_MESSAGE: &str = "Vitals extraction not available for this report.";

/// One extracted parameter
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VitalEntry {
    pub key: String,
    pub display_name: String,
    pub value: String,
    pub unit: Option<String>,
    pub status: Option<String>,
    pub reference_range: Option<String>,
    pub timestamp: Option<String>,
}

impl VitalEntry {
    /// Value and unit joined for display
    pub fn formatted_value(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} {}", self.value, unit).trim().to_string(),
            None => self.value.clone(),
        }
    }

    pub fn classification(&self) -> VitalStatus {
        VitalStatus::classify(self.status.as_deref())
    }
}

/// Best-effort reading of the free-text status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalStatus {
    Normal,
    High,
    Low,
}

impl VitalStatus {
    #[must_use]
    pub fn classify(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return Self::Normal;
        };
        let status = status.to_lowercase();
        if status == "abnormal" || status.contains("high") || status.contains("elevated") {
            Self::High
        } else if status.contains("low") || status.contains("below") {
            Self::Low
        } else {
            Self::Normal
        }
    }
}

/// Result of loading vitals for a session
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum VitalsOutcome {
    Loaded(Vec<VitalEntry>),
    /// The document is flagged for extraction but the fetch failed
    Failed,
    /// The document has no extracted vitals
    #[default]
    NotAvailable,
}

impl VitalsOutcome {
    pub fn entries(&self) -> &[VitalEntry] {
        match self {
            Self::Loaded(entries) => entries,
            Self::Failed | Self::NotAvailable => &[],
        }
    }

    /// Message to show when there is nothing to list
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            Self::Loaded(entries) if !entries.is_empty() => None,
            Self::Loaded(_) | Self::Failed => Some(NO_PARAMETERS_MESSAGE),
            Self::NotAvailable => Some(NOT_AVAILABLE_MESSAGE),
        }
    }
}

/// Load the vitals for a record, never failing the viewer
pub async fn load_vitals(api: &dyn ReportsApi, record: &DocumentRecord) -> VitalsOutcome {
    let Some(id) = record.id.as_deref() else {
        warn!("No document ID provided, skipping vitals fetch");
        return VitalsOutcome::NotAvailable;
    };
    if !record.vitals_available {
        info!("Vitals extraction not available for document {id}");
        return VitalsOutcome::NotAvailable;
    }

    match api.vitals(id).await {
        Ok(body) => {
            let entries = parse_vitals(&body);
            info!("Vitals data processed: {} entries", entries.len());
            VitalsOutcome::Loaded(entries)
        }
        Err(e) => {
            warn!("Failed to fetch vitals for document {id}: {e}");
            VitalsOutcome::Failed
        }
    }
}

/// Convert a vitals response into entries, in key order.
///
/// A present wrapper field is authoritative even when empty; the body itself
/// is read as the mapping only when no wrapper is set.
#[must_use]
pub fn parse_vitals(body: &Value) -> Vec<VitalEntry> {
    let mapping = WRAPPER_FIELDS
        .iter()
        .find_map(|field| body.get(field).filter(|v| !v.is_null()))
        .unwrap_or(body);

    let Some(mapping) = mapping.as_object() else {
        debug!("Vitals response is not a mapping");
        return Vec::new();
    };

    mapping
        .iter()
        .map(|(key, raw)| entry_from(key, raw))
        .collect()
}

fn entry_from(key: &str, raw: &Value) -> VitalEntry {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);
    let text = |name: &str| fields.get(name).and_then(value_text);

    VitalEntry {
        key: key.to_string(),
        display_name: text("original_name").unwrap_or_else(|| display_name_for(key)),
        value: text("value")
            .or_else(|| (!raw.is_object()).then(|| value_text(raw)).flatten())
            .unwrap_or_default(),
        unit: text("unit"),
        status: text("status"),
        reference_range: text("reference_range"),
        timestamp: text("timestamp"),
    }
}

/// `c-reactive_protein` becomes `C Reactive Protein`
#[must_use]
pub fn display_name_for(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    WORD_START
        .replace_all(&spaced, |caps: &regex::Captures<'_>| caps[0].to_uppercase())
        .into_owned()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
