//! Field records read from and written to the workbook around an anchor

pub mod reader;
pub mod writer;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::color::StatusColor;
use crate::locator::Anchor;
use crate::reader::CellValue;
use crate::schema::Schema;

pub use reader::{lookup, read_record};
pub use writer::{apply_rating, apply_update, write_rating, write_record};

/// Placeholder shown for fields outside the sheet
pub const NOT_AVAILABLE: &str = "N/A";

/// Value and status colour of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    /// `None` when the field row lies outside the sheet
    pub value: Option<CellValue>,
    pub color: StatusColor,
}

impl FieldValue {
    pub fn not_available() -> Self {
        Self {
            value: None,
            color: StatusColor::None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }

    /// Raw value as text, `N/A` when unavailable
    pub fn text(&self) -> String {
        match &self.value {
            Some(v) => v.as_text(),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

/// Snapshot of a record, fields in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub anchor: Anchor,
    pub fields: Vec<(String, FieldValue)>,
}

impl FieldRecord {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Text of a field, if present and available
    pub fn text_of(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| v.is_available()).map(|v| v.text())
    }
}

/// New value for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    /// Already typed number, in edit units
    Number(f64),
}

impl FieldInput {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldInput::Text(t) => t.trim().is_empty(),
            FieldInput::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldInput::Text(t) => t.clone(),
            FieldInput::Number(n) => crate::reader::workbook::format_number(*n),
        }
    }
}

impl From<&str> for FieldInput {
    fn from(s: &str) -> Self {
        FieldInput::Text(s.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(s: String) -> Self {
        FieldInput::Text(s)
    }
}

impl From<f64> for FieldInput {
    fn from(n: f64) -> Self {
        FieldInput::Number(n)
    }
}

/// Values to write, plus the ruleset whose thresholds apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePayload {
    pub values: BTreeMap<String, FieldInput>,
    pub ruleset: Option<String>,
}

impl UpdatePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ruleset(mut self, ruleset: impl Into<String>) -> Self {
        self.ruleset = Some(ruleset.into());
        self
    }

    pub fn set(mut self, key: impl Into<String>, input: impl Into<FieldInput>) -> Self {
        self.values.insert(key.into(), input.into());
        self
    }

    /// Non-empty input for a field
    pub fn input(&self, key: &str) -> Option<&FieldInput> {
        self.values.get(key).filter(|v| !v.is_empty())
    }
}

/// One line of the before/after comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub key: String,
    pub label: String,
    pub before: String,
    pub after: String,
    pub color: StatusColor,
}

impl PreviewRow {
    pub fn changes(&self) -> bool {
        self.before != self.after
    }
}

/// Before/after view of a record under a payload, without touching the workbook
pub fn preview(record: &FieldRecord, schema: &Schema, payload: &UpdatePayload) -> Vec<PreviewRow> {
    record
        .fields
        .iter()
        .filter_map(|(key, field)| {
            let spec = schema.field(key)?;
            let before = match &field.value {
                Some(value) => spec.kind.display_stored(value),
                None => NOT_AVAILABLE.to_string(),
            };
            let after = match payload.input(key) {
                Some(FieldInput::Text(t)) => spec.kind.display_input(t),
                Some(FieldInput::Number(n)) => spec.kind.display_input(&n.to_string()),
                None => before.clone(),
            };
            Some(PreviewRow {
                key: key.clone(),
                label: spec.label.clone(),
                before,
                after,
                color: field.color.clone(),
            })
        })
        .collect()
}
