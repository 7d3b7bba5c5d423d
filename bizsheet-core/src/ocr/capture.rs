//! Per-session capture state: the region drawn and the text captured per field

use std::collections::BTreeMap;

use super::{NOT_SET, OcrEvent, RegionRequest, Roi};
use crate::record::{FieldInput, UpdatePayload};
use crate::schema::{FieldKind, Schema};

use super::cleanup::{clean_biz_number, clean_number, clean_ratio};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldCapture {
    pub roi: Option<Roi>,
    pub text: String,
}

/// Mutable capture state for one document, keyed by field
#[derive(Debug, Clone, Default)]
pub struct CaptureState {
    order: Vec<String>,
    fields: BTreeMap<String, FieldCapture>,
}

impl CaptureState {
    /// One empty capture per schema field, in schema order
    pub fn for_schema(schema: &Schema) -> Self {
        let order: Vec<String> = schema.fields.iter().map(|f| f.key.clone()).collect();
        let fields = order
            .iter()
            .map(|k| (k.clone(), FieldCapture::default()))
            .collect();
        Self { order, fields }
    }

    pub fn get(&self, key: &str) -> Option<&FieldCapture> {
        self.fields.get(key)
    }

    /// Returns `false` for unknown fields
    pub fn set_roi(&mut self, key: &str, roi: Roi) -> bool {
        match self.fields.get_mut(key) {
            Some(capture) => {
                capture.roi = Some(roi);
                true
            }
            None => false,
        }
    }

    /// Returns `false` for unknown fields
    pub fn set_text(&mut self, key: &str, text: impl Into<String>) -> bool {
        match self.fields.get_mut(key) {
            Some(capture) => {
                capture.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Record a recognition event
    pub fn apply(&mut self, event: &OcrEvent) {
        if let OcrEvent::Field { key, text } = event {
            self.set_text(key, text.clone());
        }
    }

    /// Regions to recognize, in field order
    pub fn regions(&self) -> Vec<RegionRequest> {
        self.order
            .iter()
            .map(|key| RegionRequest {
                key: key.clone(),
                roi: self.fields.get(key).and_then(|c| c.roi),
            })
            .collect()
    }

    /// Forget regions and texts
    pub fn reset(&mut self) {
        for capture in self.fields.values_mut() {
            *capture = FieldCapture::default();
        }
    }

    /// Captured texts as an update payload, cleaned per field kind.
    ///
    /// The anchor field (offset 0) only carries the extracted business number
    /// and is dropped when none is found. Placeholders for undrawn regions are
    /// dropped too.
    pub fn to_payload(&self, schema: &Schema, ruleset: Option<&str>) -> UpdatePayload {
        let mut payload = UpdatePayload::new();
        payload.ruleset = ruleset.map(str::to_string);
        for (key, capture) in &self.fields {
            let text = capture.text.trim();
            if text.is_empty() || text == NOT_SET {
                continue;
            }
            let Some(spec) = schema.field(key) else {
                continue;
            };
            let cleaned = match spec.kind {
                _ if spec.offset == Some(0) => clean_biz_number(text),
                FieldKind::Ratio => clean_ratio(text),
                FieldKind::ScaledAmount => clean_number(text),
                FieldKind::Plain => text.to_string(),
            };
            if cleaned.is_empty() {
                continue;
            }
            payload.values.insert(key.clone(), FieldInput::Text(cleaned));
        }
        payload
    }

    /// Business number from the identifier field, cleaned of OCR noise
    pub fn identifier(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|c| clean_biz_number(&c.text))
            .filter(|s| !s.is_empty())
    }
}
