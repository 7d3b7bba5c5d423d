//! Record layout: which rows around the anchor hold which fields, how their
//! values are encoded, and the per-ruleset thresholds

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{BizsheetError, Result};
use crate::reader::CellValue;

/// Label substring that marks a rating row
pub const DEFAULT_RATING_MARKER: &str = "신용평가";

/// How a field's value is stored in the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Raw text, stored as entered
    #[default]
    Plain,
    /// Percentage entered as 0-100, stored as a 0-1 fraction
    Ratio,
    /// Amount entered in thousands, stored in base units
    ScaledAmount,
}

impl FieldKind {
    /// Operator-facing rendering of a stored cell value
    pub fn display_stored(&self, value: &CellValue) -> String {
        match (self, value) {
            (FieldKind::Ratio, CellValue::Number(n)) => format!("{:.2}%", n * 100.0),
            (FieldKind::ScaledAmount, CellValue::Number(n)) => group_thousands(n.trunc() as i64),
            _ => value.as_text(),
        }
    }

    /// Operator-facing rendering of a value typed in edit units
    pub fn display_input(&self, input: &str) -> String {
        let cleaned = strip_number_noise(input);
        match self {
            FieldKind::Ratio => match cleaned.parse::<f64>() {
                Ok(n) => format!("{:.2}%", n),
                Err(_) => input.to_string(),
            },
            FieldKind::ScaledAmount => match cleaned.parse::<f64>() {
                Ok(n) => group_thousands(n.trunc() as i64 * 1000),
                Err(_) => input.to_string(),
            },
            FieldKind::Plain => input.to_string(),
        }
    }
}

/// Remove thousands separators and percent signs from numeric input
pub fn strip_number_noise(input: &str) -> String {
    input.trim().replace([',', '%'], "")
}

/// `6042281000` -> `6,042,281,000`
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

fn default_true() -> bool {
    true
}

fn default_marker() -> String {
    DEFAULT_RATING_MARKER.to_string()
}

/// One logical field of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    /// Row label as written in column A of the workbook
    pub label: String,
    /// Rows below (positive) or above (negative) the anchor; `None` means the
    /// field is captured but never read or written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i32>,
    #[serde(default)]
    pub kind: FieldKind,
    /// Painted green whenever the record is written
    #[serde(default = "default_true")]
    pub repaint: bool,
}

impl FieldSpec {
    pub fn new(key: &str, label: &str, offset: i32, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            offset: Some(offset),
            kind,
            repaint: true,
        }
    }

    pub fn without_repaint(mut self) -> Self {
        self.repaint = false;
        self
    }
}

/// Acceptable range of a thresholded field, in edit units (percent for ratios)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Threshold {
    pub fn is_violated(&self, value: f64) -> bool {
        self.max.is_some_and(|max| value > max) || self.min.is_some_and(|min| value < min)
    }
}

/// Immutable record layout shared by every sheet of a workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default = "default_marker")]
    pub rating_marker: String,
    /// Key of the long-form rating field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_field: Option<String>,
    /// Key of the company name field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_field: Option<String>,
    /// Key of the region field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_field: Option<String>,
    pub fields: Vec<FieldSpec>,
    /// ruleset tag -> field key -> threshold
    #[serde(default)]
    pub thresholds: BTreeMap<String, BTreeMap<String, Threshold>>,
}

impl Default for Schema {
    fn default() -> Self {
        use FieldKind::*;
        let fields = vec![
            FieldSpec::new("company_name", "상호", -1, Plain).without_repaint(),
            FieldSpec::new("business_no", "사업자등록번호", 0, Plain),
            FieldSpec::new("region", "지역", 1, Plain),
            FieldSpec::new("capability_amount", "시평액", 2, ScaledAmount),
            FieldSpec::new("performance_3y", "3년실적", 3, ScaledAmount),
            FieldSpec::new("performance_5y", "5년실적", 4, ScaledAmount),
            FieldSpec::new("debt_ratio", "부채비율", 5, Ratio),
            FieldSpec::new("current_ratio", "유동비율", 6, Ratio),
            FieldSpec::new("business_period", "영업기간", 7, Plain),
            FieldSpec::new("credit_rating", "신용평가", 8, Plain).without_repaint(),
        ];

        let mut thresholds = BTreeMap::new();
        for tag in ["전기", "통신", "소방"] {
            let mut rules = BTreeMap::new();
            rules.insert(
                "debt_ratio".to_string(),
                Threshold {
                    min: None,
                    max: Some(500.0),
                },
            );
            rules.insert(
                "current_ratio".to_string(),
                Threshold {
                    min: Some(100.0),
                    max: None,
                },
            );
            thresholds.insert(tag.to_string(), rules);
        }

        Self {
            rating_marker: default_marker(),
            rating_field: Some("credit_rating".to_string()),
            name_field: Some("company_name".to_string()),
            region_field: Some("region".to_string()),
            fields,
            thresholds,
        }
    }
}

impl Schema {
    /// Load a schema from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BizsheetError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let schema: Schema = toml::from_str(content)
            .map_err(|e| BizsheetError::Config(format!("Invalid schema: {}", e)))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BizsheetError::Config(e.to_string()))
    }

    /// Check that field keys are unique and every reference resolves
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(BizsheetError::Config(format!(
                    "Duplicate field key '{}'",
                    field.key
                )));
            }
        }

        for (role, key) in [
            ("rating_field", &self.rating_field),
            ("name_field", &self.name_field),
            ("region_field", &self.region_field),
        ] {
            if let Some(key) = key
                && !seen.contains(key.as_str())
            {
                return Err(BizsheetError::Config(format!(
                    "{} refers to unknown field '{}'",
                    role, key
                )));
            }
        }

        for (tag, rules) in &self.thresholds {
            for key in rules.keys() {
                if !seen.contains(key.as_str()) {
                    return Err(BizsheetError::Config(format!(
                        "Threshold '{}' refers to unknown field '{}'",
                        tag, key
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Fields with an offset, in declaration order
    pub fn located_fields(&self) -> impl Iterator<Item = (&FieldSpec, i32)> {
        self.fields
            .iter()
            .filter_map(|f| f.offset.map(|offset| (f, offset)))
    }

    pub fn threshold(&self, ruleset: &str, key: &str) -> Option<&Threshold> {
        self.thresholds.get(ruleset)?.get(key)
    }

    pub fn rating(&self) -> Option<&FieldSpec> {
        self.rating_field.as_deref().and_then(|key| self.field(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_valid() {
        let schema = Schema::default();
        schema.validate().unwrap();
        assert_eq!(schema.rating().map(|f| f.offset), Some(Some(8)));
        assert!(!schema.field("company_name").unwrap().repaint);
        assert!(schema.field("debt_ratio").unwrap().repaint);
        assert_eq!(schema.located_fields().count(), 10);
    }

    #[test]
    fn test_toml_round_trip_of_default() {
        let schema = Schema::default();
        let text = schema.to_toml().unwrap();
        assert!(text.contains("[thresholds.\"전기\".debt_ratio]"));
        assert_eq!(Schema::from_toml_str(&text).unwrap(), schema);
    }

    #[test]
    fn test_parse_minimal_schema() {
        let schema = Schema::from_toml_str(
            r#"
[[fields]]
key = "business_no"
label = "사업자번호"
offset = 0

[[fields]]
key = "rate"
label = "비율"
offset = 2
kind = "ratio"

[[fields]]
key = "memo"
label = "비고"

[thresholds.telecom.rate]
max = 40.0
"#,
        )
        .unwrap();
        assert_eq!(schema.rating_marker, DEFAULT_RATING_MARKER);
        assert_eq!(schema.field("rate").unwrap().kind, FieldKind::Ratio);
        assert!(schema.field("rate").unwrap().repaint);
        assert_eq!(schema.located_fields().count(), 2);
        assert!(schema.threshold("telecom", "rate").unwrap().is_violated(40.5));
        assert!(schema.threshold("fire", "rate").is_none());
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = r#"
[[fields]]
key = "a"
label = "A"
[[fields]]
key = "a"
label = "B"
"#;
        assert!(Schema::from_toml_str(duplicate).is_err());

        let dangling = r#"
rating_field = "rating"
[[fields]]
key = "a"
label = "A"
"#;
        assert!(Schema::from_toml_str(dangling).is_err());
    }

    #[test]
    fn test_threshold_bounds() {
        let t = Threshold {
            min: Some(100.0),
            max: Some(500.0),
        };
        assert!(t.is_violated(99.9));
        assert!(t.is_violated(500.1));
        assert!(!t.is_violated(100.0));
        assert!(!t.is_violated(500.0));
        assert!(!Threshold::default().is_violated(1e9));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FieldKind::Ratio.display_stored(&CellValue::Number(0.1223)),
            "12.23%"
        );
        assert_eq!(
            FieldKind::ScaledAmount.display_stored(&CellValue::Number(6042281000.0)),
            "6,042,281,000"
        );
        assert_eq!(FieldKind::Ratio.display_input("12.5"), "12.50%");
        assert_eq!(FieldKind::ScaledAmount.display_input("6,042"), "6,042,000");
        assert_eq!(FieldKind::ScaledAmount.display_input("판단안됨"), "판단안됨");
        assert_eq!(group_thousands(-1234), "-1,234");
        assert_eq!(group_thousands(999), "999");
    }
}
