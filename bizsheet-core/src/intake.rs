//! Flows spanning several configured workbooks

use std::path::{Path, PathBuf};

use crate::archive::archive;
use crate::config::PathConfig;
use crate::error::{BizsheetError, Result};
use crate::record::{FieldRecord, lookup, write_rating};
use crate::schema::Schema;

/// A record and the workbook it was found in
#[derive(Debug, Clone)]
pub struct FoundRecord {
    pub key: String,
    pub path: PathBuf,
    pub record: FieldRecord,
}

/// Look the identifier up in every configured workbook, in key order, and
/// return the first hit. Workbooks that fail to open are skipped.
pub fn find_in_workbooks(
    config: &PathConfig,
    schema: &Schema,
    identifier: &str,
) -> Option<FoundRecord> {
    for (key, path) in config.configured() {
        match lookup(&path, schema, identifier) {
            Ok(Some(record)) => {
                return Some(FoundRecord {
                    key: key.to_string(),
                    path,
                    record,
                });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(workbook = key, error = %e, "workbook skipped"),
        }
    }
    None
}

/// Outcome of writing a rating to every configured workbook
#[derive(Debug, Clone, Default)]
pub struct RatingOutcome {
    pub updated: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Write the rating text into every configured workbook holding the
/// identifier. Failures are collected per workbook.
pub fn rate_everywhere(
    config: &PathConfig,
    schema: &Schema,
    identifier: &str,
    text: &str,
) -> Result<RatingOutcome> {
    if !text.contains('\n') {
        return Err(BizsheetError::Config(
            "rating text needs a grade line and a period line".to_string(),
        ));
    }
    let mut outcome = RatingOutcome::default();
    for (key, path) in config.configured() {
        match write_rating(&path, schema, identifier, text) {
            Ok(()) => outcome.updated.push(key.to_string()),
            Err(e) => {
                tracing::warn!(workbook = key, error = %e, "rating not written");
                outcome.failed.push((key.to_string(), e.to_string()));
            }
        }
    }
    Ok(outcome)
}

/// Archive `source` using the company name and region held by `record`
pub fn archive_for_record(
    record: &FieldRecord,
    schema: &Schema,
    source: &Path,
    root: &Path,
    doc_type: &str,
) -> Result<PathBuf> {
    let company = schema
        .name_field
        .as_deref()
        .and_then(|key| record.text_of(key))
        .ok_or_else(|| BizsheetError::archive(source, "record has no company name"))?;
    let region = schema
        .region_field
        .as_deref()
        .and_then(|key| record.text_of(key));
    archive(source, root, &company, doc_type, region.as_deref())
}
