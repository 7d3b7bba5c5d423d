//! Writing updates back to a record

use std::path::Path;

use super::{FieldInput, UpdatePayload};
use crate::color::Fill;
use crate::error::{BizsheetError, Result};
use crate::locator::{Anchor, locate};
use crate::reader::{CellValue, FontPatch, PERCENT_FORMAT, StyleChange, Workbook, read_workbook};
use crate::schema::{FieldKind, FieldSpec, Schema, strip_number_noise};
use crate::writer::save_workbook;

/// A value ready to store, with its edit-unit number for threshold checks
struct Encoded {
    value: CellValue,
    number_format: Option<&'static str>,
    edit_number: Option<f64>,
}

fn parse_number(input: &FieldInput) -> Option<f64> {
    match input {
        FieldInput::Number(n) => Some(*n),
        FieldInput::Text(t) => strip_number_noise(t).parse::<f64>().ok(),
    }
    .filter(|n| n.is_finite())
}

fn encode(kind: FieldKind, input: &FieldInput) -> Option<Encoded> {
    match kind {
        FieldKind::Plain => Some(Encoded {
            value: match input {
                FieldInput::Text(t) => CellValue::Text(t.clone()),
                FieldInput::Number(n) => CellValue::Number(*n),
            },
            number_format: None,
            edit_number: None,
        }),
        FieldKind::Ratio => parse_number(input).map(|n| Encoded {
            value: CellValue::Number(n / 100.0),
            number_format: Some(PERCENT_FORMAT),
            edit_number: Some(n),
        }),
        FieldKind::ScaledAmount => parse_number(input).map(|n| Encoded {
            value: CellValue::Number(n.trunc() * 1000.0),
            number_format: None,
            edit_number: Some(n),
        }),
    }
}

fn font_for(schema: &Schema, spec: &FieldSpec, ruleset: Option<&str>, n: Option<f64>) -> FontPatch {
    let violated = match (ruleset, n) {
        (Some(tag), Some(n)) => schema
            .threshold(tag, &spec.key)
            .is_some_and(|t| t.is_violated(n)),
        _ => false,
    };
    if violated {
        FontPatch::highlight()
    } else {
        FontPatch::regular()
    }
}

/// Apply an update to the record at `anchor` in memory.
///
/// Returns the labels of the fields whose value was written. Every in-bounds
/// field marked for repaint turns green whether or not it was written.
pub fn apply_update(
    workbook: &mut Workbook,
    schema: &Schema,
    anchor: &Anchor,
    payload: &UpdatePayload,
) -> Vec<String> {
    let mut updated = Vec::new();
    let col = anchor.col;
    let ruleset = payload.ruleset.as_deref();
    let green = StyleChange::fill(Fill::status_green());

    for (spec, offset) in schema.located_fields() {
        let in_bounds = workbook
            .get_sheet(&anchor.sheet)
            .zip(anchor.row_at(offset))
            .filter(|(sheet, row)| sheet.in_bounds((*row).into(), col.into()))
            .map(|(_, row)| row);
        let Some(row) = in_bounds else {
            tracing::debug!(field = %spec.key, offset, "field outside sheet, skipped");
            continue;
        };

        if spec.repaint {
            workbook.restyle(&anchor.sheet, row, col, &green);
        }

        let Some(input) = payload.input(&spec.key) else {
            continue;
        };
        let Some(encoded) = encode(spec.kind, input) else {
            tracing::warn!(field = %spec.key, input = %input.as_text(), "not a number, value kept");
            continue;
        };

        workbook.set_value(&anchor.sheet, row, col, encoded.value);
        let change = StyleChange {
            fill: None,
            font: Some(font_for(schema, spec, ruleset, encoded.edit_number)),
            number_format: encoded.number_format.map(str::to_string),
        };
        workbook.restyle(&anchor.sheet, row, col, &change);
        tracing::debug!(field = %spec.key, row, col, "field written");
        updated.push(spec.label.clone());
    }
    updated
}

/// Write the rating text of the record at `anchor` in memory and paint it green
pub fn apply_rating(
    workbook: &mut Workbook,
    schema: &Schema,
    anchor: &Anchor,
    text: &str,
) -> Result<()> {
    let spec = schema
        .rating()
        .ok_or_else(|| BizsheetError::Config("rating field is not defined".to_string()))?;
    let offset = spec.offset.ok_or_else(|| {
        BizsheetError::Config(format!("'{}' offset not defined", spec.label))
    })?;

    let row = workbook
        .get_sheet(&anchor.sheet)
        .zip(anchor.row_at(offset))
        .filter(|(sheet, row)| sheet.in_bounds((*row).into(), anchor.col.into()))
        .map(|(_, row)| row)
        .ok_or_else(|| {
            BizsheetError::Config(format!(
                "'{}' cell is outside sheet '{}'",
                spec.label, anchor.sheet
            ))
        })?;

    workbook.set_value(&anchor.sheet, row, anchor.col, CellValue::Text(text.to_string()));
    workbook.restyle(
        &anchor.sheet,
        row,
        anchor.col,
        &StyleChange::fill(Fill::status_green()),
    );
    Ok(())
}

fn open_located(path: &Path, identifier: &str) -> Result<(Workbook, Anchor)> {
    let workbook = read_workbook(path).map_err(|e| BizsheetError::open(path, e))?;
    let anchor = locate(&workbook, identifier)
        .ok_or_else(|| BizsheetError::NotFound(identifier.to_string()))?;
    Ok((workbook, anchor))
}

/// Reopen the workbook, update the record for `identifier` and save.
///
/// Returns the labels of the fields whose value was written.
pub fn write_record<P: AsRef<Path>>(
    path: P,
    schema: &Schema,
    identifier: &str,
    payload: &UpdatePayload,
) -> Result<Vec<String>> {
    let path = path.as_ref();
    let (mut workbook, anchor) = open_located(path, identifier)?;
    let updated = apply_update(&mut workbook, schema, &anchor, payload);
    save_workbook(&workbook).map_err(|e| BizsheetError::save(path, e))?;
    tracing::info!(
        path = %path.display(),
        sheet = %anchor.sheet,
        row = anchor.row,
        updated = updated.len(),
        "record written"
    );
    Ok(updated)
}

/// Reopen the workbook and replace only the rating text of `identifier`
pub fn write_rating<P: AsRef<Path>>(
    path: P,
    schema: &Schema,
    identifier: &str,
    text: &str,
) -> Result<()> {
    let path = path.as_ref();
    let (mut workbook, anchor) = open_located(path, identifier)?;
    apply_rating(&mut workbook, schema, &anchor, text)?;
    save_workbook(&workbook).map_err(|e| BizsheetError::save(path, e))?;
    tracing::info!(path = %path.display(), sheet = %anchor.sheet, "rating written");
    Ok(())
}
