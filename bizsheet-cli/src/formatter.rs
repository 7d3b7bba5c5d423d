//! Output formatting for records, previews and outcomes

use anyhow::Result;
use bizsheet_core::{FieldRecord, PreviewRow, Schema, StatusColor};
use colored::*;
use std::path::Path;

fn color_label(color: &StatusColor) -> ColoredString {
    match color {
        StatusColor::Green => "green".green(),
        StatusColor::Blue => "blue".blue(),
        StatusColor::None => "none".dimmed(),
        StatusColor::Other(hex) => hex.as_str().yellow(),
    }
}

/// Print a record in human-readable format
pub fn print_record(path: &Path, record: &FieldRecord, schema: &Schema) {
    println!("{}", format!("Workbook: {}", path.display()).bold());
    println!(
        "{} {}  {} {}",
        "Sheet:".bold(),
        record.anchor.sheet.cyan().bold(),
        "Anchor:".bold(),
        bizsheet_core::reader::parser_utils::cell_ref(record.anchor.row, record.anchor.col)
            .yellow()
    );
    println!();

    for (key, field) in &record.fields {
        let Some(spec) = schema.field(key) else {
            continue;
        };
        let value = match &field.value {
            Some(v) => spec.kind.display_stored(v),
            None => "N/A".bright_black().to_string(),
        };
        println!(
            "  {:<12} {:<30} {} {}",
            spec.label,
            value.replace('\n', " "),
            color_label(&field.color),
            field.color.hex().bright_black()
        );
    }
}

/// Print a record in JSON format
pub fn print_record_json(path: &Path, record: &FieldRecord) -> Result<()> {
    let fields: Vec<_> = record
        .fields
        .iter()
        .map(|(key, field)| {
            serde_json::json!({
                "key": key,
                "value": field.text(),
                "color": field.color.to_string(),
                "hex": field.color.hex(),
            })
        })
        .collect();
    let output = serde_json::json!({
        "file": path.display().to_string(),
        "anchor": record.anchor,
        "fields": fields,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print the before/after comparison, highlighting changed fields
pub fn print_preview(rows: &[PreviewRow]) {
    println!("{}", "Before / after:".bold().underline());
    for row in rows {
        let before = row.before.replace('\n', " ");
        let after = row.after.replace('\n', " ");
        if row.changes() {
            println!(
                "  {:<12} {:<24} -> {}",
                row.label,
                before.bright_black(),
                after.green().bold()
            );
        } else {
            println!("  {:<12} {}", row.label, before);
        }
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_failure(message: &str) {
    println!("{} {}", "✗".red().bold(), message);
}
