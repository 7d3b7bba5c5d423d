//! Excel workbook reader using custom XML parsers

use anyhow::{Context, Result};

use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

pub mod parser_utils;
pub mod styles;
pub mod workbook;
pub mod xlsx_parser;

use self::xlsx_parser::XlsxReader;
pub use styles::{FontPatch, PERCENT_FORMAT, StyleChange, StyleSheet};
pub use workbook::{Cell, CellEdit, CellValue, Sheet, Workbook};

/// Trait for spreadsheet format readers
pub trait WorkbookReader {
    fn read_sheets(&mut self) -> Result<Vec<Sheet>>;
}

/// Whether the path carries an extension this crate can open
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("xlsx") || s.eq_ignore_ascii_case("xlsm"))
        .unwrap_or(false)
}

/// Read a workbook from a file path
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path_ref = path.as_ref();

    if !is_supported_path(path_ref) {
        return Err(anyhow::anyhow!(
            "Unsupported file format: {}",
            path_ref.display()
        ));
    }

    let package = std::fs::read(path_ref)
        .with_context(|| format!("Failed to open file: {}", path_ref.display()))?;
    read_workbook_from_bytes(path_ref, package)
}

/// Parse a workbook package already held in memory
pub fn read_workbook_from_bytes<P: AsRef<Path>>(path: P, package: Vec<u8>) -> Result<Workbook> {
    let (styles, sheets) = {
        let mut archive = ZipArchive::new(Cursor::new(package.as_slice()))
            .context("Failed to open zip archive")?;
        let styles = StyleSheet::parse(&mut archive)?;
        let sheets = XlsxReader::new(&mut archive)?.read_sheets()?;
        (styles, sheets)
    };

    tracing::debug!(
        path = %path.as_ref().display(),
        sheets = sheets.len(),
        "workbook loaded"
    );

    Ok(Workbook {
        path: path.as_ref().to_path_buf(),
        sheets,
        styles,
        package,
    })
}
