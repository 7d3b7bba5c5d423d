//! Finding the anchor cell of a record

use crate::reader::{CellValue, Workbook};
use serde::Serialize;

/// Position of the cell holding a record's identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
}

impl Anchor {
    /// Row `offset` rows away from the anchor, if it is not before row 1
    pub fn row_at(&self, offset: i32) -> Option<u32> {
        let row = i64::from(self.row) + i64::from(offset);
        u32::try_from(row).ok().filter(|r| *r >= 1)
    }
}

/// Drop hyphens and whitespace so `123-45-67890` and `1234567 890` compare equal
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

fn normalized_cell(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Empty => None,
        other => Some(normalize_identifier(&other.as_text())),
    }
}

/// First cell matching `identifier`, scanning sheets in declaration order,
/// then rows, then columns
pub fn locate(workbook: &Workbook, identifier: &str) -> Option<Anchor> {
    let wanted = normalize_identifier(identifier);
    if wanted.is_empty() {
        return None;
    }

    for sheet in &workbook.sheets {
        // cells are keyed by (row, col), so map order is row-major
        for cell in sheet.all_cells() {
            if normalized_cell(&cell.value).as_deref() == Some(wanted.as_str()) {
                tracing::debug!(
                    sheet = %sheet.name,
                    row = cell.row,
                    col = cell.col,
                    "identifier located"
                );
                return Some(Anchor {
                    sheet: sheet.name.clone(),
                    row: cell.row,
                    col: cell.col,
                });
            }
        }
    }
    None
}
