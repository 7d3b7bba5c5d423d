//! Workbook data structures

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::styles::{StyleChange, StyleSheet};
use crate::color::{Fill, StatusColor, classify_fill};

/// Represents a complete workbook opened for one operation
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub path: PathBuf,
    /// Sheets in declaration order
    pub sheets: Vec<Sheet>,
    pub styles: StyleSheet,
    /// Raw bytes of the package as read, used to copy untouched parts on save
    pub(crate) package: Vec<u8>,
}

impl Workbook {
    /// Get a sheet by name
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get a mutable sheet by name
    pub fn get_sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Get all sheet names
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Fill applied to a cell, if the cell exists
    pub fn fill_at(&self, sheet: &str, row: u32, col: u32) -> Option<&Fill> {
        let cell = self.get_sheet(sheet)?.get_cell(row, col)?;
        self.styles.fill_of(cell.style)
    }

    /// Status colour of a cell
    pub fn color_at(&self, sheet: &str, row: u32, col: u32) -> StatusColor {
        classify_fill(self.fill_at(sheet, row, col))
    }

    /// Number format code of a cell
    pub fn number_format_at(&self, sheet: &str, row: u32, col: u32) -> String {
        let style = self
            .get_sheet(sheet)
            .and_then(|s| s.get_cell(row, col))
            .map(|c| c.style)
            .unwrap_or(0);
        self.styles.number_format_of(style)
    }

    /// Replace a cell's value, creating the cell if needed
    pub fn set_value(&mut self, sheet: &str, row: u32, col: u32, value: CellValue) -> bool {
        let Some(target) = self.get_sheet_mut(sheet) else {
            return false;
        };
        let cell = target.cell_mut(row, col);
        cell.value = value;
        target.mark(row, col, CellEdit::VALUE);
        true
    }

    /// Apply a style change to a cell, creating the cell if needed.
    ///
    /// Returns `false` when the sheet does not exist. A change that resolves to
    /// the cell's current format is not recorded as an edit.
    pub fn restyle(&mut self, sheet: &str, row: u32, col: u32, change: &StyleChange) -> bool {
        let Some(index) = self.sheets.iter().position(|s| s.name == sheet) else {
            return false;
        };
        let current = self.sheets[index]
            .get_cell(row, col)
            .map(|c| c.style)
            .unwrap_or(0);
        let derived = self.styles.derive(current, change);
        if derived != current {
            let target = &mut self.sheets[index];
            target.cell_mut(row, col).style = derived;
            target.mark(row, col, CellEdit::STYLE);
        }
        true
    }

    /// Whether anything changed since the workbook was read
    pub fn is_modified(&self) -> bool {
        self.styles.is_modified() || self.sheets.iter().any(|s| !s.edits.is_empty())
    }
}

/// What changed in a cell since it was read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellEdit {
    pub value: bool,
    pub style: bool,
}

impl CellEdit {
    pub const VALUE: CellEdit = CellEdit {
        value: true,
        style: false,
    };
    pub const STYLE: CellEdit = CellEdit {
        value: false,
        style: true,
    };
}

/// Represents a worksheet
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    /// Cells keyed by 1-based (row, col), iterated in document order
    pub cells: BTreeMap<(u32, u32), Cell>,
    /// Internal path to the sheet XML file in the ZIP archive
    pub sheet_path: String,
    max_row: u32,
    max_col: u32,
    pub(crate) edits: BTreeMap<(u32, u32), CellEdit>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, sheet_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheet_path: sheet_path.into(),
            ..Default::default()
        }
    }

    /// Insert a parsed cell, growing the bounds
    pub fn insert(&mut self, cell: Cell) {
        self.max_row = self.max_row.max(cell.row);
        self.max_col = self.max_col.max(cell.col);
        self.cells.insert((cell.row, cell.col), cell);
    }

    /// Largest row holding a cell (0 for an empty sheet)
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    /// Largest column holding a cell (0 for an empty sheet)
    pub fn max_column(&self) -> u32 {
        self.max_col
    }

    /// Whether a 1-based coordinate lies inside the used range
    pub fn in_bounds(&self, row: i64, col: i64) -> bool {
        (1..=self.max_row as i64).contains(&row) && (1..=self.max_col as i64).contains(&col)
    }

    /// Get a cell at the given position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Get all cells in document order
    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Get cells in a specific row, left to right
    pub fn cells_in_row(&self, row: u32) -> impl Iterator<Item = &Cell> {
        self.cells.range((row, 0)..=(row, u32::MAX)).map(|(_, c)| c)
    }

    /// Cells changed since the workbook was read
    pub fn edits(&self) -> &BTreeMap<(u32, u32), CellEdit> {
        &self.edits
    }

    fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.cells.entry((row, col)).or_insert_with(|| Cell {
            row,
            col,
            ..Default::default()
        })
    }

    fn mark(&mut self, row: u32, col: u32, edit: CellEdit) {
        let entry = self.edits.entry((row, col)).or_default();
        entry.value |= edit.value;
        entry.style |= edit.style;
    }
}

/// Represents a single cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
    /// Index into `cellXfs`
    pub style: u32,
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Formula {
        formula: String,
        cached_error: Option<String>,
    },
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty, or text made only of whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(t) => t.trim().is_empty(),
            _ => false,
        }
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Get the number if this is a numeric cell
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Textual rendering used for matching and display.
    ///
    /// Whole numbers render without a fractional part, formulas with a
    /// leading `=`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(t) => t.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Formula { formula, .. } => format!("={}", formula),
        }
    }

    /// Create a formula cell without error
    pub fn formula(f: impl Into<String>) -> Self {
        CellValue::Formula {
            formula: f.into(),
            cached_error: None,
        }
    }

    /// Create a formula cell with cached error
    pub fn formula_with_error(f: impl Into<String>, error: impl Into<String>) -> Self {
        CellValue::Formula {
            formula: f.into(),
            cached_error: Some(error.into()),
        }
    }
}

/// Render a number the way the cell XML stores it
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
