//! Whole-workbook recolouring passes
//!
//! A sweep looks at every cell from row 2 on, column B onwards. Column A holds
//! the row label, which decides whether the row is a rating row. Planning runs
//! per sheet in parallel; the planned fills are applied afterwards on one
//! thread and the workbook is saved once.

pub mod rating_validity;
pub mod registry;
pub mod status_aging;

use rayon::prelude::*;
use std::path::Path;

use crate::color::{Fill, StatusColor, classify_fill};
use crate::error::{BizsheetError, Result};
use crate::reader::{CellValue, Sheet, StyleChange, StyleSheet, Workbook, read_workbook};
use crate::writer::save_workbook;

pub use rating_validity::RatingValiditySweep;
pub use registry::{all_sweeps, sweep_by_id};
pub use status_aging::StatusAgingSweep;

/// Fill a sweep wants a cell to end up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillTarget {
    Clear,
    Green,
    Blue,
}

impl FillTarget {
    pub fn fill(&self) -> Fill {
        match self {
            FillTarget::Clear => Fill::none(),
            FillTarget::Green => Fill::status_green(),
            FillTarget::Blue => Fill::status_blue(),
        }
    }

    /// Whether moving a cell with `fill` to this target changes anything
    fn changes(&self, fill: Option<&Fill>) -> bool {
        match self {
            FillTarget::Clear => fill.is_some_and(Fill::is_painted),
            FillTarget::Green => classify_fill(fill) != StatusColor::Green,
            FillTarget::Blue => classify_fill(fill) != StatusColor::Blue,
        }
    }
}

/// What a sweep sees of one cell
#[derive(Debug, Clone, Copy)]
pub struct SweepCell<'a> {
    pub value: &'a CellValue,
    pub fill: Option<&'a Fill>,
    pub color: &'a StatusColor,
}

impl SweepCell<'_> {
    /// Blank cell carrying a painted fill
    pub fn is_stale_paint(&self) -> bool {
        self.value.is_blank() && self.fill.is_some_and(Fill::is_painted)
    }
}

/// A recolouring pass
pub trait Sweep: Send + Sync {
    /// Short identifier used on the command line
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Whether the sweep handles rating rows (otherwise every other row)
    fn rating_rows(&self) -> bool;

    /// Target fill for a cell, `None` to leave it alone
    fn target(&self, cell: &SweepCell<'_>) -> Option<FillTarget>;
}

/// A fill to apply to one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFill {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
    pub target: FillTarget,
}

fn is_rating_row(sheet: &Sheet, row: u32, marker: &str) -> bool {
    sheet
        .get_cell(row, 1)
        .is_some_and(|c| c.value.as_text().contains(marker))
}

fn plan_sheet(
    sheet: &Sheet,
    styles: &StyleSheet,
    sweep: &dyn Sweep,
    marker: &str,
) -> Vec<PlannedFill> {
    let mut planned = Vec::new();
    for row in 2..=sheet.max_row() {
        if is_rating_row(sheet, row, marker) != sweep.rating_rows() {
            continue;
        }
        for cell in sheet.cells_in_row(row).filter(|c| c.col >= 2) {
            let fill = styles.fill_of(cell.style);
            let color = classify_fill(fill);
            let view = SweepCell {
                value: &cell.value,
                fill,
                color: &color,
            };
            if let Some(target) = sweep.target(&view)
                && target.changes(fill)
            {
                planned.push(PlannedFill {
                    sheet: sheet.name.clone(),
                    row,
                    col: cell.col,
                    target,
                });
            }
        }
    }
    planned
}

/// Fills the sweep would change, in sheet, row, column order
pub fn plan(workbook: &Workbook, sweep: &dyn Sweep, marker: &str) -> Vec<PlannedFill> {
    workbook
        .sheets
        .par_iter()
        .map(|sheet| plan_sheet(sheet, &workbook.styles, sweep, marker))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

/// Apply planned fills; returns how many were applied
pub fn apply(workbook: &mut Workbook, planned: &[PlannedFill]) -> usize {
    planned
        .iter()
        .filter(|p| {
            workbook.restyle(&p.sheet, p.row, p.col, &StyleChange::fill(p.target.fill()))
        })
        .count()
}

/// Open a workbook, run one sweep and save it. Returns the number of cells
/// whose fill changed.
pub fn run_sweep<P: AsRef<Path>>(path: P, sweep: &dyn Sweep, marker: &str) -> Result<usize> {
    let path = path.as_ref();
    let mut workbook = read_workbook(path).map_err(|e| BizsheetError::open(path, e))?;
    let planned = plan(&workbook, sweep, marker);
    let changed = apply(&mut workbook, &planned);
    if changed > 0 {
        save_workbook(&workbook).map_err(|e| BizsheetError::save(path, e))?;
    }
    tracing::info!(path = %path.display(), sweep = sweep.id(), changed, "sweep finished");
    Ok(changed)
}


#[cfg(test)]
mod tests {
    use super::test_support::workbook;
    use super::*;

    #[test]
    fn test_header_row_and_label_column_are_ignored() {
        let mut wb = workbook(&[("부채비율", CellValue::Number(0.1), Some(FillTarget::Green))]);
        wb.restyle("Seoul", 1, 2, &StyleChange::fill(Fill::status_green()));
        wb.restyle("Seoul", 2, 1, &StyleChange::fill(Fill::status_green()));
        let planned = plan(&wb, &StatusAgingSweep, "신용평가");
        assert_eq!(
            planned,
            vec![PlannedFill {
                sheet: "Seoul".into(),
                row: 2,
                col: 2,
                target: FillTarget::Blue,
            }]
        );
    }

    #[test]
    fn test_apply_counts_changes() {
        let mut wb = workbook(&[
            ("부채비율", CellValue::Number(0.1), Some(FillTarget::Green)),
            ("유동비율", CellValue::Number(1.2), Some(FillTarget::Blue)),
            ("영업기간", CellValue::Text("5년".into()), None),
        ]);
        let planned = plan(&wb, &StatusAgingSweep, "신용평가");
        assert_eq!(apply(&mut wb, &planned), 2);
        assert_eq!(wb.color_at("Seoul", 2, 2), StatusColor::Blue);
        assert_eq!(wb.color_at("Seoul", 3, 2), StatusColor::None);
        assert_eq!(plan(&wb, &StatusAgingSweep, "신용평가").len(), 1);
    }
}
