//! Status aging: green decays to blue, blue decays to no fill

use super::{FillTarget, Sweep, SweepCell};
use crate::color::StatusColor;

pub struct StatusAgingSweep;

impl Sweep for StatusAgingSweep {
    fn id(&self) -> &str {
        "status"
    }

    fn name(&self) -> &str {
        "Status colour aging"
    }

    fn rating_rows(&self) -> bool {
        false
    }

    fn target(&self, cell: &SweepCell<'_>) -> Option<FillTarget> {
        if cell.is_stale_paint() {
            return Some(FillTarget::Clear);
        }
        match cell.color {
            StatusColor::Green => Some(FillTarget::Blue),
            StatusColor::Blue => Some(FillTarget::Clear),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CellValue;
    use crate::sweep::test_support::workbook;
    use crate::sweep::{apply, plan};

    fn step(wb: &mut crate::reader::Workbook) -> usize {
        let planned = plan(wb, &StatusAgingSweep, "신용평가");
        apply(wb, &planned)
    }

    #[test]
    fn test_green_blue_none_none() {
        let mut wb = workbook(&[("부채비율", CellValue::Number(0.1), Some(FillTarget::Green))]);

        assert_eq!(step(&mut wb), 1);
        assert_eq!(wb.color_at("Seoul", 2, 2), StatusColor::Blue);
        assert_eq!(step(&mut wb), 1);
        assert_eq!(wb.color_at("Seoul", 2, 2), StatusColor::None);
        assert_eq!(step(&mut wb), 0);
        assert_eq!(wb.color_at("Seoul", 2, 2), StatusColor::None);
    }

    #[test]
    fn test_blank_painted_cells_are_cleared() {
        let mut wb = workbook(&[
            ("지역", CellValue::Empty, Some(FillTarget::Green)),
            ("영업기간", CellValue::Text(" ".into()), Some(FillTarget::Blue)),
        ]);
        assert_eq!(step(&mut wb), 2);
        assert_eq!(wb.color_at("Seoul", 2, 2), StatusColor::None);
        assert_eq!(wb.color_at("Seoul", 3, 2), StatusColor::None);
    }

    #[test]
    fn test_rating_rows_and_other_colours_untouched() {
        let mut wb = workbook(&[
            ("신용평가", CellValue::Text("A".into()), Some(FillTarget::Green)),
            ("부채비율", CellValue::Number(0.1), None),
        ]);
        wb.restyle(
            "Seoul",
            3,
            2,
            &crate::reader::StyleChange::fill(crate::color::Fill::solid(
                crate::color::ColorRef::rgb("FFFFC000"),
            )),
        );
        assert_eq!(step(&mut wb), 0);
        assert_eq!(wb.color_at("Seoul", 2, 2), StatusColor::Green);
    }
}
