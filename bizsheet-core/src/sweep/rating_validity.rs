//! Rating validity: rating cells are recoloured from the expiry date they carry

use chrono::NaiveDate;

use super::{FillTarget, Sweep, SweepCell};
use crate::rating::parse_expiry;
use crate::reader::CellValue;

pub struct RatingValiditySweep {
    today: NaiveDate,
}

impl RatingValiditySweep {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Sweep for RatingValiditySweep {
    fn id(&self) -> &str {
        "ratings"
    }

    fn name(&self) -> &str {
        "Credit rating validity"
    }

    fn rating_rows(&self) -> bool {
        true
    }

    fn target(&self, cell: &SweepCell<'_>) -> Option<FillTarget> {
        if cell.is_stale_paint() {
            return Some(FillTarget::Clear);
        }
        let CellValue::Text(text) = cell.value else {
            return None;
        };
        let expiry = parse_expiry(text)?;
        if expiry < self.today {
            Some(FillTarget::Blue)
        } else {
            Some(FillTarget::Green)
        }
    }
}
