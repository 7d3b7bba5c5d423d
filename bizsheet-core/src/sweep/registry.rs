//! Sweep registry

use chrono::NaiveDate;

use super::*;

/// Every available sweep; the rating sweep judges expiry against `today`
pub fn all_sweeps(today: NaiveDate) -> Vec<Box<dyn Sweep>> {
    vec![
        Box::new(StatusAgingSweep),
        Box::new(RatingValiditySweep::new(today)),
    ]
}

/// Look a sweep up by its command-line identifier
pub fn sweep_by_id(id: &str, today: NaiveDate) -> Option<Box<dyn Sweep>> {
    all_sweeps(today).into_iter().find(|s| s.id() == id)
}
