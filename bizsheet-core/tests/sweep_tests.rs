mod common;

use bizsheet_core::StatusColor;
use bizsheet_core::reader::read_workbook;
use bizsheet_core::sweep::{RatingValiditySweep, StatusAgingSweep, run_sweep};
use chrono::NaiveDate;
use common::{MockSheet, STYLE_BLUE, STYLE_GREEN, STYLE_ORANGE, create_mock_xlsx};
use tempfile::tempdir;

const MARKER: &str = "신용평가";

fn colour(path: &std::path::Path, row: u32, col: u32) -> StatusColor {
    read_workbook(path).unwrap().color_at("Seoul", row, col)
}

#[test]
fn test_status_aging_is_one_step() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.xlsx");
    let sheet = MockSheet::new("Seoul")
        .text_styled(1, 2, "헤더", STYLE_GREEN)
        .text(2, 1, "부채비율")
        .number_styled(2, 2, 0.45, STYLE_GREEN)
        .number_styled(2, 3, 0.30, STYLE_ORANGE);
    create_mock_xlsx(&path, &[sheet]).unwrap();

    assert_eq!(run_sweep(&path, &StatusAgingSweep, MARKER).unwrap(), 1);
    assert_eq!(colour(&path, 2, 2), StatusColor::Blue);

    assert_eq!(run_sweep(&path, &StatusAgingSweep, MARKER).unwrap(), 1);
    assert_eq!(colour(&path, 2, 2), StatusColor::None);

    assert_eq!(run_sweep(&path, &StatusAgingSweep, MARKER).unwrap(), 0);
    assert_eq!(colour(&path, 2, 2), StatusColor::None);

    // header row and foreign colours are never touched
    assert_eq!(colour(&path, 1, 2), StatusColor::Green);
    assert_eq!(colour(&path, 2, 3), StatusColor::Other("#FFC000".into()));
}

#[test]
fn test_status_aging_skips_rating_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.xlsx");
    let sheet = MockSheet::new("Seoul")
        .text(1, 1, "구분")
        .text(2, 1, "신용평가")
        .text_styled(2, 2, "A~30.01.01", STYLE_GREEN)
        .text(3, 1, "유동비율")
        .number_styled(3, 2, 1.2, STYLE_BLUE);
    create_mock_xlsx(&path, &[sheet]).unwrap();

    assert_eq!(run_sweep(&path, &StatusAgingSweep, MARKER).unwrap(), 1);
    assert_eq!(colour(&path, 2, 2), StatusColor::Green);
    assert_eq!(colour(&path, 3, 2), StatusColor::None);
}

#[test]
fn test_rating_validity_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.xlsx");
    let sheet = MockSheet::new("Seoul")
        .text(1, 1, "구분")
        .text(2, 1, "신용평가")
        .text(2, 2, "A~23.06.30")
        .text_styled(2, 3, "BB+\n(24.03.01~25.02.28)", STYLE_BLUE)
        .text_styled(2, 4, "확인불가", STYLE_GREEN);
    create_mock_xlsx(&path, &[sheet]).unwrap();

    let sweep = RatingValiditySweep::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(run_sweep(&path, &sweep, MARKER).unwrap(), 2);
    for _ in 0..2 {
        assert_eq!(colour(&path, 2, 2), StatusColor::Blue);
        assert_eq!(colour(&path, 2, 3), StatusColor::Green);
        assert_eq!(colour(&path, 2, 4), StatusColor::Green);
        assert_eq!(run_sweep(&path, &sweep, MARKER).unwrap(), 0);
    }
}
