mod common;

use bizsheet_core::reader::{CellValue, read_workbook};
use bizsheet_core::writer::{save_workbook, save_workbook_as};
use common::{create_mock_xlsx, seoul_record};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_failed_save_keeps_original() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.xlsx");
    create_mock_xlsx(&path, &[seoul_record(10, 3)]).unwrap();
    let original = fs::read(&path).unwrap();

    let mut workbook = read_workbook(&path).unwrap();
    assert!(workbook.set_value("Seoul", 15, 3, CellValue::Number(0.5)));

    // a directory cannot be replaced by the renamed temp file
    let blocked = dir.path().join("blocked.xlsx");
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("keep"), b"x").unwrap();
    assert!(save_workbook_as(&workbook, &blocked).is_err());

    assert_eq!(fs::read(&path).unwrap(), original);
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["blocked.xlsx", "db.xlsx"]);
}

#[test]
fn test_save_replaces_in_place() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.xlsx");
    create_mock_xlsx(&path, &[seoul_record(10, 3)]).unwrap();

    let mut workbook = read_workbook(&path).unwrap();
    workbook.set_value("Seoul", 15, 3, CellValue::Number(0.5));
    save_workbook(&workbook).unwrap();

    let reread = read_workbook(&path).unwrap();
    assert_eq!(
        reread.get_sheet("Seoul").unwrap().get_cell(15, 3).unwrap().value,
        CellValue::Number(0.5)
    );
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
