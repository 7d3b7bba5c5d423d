//! Workbook persistence

pub mod xlsx_writer;

pub use xlsx_writer::{render_package, save_workbook, save_workbook_as};
