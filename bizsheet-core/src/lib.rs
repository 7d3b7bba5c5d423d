//! bizsheet: business record locator and updater for xlsx workbooks
//!
//! A record is a column of cells anchored at the business number. Fields sit
//! at fixed row offsets from the anchor; their fill colour tracks how recently
//! they were updated.

pub mod archive;
pub mod color;
pub mod config;
pub mod error;
pub mod intake;
pub mod locator;
pub mod ocr;
pub mod rating;
pub mod reader;
pub mod record;
pub mod schema;
pub mod sweep;
pub mod writer;

pub use color::StatusColor;
pub use config::PathConfig;
pub use error::{BizsheetError, ErrorKind, Result};
pub use locator::{Anchor, locate, normalize_identifier};
pub use record::{
    FieldInput, FieldRecord, FieldValue, PreviewRow, UpdatePayload, lookup, preview, read_record,
    write_rating, write_record,
};
pub use schema::{FieldKind, FieldSpec, Schema};
pub use sweep::{Sweep, run_sweep};
