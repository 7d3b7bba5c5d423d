//! Error types for bizsheet operations

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for bizsheet operations
pub type Result<T> = std::result::Result<T, BizsheetError>;

/// Closed classification of operation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileAccess,
    NotFound,
    Config,
    Archive,
    Recognition,
}

/// Errors surfaced at operation boundaries
#[derive(Error, Debug)]
pub enum BizsheetError {
    /// The workbook could not be opened or parsed
    #[error("Failed to open workbook {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// The workbook could not be written back
    #[error("Failed to save workbook {}: {message}", path.display())]
    Save { path: PathBuf, message: String },

    /// The identifier is not present in any sheet
    #[error("Business number '{0}' not found in workbook")]
    NotFound(String),

    /// Schema or path configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source document could not be archived
    #[error("Failed to archive {}: {message}", source_path.display())]
    Archive {
        source_path: PathBuf,
        message: String,
    },

    /// The recognizer failed on a region
    #[error("Recognition failed: {0}")]
    Recognition(String),
}

impl BizsheetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BizsheetError::Open { .. } | BizsheetError::Save { .. } => ErrorKind::FileAccess,
            BizsheetError::NotFound(_) => ErrorKind::NotFound,
            BizsheetError::Config(_) => ErrorKind::Config,
            BizsheetError::Archive { .. } => ErrorKind::Archive,
            BizsheetError::Recognition(_) => ErrorKind::Recognition,
        }
    }

    /// Wrap a reader failure, keeping the whole context chain
    pub fn open(path: &Path, err: anyhow::Error) -> Self {
        BizsheetError::Open {
            path: path.to_path_buf(),
            message: format!("{:#}", err),
        }
    }

    /// Wrap a writer failure, keeping the whole context chain
    pub fn save(path: &Path, err: anyhow::Error) -> Self {
        BizsheetError::Save {
            path: path.to_path_buf(),
            message: format!("{:#}", err),
        }
    }

    pub fn archive(source: &Path, err: impl std::fmt::Display) -> Self {
        BizsheetError::Archive {
            source_path: source.to_path_buf(),
            message: err.to_string(),
        }
    }
}
