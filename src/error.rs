//! Error types for the export pipeline
//!
//! Parse-level ambiguity never produces an error: the dialect detector and the
//! metadata parser always fall back to documented defaults. The variants below
//! cover the hard failures only: an archive the inventory rejected, a dataset
//! whose sources cannot be found (when the policy says so), and I/O or codec
//! failures while reading the archive or writing the workbook.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric codes for export failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// The archive failed the inventory check
    InvalidArchive = -32001,
    /// A declared dataset source is missing from the archive
    MissingSource = -32002,
    /// The ZIP container could not be read
    ArchiveError = -32003,
    /// File I/O error
    IoError = -32004,
    /// A dataset could not be tokenized
    CsvError = -32005,
    /// The workbook could not be built or serialized
    SpreadsheetError = -32006,
    /// Text could not be encoded or decoded
    EncodingError = -32007,
    /// Invalid configuration
    ConfigError = -32008,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArchive | ErrorCode::ConfigError | ErrorCode::EncodingError => {
                "client_error"
            }
            ErrorCode::MissingSource => "resource_not_found",
            ErrorCode::ArchiveError | ErrorCode::IoError => "io_error",
            ErrorCode::CsvError | ErrorCode::SpreadsheetError => "subsystem_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("archive is not a valid export: {reason}")]
    InvalidArchive { reason: String },

    #[error("no source file found for dataset '{dataset}'")]
    MissingSource { dataset: String },

    #[error("failed to read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dataset '{dataset}': {source}")]
    Csv {
        dataset: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to build workbook: {0}")]
    Spreadsheet(String),

    #[error("invalid encoded text: {0}")]
    Encoding(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExportError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExportError::InvalidArchive { .. } => ErrorCode::InvalidArchive,
            ExportError::MissingSource { .. } => ErrorCode::MissingSource,
            ExportError::Archive(_) => ErrorCode::ArchiveError,
            ExportError::Io(_) => ErrorCode::IoError,
            ExportError::Csv { .. } => ErrorCode::CsvError,
            ExportError::Spreadsheet(_) => ErrorCode::SpreadsheetError,
            ExportError::Encoding(_) => ErrorCode::EncodingError,
            ExportError::Config(_) => ErrorCode::ConfigError,
        }
    }

    pub fn invalid_archive(reason: impl Into<String>) -> Self {
        ExportError::InvalidArchive {
            reason: reason.into(),
        }
    }

    pub fn missing_source(dataset: impl Into<String>) -> Self {
        ExportError::MissingSource {
            dataset: dataset.into(),
        }
    }
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Extension trait for adding pipeline context to Results
pub trait ResultExt<T> {
    /// Add archive entry context
    fn with_entry(self, entry: &str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_entry(self, entry: &str) -> Result<T> {
        self.with_context(|| format!("Error in archive entry '{}'", entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::InvalidArchive.code(), -32001);
        assert_eq!(ErrorCode::MissingSource.code(), -32002);
        assert_eq!(ErrorCode::ConfigError.code(), -32008);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ErrorCode::InvalidArchive.category(), "client_error");
        assert_eq!(ErrorCode::MissingSource.category(), "resource_not_found");
        assert_eq!(ErrorCode::IoError.category(), "io_error");
        assert_eq!(ErrorCode::SpreadsheetError.category(), "subsystem_error");
    }

    #[test]
    fn test_error_maps_to_code() {
        let err = ExportError::missing_source("cgm");
        assert_eq!(err.code(), ErrorCode::MissingSource);
        assert_eq!(err.to_string(), "no source file found for dataset 'cgm'");

        let err = ExportError::invalid_archive("no CSV files found");
        assert_eq!(err.code(), ErrorCode::InvalidArchive);
        assert!(err.to_string().contains("no CSV files found"));
    }

    #[test]
    fn test_result_ext_adds_context() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result.with_entry("bolus_data_1.csv").unwrap_err();
        assert_eq!(err.to_string(), "Error in archive entry 'bolus_data_1.csv'");
        assert_eq!(err.root_cause().to_string(), "gone");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(
            ErrorCode::MissingSource.to_string(),
            "MissingSource(-32002)"
        );
    }
}
