//! Error types for the data-loader crate.

use thiserror::Error;

/// Errors that can occur while loading or generating a dataset.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// Neither MovieLens layout was found in the directory
    #[error("No MovieLens ratings file (ratings.dat or ratings.csv) found in {path}")]
    DatasetNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The csv reader rejected a record
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
