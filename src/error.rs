//! Error handling for catalog loading and model matching.
//!
//! Provides error types with context for header parsing, unit conversion,
//! catalog construction and observational table joins.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Invalid format in file: {path} (line {line}) - {reason}")]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Malformed unit expression '{expression}': {reason}")]
    Grammar { expression: String, reason: String },

    #[error("Column not found: {column}")]
    MissingColumn { column: String },

    #[error("Unit not found in unit dictionary: {unit}")]
    UnknownUnit { unit: String },

    #[error("Unsupported model naming convention: {convention}")]
    UnsupportedConvention { convention: String },

    #[error("Cannot parse model name '{name}': {reason}")]
    InvalidModelName { name: String, reason: String },

    #[error("No catalog entries ending in '{extension}' found at path: {path}")]
    EmptyCatalog { path: PathBuf, extension: String },

    #[error("Dataset not found at path: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Join failed: {reason}")]
    Join { reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Snapshot extraction failed for model {model}: {source}")]
    SnapshotExtraction {
        model: String,
        #[source]
        source: Box<MatchError>,
    },
}

impl MatchError {
    pub(crate) fn format(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn grammar(expression: &str, reason: impl Into<String>) -> Self {
        Self::Grammar {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
