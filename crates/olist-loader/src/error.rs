//! Error types for the loader
//!
//! Two families:
//!
//! - [`ConfigError`] is raised before any dataset is touched and aborts the run.
//! - [`EntryError`] belongs to a single dataset; the orchestrator reports it and
//!   moves on to the next one.

use olist_common::EnvError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for per-dataset operations
pub type Result<T> = std::result::Result<T, EntryError>;

/// Pre-flight failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Env(#[from] EnvError),

    #[error("Source directory not found: {}. Set OLIST_DATA_DIR or pass --data-dir.", .0.display())]
    SourceRoot(PathBuf),

    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("Invalid dataset '{dataset}': {reason}")]
    InvalidDataset { dataset: String, reason: String },

    #[error("Unknown dataset '{0}'. Use --list to see the available datasets.")]
    UnknownDataset(String),

    #[error("Database is not reachable: {0}")]
    Database(#[source] sqlx::Error),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Failures scoped to one dataset
#[derive(Error, Debug)]
pub enum EntryError {
    /// Source file is absent; the dataset is skipped, not failed
    #[error("Source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Could not decode {} as {primary} or {fallback}", path.display())]
    Decode {
        path: PathBuf,
        primary: &'static str,
        fallback: &'static str,
    },

    #[error("Malformed source {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },

    #[error("Dataset '{dataset}' is missing column(s) in the source: {}", columns.join(", "))]
    MissingColumn {
        dataset: String,
        columns: Vec<String>,
    },

    #[error(
        "Failed to clear table `{table}`. Make sure the destination tables are created first \
         (run the schema DDL). Original error: {source}"
    )]
    ClearFailed {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Insert into `{table}` failed at batch {batch}: {source}")]
    Insert {
        table: String,
        batch: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("Transaction on `{table}` failed: {source}")]
    Transaction {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Row count query on `{table}` failed: {source}")]
    Count {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

impl EntryError {
    /// Short machine-friendly name used in status lines
    pub fn kind(&self) -> &'static str {
        match self {
            EntryError::SourceNotFound { .. } => "source_not_found",
            EntryError::Decode { .. } => "decode",
            EntryError::MalformedSource { .. } => "malformed_source",
            EntryError::MissingColumn { .. } => "missing_column",
            EntryError::ClearFailed { .. } => "clear_failed",
            EntryError::Insert { .. } => "insert",
            EntryError::Transaction { .. } => "transaction",
            EntryError::Count { .. } => "count",
        }
    }
}
