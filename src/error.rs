//! Error taxonomy for the upload pipeline.
//!
//! Fatal conditions are typed so callers can react (switch write mode,
//! re-upload a corrected file). Recoverable conditions never surface here:
//! dropped CSV rows and failed insert batches are counted and reported
//! through [`crate::convert::Conversion`] and [`crate::load::LoadReport`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document cannot yield records: a CSV without a header plus at
    /// least one data row, or a JSON document whose top level is not an
    /// object or an array of objects.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The document claimed to be JSON but did not parse.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A JSON array element turned out not to be an object during full
    /// conversion.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Table '{dataset}.{table}' already exists; use append or replace")]
    TableConflict { dataset: String, table: String },

    #[error("Table '{dataset}.{table}' does not exist; use create")]
    TableNotFound { dataset: String, table: String },

    /// A warehouse call outside the tolerated-failure set (existence checks,
    /// dataset/table creation) failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure reported by a [`crate::store::TableStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the operation (missing dataset, bad table state).
    #[error("{0}")]
    Rejected(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        StoreError::Rejected(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}
