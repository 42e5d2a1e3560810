//! Error types for the query engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a row source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Table not found: {0}")]
    NotFound(String),

    #[error("Malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The statement text is not well-formed.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// The statement is well-formed but cannot be planned. Always raised
    /// before any row is read.
    #[error("Bind error: {0}")]
    Bind(String),

    /// A runtime type or arithmetic failure.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The API was used incorrectly, e.g. reading a cursor that is not on a row.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Cursor is closed")]
    CursorClosed,

    #[error("Execution was cancelled")]
    Cancelled,
}

impl From<flatsql_value::Error> for Error {
    fn from(err: flatsql_value::Error) -> Self {
        Error::Evaluation(err.to_string())
    }
}
