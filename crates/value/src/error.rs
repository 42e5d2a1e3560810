//! Errors raised while converting or combining values

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Numeric overflow: {0}")]
    Overflow(String),

    #[error("Cannot convert '{raw}' to {target}")]
    Conversion { raw: String, target: String },

    #[error("Unknown data type: {0}")]
    UnknownType(String),

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("Unknown locale: {0}")]
    UnknownLocale(String),
}
