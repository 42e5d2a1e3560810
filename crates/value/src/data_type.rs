//! Data types of flatsql values

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The type of a column or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// The type of a bare NULL literal.
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Str,
    Date,
    Time,
    Timestamp,
    Array(Box<DataType>),
}

impl DataType {
    /// Position in the numeric promotion order, or None for non-numeric types.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            Self::I8 => Some(0),
            Self::I16 => Some(1),
            Self::I32 => Some(2),
            Self::I64 => Some(3),
            Self::F32 => Some(4),
            Self::F64 => Some(5),
            Self::Decimal => Some(6),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    /// The wider of two numeric types. Non-numeric input yields None.
    pub fn wider(&self, other: &DataType) -> Option<DataType> {
        let (left, right) = (self.numeric_rank()?, other.numeric_rank()?);
        Some(if left >= right { self.clone() } else { other.clone() })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool => write!(f, "Boolean"),
            Self::I8 => write!(f, "Byte"),
            Self::I16 => write!(f, "Short"),
            Self::I32 => write!(f, "Int"),
            Self::I64 => write!(f, "Long"),
            Self::F32 => write!(f, "Float"),
            Self::F64 => write!(f, "Double"),
            Self::Decimal => write!(f, "BigDecimal"),
            Self::Str => write!(f, "String"),
            Self::Date => write!(f, "Date"),
            Self::Time => write!(f, "Time"),
            Self::Timestamp => write!(f, "Timestamp"),
            Self::Array(element) => write!(f, "Array<{}>", element),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    /// Parses a declared column type. Accepts the flatsql names as well as
    /// the usual SQL spellings.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        let upper = name.to_uppercase();
        if let Some(element) = upper
            .strip_prefix("ARRAY<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Ok(Self::Array(Box::new(element.parse()?)));
        }
        Ok(match upper.as_str() {
            "BOOLEAN" | "BOOL" => Self::Bool,
            "BYTE" | "TINYINT" => Self::I8,
            "SHORT" | "SMALLINT" => Self::I16,
            "INT" | "INTEGER" => Self::I32,
            "LONG" | "BIGINT" => Self::I64,
            "FLOAT" | "REAL" => Self::F32,
            "DOUBLE" => Self::F64,
            "BIGDECIMAL" | "DECIMAL" | "NUMERIC" => Self::Decimal,
            "STRING" | "VARCHAR" | "CHAR" | "TEXT" => Self::Str,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" => Self::Timestamp,
            _ => return Err(Error::UnknownType(name.to_string())),
        })
    }
}
