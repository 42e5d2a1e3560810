//! Aggregate function kinds
//!
//! Aggregates are never evaluated per row. The planner binds each call into
//! an aggregate slot and the aggregator feeds the slot's accumulator.

use super::Arity;
use crate::types::DataType;
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    StringAgg,
    ArrayAgg,
}

impl AggregateKind {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name.to_uppercase().as_str() {
            "COUNT" => Self::Count,
            "SUM" => Self::Sum,
            "AVG" => Self::Avg,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "STRING_AGG" => Self::StringAgg,
            "ARRAY_AGG" => Self::ArrayAgg,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::StringAgg => "STRING_AGG",
            Self::ArrayAgg => "ARRAY_AGG",
        }
    }

    /// STRING_AGG takes the value and a constant separator.
    pub fn arity(&self) -> Arity {
        match self {
            Self::StringAgg => Arity::exact(2),
            _ => Arity::exact(1),
        }
    }

    pub fn result_type(&self, arg: &DataType) -> DataType {
        match self {
            Self::Count => DataType::I64,
            Self::Sum => match arg {
                t if t.is_integer() => DataType::I64,
                DataType::Decimal => DataType::Decimal,
                _ => DataType::F64,
            },
            Self::Avg => match arg {
                DataType::Decimal => DataType::Decimal,
                _ => DataType::F64,
            },
            Self::Min | Self::Max => arg.clone(),
            Self::StringAgg => DataType::Str,
            Self::ArrayAgg => DataType::Array(Box::new(arg.clone())),
        }
    }
}

impl Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
