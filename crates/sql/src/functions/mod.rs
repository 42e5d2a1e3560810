//! SQL function definitions
//!
//! Built-in scalar functions form a closed enum resolved once by the planner.
//! Aggregates are recognized separately and evaluated by the aggregator.
//! User functions are the single open extension point, held in a
//! `FunctionRegistry` and also resolved at plan time.

pub mod aggregate;
pub mod registry;

mod numeric;
mod phonetic;
mod string;
mod temporal;

pub use aggregate::AggregateKind;
pub use registry::{FunctionRegistry, UserFunction};

use crate::error::{Error, Result};
use crate::operators::sql_equal;
use crate::types::{DataType, ExecutionContext, RowEnvironment, Value};
use std::fmt::Display;

/// The number of arguments a function accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exact(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn variadic(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    /// Fails with a bind error when `count` arguments are not accepted.
    pub fn check(&self, name: &str, count: usize) -> Result<()> {
        if self.accepts(count) {
            return Ok(());
        }
        let expected = match self.max {
            Some(max) if max == self.min => format!("{}", max),
            Some(max) => format!("{} to {}", self.min, max),
            None => format!("at least {}", self.min),
        };
        Err(Error::Bind(format!(
            "{} takes {} argument{}, got {}",
            name,
            expected,
            if self.max == Some(1) { "" } else { "s" },
            count
        )))
    }
}

/// Built-in scalar functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    Abs,
    Round,
    Lower,
    Upper,
    Length,
    Trim,
    LTrim,
    RTrim,
    Substring,
    Replace,
    Coalesce,
    NullIf,
    Soundex,
    Difference,
    Year,
    Month,
    DayOfMonth,
    DayOfWeek,
    DayOfYear,
    HourOfDay,
    Minute,
    Second,
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
    ToArray,
    Random,
    LineNumber,
}

impl ScalarFunction {
    const ALL: [ScalarFunction; 28] = [
        Self::Abs,
        Self::Round,
        Self::Lower,
        Self::Upper,
        Self::Length,
        Self::Trim,
        Self::LTrim,
        Self::RTrim,
        Self::Substring,
        Self::Replace,
        Self::Coalesce,
        Self::NullIf,
        Self::Soundex,
        Self::Difference,
        Self::Year,
        Self::Month,
        Self::DayOfMonth,
        Self::DayOfWeek,
        Self::DayOfYear,
        Self::HourOfDay,
        Self::Minute,
        Self::Second,
        Self::CurrentDate,
        Self::CurrentTime,
        Self::CurrentTimestamp,
        Self::ToArray,
        Self::Random,
        Self::LineNumber,
    ];

    /// Looks up a built-in function by name, case-insensitively.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|function| function.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Abs => "ABS",
            Self::Round => "ROUND",
            Self::Lower => "LOWER",
            Self::Upper => "UPPER",
            Self::Length => "LENGTH",
            Self::Trim => "TRIM",
            Self::LTrim => "LTRIM",
            Self::RTrim => "RTRIM",
            Self::Substring => "SUBSTRING",
            Self::Replace => "REPLACE",
            Self::Coalesce => "COALESCE",
            Self::NullIf => "NULLIF",
            Self::Soundex => "SOUNDEX",
            Self::Difference => "DIFFERENCE",
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::DayOfMonth => "DAYOFMONTH",
            Self::DayOfWeek => "DAYOFWEEK",
            Self::DayOfYear => "DAYOFYEAR",
            Self::HourOfDay => "HOUROFDAY",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
            Self::CurrentDate => "CURRENT_DATE",
            Self::CurrentTime => "CURRENT_TIME",
            Self::CurrentTimestamp => "CURRENT_TIMESTAMP",
            Self::ToArray => "TO_ARRAY",
            Self::Random => "RANDOM",
            Self::LineNumber => "LINE_NUMBER",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::CurrentDate
            | Self::CurrentTime
            | Self::CurrentTimestamp
            | Self::Random
            | Self::LineNumber => Arity::exact(0),
            Self::Round | Self::Trim | Self::LTrim | Self::RTrim => Arity::range(1, 2),
            Self::Substring => Arity::range(2, 3),
            Self::Replace => Arity::exact(3),
            Self::NullIf | Self::Difference => Arity::exact(2),
            Self::Coalesce | Self::ToArray => Arity::variadic(1),
            _ => Arity::exact(1),
        }
    }

    /// Whether the function reads row position or random state, so its
    /// value must be cached per row.
    pub fn is_volatile(&self) -> bool {
        matches!(self, Self::Random)
    }

    /// The static result type for the given argument types.
    pub fn result_type(&self, args: &[DataType]) -> DataType {
        match self {
            Self::Abs => match args.first() {
                Some(DataType::I8 | DataType::I16) => DataType::I32,
                Some(t) if t.is_numeric() => t.clone(),
                _ => DataType::Decimal,
            },
            Self::Round => match args.first() {
                Some(DataType::F32) => DataType::F64,
                Some(t) if t.is_numeric() => t.clone(),
                _ => DataType::Decimal,
            },
            Self::Lower
            | Self::Upper
            | Self::Trim
            | Self::LTrim
            | Self::RTrim
            | Self::Substring
            | Self::Replace
            | Self::Soundex => DataType::Str,
            Self::Length
            | Self::Difference
            | Self::Year
            | Self::Month
            | Self::DayOfMonth
            | Self::DayOfWeek
            | Self::DayOfYear
            | Self::HourOfDay
            | Self::Minute
            | Self::Second => DataType::I32,
            Self::Coalesce => args
                .iter()
                .find(|t| **t != DataType::Null)
                .cloned()
                .unwrap_or(DataType::Null),
            Self::NullIf => args.first().cloned().unwrap_or(DataType::Null),
            Self::CurrentDate => DataType::Date,
            Self::CurrentTime => DataType::Time,
            Self::CurrentTimestamp => DataType::Timestamp,
            Self::ToArray => DataType::Array(Box::new(
                args.iter()
                    .find(|t| **t != DataType::Null)
                    .cloned()
                    .unwrap_or(DataType::Null),
            )),
            Self::Random => DataType::F64,
            Self::LineNumber => DataType::I64,
        }
    }

    /// Evaluates the function over already evaluated arguments.
    pub fn evaluate(
        &self,
        args: &[Value],
        env: &RowEnvironment,
        context: &ExecutionContext,
        call_site: usize,
    ) -> Result<Value> {
        match self {
            Self::Abs => numeric::abs(&args[0], context),
            Self::Round => numeric::round(&args[0], args.get(1), context),
            Self::Lower => string::map_text(&args[0], |s| s.to_lowercase()),
            Self::Upper => string::map_text(&args[0], |s| s.to_uppercase()),
            Self::Length => string::length(&args[0]),
            Self::Trim => string::trim(&args[0], args.get(1), string::TrimSide::Both),
            Self::LTrim => string::trim(&args[0], args.get(1), string::TrimSide::Leading),
            Self::RTrim => string::trim(&args[0], args.get(1), string::TrimSide::Trailing),
            Self::Substring => string::substring(&args[0], &args[1], args.get(2)),
            Self::Replace => string::replace(&args[0], &args[1], &args[2]),
            Self::Coalesce => Ok(args
                .iter()
                .find(|value| !value.is_null())
                .cloned()
                .unwrap_or(Value::Null)),
            Self::NullIf => match sql_equal(&args[0], &args[1], context.rules)? {
                Some(true) => Ok(Value::Null),
                _ => Ok(args[0].clone()),
            },
            Self::Soundex => phonetic::soundex_value(&args[0]),
            Self::Difference => phonetic::difference(&args[0], &args[1]),
            Self::Year
            | Self::Month
            | Self::DayOfMonth
            | Self::DayOfWeek
            | Self::DayOfYear
            | Self::HourOfDay
            | Self::Minute
            | Self::Second => temporal::extract(*self, &args[0], context),
            Self::CurrentDate => Ok(Value::Date(context.now.date())),
            Self::CurrentTime => Ok(Value::Time(context.now.time())),
            Self::CurrentTimestamp => Ok(Value::Timestamp(context.now)),
            Self::ToArray => {
                let element = args
                    .iter()
                    .find(|value| !value.is_null())
                    .map(Value::data_type)
                    .unwrap_or(DataType::Null);
                Ok(Value::Array(element, args.to_vec()))
            }
            Self::Random => Ok(env.cached(call_site, || Value::F64(context.next_random()))),
            Self::LineNumber => Ok(Value::I64(env.line as i64)),
        }
    }
}

impl Display for ScalarFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads a numeric argument, converting strings with the active rules.
pub(crate) fn numeric_argument(function: &str, value: &Value, context: &ExecutionContext) -> Result<Value> {
    match value {
        n if n.is_numeric() => Ok(n.clone()),
        Value::Str(s) => context
            .rules
            .convert(s, &DataType::Decimal)
            .map_err(|_| unconvertible(function, value)),
        other => Err(unconvertible(function, other)),
    }
}

pub(crate) fn unconvertible(function: &str, value: &Value) -> Error {
    Error::Evaluation(format!(
        "{} cannot take {} argument '{}'",
        function,
        value.data_type(),
        value
    ))
}
