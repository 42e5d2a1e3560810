//! The flatsql value type
//!
//! `Value` implements `Eq`, `Ord` and `Hash` with "same value" semantics: NULL
//! equals NULL, and numbers are equal across representations (`I32(1)` equals
//! `F64(1.0)`). These are the semantics of DISTINCT, GROUP BY and ORDER BY. SQL
//! comparisons, where NULL is unknown, live in the query engine.

use crate::temporal::{Date, Time, Timestamp};
use crate::{DataType, Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A row of values.
pub type Row = Vec<Value>;

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Str(String),
    Date(Date),
    Time(Time),
    Timestamp(Timestamp),
    /// Element type and the ordered elements.
    Array(DataType, Vec<Value>),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Bool(_) => DataType::Bool,
            Self::I8(_) => DataType::I8,
            Self::I16(_) => DataType::I16,
            Self::I32(_) => DataType::I32,
            Self::I64(_) => DataType::I64,
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::Decimal(_) => DataType::Decimal,
            Self::Str(_) => DataType::Str,
            Self::Date(_) => DataType::Date,
            Self::Time(_) => DataType::Time,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::Array(element, _) => DataType::Array(Box::new(element.clone())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        self.data_type().is_numeric()
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::I8(_) | Self::I16(_) | Self::I32(_) | Self::I64(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an i64, if it is an integer.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::I8(n) => Some(*n as i64),
            Self::I16(n) => Some(*n as i64),
            Self::I32(n) => Some(*n as i64),
            Self::I64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::F32(n) => Some(*n as f64),
            Self::F64(n) => Some(*n),
            Self::Decimal(d) => d.to_f64(),
            other => other.to_i64().map(|n| n as f64),
        }
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::F32(n) => Decimal::from_f32(*n),
            Self::F64(n) => Decimal::from_f64(*n),
            Self::Decimal(d) => Some(*d),
            other => other.to_i64().map(Decimal::from),
        }
    }

    /// Widens a numeric value to the given numeric type. Narrowing integer
    /// conversions are checked.
    pub fn widen(&self, to: &DataType) -> Result<Value> {
        if !self.is_numeric() {
            return Err(Error::TypeMismatch {
                expected: to.to_string(),
                found: self.data_type().to_string(),
            });
        }
        let overflow = || Error::Overflow(format!("{} does not fit in {}", self, to));
        Ok(match to {
            DataType::I8 => Value::I8(self.integral()?.try_into().map_err(|_| overflow())?),
            DataType::I16 => Value::I16(self.integral()?.try_into().map_err(|_| overflow())?),
            DataType::I32 => Value::I32(self.integral()?.try_into().map_err(|_| overflow())?),
            DataType::I64 => Value::I64(self.integral()?),
            DataType::F32 => Value::F32(self.to_f64().ok_or_else(overflow)? as f32),
            DataType::F64 => Value::F64(self.to_f64().ok_or_else(overflow)?),
            DataType::Decimal => Value::Decimal(self.to_decimal().ok_or_else(overflow)?),
            other => {
                return Err(Error::TypeMismatch {
                    expected: "numeric type".into(),
                    found: other.to_string(),
                });
            }
        })
    }

    fn integral(&self) -> Result<i64> {
        self.to_i64().ok_or_else(|| Error::TypeMismatch {
            expected: "integer".into(),
            found: self.data_type().to_string(),
        })
    }

    /// Rank of the value's comparison class in the total order.
    fn class_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::I8(_)
            | Self::I16(_)
            | Self::I32(_)
            | Self::I64(_)
            | Self::F32(_)
            | Self::F64(_)
            | Self::Decimal(_) => 2,
            Self::Str(_) => 3,
            Self::Date(_) => 4,
            Self::Time(_) => 5,
            Self::Timestamp(_) => 6,
            Self::Array(_, _) => 7,
        }
    }
}

/// An exact integral reading of a float, when it has one.
fn float_as_i64(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn decimal_as_i64(d: &Decimal) -> Option<i64> {
    d.fract().is_zero().then(|| d.to_i64()).flatten()
}

/// Total order across numeric representations.
fn numeric_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
        (Value::Decimal(d), other) if other.is_integer() => {
            d.cmp(&Decimal::from(other.to_i64().unwrap_or_default()))
        }
        (other, Value::Decimal(d)) if other.is_integer() => {
            Decimal::from(other.to_i64().unwrap_or_default()).cmp(d)
        }
        (a, b) if a.is_integer() && b.is_integer() => a
            .to_i64()
            .unwrap_or_default()
            .cmp(&b.to_i64().unwrap_or_default()),
        (a, b) if a.is_integer() || b.is_integer() => {
            let (int, float, flipped) = if a.is_integer() { (a, b, false) } else { (b, a, true) };
            let n = int.to_i64().unwrap_or_default();
            let f = float.to_f64().unwrap_or(f64::NAN);
            let ordering = match float_as_i64(f) {
                Some(m) => n.cmp(&m),
                None => (n as f64).total_cmp(&f),
            };
            if flipped { ordering.reverse() } else { ordering }
        }
        (a, b) => {
            let (a, b) = (a.to_f64().unwrap_or(f64::NAN), b.to_f64().unwrap_or(f64::NAN));
            // -0.0 + 0.0 is 0.0
            (a + 0.0).total_cmp(&(b + 0.0))
        }
    }
}

fn hash_numeric<H: Hasher>(value: &Value, state: &mut H) {
    let integral = match value {
        Value::Decimal(d) => decimal_as_i64(d),
        Value::F32(_) | Value::F64(_) => value.to_f64().and_then(float_as_i64),
        other => other.to_i64(),
    };
    match integral {
        Some(n) => n.hash(state),
        None => {
            let f = value.to_f64().unwrap_or(f64::NAN);
            let f = if f.is_nan() { f64::NAN } else { f + 0.0 };
            f.to_bits().hash(state)
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// NULL sorts before everything. Values of different, incomparable kinds
    /// are ordered by kind.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => numeric_cmp(a, b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Array(_, a), Self::Array(_, b)) => a.cmp(b),
            (a, b) => a.class_rank().cmp(&b.class_rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class_rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Str(s) => s.hash(state),
            Self::Date(d) => d.hash(state),
            Self::Time(t) => t.hash(state),
            Self::Timestamp(t) => t.hash(state),
            Self::Array(_, values) => values.hash(state),
            numeric => hash_numeric(numeric, state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::I8(n) => write!(f, "{}", n),
            Self::I16(n) => write!(f, "{}", n),
            Self::I32(n) => write!(f, "{}", n),
            Self::I64(n) => write!(f, "{}", n),
            Self::F32(n) => write!(f, "{:?}", n),
            Self::F64(n) => write!(f, "{:?}", n),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Str(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d),
            Self::Time(t) => write!(f, "{}", t),
            Self::Timestamp(t) => write!(f, "{}", t),
            Self::Array(_, values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::F64(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    #[test]
    fn test_numeric_equality_across_representations() {
        assert_eq!(Value::I32(1), Value::F64(1.0));
        assert_eq!(Value::I8(7), Value::I64(7));
        assert_eq!(Value::Decimal(Decimal::from_str("2.50").unwrap()), Value::F64(2.5));
        assert_ne!(Value::I32(1), Value::F64(1.5));
        assert_ne!(Value::I64(9_007_199_254_740_993), Value::F64(9_007_199_254_740_992.0));
    }

    #[test]
    fn test_hash_agrees_with_equality() {
        let set: HashSet<Value> = [
            Value::I32(1),
            Value::F64(1.0),
            Value::Decimal(Decimal::ONE),
            Value::I64(2),
            Value::F64(-0.0),
            Value::I8(0),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_null_sorts_first_and_equals_itself() {
        let mut values = vec![Value::I32(3), Value::Null, Value::F64(-1.5), Value::I64(2)];
        values.sort();
        assert_eq!(
            values,
            vec![Value::Null, Value::F64(-1.5), Value::I64(2), Value::I32(3)]
        );
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn test_widen() {
        assert_eq!(Value::I8(5).widen(&DataType::F64).unwrap(), Value::F64(5.0));
        assert!(matches!(
            Value::I64(1 << 40).widen(&DataType::I32),
            Err(Error::Overflow(_))
        ));
        assert!(Value::Str("1".into()).widen(&DataType::I32).is_err());
    }
}
