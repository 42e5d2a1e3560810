//! Arithmetic operators: + - * / % and unary + -
//!
//! Numeric operands widen to the wider of the two types, with byte and short
//! arithmetic carried out as int. Integer arithmetic is checked; integer
//! division truncates toward zero. Temporal operands follow calendar rules
//! for dates and instant rules for timestamps.

use super::traits::{BinaryOperator, UnaryOperator};
use crate::error::{Error, Result};
use crate::types::{DataType, Value};
use flatsql_value::ConversionRules;
use rust_decimal::Decimal;

/// The type numeric arithmetic is carried out in.
pub(crate) fn arithmetic_type(left: &DataType, right: &DataType) -> Option<DataType> {
    Some(match left.wider(right)? {
        DataType::I8 | DataType::I16 => DataType::I32,
        other => other,
    })
}

struct NumericOp {
    name: &'static str,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
    decimal: fn(Decimal, Decimal) -> Option<Decimal>,
}

fn numeric(op: &NumericOp, left: &Value, right: &Value) -> Result<Value> {
    let target = arithmetic_type(&left.data_type(), &right.data_type())
        .ok_or_else(|| mismatch(op.name, left, right))?;
    let overflow = || Error::Evaluation(format!("numeric overflow in {}: {} and {}", op.name, left, right));
    match target {
        DataType::I32 | DataType::I64 => {
            let (a, b) = (left.to_i64(), right.to_i64());
            let result = a
                .zip(b)
                .and_then(|(a, b)| (op.int)(a, b))
                .ok_or_else(overflow)?;
            Value::I64(result).widen(&target).map_err(|_| overflow())
        }
        DataType::F32 | DataType::F64 => {
            let (a, b) = (left.to_f64(), right.to_f64());
            let result = a.zip(b).map(|(a, b)| (op.float)(a, b)).ok_or_else(overflow)?;
            Ok(match target {
                DataType::F32 => Value::F32(result as f32),
                _ => Value::F64(result),
            })
        }
        _ => {
            let (a, b) = (left.to_decimal(), right.to_decimal());
            a.zip(b)
                .and_then(|(a, b)| (op.decimal)(a, b))
                .map(Value::Decimal)
                .ok_or_else(overflow)
        }
    }
}

fn mismatch(name: &str, left: &Value, right: &Value) -> Error {
    Error::Evaluation(format!(
        "cannot apply {} to {} and {}",
        name,
        left.data_type(),
        right.data_type()
    ))
}

/// The negation of an integer offset subtracted from a temporal.
fn negated(value: &Value) -> Result<i64> {
    value
        .to_i64()
        .and_then(i64::checked_neg)
        .ok_or_else(|| Error::Evaluation(format!("numeric overflow in -: {}", value)))
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::F32(n) => *n == 0.0,
        Value::F64(n) => *n == 0.0,
        Value::Decimal(d) => d.is_zero(),
        other => other.to_i64() == Some(0),
    }
}

fn numeric_result_type(left: &DataType, right: &DataType) -> DataType {
    arithmetic_type(left, right).unwrap_or(DataType::Null)
}

pub struct AddOperator;

impl BinaryOperator for AddOperator {
    fn name(&self) -> &'static str {
        "addition"
    }

    fn symbol(&self) -> &'static str {
        "+"
    }

    fn result_type(&self, left: &DataType, right: &DataType) -> DataType {
        use DataType::*;
        match (left, right) {
            (Str, _) | (_, Str) => Str,
            (Date, Time) | (Time, Date) => Timestamp,
            (Date, r) | (r, Date) if r.is_integer() => Date,
            (Time, r) | (r, Time) if r.is_integer() => Time,
            (Timestamp, r) | (r, Timestamp) if r.is_integer() => Timestamp,
            (l, r) => numeric_result_type(l, r),
        }
    }

    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        use Value::*;
        Ok(match (left, right) {
            (Null, _) | (_, Null) => Null,
            (Str(_), _) | (_, Str(_)) => Str(format!("{}{}", left, right)),
            (Date(date), Time(time)) | (Time(time), Date(date)) => Timestamp(date.at(time)?),
            (Date(date), n) | (n, Date(date)) if n.is_integer() => {
                Date(date.add_days(n.to_i64().unwrap_or_default())?)
            }
            (Time(time), n) | (n, Time(time)) if n.is_integer() => {
                Time(time.add_millis(n.to_i64().unwrap_or_default())?)
            }
            (Timestamp(ts), n) | (n, Timestamp(ts)) if n.is_integer() => {
                Timestamp(ts.add_millis(n.to_i64().unwrap_or_default())?)
            }
            _ => {
                static OP: NumericOp = NumericOp {
                    name: "+",
                    int: i64::checked_add,
                    float: |a, b| a + b,
                    decimal: rust_decimal::Decimal::checked_add,
                };
                numeric(&OP, left, right)?
            }
        })
    }
}

pub struct SubtractOperator;

impl BinaryOperator for SubtractOperator {
    fn name(&self) -> &'static str {
        "subtraction"
    }

    fn symbol(&self) -> &'static str {
        "-"
    }

    fn result_type(&self, left: &DataType, right: &DataType) -> DataType {
        use DataType::*;
        match (left, right) {
            (Date, Date) => I32,
            (Time, Time) | (Timestamp, Timestamp) => I64,
            (Date, r) if r.is_integer() => Date,
            (Time, r) if r.is_integer() => Time,
            (Timestamp, r) if r.is_integer() => Timestamp,
            (l, r) => numeric_result_type(l, r),
        }
    }

    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        use Value::*;
        Ok(match (left, right) {
            (Null, _) | (_, Null) => Null,
            (Date(a), Date(b)) => {
                let days = a.days_since(b);
                I32(days
                    .try_into()
                    .map_err(|_| Error::Evaluation(format!("numeric overflow: {} days", days)))?)
            }
            (Time(a), Time(b)) => I64(a.millis - b.millis),
            (Timestamp(a), Timestamp(b)) => I64(a.millis_since(b)),
            (Date(date), n) if n.is_integer() => Date(date.add_days(negated(n)?)?),
            (Time(time), n) if n.is_integer() => Time(time.add_millis(negated(n)?)?),
            (Timestamp(ts), n) if n.is_integer() => Timestamp(ts.add_millis(negated(n)?)?),
            _ => {
                static OP: NumericOp = NumericOp {
                    name: "-",
                    int: i64::checked_sub,
                    float: |a, b| a - b,
                    decimal: rust_decimal::Decimal::checked_sub,
                };
                numeric(&OP, left, right)?
            }
        })
    }
}

pub struct MultiplyOperator;

impl BinaryOperator for MultiplyOperator {
    fn name(&self) -> &'static str {
        "multiplication"
    }

    fn symbol(&self) -> &'static str {
        "*"
    }

    fn result_type(&self, left: &DataType, right: &DataType) -> DataType {
        numeric_result_type(left, right)
    }

    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        static OP: NumericOp = NumericOp {
            name: "*",
            int: i64::checked_mul,
            float: |a, b| a * b,
            decimal: Decimal::checked_mul,
        };
        numeric(&OP, left, right)
    }
}

pub struct DivideOperator;

impl BinaryOperator for DivideOperator {
    fn name(&self) -> &'static str {
        "division"
    }

    fn symbol(&self) -> &'static str {
        "/"
    }

    fn result_type(&self, left: &DataType, right: &DataType) -> DataType {
        numeric_result_type(left, right)
    }

    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        if right.is_numeric() && is_zero(right) {
            return Err(Error::Evaluation(format!("division by zero: {} / {}", left, right)));
        }
        static OP: NumericOp = NumericOp {
            name: "/",
            int: i64::checked_div,
            float: |a, b| a / b,
            decimal: Decimal::checked_div,
        };
        numeric(&OP, left, right)
    }
}

pub struct RemainderOperator;

impl BinaryOperator for RemainderOperator {
    fn name(&self) -> &'static str {
        "remainder"
    }

    fn symbol(&self) -> &'static str {
        "%"
    }

    fn result_type(&self, left: &DataType, right: &DataType) -> DataType {
        numeric_result_type(left, right)
    }

    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        if right.is_numeric() && is_zero(right) {
            return Err(Error::Evaluation(format!("modulo by zero: {} % {}", left, right)));
        }
        static OP: NumericOp = NumericOp {
            name: "%",
            int: i64::checked_rem,
            float: |a, b| a % b,
            decimal: Decimal::checked_rem,
        };
        numeric(&OP, left, right)
    }
}

pub struct NegateOperator;

impl UnaryOperator for NegateOperator {
    fn name(&self) -> &'static str {
        "negation"
    }

    fn symbol(&self) -> &'static str {
        "-"
    }

    fn result_type(&self, operand: &DataType) -> DataType {
        match operand {
            DataType::I8 | DataType::I16 => DataType::I32,
            other if other.is_numeric() => other.clone(),
            _ => DataType::Null,
        }
    }

    fn execute(&self, operand: &Value) -> Result<Value> {
        let overflow = || Error::Evaluation(format!("numeric overflow: -{}", operand));
        Ok(match operand {
            Value::Null => Value::Null,
            Value::I8(n) => Value::I32(-(*n as i32)),
            Value::I16(n) => Value::I32(-(*n as i32)),
            Value::I32(n) => Value::I32(n.checked_neg().ok_or_else(overflow)?),
            Value::I64(n) => Value::I64(n.checked_neg().ok_or_else(overflow)?),
            Value::F32(n) => Value::F32(-n),
            Value::F64(n) => Value::F64(-n),
            Value::Decimal(d) => Value::Decimal(-*d),
            other => {
                return Err(Error::Evaluation(format!(
                    "cannot negate {}",
                    other.data_type()
                )));
            }
        })
    }
}

pub struct IdentityOperator;

impl UnaryOperator for IdentityOperator {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn symbol(&self) -> &'static str {
        "+"
    }

    fn result_type(&self, operand: &DataType) -> DataType {
        operand.clone()
    }

    fn execute(&self, operand: &Value) -> Result<Value> {
        match operand {
            Value::Null => Ok(Value::Null),
            n if n.is_numeric() => Ok(n.clone()),
            other => Err(Error::Evaluation(format!(
                "cannot apply unary + to {}",
                other.data_type()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use flatsql_value::{Date, Time, Timestamp};

    fn rules() -> ConversionRules {
        ConversionRules::default()
    }

    #[test]
    fn test_integer_division_truncates() {
        let op = DivideOperator;
        assert_eq!(op.execute(&Value::I32(5), &Value::I32(2), &rules()), Ok(Value::I32(2)));
        assert_eq!(op.execute(&Value::I32(-7), &Value::I32(2), &rules()), Ok(Value::I32(-3)));
        assert_eq!(op.execute(&Value::I32(5), &Value::F64(2.0), &rules()), Ok(Value::F64(2.5)));
        assert!(matches!(
            op.execute(&Value::I32(5), &Value::I32(0), &rules()),
            Err(Error::Evaluation(_))
        ));
        assert!(matches!(
            op.execute(&Value::F64(5.0), &Value::F64(0.0), &rules()),
            Err(Error::Evaluation(_))
        ));
    }

    #[test]
    fn test_remainder() {
        let op = RemainderOperator;
        assert_eq!(op.execute(&Value::I32(7), &Value::I32(3), &rules()), Ok(Value::I32(1)));
        assert!(matches!(
            op.execute(&Value::I32(5), &Value::I32(0), &rules()),
            Err(Error::Evaluation(_))
        ));
    }

    #[test]
    fn test_promotion() {
        let op = AddOperator;
        let sum = op.execute(&Value::I8(100), &Value::I8(100), &rules());
        assert!(matches!(sum, Ok(Value::I32(200))));
        assert!(matches!(
            op.execute(&Value::I32(1), &Value::I64(2), &rules()),
            Ok(Value::I64(3))
        ));
        assert!(matches!(
            op.execute(&Value::I64(1), &Value::Decimal(Decimal::new(15, 1)), &rules()),
            Ok(Value::Decimal(d)) if d == Decimal::new(25, 1)
        ));
        assert_eq!(op.result_type(&DataType::I16, &DataType::I8), DataType::I32);
        assert_eq!(op.result_type(&DataType::I32, &DataType::F64), DataType::F64);
    }

    #[test]
    fn test_overflow() {
        let op = MultiplyOperator;
        assert!(matches!(
            op.execute(&Value::I32(i32::MAX), &Value::I32(2), &rules()),
            Err(Error::Evaluation(_))
        ));
        assert!(matches!(
            op.execute(&Value::I64(i64::MAX), &Value::I32(2), &rules()),
            Err(Error::Evaluation(_))
        ));
        assert!(NegateOperator.execute(&Value::I32(i32::MIN)).is_err());
    }

    #[test]
    fn test_subtracting_minimum_long_from_temporal() {
        let date = Date::from_ymd(2024, 2, 28, Tz::UTC).unwrap();
        assert!(matches!(
            SubtractOperator.execute(&Value::Date(date), &Value::I64(i64::MIN), &rules()),
            Err(Error::Evaluation(_))
        ));
        let time = Time::new(0, Tz::UTC);
        assert!(matches!(
            SubtractOperator.execute(&Value::Time(time), &Value::I64(i64::MIN), &rules()),
            Err(Error::Evaluation(_))
        ));
    }

    #[test]
    fn test_string_concatenation_with_plus() {
        let op = AddOperator;
        assert_eq!(
            op.execute(&Value::Str("a".into()), &Value::I32(1), &rules()),
            Ok(Value::Str("a1".into()))
        );
        assert_eq!(op.execute(&Value::Null, &Value::Str("a".into()), &rules()), Ok(Value::Null));
    }

    #[test]
    fn test_date_arithmetic() {
        let date = Date::from_ymd(2024, 2, 28, Tz::UTC).unwrap();
        let later = AddOperator
            .execute(&Value::Date(date), &Value::I32(2), &rules())
            .unwrap();
        assert_eq!(later.to_string(), "2024-03-01");
        let days = SubtractOperator
            .execute(&later, &Value::Date(date), &rules())
            .unwrap();
        assert_eq!(days, Value::I32(2));
    }

    #[test]
    fn test_time_is_linear() {
        let time = Time::new(23 * 3_600_000, Tz::UTC);
        let later = AddOperator
            .execute(&Value::Time(time), &Value::I64(2 * 3_600_000), &rules())
            .unwrap();
        let Value::Time(later) = later else { panic!("expected time") };
        assert_eq!(later.millis, 25 * 3_600_000);
        let diff = SubtractOperator
            .execute(&Value::Time(later), &Value::Time(time), &rules())
            .unwrap();
        assert_eq!(diff, Value::I64(2 * 3_600_000));
    }

    #[test]
    fn test_timestamp_across_dst() {
        let zone: Tz = "America/New_York".parse().unwrap();
        // 2024-03-10 01:30 EST, half an hour before the spring-forward gap.
        let date = Date::from_ymd(2024, 3, 10, zone).unwrap();
        let start = date.at(&Time::new(90 * 60_000, zone)).unwrap();
        let later = AddOperator
            .execute(&Value::Timestamp(start), &Value::I64(3_600_000), &rules())
            .unwrap();
        assert_eq!(later.to_string(), "2024-03-10 03:30:00");
        let diff = SubtractOperator
            .execute(&later, &Value::Timestamp(start), &rules())
            .unwrap();
        assert_eq!(diff, Value::I64(3_600_000));
    }

    #[test]
    fn test_date_plus_time() {
        let date = Date::from_ymd(2024, 1, 2, Tz::UTC).unwrap();
        let time = Time::new(3_600_000, Tz::UTC);
        let ts = AddOperator
            .execute(&Value::Date(date), &Value::Time(time), &rules())
            .unwrap();
        assert_eq!(
            ts,
            Value::Timestamp(Timestamp::from_millis(1_704_157_200_000, Tz::UTC).unwrap())
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            MultiplyOperator.execute(&Value::Bool(true), &Value::I32(2), &rules()),
            Err(Error::Evaluation(_))
        ));
    }
}
