//! Comparison operators: = != < <= > >=
//!
//! A comparison with a NULL operand is unknown. Numbers compare across
//! representations, dates compare with timestamps at the start of the day,
//! and a string compared with a typed value is first converted to that type.

use super::traits::BinaryOperator;
use crate::error::{Error, Result};
use crate::types::{DataType, Value};
use flatsql_value::{ConversionRules, Timestamp};
use std::cmp::Ordering;

/// Compares two values under SQL rules. Returns None when either side is
/// NULL.
pub fn compare(left: &Value, right: &Value, rules: &ConversionRules) -> Result<Option<Ordering>> {
    let incomparable = || {
        Error::Evaluation(format!(
            "cannot compare {} with {}",
            left.data_type(),
            right.data_type()
        ))
    };
    Ok(Some(match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(None),
        (a, b) if a.is_numeric() && b.is_numeric() => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Date(a), Value::Date(b)) => a.cmp(b),
        (Value::Time(a), Value::Time(b)) => a.cmp(b),
        (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
        (Value::Date(a), Value::Timestamp(b)) => Timestamp::new(a.start()?).cmp(b),
        (Value::Timestamp(a), Value::Date(b)) => a.cmp(&Timestamp::new(b.start()?)),
        (Value::Array(_, a), Value::Array(_, b)) => a.cmp(b),
        (Value::Str(s), other) => {
            let converted = convert_for_comparison(s, other, rules).ok_or_else(incomparable)?;
            return compare(&converted, other, rules);
        }
        (other, Value::Str(s)) => {
            let converted = convert_for_comparison(s, other, rules).ok_or_else(incomparable)?;
            return compare(other, &converted, rules);
        }
        _ => return Err(incomparable()),
    }))
}

/// Converts a string to the type of the value it is compared with.
fn convert_for_comparison(text: &str, other: &Value, rules: &ConversionRules) -> Option<Value> {
    let target = match other.data_type() {
        DataType::Array(_) | DataType::Str | DataType::Null => return None,
        numeric if numeric.is_numeric() => DataType::Decimal,
        target => target,
    };
    rules.convert(text, &target).ok()
}

/// Whether two values are equal under SQL rules, None when unknown.
pub fn sql_equal(left: &Value, right: &Value, rules: &ConversionRules) -> Result<Option<bool>> {
    Ok(compare(left, right, rules)?.map(|ordering| ordering == Ordering::Equal))
}

macro_rules! comparison_operator {
    ($name:ident, $label:literal, $symbol:literal, $test:expr) => {
        pub struct $name;

        impl BinaryOperator for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn symbol(&self) -> &'static str {
                $symbol
            }

            fn result_type(&self, _left: &DataType, _right: &DataType) -> DataType {
                DataType::Bool
            }

            fn execute(&self, left: &Value, right: &Value, rules: &ConversionRules) -> Result<Value> {
                let test: fn(Ordering) -> bool = $test;
                Ok(match compare(left, right, rules)? {
                    Some(ordering) => Value::Bool(test(ordering)),
                    None => Value::Null,
                })
            }
        }
    };
}

comparison_operator!(EqualOperator, "equality", "=", |o| o == Ordering::Equal);
comparison_operator!(NotEqualOperator, "inequality", "!=", |o| o != Ordering::Equal);
comparison_operator!(LessThanOperator, "less than", "<", |o| o == Ordering::Less);
comparison_operator!(LessThanOrEqualOperator, "less than or equal", "<=", |o| o != Ordering::Greater);
comparison_operator!(GreaterThanOperator, "greater than", ">", |o| o == Ordering::Greater);
comparison_operator!(GreaterThanOrEqualOperator, "greater than or equal", ">=", |o| o != Ordering::Less);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use flatsql_value::Date;

    fn rules() -> ConversionRules {
        ConversionRules::default()
    }

    #[test]
    fn test_null_is_unknown() {
        assert_eq!(compare(&Value::Null, &Value::Null, &rules()), Ok(None));
        assert_eq!(
            EqualOperator.execute(&Value::I32(1), &Value::Null, &rules()),
            Ok(Value::Null)
        );
        assert_eq!(
            NotEqualOperator.execute(&Value::Null, &Value::Str("a".into()), &rules()),
            Ok(Value::Null)
        );
    }

    #[test]
    fn test_numeric_across_representations() {
        assert_eq!(
            EqualOperator.execute(&Value::I32(1), &Value::F64(1.0), &rules()),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            LessThanOperator.execute(&Value::I64(2), &Value::F32(2.5), &rules()),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            GreaterThanOrEqualOperator.execute(
                &Value::Decimal(rust_decimal::Decimal::new(30, 1)),
                &Value::I8(3),
                &rules()
            ),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(
            EqualOperator.execute(&Value::Str("20".into()), &Value::I32(20), &rules()),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            LessThanOperator.execute(&Value::I32(3), &Value::Str("10".into()), &rules()),
            Ok(Value::Bool(true))
        );
        let date = Date::from_ymd(2024, 5, 1, Tz::UTC).unwrap();
        assert_eq!(
            EqualOperator.execute(&Value::Date(date), &Value::Str("2024-05-01".into()), &rules()),
            Ok(Value::Bool(true))
        );
        assert!(matches!(
            EqualOperator.execute(&Value::I32(1), &Value::Str("abc".into()), &rules()),
            Err(Error::Evaluation(_))
        ));
    }

    #[test]
    fn test_strings_compare_lexically() {
        assert_eq!(
            LessThanOperator.execute(&Value::Str("10".into()), &Value::Str("9".into()), &rules()),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_incomparable() {
        assert!(compare(&Value::Bool(true), &Value::I32(1), &rules()).is_err());
    }
}
