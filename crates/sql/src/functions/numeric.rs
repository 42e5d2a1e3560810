//! Numeric functions: ABS and ROUND

use super::{numeric_argument, unconvertible};
use crate::error::{Error, Result};
use crate::types::{ExecutionContext, Value};
use rust_decimal::RoundingStrategy;

pub(super) fn abs(value: &Value, context: &ExecutionContext) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let overflow = || Error::Evaluation(format!("numeric overflow: ABS({})", value));
    Ok(match numeric_argument("ABS", value, context)? {
        Value::I8(n) => Value::I32((n as i32).abs()),
        Value::I16(n) => Value::I32((n as i32).abs()),
        Value::I32(n) => Value::I32(n.checked_abs().ok_or_else(overflow)?),
        Value::I64(n) => Value::I64(n.checked_abs().ok_or_else(overflow)?),
        Value::F32(n) => Value::F32(n.abs()),
        Value::F64(n) => Value::F64(n.abs()),
        Value::Decimal(d) => Value::Decimal(d.abs()),
        other => return Err(unconvertible("ABS", &other)),
    })
}

/// ROUND(x [, digits]), rounding half away from zero.
pub(super) fn round(value: &Value, digits: Option<&Value>, context: &ExecutionContext) -> Result<Value> {
    let digits = match digits {
        None => 0,
        Some(Value::Null) => return Ok(Value::Null),
        Some(digits) => digits
            .to_i64()
            .and_then(|d| i32::try_from(d).ok())
            .ok_or_else(|| unconvertible("ROUND", digits))?,
    };
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(match numeric_argument("ROUND", value, context)? {
        n if n.is_integer() && digits >= 0 => n,
        n if n.is_integer() => {
            let factor = 10i64.checked_pow(digits.unsigned_abs()).unwrap_or(i64::MAX);
            let n64 = n.to_i64().unwrap_or_default();
            let rounded = (n64 as f64 / factor as f64).round() as i64 * factor;
            Value::I64(rounded).widen(&n.data_type()).unwrap_or(Value::I64(rounded))
        }
        Value::Decimal(d) => {
            let scale = digits.max(0) as u32;
            Value::Decimal(d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero))
        }
        other => {
            let f = other.to_f64().unwrap_or(f64::NAN);
            let factor = 10f64.powi(digits);
            Value::F64((f * factor).round() / factor)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CancelHandle;
    use flatsql_value::ConversionRules;
    use rust_decimal::Decimal;

    fn with_context<T>(f: impl FnOnce(&ExecutionContext) -> T) -> T {
        let rules = ConversionRules::default();
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(&[], &rules, None, &cancel);
        f(&context)
    }

    #[test]
    fn test_abs() {
        with_context(|context| {
            assert_eq!(abs(&Value::I32(-3), context), Ok(Value::I32(3)));
            assert_eq!(abs(&Value::F64(-1.5), context), Ok(Value::F64(1.5)));
            assert_eq!(abs(&Value::Null, context), Ok(Value::Null));
            assert_eq!(
                abs(&Value::Str("-2.5".into()), context),
                Ok(Value::Decimal(Decimal::new(25, 1)))
            );
            assert!(abs(&Value::Str("abc".into()), context).is_err());
            assert!(abs(&Value::I64(i64::MIN), context).is_err());
        });
    }

    #[test]
    fn test_round() {
        with_context(|context| {
            assert_eq!(round(&Value::F64(2.5), None, context), Ok(Value::F64(3.0)));
            assert_eq!(round(&Value::F64(-2.5), None, context), Ok(Value::F64(-3.0)));
            assert_eq!(
                round(&Value::F64(3.14159), Some(&Value::I32(2)), context),
                Ok(Value::F64(3.14))
            );
            assert_eq!(round(&Value::I32(7), None, context), Ok(Value::I32(7)));
            assert_eq!(
                round(&Value::I32(1250), Some(&Value::I32(-2)), context),
                Ok(Value::I32(1300))
            );
            assert_eq!(
                round(&Value::Decimal(Decimal::new(1235, 3)), Some(&Value::I32(2)), context),
                Ok(Value::Decimal(Decimal::new(124, 2)))
            );
        });
    }
}
