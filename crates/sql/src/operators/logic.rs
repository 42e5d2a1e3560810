//! Logical operators with three-valued (Kleene) semantics

use super::traits::{BinaryOperator, UnaryOperator};
use crate::error::{Error, Result};
use crate::types::{DataType, Value};
use flatsql_value::ConversionRules;

/// Reads a boolean operand. NULL is unknown.
pub fn truth(value: &Value, operator: &str) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(Error::Evaluation(format!(
            "{} requires boolean operands, found {}",
            operator,
            other.data_type()
        ))),
    }
}

fn to_value(truth: Option<bool>) -> Value {
    truth.map_or(Value::Null, Value::Bool)
}

pub struct AndOperator;

impl BinaryOperator for AndOperator {
    fn name(&self) -> &'static str {
        "logical AND"
    }

    fn symbol(&self) -> &'static str {
        "AND"
    }

    fn result_type(&self, _left: &DataType, _right: &DataType) -> DataType {
        DataType::Bool
    }

    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        Ok(to_value(match (truth(left, "AND")?, truth(right, "AND")?) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }))
    }
}

pub struct OrOperator;

impl BinaryOperator for OrOperator {
    fn name(&self) -> &'static str {
        "logical OR"
    }

    fn symbol(&self) -> &'static str {
        "OR"
    }

    fn result_type(&self, _left: &DataType, _right: &DataType) -> DataType {
        DataType::Bool
    }

    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        Ok(to_value(match (truth(left, "OR")?, truth(right, "OR")?) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        }))
    }
}

pub struct NotOperator;

impl UnaryOperator for NotOperator {
    fn name(&self) -> &'static str {
        "logical NOT"
    }

    fn symbol(&self) -> &'static str {
        "NOT"
    }

    fn result_type(&self, _operand: &DataType) -> DataType {
        DataType::Bool
    }

    fn execute(&self, operand: &Value) -> Result<Value> {
        Ok(to_value(truth(operand, "NOT")?.map(|b| !b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kleene_truth_tables() {
        let rules = ConversionRules::default();
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        let n = Value::Null;

        assert_eq!(AndOperator.execute(&t, &n, &rules), Ok(Value::Null));
        assert_eq!(AndOperator.execute(&f, &n, &rules), Ok(f.clone()));
        assert_eq!(AndOperator.execute(&n, &f, &rules), Ok(f.clone()));
        assert_eq!(AndOperator.execute(&t, &t, &rules), Ok(t.clone()));

        assert_eq!(OrOperator.execute(&t, &n, &rules), Ok(t.clone()));
        assert_eq!(OrOperator.execute(&n, &f, &rules), Ok(Value::Null));
        assert_eq!(OrOperator.execute(&f, &f, &rules), Ok(f.clone()));

        assert_eq!(NotOperator.execute(&n), Ok(Value::Null));
        assert_eq!(NotOperator.execute(&t), Ok(f));
    }

    #[test]
    fn test_non_boolean_operand() {
        assert!(NotOperator.execute(&Value::I32(1)).is_err());
    }
}
