//! String concatenation operator (||)

use super::traits::BinaryOperator;
use crate::error::Result;
use crate::types::{DataType, Value};
use flatsql_value::ConversionRules;

pub struct ConcatOperator;

impl BinaryOperator for ConcatOperator {
    fn name(&self) -> &'static str {
        "concatenation"
    }

    fn symbol(&self) -> &'static str {
        "||"
    }

    fn result_type(&self, _left: &DataType, _right: &DataType) -> DataType {
        DataType::Str
    }

    /// Any value concatenates by its text form; NULL makes the result NULL.
    fn execute(&self, left: &Value, right: &Value, _rules: &ConversionRules) -> Result<Value> {
        Ok(match (left, right) {
            (Value::Null, _) | (_, Value::Null) => Value::Null,
            (left, right) => Value::Str(format!("{}{}", left, right)),
        })
    }
}
