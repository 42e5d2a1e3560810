//! Core traits for SQL operators

use crate::error::Result;
use crate::types::{DataType, Value};
use flatsql_value::ConversionRules;

/// Trait for binary operators (two operands)
pub trait BinaryOperator: Send + Sync {
    /// Get operator name for error messages
    fn name(&self) -> &'static str;

    /// Get operator symbol for display
    fn symbol(&self) -> &'static str;

    /// The static result type for the given operand types, used to describe
    /// output columns. `DataType::Null` when it depends on the values.
    fn result_type(&self, left: &DataType, right: &DataType) -> DataType;

    /// Execute the operation. The rules convert strings compared against
    /// typed values.
    fn execute(&self, left: &Value, right: &Value, rules: &ConversionRules) -> Result<Value>;
}

/// Trait for unary operators (one operand)
pub trait UnaryOperator: Send + Sync {
    fn name(&self) -> &'static str;

    fn symbol(&self) -> &'static str;

    fn result_type(&self, operand: &DataType) -> DataType;

    fn execute(&self, operand: &Value) -> Result<Value>;
}
