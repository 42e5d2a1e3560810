//! The bound data model: values, bound expressions and evaluation state.

pub mod context;
pub mod expression;

pub use context::{CancelHandle, ExecutionContext, GroupValues, RowEnvironment};
pub use expression::Expression;
pub use flatsql_value::{DataType, Row, Value};
