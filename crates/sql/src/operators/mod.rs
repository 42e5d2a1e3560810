//! SQL operator implementations
//!
//! Every operator is a unit struct implementing `BinaryOperator` or
//! `UnaryOperator`, so the static result type used for column descriptions
//! and the runtime behavior live side by side.

pub mod traits;

mod arithmetic;
mod comparison;
mod concat;
mod like;
mod logic;

pub use arithmetic::{
    AddOperator, DivideOperator, IdentityOperator, MultiplyOperator, NegateOperator,
    RemainderOperator, SubtractOperator,
};
pub use comparison::{
    EqualOperator, GreaterThanOperator, GreaterThanOrEqualOperator, LessThanOperator,
    LessThanOrEqualOperator, NotEqualOperator, compare, sql_equal,
};
pub use concat::ConcatOperator;
pub use like::{LikePattern, escape_char};
pub use logic::{AndOperator, NotOperator, OrOperator, truth};
pub use traits::{BinaryOperator, UnaryOperator};

pub(crate) use arithmetic::arithmetic_type;
