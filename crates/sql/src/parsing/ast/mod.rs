//! Abstract Syntax Tree (AST) for SELECT statements
//!
//! The AST only describes syntax. Whether tables and columns exist, and
//! whether GROUP BY is used consistently, is decided by the planner.

pub mod expressions;
pub mod select;

pub use expressions::{Expression, Literal, Operator};
pub use select::{Direction, FromClause, SelectStatement};

/// A parsed statement. Only queries are supported.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<SelectStatement>),
}

impl Statement {
    pub fn parameter_count(&self) -> usize {
        match self {
            Statement::Select(select) => select.parameter_count(),
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Select(select) => select.fmt(f),
        }
    }
}
