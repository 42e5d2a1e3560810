//! SQL parsing: text to statement AST
//!
//! The grammar covers single-table SELECT statements with WHERE, GROUP BY,
//! HAVING, ORDER BY, LIMIT/OFFSET and scalar, IN and EXISTS subqueries.

pub mod ast;
pub mod caching_parser;
mod lexer;
mod parser;

use crate::error::Result;

pub use ast::{Expression, Statement};
pub use caching_parser::CachingParser;
pub use lexer::{Keyword, Lexer, Token};
pub use parser::Parser;

/// Parse a SQL statement string into an AST
pub fn parse_sql(sql: &str) -> Result<Statement> {
    Parser::parse(sql)
}
