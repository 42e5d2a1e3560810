//! Literal parser module
//!
//! Handles parsing of numeric, string, boolean and typed temporal literals.

use super::super::{Keyword, Token};
use super::token_helper::TokenHelper;
use crate::error::{Error, Result};
use crate::parsing::ast::{Expression, Literal};

/// Parser trait for literal values
pub trait LiteralParser: TokenHelper {
    /// Parses a literal value from a token, if it is one.
    fn parse_literal(&mut self, token: &Token) -> Result<Option<Expression>> {
        Ok(Some(
            match token {
                Token::Number(n) => parse_number(n)?,
                Token::String(s) => Literal::String(s.clone()),
                Token::Keyword(Keyword::True) => Literal::Boolean(true),
                Token::Keyword(Keyword::False) => Literal::Boolean(false),
                Token::Keyword(Keyword::Null) => Literal::Null,
                _ => return Ok(None),
            }
            .into(),
        ))
    }

    /// Parses the string following DATE, TIME or TIMESTAMP. The text is
    /// validated against the active conversion rules during planning.
    fn parse_typed_literal(&mut self, kind: &str) -> Result<Expression> {
        let text = match self.next()? {
            Token::String(text) => text,
            token => {
                return Err(Error::Syntax(format!(
                    "expected string after {}, found {}",
                    kind, token
                )));
            }
        };
        Ok(match kind.to_uppercase().as_str() {
            "DATE" => Literal::Date(text),
            "TIME" => Literal::Time(text),
            "TIMESTAMP" => Literal::Timestamp(text),
            other => return Err(Error::Syntax(format!("unknown literal type {}", other))),
        }
        .into())
    }
}

/// Returns true for identifiers that introduce a typed literal.
pub fn is_typed_literal(ident: &str) -> bool {
    matches!(
        ident.to_uppercase().as_str(),
        "DATE" | "TIME" | "TIMESTAMP"
    )
}

/// Parses a numeric literal. Integers that fit are Integer, larger ones and
/// those with an L suffix are Long, anything else is Float.
fn parse_number(n: &str) -> Result<Literal> {
    if let Some(digits) = n.strip_suffix('L') {
        return digits
            .parse::<i64>()
            .map(Literal::Long)
            .map_err(|e| Error::Syntax(format!("invalid long literal {}: {}", n, e)));
    }
    if n.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(value) = n.parse::<i32>() {
            return Ok(Literal::Integer(value));
        }
        if let Ok(value) = n.parse::<i64>() {
            return Ok(Literal::Long(value));
        }
    }
    n.parse::<f64>()
        .map(Literal::Float)
        .map_err(|e| Error::Syntax(format!("invalid number {}: {}", n, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42").unwrap(), Literal::Integer(42));
        assert_eq!(parse_number("42L").unwrap(), Literal::Long(42));
        assert_eq!(parse_number("3000000000").unwrap(), Literal::Long(3_000_000_000));
        assert_eq!(parse_number("2.5").unwrap(), Literal::Float(2.5));
        assert_eq!(parse_number("1e3").unwrap(), Literal::Float(1000.0));
        assert!(parse_number("1.5L").is_err());
    }
}
