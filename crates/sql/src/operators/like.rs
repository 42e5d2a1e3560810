//! LIKE pattern matching
//!
//! `%` matches any run of characters and `_` exactly one. An optional escape
//! character makes the following character literal. Patterns are translated
//! to anchored regular expressions.

use crate::error::{Error, Result};
use regex::Regex;

/// A compiled LIKE pattern.
#[derive(Clone, Debug)]
pub struct LikePattern {
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: &str, escape: Option<char>) -> Result<Self> {
        let regex = Regex::new(&to_regex(pattern, escape)?)
            .map_err(|e| Error::Evaluation(format!("invalid LIKE pattern '{}': {}", pattern, e)))?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Reads an ESCAPE operand, which must be a single character.
pub fn escape_char(escape: &str) -> Result<char> {
    let mut chars = escape.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::Evaluation(format!(
            "ESCAPE must be a single character, found '{}'",
            escape
        ))),
    }
}

fn to_regex(pattern: &str, escape: Option<char>) -> Result<String> {
    let mut regex = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            let literal = chars.next().ok_or_else(|| {
                Error::Evaluation(format!("LIKE pattern '{}' ends with its escape character", pattern))
            })?;
            regex.push_str(&regex::escape(&literal.to_string()));
            continue;
        }
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    Ok(regex)
}
