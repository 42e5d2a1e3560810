//! Cursor operations over the token stream shared by the grammar traits

use super::super::{Keyword, Token};
use crate::error::{Error, Result};

/// Token access for the recursive-descent parser. The expression, literal
/// and SELECT grammars build on these.
pub trait TokenHelper {
    /// The next token; running out of input is a syntax error.
    fn next(&mut self) -> Result<Token>;

    /// The next token as an identifier name.
    fn next_ident(&mut self) -> Result<String>;

    /// Consumes the next token when `predicate` holds for it.
    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token>;

    /// Consumes the next token when `f` maps it to Some.
    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T>;

    /// Consumes `token` if it comes next.
    fn next_is(&mut self, token: Token) -> bool;

    /// Consumes `expect` or fails with a syntax error naming what was found.
    fn expect(&mut self, expect: Token) -> Result<()>;

    fn peek(&mut self) -> Result<Option<&Token>>;

    /// Optional punctuation.
    fn skip(&mut self, token: Token) {
        self.next_is(token);
    }

    fn peek_keyword(&mut self, keyword: Keyword) -> bool {
        matches!(self.peek(), Ok(Some(Token::Keyword(k))) if *k == keyword)
    }

    /// Consumes a closing parenthesis, reporting a missing one as unbalanced.
    fn expect_close_paren(&mut self) -> Result<()> {
        let found = match self.peek()? {
            Some(Token::CloseParen) => None,
            Some(token) => Some(token.to_string()),
            None => Some("end of input".to_string()),
        };
        match found {
            None => self.expect(Token::CloseParen),
            Some(found) => Err(Error::Syntax(format!(
                "unbalanced parenthesis: expected ), found {}",
                found
            ))),
        }
    }
}
