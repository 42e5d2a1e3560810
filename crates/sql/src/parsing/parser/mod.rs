//! Modular SQL parser implementation
//!
//! The parser is split into several modules:
//! - expr_parser: Expression parsing with operator precedence
//! - select_parser: SELECT statement clauses
//! - literal_parser: Literal value parsing
//! - token_helper: Base trait for token navigation

pub mod expr_parser;
pub mod literal_parser;
pub mod select_parser;
pub mod token_helper;

use std::iter::Peekable;

use self::expr_parser::ExpressionParser;
use self::literal_parser::LiteralParser;
use self::select_parser::SelectParser;
use self::token_helper::TokenHelper;
use super::ast::{Expression, SelectStatement, Statement};
use super::{Keyword, Lexer, Token};
use crate::error::{Error, Result};

/// The SQL parser takes tokens from the lexer and parses the SQL syntax into an
/// Abstract Syntax Tree (AST).
///
/// The AST only ensures the syntax is well-formed. It does not know whether
/// a table or column exists; that is the job of the planner.
pub struct Parser<'a> {
    pub lexer: Peekable<Lexer<'a>>,
    /// Counter for parameter placeholders (?)
    param_count: usize,
}

impl Parser<'_> {
    /// Parses the input string into a SQL statement AST. The entire string must
    /// be parsed as a single statement, ending with an optional semicolon.
    pub fn parse(statement: &str) -> Result<Statement> {
        let mut parser = Self::new(statement);
        let statement = parser.parse_statement()?;
        parser.skip(Token::Semicolon);
        parser.expect_end()?;
        Ok(statement)
    }

    /// Parses `;`-separated statements. Empty segments are skipped. Placeholders
    /// are numbered per statement.
    pub fn parse_script(script: &str) -> Result<Vec<Statement>> {
        let mut parser = Self::new(script);
        let mut statements = Vec::new();
        loop {
            while parser.next_is(Token::Semicolon) {}
            if parser.peek()?.is_none() {
                break;
            }
            parser.param_count = 0;
            statements.push(parser.parse_statement()?);
            if !parser.next_is(Token::Semicolon) {
                parser.expect_end()?;
                break;
            }
        }
        Ok(statements)
    }

    /// Creates a new parser for the given string.
    pub fn new(input: &str) -> Parser<'_> {
        Parser {
            lexer: Lexer::new(input).peekable(),
            param_count: 0,
        }
    }

    /// Errors unless all input has been consumed.
    fn expect_end(&mut self) -> Result<()> {
        match self.lexer.next().transpose()? {
            None => Ok(()),
            Some(Token::CloseParen) => Err(Error::Syntax(
                "unbalanced parenthesis: unexpected )".into(),
            )),
            Some(token) => Err(Error::Syntax(format!("unexpected token {}", token))),
        }
    }

    /// Fetches the next lexer token, or errors if none is found.
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .transpose()?
            .ok_or_else(|| Error::Syntax("unexpected end of input".into()))
    }

    /// Returns the next identifier, or errors if not found.
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::Syntax(format!(
                "expected identifier, found {}",
                token
            ))),
        }
    }

    /// Returns the next lexer token if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.peek().ok()?.filter(|&t| predicate(t))?;
        self.next().ok()
    }

    /// Passes the next lexer token through the closure, consuming it if the
    /// closure returns Some. Returns the result of the closure.
    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        let value = f(self.peek().ok()??)?;
        self.next().ok()?;
        Some(value)
    }

    /// Consumes the next lexer token if it is the given token, returning true.
    fn next_is(&mut self, token: Token) -> bool {
        self.next_if(|t| t == &token).is_some()
    }

    /// Consumes the next lexer token if it's the expected token, or errors.
    fn expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Syntax(format!(
                "expected {}, found {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Peeks the next lexer token if any, without consuming it.
    fn peek(&mut self) -> Result<Option<&Token>> {
        self.lexer
            .peek()
            .map(|result| result.as_ref().map(Some).map_err(|e| e.clone()))
            .unwrap_or(Ok(None))
    }

    /// Parses a SQL statement.
    pub fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Select)) => {
                Ok(Statement::Select(Box::new(self.parse_select()?)))
            }
            Some(_) => {
                let token = self.next()?;
                Err(Error::Syntax(format!(
                    "expected SELECT statement, found {}",
                    token
                )))
            }
            None => Err(Error::Syntax("empty statement".into())),
        }
    }
}

// Implement TokenHelper trait for Parser
impl TokenHelper for Parser<'_> {
    fn next(&mut self) -> Result<Token> {
        self.next()
    }

    fn next_ident(&mut self) -> Result<String> {
        self.next_ident()
    }

    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.next_if(predicate)
    }

    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        self.next_if_map(f)
    }

    fn next_is(&mut self, token: Token) -> bool {
        self.next_is(token)
    }

    fn expect(&mut self, expect: Token) -> Result<()> {
        self.expect(expect)
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        self.peek()
    }
}

// Implement LiteralParser trait for Parser
impl LiteralParser for Parser<'_> {}

// Implement ExpressionParser trait for Parser
impl ExpressionParser for Parser<'_> {
    fn next_parameter(&mut self) -> usize {
        let index = self.param_count;
        self.param_count += 1;
        index
    }

    fn parse_select_statement(&mut self) -> Result<SelectStatement> {
        SelectParser::parse_select(self)
    }
}

// Implement SelectParser trait for Parser
impl SelectParser for Parser<'_> {
    fn parse_expression(&mut self) -> Result<Expression> {
        ExpressionParser::parse_expression(self)
    }
}
