//! SQL lexer
//!
//! Turns statement text into a stream of tokens. Unquoted identifiers keep
//! their spelling (names resolve case-insensitively later); quoted identifiers
//! may also contain spaces and other special characters.

use crate::error::{Error, Result};
use std::fmt::Display;
use std::iter::Peekable;
use std::str::Chars;

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A numeric literal, with an optional `L` suffix kept in the text.
    Number(String),
    /// A string literal, with quotes removed and escapes resolved.
    String(String),
    /// An identifier, quoted or not.
    Ident(String),
    Keyword(Keyword),
    Period,             // .
    Equal,              // =
    NotEqual,           // !=
    LessOrGreaterThan,  // <>
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    LessThan,           // <
    LessThanOrEqual,    // <=
    Plus,               // +
    Minus,              // -
    Asterisk,           // *
    Slash,              // /
    Percent,            // %
    Concat,             // ||
    Question,           // ?
    OpenParen,          // (
    CloseParen,         // )
    Comma,              // ,
    Semicolon,          // ;
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Number(n) => n,
            Self::String(s) => return write!(f, "'{}'", s.replace('\'', "''")),
            Self::Ident(s) => s,
            Self::Keyword(k) => return k.fmt(f),
            Self::Period => ".",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessOrGreaterThan => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Concat => "||",
            Self::Question => "?",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::Comma => ",",
            Self::Semicolon => ";",
        })
    }
}

impl From<Keyword> for Token {
    fn from(keyword: Keyword) -> Self {
        Self::Keyword(keyword)
    }
}

/// Reserved keywords. Anything else lexes as an identifier, so e.g. DATE and
/// COUNT remain usable as column names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    And,
    As,
    Asc,
    Between,
    By,
    Case,
    Cross,
    Desc,
    Distinct,
    Else,
    End,
    Escape,
    Exists,
    False,
    From,
    Full,
    Group,
    Having,
    In,
    Inner,
    Is,
    Join,
    Left,
    Like,
    Limit,
    Not,
    Null,
    Offset,
    On,
    Or,
    Order,
    Outer,
    Right,
    Select,
    Then,
    True,
    When,
    Where,
}

impl TryFrom<&str> for Keyword {
    type Error = &'static str;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Ok(match value.to_uppercase().as_ref() {
            "AND" => Self::And,
            "AS" => Self::As,
            "ASC" => Self::Asc,
            "BETWEEN" => Self::Between,
            "BY" => Self::By,
            "CASE" => Self::Case,
            "CROSS" => Self::Cross,
            "DESC" => Self::Desc,
            "DISTINCT" => Self::Distinct,
            "ELSE" => Self::Else,
            "END" => Self::End,
            "ESCAPE" => Self::Escape,
            "EXISTS" => Self::Exists,
            "FALSE" => Self::False,
            "FROM" => Self::From,
            "FULL" => Self::Full,
            "GROUP" => Self::Group,
            "HAVING" => Self::Having,
            "IN" => Self::In,
            "INNER" => Self::Inner,
            "IS" => Self::Is,
            "JOIN" => Self::Join,
            "LEFT" => Self::Left,
            "LIKE" => Self::Like,
            "LIMIT" => Self::Limit,
            "NOT" => Self::Not,
            "NULL" => Self::Null,
            "OFFSET" => Self::Offset,
            "ON" => Self::On,
            "OR" => Self::Or,
            "ORDER" => Self::Order,
            "OUTER" => Self::Outer,
            "RIGHT" => Self::Right,
            "SELECT" => Self::Select,
            "THEN" => Self::Then,
            "TRUE" => Self::True,
            "WHEN" => Self::When,
            "WHERE" => Self::Where,
            _ => return Err("not a keyword"),
        })
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::As => "AS",
            Self::Asc => "ASC",
            Self::Between => "BETWEEN",
            Self::By => "BY",
            Self::Case => "CASE",
            Self::Cross => "CROSS",
            Self::Desc => "DESC",
            Self::Distinct => "DISTINCT",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Escape => "ESCAPE",
            Self::Exists => "EXISTS",
            Self::False => "FALSE",
            Self::From => "FROM",
            Self::Full => "FULL",
            Self::Group => "GROUP",
            Self::Having => "HAVING",
            Self::In => "IN",
            Self::Inner => "INNER",
            Self::Is => "IS",
            Self::Join => "JOIN",
            Self::Left => "LEFT",
            Self::Like => "LIKE",
            Self::Limit => "LIMIT",
            Self::Not => "NOT",
            Self::Null => "NULL",
            Self::Offset => "OFFSET",
            Self::On => "ON",
            Self::Or => "OR",
            Self::Order => "ORDER",
            Self::Outer => "OUTER",
            Self::Right => "RIGHT",
            Self::Select => "SELECT",
            Self::Then => "THEN",
            Self::True => "TRUE",
            Self::When => "WHEN",
            Self::Where => "WHERE",
        })
    }
}

/// The lexer is an iterator over tokens. Errors end the useful part of the
/// stream; callers stop at the first one.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Result<Token>> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => self
                .chars
                .peek()
                .map(|c| Err(Error::Syntax(format!("unexpected character {}", c)))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn next_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        self.chars.peek().filter(|&&c| predicate(c))?;
        self.chars.next()
    }

    fn next_is(&mut self, c: char) -> bool {
        self.next_if(|n| n == c).is_some()
    }

    /// Scans the next token, if any. Returns None at end of input, or when
    /// the next character starts no token.
    fn scan(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments()?;
        match self.chars.peek() {
            Some('\'') => self.scan_string().map(Some),
            Some('"') => self.scan_quoted_ident().map(Some),
            Some(c) if c.is_ascii_digit() => Ok(Some(self.scan_number())),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(Some(self.scan_ident_or_keyword())),
            Some(_) => self.scan_symbol(),
            None => Ok(None),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            while self.next_if(char::is_whitespace).is_some() {}
            let mut lookahead = self.chars.clone();
            match (lookahead.next(), lookahead.next()) {
                (Some('-'), Some('-')) => {
                    while self.next_if(|c| c != '\n').is_some() {}
                }
                (Some('/'), Some('*')) => {
                    self.chars.next();
                    self.chars.next();
                    self.skip_block_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Skips the body of a block comment. Block comments do not nest.
    fn skip_block_comment(&mut self) -> Result<()> {
        loop {
            match self.chars.next() {
                Some('*') if self.next_is('/') => return Ok(()),
                Some('/') if self.chars.peek() == Some(&'*') => {
                    return Err(Error::Syntax("nested block comment".into()));
                }
                Some(_) => {}
                None => return Err(Error::Syntax("unterminated block comment".into())),
            }
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            name.push(c);
        }
        match Keyword::try_from(name.as_str()) {
            Ok(keyword) => Token::Keyword(keyword),
            Err(_) => Token::Ident(name),
        }
    }

    /// Scans a double-quoted identifier. A doubled quote is a literal quote.
    fn scan_quoted_ident(&mut self) -> Result<Token> {
        self.chars.next();
        let mut ident = String::new();
        loop {
            match self.chars.next() {
                Some('"') if self.next_is('"') => ident.push('"'),
                Some('"') => break,
                Some(c) => ident.push(c),
                None => return Err(Error::Syntax("unterminated quoted identifier".into())),
            }
        }
        Ok(Token::Ident(ident))
    }

    /// Scans a number: digits, an optional fraction, an optional exponent and
    /// an optional L suffix marking a long.
    fn scan_number(&mut self) -> Token {
        let mut number = String::new();
        while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
            number.push(c);
        }
        let mut lookahead = self.chars.clone();
        if lookahead.next() == Some('.') && lookahead.peek().is_some_and(|c| c.is_ascii_digit())
        {
            number.push('.');
            self.chars.next();
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                number.push(c);
            }
        }
        let mut lookahead = self.chars.clone();
        if matches!(lookahead.next(), Some('e' | 'E')) {
            let sign = lookahead.next_if(|c| *c == '+' || *c == '-');
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                number.push('e');
                self.chars.next();
                if let Some(sign) = sign {
                    number.push(sign);
                    self.chars.next();
                }
                while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                    number.push(c);
                }
            }
        }
        if let Some(c) = self.next_if(|c| c == 'L' || c == 'l') {
            number.push(c.to_ascii_uppercase());
        }
        Token::Number(number)
    }

    /// Scans a single-quoted string. A doubled quote is a literal quote.
    fn scan_string(&mut self) -> Result<Token> {
        self.chars.next();
        let mut string = String::new();
        loop {
            match self.chars.next() {
                Some('\'') if self.next_is('\'') => string.push('\''),
                Some('\'') => break,
                Some(c) => string.push(c),
                None => return Err(Error::Syntax("unterminated string literal".into())),
            }
        }
        Ok(Token::String(string))
    }

    fn scan_symbol(&mut self) -> Result<Option<Token>> {
        let Some(c) = self.chars.peek().copied() else {
            return Ok(None);
        };
        let token = match c {
            '.' => Token::Period,
            '=' => Token::Equal,
            '>' => Token::GreaterThan,
            '<' => Token::LessThan,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '?' => Token::Question,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '!' | '|' => {
                self.chars.next();
                return match (c, self.chars.next()) {
                    ('!', Some('=')) => Ok(Some(Token::NotEqual)),
                    ('|', Some('|')) => Ok(Some(Token::Concat)),
                    _ => Err(Error::Syntax(format!("unexpected character {}", c))),
                };
            }
            _ => return Ok(None),
        };
        self.chars.next();
        Ok(Some(match token {
            Token::GreaterThan if self.next_is('=') => Token::GreaterThanOrEqual,
            Token::LessThan if self.next_is('=') => Token::LessThanOrEqual,
            Token::LessThan if self.next_is('>') => Token::LessOrGreaterThan,
            token => token,
        }))
    }
}
