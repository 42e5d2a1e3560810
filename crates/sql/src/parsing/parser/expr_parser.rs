//! Expression parser module
//!
//! Handles parsing of SQL expressions with operator precedence, function
//! calls, CASE, subqueries and the multi-token postfix predicates
//! (IS [NOT] NULL, [NOT] IN, [NOT] BETWEEN, [NOT] LIKE).

use super::super::{Keyword, Token};
use super::literal_parser::{LiteralParser, is_typed_literal};
use crate::error::{Error, Result};
use crate::parsing::ast::{Expression, Operator, SelectStatement};
use std::ops::Add;

/// Operator precedence.
pub type Precedence = u8;

/// Precedence of the comparison-level postfix predicates.
const PREDICATE_PRECEDENCE: Precedence = 4;

/// Operator associativity.
pub enum Associativity {
    Left,
    Right,
}

impl Add<Associativity> for Precedence {
    type Output = Self;

    fn add(self, rhs: Associativity) -> Self {
        // Left-associative operators have increased precedence, so they bind
        // tighter to their left-hand side.
        self + match rhs {
            Associativity::Left => 1,
            Associativity::Right => 0,
        }
    }
}

/// Prefix operators.
pub enum PrefixOperator {
    Minus, // -a
    Not,   // NOT a
    Plus,  // +a
}

impl PrefixOperator {
    /// The operator precedence.
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Not => 3,
            Self::Minus | Self::Plus => 9,
        }
    }

    // Prefix operators are right-associative by definition.
    pub fn associativity(&self) -> Associativity {
        Associativity::Right
    }

    /// Builds an AST expression for the operator.
    pub fn into_expression(self, rhs: Expression) -> Expression {
        let rhs = Box::new(rhs);
        match self {
            Self::Plus => Operator::Identity(rhs).into(),
            Self::Minus => Operator::Negate(rhs).into(),
            Self::Not => Operator::Not(rhs).into(),
        }
    }
}

/// Infix operators.
pub enum InfixOperator {
    Add,                // a + b
    And,                // a AND b
    Concat,             // a || b
    Divide,             // a / b
    Equal,              // a = b
    GreaterThan,        // a > b
    GreaterThanOrEqual, // a >= b
    LessThan,           // a < b
    LessThanOrEqual,    // a <= b
    Multiply,           // a * b
    NotEqual,           // a != b, a <> b
    Or,                 // a OR b
    Remainder,          // a % b
    Subtract,           // a - b
}

impl InfixOperator {
    /// The operator precedence. Equality shares its level with IS, IN,
    /// BETWEEN and LIKE; ordering comparisons bind tighter.
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Or => 1,
            Self::And => 2,
            // Self::Not => 3
            Self::Equal | Self::NotEqual => PREDICATE_PRECEDENCE,
            Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::LessThan
            | Self::LessThanOrEqual => 5,
            Self::Concat => 6,
            Self::Add | Self::Subtract => 7,
            Self::Multiply | Self::Divide | Self::Remainder => 8,
        }
    }

    /// The operator associativity.
    pub fn associativity(&self) -> Associativity {
        Associativity::Left
    }

    /// Builds an AST expression for the infix operator.
    pub fn into_expression(self, lhs: Expression, rhs: Expression) -> Expression {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match self {
            Self::Add => Operator::Add(lhs, rhs).into(),
            Self::And => Operator::And(lhs, rhs).into(),
            Self::Concat => Operator::Concat(lhs, rhs).into(),
            Self::Divide => Operator::Divide(lhs, rhs).into(),
            Self::Equal => Operator::Equal(lhs, rhs).into(),
            Self::GreaterThan => Operator::GreaterThan(lhs, rhs).into(),
            Self::GreaterThanOrEqual => Operator::GreaterThanOrEqual(lhs, rhs).into(),
            Self::LessThan => Operator::LessThan(lhs, rhs).into(),
            Self::LessThanOrEqual => Operator::LessThanOrEqual(lhs, rhs).into(),
            Self::Multiply => Operator::Multiply(lhs, rhs).into(),
            Self::NotEqual => Operator::NotEqual(lhs, rhs).into(),
            Self::Or => Operator::Or(lhs, rhs).into(),
            Self::Remainder => Operator::Remainder(lhs, rhs).into(),
            Self::Subtract => Operator::Subtract(lhs, rhs).into(),
        }
    }
}

/// Postfix operators. All of them sit at the equality precedence level.
pub enum PostfixOperator {
    IsNull(bool),                                  // a IS [NOT] NULL
    InList(Vec<Expression>, bool),                 // a [NOT] IN (list)
    InSubquery(SelectStatement, bool),             // a [NOT] IN (SELECT ...)
    Between(Expression, Expression, bool),         // a [NOT] BETWEEN low AND high
    Like(Expression, Option<Expression>, bool),    // a [NOT] LIKE pattern [ESCAPE e]
}

impl PostfixOperator {
    /// Builds an AST expression for the operator.
    pub fn into_expression(self, lhs: Expression) -> Expression {
        let expr = Box::new(lhs);
        match self {
            Self::IsNull(negated) => Operator::IsNull { expr, negated }.into(),
            Self::InList(list, negated) => Operator::InList {
                expr,
                list,
                negated,
            }
            .into(),
            Self::InSubquery(subquery, negated) => Operator::InSubquery {
                expr,
                subquery: Box::new(subquery),
                negated,
            }
            .into(),
            Self::Between(low, high, negated) => Operator::Between {
                expr,
                low: Box::new(low),
                high: Box::new(high),
                negated,
            }
            .into(),
            Self::Like(pattern, escape, negated) => Operator::Like {
                expr,
                pattern: Box::new(pattern),
                escape: escape.map(Box::new),
                negated,
            }
            .into(),
        }
    }
}

/// Parser trait for expressions
pub trait ExpressionParser: LiteralParser {
    /// Allocates the index of the next `?` placeholder.
    fn next_parameter(&mut self) -> usize;

    /// Parses a SELECT statement, used for subqueries.
    fn parse_select_statement(&mut self) -> Result<SelectStatement>;

    /// Parses an expression using precedence climbing. Operators of higher
    /// precedence bind tighter; the right-hand side of an infix operator is
    /// parsed at a minimum precedence one above its own for left-associative
    /// operators.
    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_expression_at(0)
    }

    /// Parses an expression at the given minimum precedence.
    fn parse_expression_at(&mut self, min_precedence: Precedence) -> Result<Expression> {
        // If the left-hand side is a prefix operator, recursively parse it and
        // its operand. Otherwise, parse the left-hand side as an atom.
        let mut lhs = if let Some(prefix) = self.parse_prefix_operator_at(min_precedence) {
            let next_precedence = prefix.precedence() + prefix.associativity();
            let rhs = self.parse_expression_at(next_precedence)?;
            prefix.into_expression(rhs)
        } else {
            self.parse_expression_atom()?
        };

        // Apply any postfix operators to the left-hand side.
        while let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
            lhs = postfix.into_expression(lhs)
        }

        // Repeatedly apply any infix operators to the left-hand side as long as
        // their precedence is greater than or equal to the current minimum
        // precedence.
        while let Some(infix) = self.parse_infix_operator_at(min_precedence) {
            let next_precedence = infix.precedence() + infix.associativity();
            let rhs = self.parse_expression_at(next_precedence)?;
            lhs = infix.into_expression(lhs, rhs);

            // Postfix predicates after a binary operator, e.g. 1 + NULL IS NULL.
            while let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
                lhs = postfix.into_expression(lhs)
            }
        }

        Ok(lhs)
    }

    /// Parses an expression atom: a literal, a column, a function call, a
    /// placeholder, CASE, EXISTS, a subquery or a parenthesized expression.
    fn parse_expression_atom(&mut self) -> Result<Expression> {
        let token = self.next()?;
        if let Some(literal) = self.parse_literal(&token)? {
            return Ok(literal);
        }
        Ok(match token {
            // All columns.
            Token::Asterisk => Expression::All,

            Token::Keyword(Keyword::Case) => self.parse_case()?,

            Token::Keyword(Keyword::Exists) => {
                self.expect(Token::OpenParen)?;
                let select = self.parse_select_statement()?;
                self.expect_close_paren()?;
                Expression::Exists(Box::new(select))
            }

            // DATE '2024-01-31' and friends.
            Token::Ident(kind)
                if is_typed_literal(&kind) && matches!(self.peek(), Ok(Some(Token::String(_)))) =>
            {
                self.parse_typed_literal(&kind)?
            }

            // Function call.
            Token::Ident(name) if self.next_is(Token::OpenParen) => self.parse_function(name)?,

            // Niladic temporal functions may omit the parentheses.
            Token::Ident(name)
                if matches!(
                    name.to_uppercase().as_str(),
                    "CURRENT_DATE" | "CURRENT_TIME" | "CURRENT_TIMESTAMP"
                ) && !matches!(self.peek(), Ok(Some(Token::Period))) =>
            {
                Expression::Function {
                    name,
                    args: Vec::new(),
                    distinct: false,
                }
            }

            // Column name, either qualified as table.column or unqualified.
            Token::Ident(table) if self.next_is(Token::Period) => {
                if self.next_is(Token::Asterisk) {
                    Expression::QualifiedAll(table)
                } else {
                    Expression::Column(Some(table), self.next_ident()?)
                }
            }
            Token::Ident(column) => Expression::Column(None, column),

            Token::Question => Expression::Parameter(self.next_parameter()),

            // Parenthesized expression or scalar subquery.
            Token::OpenParen => {
                let expr = if self.peek_keyword(Keyword::Select) {
                    Expression::Subquery(Box::new(self.parse_select_statement()?))
                } else {
                    self.parse_expression()?
                };
                self.expect_close_paren()?;
                expr
            }

            token => {
                return Err(Error::Syntax(format!(
                    "expected expression atom, found {}",
                    token
                )));
            }
        })
    }

    /// Parses the arguments of a function call, after the opening parenthesis.
    fn parse_function(&mut self, name: String) -> Result<Expression> {
        if self.next_is(Token::Asterisk) {
            self.expect_close_paren()?;
            return Ok(Expression::Function {
                name,
                args: vec![Expression::All],
                distinct: false,
            });
        }
        let distinct = self.next_is(Keyword::Distinct.into());
        let mut args = Vec::new();
        if !self.next_is(Token::CloseParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect_close_paren()?;
        }
        if distinct && args.is_empty() {
            return Err(Error::Syntax(format!(
                "expected argument after DISTINCT in {}",
                name
            )));
        }
        Ok(Expression::Function {
            name,
            args,
            distinct,
        })
    }

    /// Parses a CASE expression, after the CASE keyword.
    fn parse_case(&mut self) -> Result<Expression> {
        let operand = if self.peek_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let mut when_clauses = Vec::new();
        while self.next_is(Keyword::When.into()) {
            let when = self.parse_expression()?;
            self.expect(Keyword::Then.into())?;
            let then = self.parse_expression()?;
            when_clauses.push((when, then));
        }
        if when_clauses.is_empty() {
            return Err(Error::Syntax("CASE requires at least one WHEN clause".into()));
        }

        let else_clause = if self.next_is(Keyword::Else.into()) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(Keyword::End.into())?;

        Ok(Expression::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parses a prefix operator, if there is one and its precedence is at least
    /// min_precedence.
    fn parse_prefix_operator_at(&mut self, min_precedence: Precedence) -> Option<PrefixOperator> {
        self.next_if_map(|token| {
            let operator = match token {
                Token::Keyword(Keyword::Not) => PrefixOperator::Not,
                Token::Minus => PrefixOperator::Minus,
                Token::Plus => PrefixOperator::Plus,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses an infix operator, if there is one and its precedence is at least
    /// min_precedence.
    fn parse_infix_operator_at(&mut self, min_precedence: Precedence) -> Option<InfixOperator> {
        self.next_if_map(|token| {
            let operator = match token {
                Token::Asterisk => InfixOperator::Multiply,
                Token::Concat => InfixOperator::Concat,
                Token::Equal => InfixOperator::Equal,
                Token::GreaterThan => InfixOperator::GreaterThan,
                Token::GreaterThanOrEqual => InfixOperator::GreaterThanOrEqual,
                Token::Keyword(Keyword::And) => InfixOperator::And,
                Token::Keyword(Keyword::Or) => InfixOperator::Or,
                Token::LessOrGreaterThan => InfixOperator::NotEqual,
                Token::LessThan => InfixOperator::LessThan,
                Token::LessThanOrEqual => InfixOperator::LessThanOrEqual,
                Token::Minus => InfixOperator::Subtract,
                Token::NotEqual => InfixOperator::NotEqual,
                Token::Percent => InfixOperator::Remainder,
                Token::Plus => InfixOperator::Add,
                Token::Slash => InfixOperator::Divide,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses a postfix predicate, if there is one and the predicate level is
    /// at least min_precedence. These span several tokens, so nothing is
    /// consumed unless the precedence is satisfied.
    fn parse_postfix_operator_at(
        &mut self,
        min_precedence: Precedence,
    ) -> Result<Option<PostfixOperator>> {
        if PREDICATE_PRECEDENCE < min_precedence {
            return Ok(None);
        }
        let bound = PREDICATE_PRECEDENCE + 1;

        if self.next_is(Keyword::Is.into()) {
            let negated = self.next_is(Keyword::Not.into());
            self.expect(Keyword::Null.into())?;
            return Ok(Some(PostfixOperator::IsNull(negated)));
        }

        let negated = match self.peek()? {
            Some(Token::Keyword(Keyword::Not)) => {
                self.next()?;
                true
            }
            Some(Token::Keyword(Keyword::In | Keyword::Between | Keyword::Like)) => false,
            _ => return Ok(None),
        };

        match self.next()? {
            Token::Keyword(Keyword::In) => {
                self.expect(Token::OpenParen)?;
                if self.peek_keyword(Keyword::Select) {
                    let subquery = self.parse_select_statement()?;
                    self.expect_close_paren()?;
                    return Ok(Some(PostfixOperator::InSubquery(subquery, negated)));
                }
                if self.next_is(Token::CloseParen) {
                    return Err(Error::Syntax("empty IN list".into()));
                }
                let mut list = vec![self.parse_expression()?];
                while self.next_is(Token::Comma) {
                    list.push(self.parse_expression()?);
                }
                self.expect_close_paren()?;
                Ok(Some(PostfixOperator::InList(list, negated)))
            }
            Token::Keyword(Keyword::Between) => {
                let low = self.parse_expression_at(bound)?;
                self.expect(Keyword::And.into())?;
                let high = self.parse_expression_at(bound)?;
                Ok(Some(PostfixOperator::Between(low, high, negated)))
            }
            Token::Keyword(Keyword::Like) => {
                let pattern = self.parse_expression_at(bound)?;
                let escape = if self.next_is(Keyword::Escape.into()) {
                    Some(self.parse_expression_at(bound)?)
                } else {
                    None
                };
                Ok(Some(PostfixOperator::Like(pattern, escape, negated)))
            }
            token => Err(Error::Syntax(format!(
                "expected IN, BETWEEN or LIKE after NOT, found {}",
                token
            ))),
        }
    }
}
