//! SELECT statement parser module
//!
//! Handles the clauses of a SELECT statement. Joins are rejected here; a
//! derived table in FROM parses and is left for the planner to reject.

use super::super::{Keyword, Token};
use super::token_helper::TokenHelper;
use crate::error::{Error, Result};
use crate::parsing::ast::{Direction, Expression, FromClause, SelectStatement};

/// Type alias for SELECT clause parsing result: (distinct, select_expressions)
type SelectClauseResult = (bool, Vec<(Expression, Option<String>)>);

/// Parser trait for SELECT statements
pub trait SelectParser: TokenHelper {
    /// Parses an expression
    fn parse_expression(&mut self) -> Result<Expression>;

    /// Parses a SELECT statement, starting at the SELECT keyword.
    fn parse_select(&mut self) -> Result<SelectStatement> {
        let (distinct, select) = self.parse_select_clause()?;
        let from = self.parse_from_clause()?;
        let r#where = self.parse_where_clause()?;
        let group_by = self.parse_group_by_clause()?;
        let having = self.parse_having_clause()?;
        let order_by = self.parse_order_by_clause()?;
        let (offset, limit) = self.parse_limit_offset_clause()?;
        Ok(SelectStatement {
            distinct,
            select,
            from,
            r#where,
            group_by,
            having,
            order_by,
            offset,
            limit,
        })
    }

    /// Parses the SELECT clause.
    fn parse_select_clause(&mut self) -> Result<SelectClauseResult> {
        self.expect(Keyword::Select.into())?;
        let distinct = self.next_is(Keyword::Distinct.into());

        let mut select = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let mut alias = None;
            if self.next_is(Keyword::As.into()) || matches!(self.peek()?, Some(Token::Ident(_))) {
                if matches!(expr, Expression::All | Expression::QualifiedAll(_)) {
                    return Err(Error::Syntax(format!("can't alias {}", expr)));
                }
                alias = Some(self.next_ident()?);
            }
            select.push((expr, alias));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok((distinct, select))
    }

    /// Parses a FROM clause, if present.
    fn parse_from_clause(&mut self) -> Result<Option<FromClause>> {
        if !self.next_is(Keyword::From.into()) {
            return Ok(None);
        }

        let from = if self.next_is(Token::OpenParen) {
            if !matches!(self.peek()?, Some(Token::Keyword(Keyword::Select))) {
                return Err(Error::Syntax(
                    "expected SELECT after opening parenthesis in FROM clause".into(),
                ));
            }
            let select = Box::new(self.parse_select()?);
            self.expect_close_paren()?;
            FromClause::Subquery {
                select,
                alias: self.parse_table_alias()?,
            }
        } else {
            let name = self.next_ident()?;
            if self.next_is(Token::Period) {
                return Err(Error::Syntax(format!(
                    "qualified table names are not supported: {}.{}",
                    name,
                    self.next_ident()?
                )));
            }
            FromClause::Table {
                name,
                alias: self.parse_table_alias()?,
            }
        };

        if self.next_is(Token::Comma) {
            return Err(Error::Syntax(
                "multiple tables in FROM clause are not supported".into(),
            ));
        }
        if let Some(Token::Keyword(
            keyword @ (Keyword::Join
            | Keyword::Inner
            | Keyword::Left
            | Keyword::Right
            | Keyword::Full
            | Keyword::Cross),
        )) = self.peek()?
        {
            return Err(Error::Syntax(format!("joins are not supported: found {}", keyword)));
        }
        Ok(Some(from))
    }

    /// Parses an optional table alias, with or without AS.
    fn parse_table_alias(&mut self) -> Result<Option<String>> {
        if self.next_is(Keyword::As.into()) || matches!(self.peek()?, Some(Token::Ident(_))) {
            return Ok(Some(self.next_ident()?));
        }
        Ok(None)
    }

    /// Parses a WHERE clause, if present.
    fn parse_where_clause(&mut self) -> Result<Option<Expression>> {
        if !self.next_is(Keyword::Where.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses a GROUP BY clause, if present.
    fn parse_group_by_clause(&mut self) -> Result<Vec<Expression>> {
        let mut group_by = Vec::new();
        if !self.next_is(Keyword::Group.into()) {
            return Ok(group_by);
        }
        self.expect(Keyword::By.into())?;
        loop {
            group_by.push(self.parse_expression()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(group_by)
    }

    /// Parses a HAVING clause, if present.
    fn parse_having_clause(&mut self) -> Result<Option<Expression>> {
        if !self.next_is(Keyword::Having.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses an ORDER BY clause, if present.
    fn parse_order_by_clause(&mut self) -> Result<Vec<(Expression, Direction)>> {
        let mut order_by = Vec::new();
        if !self.next_is(Keyword::Order.into()) {
            return Ok(order_by);
        }
        self.expect(Keyword::By.into())?;
        loop {
            let expr = self.parse_expression()?;
            let direction = if self.next_is(Keyword::Desc.into()) {
                Direction::Desc
            } else {
                self.skip(Keyword::Asc.into());
                Direction::Asc
            };
            order_by.push((expr, direction));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(order_by)
    }

    /// Parses LIMIT and OFFSET clauses, in either order. Returns
    /// (offset, limit).
    fn parse_limit_offset_clause(&mut self) -> Result<(Option<Expression>, Option<Expression>)> {
        let mut offset = None;
        let mut limit = None;
        loop {
            if limit.is_none() && self.next_is(Keyword::Limit.into()) {
                limit = Some(self.parse_expression()?);
            } else if offset.is_none() && self.next_is(Keyword::Offset.into()) {
                offset = Some(self.parse_expression()?);
            } else {
                break;
            }
        }
        Ok((offset, limit))
    }
}
