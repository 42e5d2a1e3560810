//! SELECT statement AST nodes

use super::expressions::Expression;
use std::fmt;

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// The FROM item. Only a single source is supported.
#[derive(Debug, Clone, PartialEq)]
pub enum FromClause {
    /// A table resolved through the catalog.
    Table {
        name: String,
        alias: Option<String>,
    },
    /// A derived table, i.e. FROM (SELECT ...). Parsed, but rejected by the
    /// planner.
    Subquery {
        select: Box<SelectStatement>,
        alias: Option<String>,
    },
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    /// Select list expressions with optional aliases.
    pub select: Vec<(Expression, Option<String>)>,
    pub from: Option<FromClause>,
    pub r#where: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<(Expression, Direction)>,
    pub offset: Option<Expression>,
    pub limit: Option<Expression>,
}

impl SelectStatement {
    /// All expressions directly owned by this statement, in clause order.
    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.select
            .iter()
            .map(|(expr, _)| expr)
            .chain(self.r#where.iter())
            .chain(self.group_by.iter())
            .chain(self.having.iter())
            .chain(self.order_by.iter().map(|(expr, _)| expr))
            .chain(self.offset.iter())
            .chain(self.limit.iter())
    }

    /// The number of `?` placeholders, including those in subqueries.
    pub fn parameter_count(&self) -> usize {
        let mut count = 0;
        self.visit_parameters(&mut |index| count = count.max(index + 1));
        count
    }

    fn visit_parameters(&self, visit: &mut impl FnMut(usize)) {
        if let Some(FromClause::Subquery { select, .. }) = &self.from {
            select.visit_parameters(visit);
        }
        for expr in self.expressions() {
            expr.walk(&mut |e| {
                if let Expression::Parameter(index) = e {
                    visit(*index);
                }
                true
            });
            for subquery in expr.subqueries() {
                subquery.visit_parameters(visit);
            }
        }
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        for (i, (expr, alias)) in self.select.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", expr)?;
            if let Some(alias) = alias {
                write!(f, " AS {}", alias)?;
            }
        }
        match &self.from {
            Some(FromClause::Table { name, alias }) => {
                write!(f, " FROM {}", name)?;
                if let Some(alias) = alias {
                    write!(f, " {}", alias)?;
                }
            }
            Some(FromClause::Subquery { select, alias }) => {
                write!(f, " FROM ({})", select)?;
                if let Some(alias) = alias {
                    write!(f, " {}", alias)?;
                }
            }
            None => {}
        }
        if let Some(r#where) = &self.r#where {
            write!(f, " WHERE {}", r#where)?;
        }
        if !self.group_by.is_empty() {
            let keys: Vec<String> = self.group_by.iter().map(|e| e.to_string()).collect();
            write!(f, " GROUP BY {}", keys.join(", "))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|(e, direction)| match direction {
                    Direction::Asc => e.to_string(),
                    Direction::Desc => format!("{} DESC", e),
                })
                .collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}
