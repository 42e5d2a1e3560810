//! Bound expressions
//!
//! The planner turns AST expressions into this form: names are resolved to
//! positions, functions to their implementations, constant literals to typed
//! values, and subqueries to nested plans. Evaluation never looks anything up
//! by name.

use super::Value;
use crate::functions::{ScalarFunction, UserFunction};
use crate::operators::LikePattern;
use crate::planning::SelectPlan;
use std::fmt::Display;
use std::sync::Arc;

/// An expression, made up of nested operations and values. Evaluated to a
/// final value against a row environment during execution.
#[derive(Clone, Debug)]
pub enum Expression {
    /// A constant value.
    Constant(Value),
    /// A column of the current row (depth 0) or of an enclosing row.
    Column { depth: usize, index: usize },
    /// A parameter placeholder (0-indexed).
    Parameter(usize),
    /// The i-th GROUP BY key of the current group.
    GroupKey(usize),
    /// The result of the i-th aggregate slot of the current group.
    Aggregate(usize),

    /// a AND b: Kleene conjunction.
    And(Box<Expression>, Box<Expression>),
    /// a OR b: Kleene disjunction.
    Or(Box<Expression>, Box<Expression>),
    /// NOT a: negation, NULL stays NULL.
    Not(Box<Expression>),

    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqual(Box<Expression>, Box<Expression>),
    /// a IS NULL, or a IS NOT NULL when negated.
    IsNull(Box<Expression>, bool),

    /// a + b: numeric or temporal addition, or concatenation with a string.
    Add(Box<Expression>, Box<Expression>),
    /// a || b: string concatenation.
    Concat(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Remainder(Box<Expression>, Box<Expression>),
    /// +a: numeric identity.
    Identity(Box<Expression>),
    /// -a: numeric negation.
    Negate(Box<Expression>),

    /// a LIKE pattern [ESCAPE e]. `compiled` is set when the pattern and
    /// escape are constants.
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        escape: Option<Box<Expression>>,
        compiled: Option<LikePattern>,
        negated: bool,
    },
    /// a BETWEEN low AND high.
    Between(Box<Expression>, Box<Expression>, Box<Expression>, bool),
    /// a IN (list).
    InList(Box<Expression>, Vec<Expression>, bool),
    /// a IN (SELECT ...).
    InSubquery(Box<Expression>, Arc<SelectPlan>, bool),
    /// EXISTS (SELECT ...).
    Exists(Arc<SelectPlan>),
    /// (SELECT ...) yielding a single value.
    Subquery(Arc<SelectPlan>),

    /// CASE [operand] WHEN .. THEN .. [ELSE ..] END.
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<(Expression, Expression)>,
        else_clause: Option<Box<Expression>>,
    },

    /// A built-in scalar function. The call site identifies the call within
    /// the plan, for per-row result caching.
    Function {
        function: ScalarFunction,
        args: Vec<Expression>,
        call_site: usize,
    },
    /// A registered user function.
    UserFunction {
        function: Arc<UserFunction>,
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Whether the expression is a constant or a parameter, i.e. whether it
    /// can be evaluated before any row is read.
    pub fn is_row_independent(&self) -> bool {
        match self {
            Self::Constant(_) | Self::Parameter(_) => true,
            Self::Identity(expr) | Self::Negate(expr) => expr.is_row_independent(),
            Self::Add(lhs, rhs)
            | Self::Subtract(lhs, rhs)
            | Self::Multiply(lhs, rhs)
            | Self::Divide(lhs, rhs)
            | Self::Remainder(lhs, rhs) => lhs.is_row_independent() && rhs.is_row_independent(),
            _ => false,
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let binary = |f: &mut std::fmt::Formatter<'_>, op: &str, lhs: &Expression, rhs: &Expression| {
            write!(f, "({} {} {})", lhs, op, rhs)
        };
        let list = |f: &mut std::fmt::Formatter<'_>, args: &[Expression]| -> std::fmt::Result {
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            Ok(())
        };
        match self {
            Self::Constant(Value::Str(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Constant(value) => write!(f, "{}", value),
            Self::Column { depth, index } if *depth == 0 => write!(f, "#{}", index),
            Self::Column { depth, index } => write!(f, "#{}^{}", index, depth),
            Self::Parameter(index) => write!(f, "?{}", index + 1),
            Self::GroupKey(index) => write!(f, "key#{}", index),
            Self::Aggregate(index) => write!(f, "agg#{}", index),
            Self::And(lhs, rhs) => binary(f, "AND", lhs, rhs),
            Self::Or(lhs, rhs) => binary(f, "OR", lhs, rhs),
            Self::Not(expr) => write!(f, "NOT {}", expr),
            Self::Equal(lhs, rhs) => binary(f, "=", lhs, rhs),
            Self::NotEqual(lhs, rhs) => binary(f, "!=", lhs, rhs),
            Self::GreaterThan(lhs, rhs) => binary(f, ">", lhs, rhs),
            Self::GreaterThanOrEqual(lhs, rhs) => binary(f, ">=", lhs, rhs),
            Self::LessThan(lhs, rhs) => binary(f, "<", lhs, rhs),
            Self::LessThanOrEqual(lhs, rhs) => binary(f, "<=", lhs, rhs),
            Self::IsNull(expr, false) => write!(f, "{} IS NULL", expr),
            Self::IsNull(expr, true) => write!(f, "{} IS NOT NULL", expr),
            Self::Add(lhs, rhs) => binary(f, "+", lhs, rhs),
            Self::Concat(lhs, rhs) => binary(f, "||", lhs, rhs),
            Self::Subtract(lhs, rhs) => binary(f, "-", lhs, rhs),
            Self::Multiply(lhs, rhs) => binary(f, "*", lhs, rhs),
            Self::Divide(lhs, rhs) => binary(f, "/", lhs, rhs),
            Self::Remainder(lhs, rhs) => binary(f, "%", lhs, rhs),
            Self::Identity(expr) => write!(f, "+{}", expr),
            Self::Negate(expr) => write!(f, "-{}", expr),
            Self::Like {
                expr,
                pattern,
                escape,
                negated,
                ..
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}LIKE {}", expr, not, pattern)?;
                if let Some(escape) = escape {
                    write!(f, " ESCAPE {}", escape)?;
                }
                Ok(())
            }
            Self::Between(expr, low, high, negated) => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}BETWEEN {} AND {}", expr, not, low, high)
            }
            Self::InList(expr, items, negated) => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}IN (", expr, not)?;
                list(f, items)?;
                write!(f, ")")
            }
            Self::InSubquery(expr, _, negated) => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}IN (subquery)", expr, not)
            }
            Self::Exists(_) => write!(f, "EXISTS (subquery)"),
            Self::Subquery(_) => write!(f, "(subquery)"),
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(else_clause) = else_clause {
                    write!(f, " ELSE {}", else_clause)?;
                }
                write!(f, " END")
            }
            Self::Function { function, args, .. } => {
                write!(f, "{}(", function)?;
                list(f, args)?;
                write!(f, ")")
            }
            Self::UserFunction { function, args } => {
                write!(f, "{}(", function.name)?;
                list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let expr = Expression::And(
            Box::new(Expression::Equal(
                Box::new(Expression::Column { depth: 0, index: 1 }),
                Box::new(Expression::Constant(Value::Str("it's".into()))),
            )),
            Box::new(Expression::IsNull(Box::new(Expression::Parameter(0)), true)),
        );
        assert_eq!(expr.to_string(), "((#1 = 'it''s') AND ?1 IS NOT NULL)");
    }

    #[test]
    fn test_row_independent() {
        let constant = Expression::Negate(Box::new(Expression::Constant(Value::I32(1))));
        assert!(constant.is_row_independent());
        assert!(Expression::Parameter(0).is_row_independent());
        let column = Expression::Add(
            Box::new(Expression::Parameter(0)),
            Box::new(Expression::Column { depth: 0, index: 0 }),
        );
        assert!(!column.is_row_independent());
    }
}
