//! Expression AST nodes

use super::select::SelectStatement;
use std::fmt;
use std::hash::{Hash, Hasher};

/// SQL expressions, e.g. `a + 7 > b`. Can be nested.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// All columns, i.e. *.
    All,
    /// All columns of a table, i.e. t.*.
    QualifiedAll(String),
    /// A column reference, optionally qualified with a table name or alias.
    Column(Option<String>, String),
    /// A literal value.
    Literal(Literal),
    /// A `?` placeholder, numbered from 0 in order of appearance.
    Parameter(usize),
    /// A function call. Aggregates are function calls too.
    Function {
        name: String,
        args: Vec<Expression>,
        distinct: bool,
    },
    /// An operator.
    Operator(Operator),
    /// CASE [operand] WHEN ... THEN ... [ELSE ...] END. Without an operand
    /// this is a searched CASE.
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<(Expression, Expression)>,
        else_clause: Option<Box<Expression>>,
    },
    /// A scalar subquery.
    Subquery(Box<SelectStatement>),
    /// EXISTS (subquery).
    Exists(Box<SelectStatement>),
}

/// Expression literal values.
#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f64),
    String(String),
    /// DATE '...', converted with the active rules at bind time.
    Date(String),
    Time(String),
    Timestamp(String),
}

/// To allow using expressions and literals in e.g. hashmaps, implement simple
/// equality by value for all types, including Null and f64::NAN.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Integer(l), Self::Integer(r)) => l == r,
            (Self::Long(l), Self::Long(r)) => l == r,
            (Self::Float(l), Self::Float(r)) => l.to_bits() == r.to_bits(),
            (Self::String(l), Self::String(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(v) => v.hash(state),
            Self::Integer(v) => v.hash(state),
            Self::Long(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::String(v) | Self::Date(v) | Self::Time(v) | Self::Timestamp(v) => v.hash(state),
        }
    }
}

/// Expression operators.
#[derive(Clone, Debug, PartialEq)]
pub enum Operator {
    And(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    Equal(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqual(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),

    Add(Box<Expression>, Box<Expression>),
    Concat(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Identity(Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),
    Remainder(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),

    /// a IS [NOT] NULL
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
    /// a [NOT] LIKE pattern [ESCAPE e]
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        escape: Option<Box<Expression>>,
        negated: bool,
    },
    /// a [NOT] BETWEEN low AND high
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    /// a [NOT] IN (list)
    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    /// a [NOT] IN (SELECT ...)
    InSubquery {
        expr: Box<Expression>,
        subquery: Box<SelectStatement>,
        negated: bool,
    },
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

impl From<Operator> for Expression {
    fn from(operator: Operator) -> Self {
        Expression::Operator(operator)
    }
}

impl Operator {
    /// The symbol of a binary operator, if this is one.
    pub fn binary(&self) -> Option<(&'static str, &Expression, &Expression)> {
        use Operator::*;
        Some(match self {
            And(l, r) => ("AND", l, r),
            Or(l, r) => ("OR", l, r),
            Equal(l, r) => ("=", l, r),
            NotEqual(l, r) => ("!=", l, r),
            GreaterThan(l, r) => (">", l, r),
            GreaterThanOrEqual(l, r) => (">=", l, r),
            LessThan(l, r) => ("<", l, r),
            LessThanOrEqual(l, r) => ("<=", l, r),
            Add(l, r) => ("+", l, r),
            Concat(l, r) => ("||", l, r),
            Divide(l, r) => ("/", l, r),
            Multiply(l, r) => ("*", l, r),
            Remainder(l, r) => ("%", l, r),
            Subtract(l, r) => ("-", l, r),
            _ => return None,
        })
    }
}

impl Expression {
    /// Walks the expression tree depth-first, calling the visitor on every
    /// node. Halts and returns false if the visitor returns false. Does not
    /// descend into subqueries.
    pub fn walk<'e>(&'e self, visitor: &mut impl FnMut(&'e Expression) -> bool) -> bool {
        use Operator::*;

        if !visitor(self) {
            return false;
        }

        match self {
            Self::Operator(op) => match op {
                And(lhs, rhs)
                | Or(lhs, rhs)
                | Equal(lhs, rhs)
                | NotEqual(lhs, rhs)
                | GreaterThan(lhs, rhs)
                | GreaterThanOrEqual(lhs, rhs)
                | LessThan(lhs, rhs)
                | LessThanOrEqual(lhs, rhs)
                | Add(lhs, rhs)
                | Concat(lhs, rhs)
                | Divide(lhs, rhs)
                | Multiply(lhs, rhs)
                | Remainder(lhs, rhs)
                | Subtract(lhs, rhs) => lhs.walk(visitor) && rhs.walk(visitor),

                Not(expr) | Identity(expr) | Negate(expr) => expr.walk(visitor),
                IsNull { expr, .. } | InSubquery { expr, .. } => expr.walk(visitor),

                Like {
                    expr,
                    pattern,
                    escape,
                    ..
                } => {
                    expr.walk(visitor)
                        && pattern.walk(visitor)
                        && escape.as_ref().is_none_or(|e| e.walk(visitor))
                }
                Between {
                    expr, low, high, ..
                } => expr.walk(visitor) && low.walk(visitor) && high.walk(visitor),
                InList { expr, list, .. } => {
                    expr.walk(visitor) && list.iter().all(|e| e.walk(visitor))
                }
            },

            Self::Function { args, .. } => args.iter().all(|arg| arg.walk(visitor)),

            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                operand.as_ref().is_none_or(|e| e.walk(visitor))
                    && when_clauses
                        .iter()
                        .all(|(when, then)| when.walk(visitor) && then.walk(visitor))
                    && else_clause.as_ref().is_none_or(|e| e.walk(visitor))
            }

            Self::All
            | Self::QualifiedAll(_)
            | Self::Column(_, _)
            | Self::Literal(_)
            | Self::Parameter(_)
            | Self::Subquery(_)
            | Self::Exists(_) => true,
        }
    }

    /// Returns true if the visitor returns true for any node in the tree.
    pub fn contains(&self, visitor: &impl Fn(&Expression) -> bool) -> bool {
        !self.walk(&mut |expr| !visitor(expr))
    }

    /// Visits the subqueries directly nested in this expression.
    pub fn subqueries(&self) -> Vec<&SelectStatement> {
        let mut subqueries = Vec::new();
        self.walk(&mut |expr| {
            match expr {
                Self::Subquery(select) | Self::Exists(select) => subqueries.push(select.as_ref()),
                Self::Operator(Operator::InSubquery { subquery, .. }) => {
                    subqueries.push(subquery.as_ref())
                }
                _ => {}
            }
            true
        });
        subqueries
    }

    /// Canonical prefix rendering, e.g. `AND = [A] '20' = [B] 'AA'` for
    /// `A='20' AND B='AA'`.
    pub fn prefix(&self) -> String {
        self.prefix_with(&|qualifier, name| match qualifier {
            Some(table) => format!("[{}.{}]", table, name),
            None => format!("[{}]", name),
        })
    }

    /// Prefix rendering with a custom column renderer.
    pub fn prefix_with(&self, column: &dyn Fn(Option<&str>, &str) -> String) -> String {
        let render = |expr: &Expression| expr.prefix_with(column);
        match self {
            Self::All => "*".into(),
            Self::QualifiedAll(table) => format!("{}.*", table),
            Self::Column(qualifier, name) => column(qualifier.as_deref(), name),
            Self::Literal(literal) => literal.to_string(),
            Self::Parameter(index) => format!("?{}", index + 1),
            Self::Function {
                name,
                args,
                distinct,
            } => format!(
                "{}({}{})",
                name.to_uppercase(),
                if *distinct { "DISTINCT " } else { "" },
                args.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            Self::Operator(op) => {
                if let Some((symbol, lhs, rhs)) = op.binary() {
                    return format!("{} {} {}", symbol, render(lhs), render(rhs));
                }
                let not = |negated: &bool| if *negated { "NOT " } else { "" };
                match op {
                    Operator::Not(expr) => format!("NOT {}", render(expr)),
                    Operator::Negate(expr) => format!("NEG {}", render(expr)),
                    Operator::Identity(expr) => format!("POS {}", render(expr)),
                    Operator::IsNull { expr, negated } => {
                        format!("IS {}NULL {}", not(negated), render(expr))
                    }
                    Operator::Like {
                        expr,
                        pattern,
                        escape,
                        negated,
                    } => {
                        let mut out =
                            format!("{}LIKE {} {}", not(negated), render(expr), render(pattern));
                        if let Some(escape) = escape {
                            out.push_str(&format!(" ESCAPE {}", render(escape)));
                        }
                        out
                    }
                    Operator::Between {
                        expr,
                        low,
                        high,
                        negated,
                    } => format!(
                        "{}BETWEEN {} {} {}",
                        not(negated),
                        render(expr),
                        render(low),
                        render(high)
                    ),
                    Operator::InList {
                        expr,
                        list,
                        negated,
                    } => format!(
                        "{}IN {} ({})",
                        not(negated),
                        render(expr),
                        list.iter().map(render).collect::<Vec<_>>().join(", ")
                    ),
                    Operator::InSubquery {
                        expr,
                        subquery,
                        negated,
                    } => format!("{}IN {} ({})", not(negated), render(expr), subquery),
                    _ => unreachable!("binary operators are rendered above"),
                }
            }
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let mut out = String::from("CASE");
                if let Some(operand) = operand {
                    out.push_str(&format!(" {}", render(operand)));
                }
                for (when, then) in when_clauses {
                    out.push_str(&format!(" WHEN {} THEN {}", render(when), render(then)));
                }
                if let Some(else_clause) = else_clause {
                    out.push_str(&format!(" ELSE {}", render(else_clause)));
                }
                out.push_str(" END");
                out
            }
            Self::Subquery(select) => format!("({})", select),
            Self::Exists(select) => format!("EXISTS ({})", select),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Long(n) => write!(f, "{}L", n),
            Self::Float(n) => write!(f, "{:?}", n),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Date(s) => write!(f, "DATE '{}'", s),
            Self::Time(s) => write!(f, "TIME '{}'", s),
            Self::Timestamp(s) => write!(f, "TIMESTAMP '{}'", s),
        }
    }
}

/// Renders the expression as SQL text. Used to name unaliased output columns.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Nested operators are parenthesized.
        let nested = |expr: &Expression| match expr {
            Expression::Operator(_) => format!("({})", expr),
            _ => expr.to_string(),
        };
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            Self::All => write!(f, "*"),
            Self::QualifiedAll(table) => write!(f, "{}.*", table),
            Self::Column(Some(table), name) => write!(f, "{}.{}", table, name),
            Self::Column(None, name) => write!(f, "{}", name),
            Self::Literal(literal) => write!(f, "{}", literal),
            Self::Parameter(_) => write!(f, "?"),
            Self::Function {
                name,
                args,
                distinct,
            } => write!(
                f,
                "{}({}{})",
                name,
                if *distinct { "DISTINCT " } else { "" },
                args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
            ),
            Self::Operator(op) => {
                if let Some((symbol, lhs, rhs)) = op.binary() {
                    return write!(f, "{} {} {}", nested(lhs), symbol, nested(rhs));
                }
                match op {
                    Operator::Not(expr) => write!(f, "NOT {}", nested(expr)),
                    Operator::Negate(expr) => write!(f, "-{}", nested(expr)),
                    Operator::Identity(expr) => write!(f, "+{}", nested(expr)),
                    Operator::IsNull { expr, negated } => {
                        write!(f, "{} IS {}NULL", nested(expr), not(negated))
                    }
                    Operator::Like {
                        expr,
                        pattern,
                        escape,
                        negated,
                    } => {
                        write!(f, "{} {}LIKE {}", nested(expr), not(negated), nested(pattern))?;
                        match escape {
                            Some(escape) => write!(f, " ESCAPE {}", nested(escape)),
                            None => Ok(()),
                        }
                    }
                    Operator::Between {
                        expr,
                        low,
                        high,
                        negated,
                    } => write!(
                        f,
                        "{} {}BETWEEN {} AND {}",
                        nested(expr),
                        not(negated),
                        nested(low),
                        nested(high)
                    ),
                    Operator::InList {
                        expr,
                        list,
                        negated,
                    } => write!(
                        f,
                        "{} {}IN ({})",
                        nested(expr),
                        not(negated),
                        list.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
                    ),
                    Operator::InSubquery {
                        expr,
                        subquery,
                        negated,
                    } => write!(f, "{} {}IN ({})", nested(expr), not(negated), subquery),
                    _ => unreachable!("binary operators are rendered above"),
                }
            }
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
            Self::Subquery(select) => write!(f, "({})", select),
            Self::Exists(select) => write!(f, "EXISTS ({})", select),
        }
    }
}
