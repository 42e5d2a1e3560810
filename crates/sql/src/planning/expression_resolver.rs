//! Expression resolution
//!
//! Binds AST expressions against the planner's scopes: columns become
//! positions, literals become typed constants, functions are looked up once,
//! aggregates are assigned slots and subqueries are planned recursively. Each
//! bound expression comes with its static type, used to describe output
//! columns.

use super::aggregate_planner::Aggregation;
use super::plan::AggregateCall;
use super::planner::{Clause, Planner};
use crate::error::{Error, Result};
use crate::functions::{AggregateKind, ScalarFunction};
use crate::operators::{
    AddOperator, BinaryOperator, DivideOperator, IdentityOperator, LikePattern, MultiplyOperator,
    NegateOperator, RemainderOperator, SubtractOperator, UnaryOperator, escape_char,
};
use crate::parsing::ast::{Expression as AstExpression, Literal, Operator, SelectStatement};
use crate::types::{DataType, Expression, Value};
use std::sync::Arc;

type Bound = (Expression, DataType);

/// Errors found while checking constants at plan time are bind errors.
fn at_bind_time(err: Error) -> Error {
    match err {
        Error::Evaluation(message) => Error::Bind(message),
        other => other,
    }
}

impl Planner<'_> {
    /// Binds an expression in the innermost scope.
    pub(super) fn bind(&mut self, expr: &AstExpression) -> Result<Bound> {
        // In a grouped query an expression equal to a GROUP BY key reads the
        // key, whatever it is made of.
        if let Some(aggregation) = &self.scope().aggregation
            && let Some((index, data_type)) = aggregation.key(&self.canonical(expr))
        {
            return Ok((Expression::GroupKey(index), data_type));
        }

        match expr {
            AstExpression::All | AstExpression::QualifiedAll(_) => Err(Error::Bind(
                "* is only allowed in the select list and in COUNT(*)".into(),
            )),
            AstExpression::Column(qualifier, name) => self.bind_column(qualifier.as_deref(), name),
            AstExpression::Literal(literal) => self.bind_literal(literal),
            AstExpression::Parameter(index) => Ok((Expression::Parameter(*index), DataType::Null)),
            AstExpression::Function {
                name,
                args,
                distinct,
            } => match AggregateKind::lookup(name) {
                Some(kind) => self.bind_aggregate(expr, kind, args, *distinct),
                None => self.bind_function(name, args, *distinct),
            },
            AstExpression::Operator(op) => self.bind_operator(op),
            AstExpression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let operand = operand
                    .as_ref()
                    .map(|operand| self.bind(operand).map(|(e, _)| Box::new(e)))
                    .transpose()?;
                let mut result_type = DataType::Null;
                let mut clauses = Vec::with_capacity(when_clauses.len());
                for (when, then) in when_clauses {
                    let (when, _) = self.bind(when)?;
                    let (then, then_type) = self.bind(then)?;
                    if result_type == DataType::Null {
                        result_type = then_type;
                    }
                    clauses.push((when, then));
                }
                let else_clause = match else_clause {
                    Some(else_clause) => {
                        let (bound, else_type) = self.bind(else_clause)?;
                        if result_type == DataType::Null {
                            result_type = else_type;
                        }
                        Some(Box::new(bound))
                    }
                    None => None,
                };
                Ok((
                    Expression::Case {
                        operand,
                        when_clauses: clauses,
                        else_clause,
                    },
                    result_type,
                ))
            }
            AstExpression::Subquery(select) => {
                let plan = self.plan_single_column(select, "scalar")?;
                let data_type = plan.columns[0].data_type.clone();
                Ok((Expression::Subquery(Arc::new(plan)), data_type))
            }
            AstExpression::Exists(select) => {
                let plan = self.plan_select(select)?;
                Ok((Expression::Exists(Arc::new(plan)), DataType::Bool))
            }
        }
    }

    fn bind_column(&mut self, qualifier: Option<&str>, name: &str) -> Result<Bound> {
        let levels = self.scopes.len();
        for depth in 0..levels {
            let scope = &mut self.scopes[levels - 1 - depth];
            if let Some(index) = scope.find(qualifier, name) {
                // A subquery sees a grouped outer row only through its keys.
                let ungrouped = match &scope.aggregation {
                    Some(aggregation) => depth == 0 || !aggregation.groups_column(index),
                    None => false,
                };
                if ungrouped {
                    return Err(Error::Bind(format!(
                        "column {} must appear in GROUP BY or be used in an aggregate function",
                        name
                    )));
                }
                scope.referenced[index] = true;
                let data_type = scope.columns[index].data_type.clone();
                return Ok((Expression::Column { depth, index }, data_type));
            }
            if depth == 0
                && qualifier.is_none()
                && let Some(aliased) = scope.alias_expression(name).cloned()
            {
                scope.aliases_active = false;
                let bound = self.bind(&aliased);
                self.scope_mut().aliases_active = true;
                return bound;
            }
        }
        Err(Error::Bind(match qualifier {
            Some(qualifier) => format!("unknown column {}.{}", qualifier, name),
            None => format!("unknown column {}", name),
        }))
    }

    fn bind_literal(&self, literal: &Literal) -> Result<Bound> {
        let invalid = |kind: &str, text: &str| Error::Bind(format!("invalid {} literal '{}'", kind, text));
        let value = match literal {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Integer(n) => Value::I32(*n),
            Literal::Long(n) => Value::I64(*n),
            Literal::Float(n) => Value::F64(*n),
            Literal::String(s) => Value::Str(s.clone()),
            Literal::Date(s) => Value::Date(self.rules.parse_date(s).ok_or_else(|| invalid("DATE", s))?),
            Literal::Time(s) => Value::Time(self.rules.parse_time(s).ok_or_else(|| invalid("TIME", s))?),
            Literal::Timestamp(s) => Value::Timestamp(
                self.rules
                    .parse_timestamp(s)
                    .ok()
                    .flatten()
                    .ok_or_else(|| invalid("TIMESTAMP", s))?,
            ),
        };
        let data_type = value.data_type();
        Ok((Expression::Constant(value), data_type))
    }

    fn bind_aggregate(
        &mut self,
        call: &AstExpression,
        kind: AggregateKind,
        args: &[AstExpression],
        distinct: bool,
    ) -> Result<Bound> {
        let clause = self.scope().clause;
        let Some(aggregation) = &self.scope().aggregation else {
            return Err(Error::Bind(format!(
                "aggregate function {} is not allowed in {}",
                kind, clause
            )));
        };
        let canonical = self.canonical(call);
        if let Some((slot, data_type)) = aggregation.slot(&canonical) {
            return Ok((Expression::Aggregate(slot), data_type));
        }
        kind.arity().check(kind.name(), args.len())?;

        let (arg, arg_type) = match &args[0] {
            AstExpression::All if kind == AggregateKind::Count && !distinct => (None, DataType::Null),
            AstExpression::All => {
                return Err(Error::Bind(format!("{}(*) is not supported", kind)));
            }
            arg => {
                let (bound, data_type) = self.bind_aggregate_argument(arg)?;
                (Some(bound), data_type)
            }
        };
        let separator = match (kind, args.get(1)) {
            (AggregateKind::StringAgg, Some(AstExpression::Literal(Literal::String(s)))) => {
                Some(s.clone())
            }
            (AggregateKind::StringAgg, _) => {
                return Err(Error::Bind(
                    "STRING_AGG separator must be a string literal".into(),
                ));
            }
            _ => None,
        };

        let data_type = kind.result_type(&arg_type);
        let call = AggregateCall {
            kind,
            arg,
            distinct,
            separator,
        };
        let slot = self
            .scope_mut()
            .aggregation
            .as_mut()
            .map(|aggregation| aggregation.add_slot(canonical, call, data_type.clone()))
            .ok_or_else(|| Error::Bind(format!("aggregate function {} is not allowed in {}", kind, clause)))?;
        Ok((Expression::Aggregate(slot), data_type))
    }

    /// Binds an aggregate's argument as a plain row expression, where
    /// neither aggregates nor the group key check apply.
    fn bind_aggregate_argument(&mut self, arg: &AstExpression) -> Result<Bound> {
        let scope = self.scope_mut();
        let aggregation: Option<Aggregation> = scope.aggregation.take();
        let clause = std::mem::replace(&mut scope.clause, Clause::AggregateArgument);
        let bound = self.bind(arg);
        let scope = self.scope_mut();
        scope.aggregation = aggregation;
        scope.clause = clause;
        bound
    }

    fn bind_function(&mut self, name: &str, args: &[AstExpression], distinct: bool) -> Result<Bound> {
        if distinct {
            return Err(Error::Bind(format!(
                "DISTINCT is only allowed in aggregate functions, not in {}",
                name.to_uppercase()
            )));
        }
        if let Some(function) = ScalarFunction::lookup(name) {
            function.arity().check(function.name(), args.len())?;
            let (args, types) = self.bind_all(args)?;
            let data_type = function.result_type(&types);
            let call_site = self.next_call_site();
            return Ok((
                Expression::Function {
                    function,
                    args,
                    call_site,
                },
                data_type,
            ));
        }
        if let Some(function) = self.functions.get(name) {
            function.arity.check(&function.name, args.len())?;
            let (args, _) = self.bind_all(args)?;
            let data_type = function.return_type.clone();
            return Ok((Expression::UserFunction { function, args }, data_type));
        }
        Err(Error::Bind(format!("unknown function {}", name.to_uppercase())))
    }

    fn bind_all(&mut self, exprs: &[AstExpression]) -> Result<(Vec<Expression>, Vec<DataType>)> {
        let mut bound = Vec::with_capacity(exprs.len());
        let mut types = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let (expr, data_type) = self.bind(expr)?;
            bound.push(expr);
            types.push(data_type);
        }
        Ok((bound, types))
    }

    fn bind_operator(&mut self, op: &Operator) -> Result<Bound> {
        use Operator::*;

        let binary = |planner: &mut Self,
                      lhs: &AstExpression,
                      rhs: &AstExpression,
                      operator: Option<&dyn BinaryOperator>|
         -> Result<(Box<Expression>, Box<Expression>, DataType)> {
            let (lhs, lhs_type) = planner.bind(lhs)?;
            let (rhs, rhs_type) = planner.bind(rhs)?;
            let data_type = match operator {
                Some(operator) => operator.result_type(&lhs_type, &rhs_type),
                None => DataType::Bool,
            };
            Ok((Box::new(lhs), Box::new(rhs), data_type))
        };
        let boolean = |expr: Expression| Ok((expr, DataType::Bool));

        match op {
            And(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::And(l, r))
            }
            Or(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::Or(l, r))
            }
            Not(expr) => {
                let (expr, _) = self.bind(expr)?;
                boolean(Expression::Not(Box::new(expr)))
            }
            Equal(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::Equal(l, r))
            }
            NotEqual(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::NotEqual(l, r))
            }
            GreaterThan(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::GreaterThan(l, r))
            }
            GreaterThanOrEqual(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::GreaterThanOrEqual(l, r))
            }
            LessThan(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::LessThan(l, r))
            }
            LessThanOrEqual(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                boolean(Expression::LessThanOrEqual(l, r))
            }
            Add(lhs, rhs) => {
                let (l, r, t) = binary(self, lhs, rhs, Some(&AddOperator))?;
                Ok((Expression::Add(l, r), t))
            }
            Concat(lhs, rhs) => {
                let (l, r, _) = binary(self, lhs, rhs, None)?;
                Ok((Expression::Concat(l, r), DataType::Str))
            }
            Subtract(lhs, rhs) => {
                let (l, r, t) = binary(self, lhs, rhs, Some(&SubtractOperator))?;
                Ok((Expression::Subtract(l, r), t))
            }
            Multiply(lhs, rhs) => {
                let (l, r, t) = binary(self, lhs, rhs, Some(&MultiplyOperator))?;
                Ok((Expression::Multiply(l, r), t))
            }
            Divide(lhs, rhs) => {
                let (l, r, t) = binary(self, lhs, rhs, Some(&DivideOperator))?;
                Ok((Expression::Divide(l, r), t))
            }
            Remainder(lhs, rhs) => {
                let (l, r, t) = binary(self, lhs, rhs, Some(&RemainderOperator))?;
                Ok((Expression::Remainder(l, r), t))
            }
            Identity(expr) => {
                let (expr, data_type) = self.bind(expr)?;
                let data_type = IdentityOperator.result_type(&data_type);
                Ok((Expression::Identity(Box::new(expr)), data_type))
            }
            Negate(expr) => {
                let (expr, data_type) = self.bind(expr)?;
                let data_type = NegateOperator.result_type(&data_type);
                Ok((Expression::Negate(Box::new(expr)), data_type))
            }
            IsNull { expr, negated } => {
                let (expr, _) = self.bind(expr)?;
                boolean(Expression::IsNull(Box::new(expr), *negated))
            }
            Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                let (expr, _) = self.bind(expr)?;
                let (pattern, _) = self.bind(pattern)?;
                let escape = escape
                    .as_ref()
                    .map(|escape| self.bind(escape).map(|(e, _)| Box::new(e)))
                    .transpose()?;
                let compiled = compile_constant_pattern(&pattern, escape.as_deref())?;
                boolean(Expression::Like {
                    expr: Box::new(expr),
                    pattern: Box::new(pattern),
                    escape,
                    compiled,
                    negated: *negated,
                })
            }
            Between {
                expr,
                low,
                high,
                negated,
            } => {
                let (expr, _) = self.bind(expr)?;
                let (low, _) = self.bind(low)?;
                let (high, _) = self.bind(high)?;
                boolean(Expression::Between(
                    Box::new(expr),
                    Box::new(low),
                    Box::new(high),
                    *negated,
                ))
            }
            InList {
                expr,
                list,
                negated,
            } => {
                let (expr, _) = self.bind(expr)?;
                let (list, _) = self.bind_all(list)?;
                boolean(Expression::InList(Box::new(expr), list, *negated))
            }
            InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let (expr, _) = self.bind(expr)?;
                let plan = self.plan_single_column(subquery, "IN")?;
                boolean(Expression::InSubquery(Box::new(expr), Arc::new(plan), *negated))
            }
        }
    }

    /// Plans a subquery that must produce exactly one column.
    fn plan_single_column(
        &mut self,
        select: &SelectStatement,
        kind: &str,
    ) -> Result<super::plan::SelectPlan> {
        let plan = self.plan_select(select)?;
        if plan.width() != 1 {
            return Err(Error::Bind(format!(
                "{} subquery must return exactly one column, found {}",
                kind,
                plan.width()
            )));
        }
        Ok(plan)
    }
}

/// Compiles a LIKE pattern once when it and its escape are constants.
fn compile_constant_pattern(
    pattern: &Expression,
    escape: Option<&Expression>,
) -> Result<Option<LikePattern>> {
    let Expression::Constant(Value::Str(pattern)) = pattern else {
        return Ok(None);
    };
    let escape = match escape {
        None => None,
        Some(Expression::Constant(Value::Str(escape))) => {
            Some(escape_char(escape).map_err(at_bind_time)?)
        }
        Some(_) => return Ok(None),
    };
    LikePattern::new(pattern, escape)
        .map(Some)
        .map_err(at_bind_time)
}

#[cfg(test)]
mod tests {
    use crate::catalog::{MemoryCatalog, MemoryTable, SourceColumn};
    use crate::config::EngineConfig;
    use crate::error::Error;
    use crate::functions::{Arity, FunctionRegistry, UserFunction};
    use crate::parsing::parse_sql;
    use crate::planning::{Planner, SelectPlan};
    use crate::types::{DataType, Expression, Value};
    use flatsql_value::ConversionRules;

    fn plan_with(sql: &str, functions: &FunctionRegistry) -> crate::error::Result<SelectPlan> {
        let catalog = MemoryCatalog::new().with_table(
            "t",
            MemoryTable::new(vec![
                SourceColumn::new("A", DataType::I32),
                SourceColumn::new("B", DataType::Str),
            ]),
        );
        let config = EngineConfig::default();
        let rules = ConversionRules::default();
        Planner::new(&catalog, &config, &rules, functions).plan(&parse_sql(sql)?)
    }

    fn plan_sql(sql: &str) -> crate::error::Result<SelectPlan> {
        plan_with(sql, &FunctionRegistry::new())
    }

    #[test]
    fn test_literals_are_typed() {
        let plan = plan_sql("SELECT 1, 3000000000, 2.5, DATE '2024-02-29', NULL").unwrap();
        let types: Vec<_> = plan.columns.iter().map(|c| c.data_type.clone()).collect();
        assert_eq!(
            types,
            vec![DataType::I32, DataType::I64, DataType::F64, DataType::Date, DataType::Null]
        );
        assert!(matches!(
            plan_sql("SELECT DATE '2024-02-30'"),
            Err(Error::Bind(message)) if message.contains("invalid DATE literal")
        ));
    }

    #[test]
    fn test_constant_like_is_compiled() {
        let plan = plan_sql("SELECT a FROM t WHERE b LIKE 'x!%%' ESCAPE '!'").unwrap();
        let Some(Expression::Like { compiled, .. }) = &plan.filter else {
            panic!("expected LIKE");
        };
        assert!(compiled.as_ref().is_some_and(|p| p.is_match("x%yz")));

        let plan = plan_sql("SELECT a FROM t WHERE b LIKE ?").unwrap();
        assert!(matches!(&plan.filter, Some(Expression::Like { compiled: None, .. })));

        assert!(matches!(
            plan_sql("SELECT a FROM t WHERE b LIKE 'x!' ESCAPE '!'"),
            Err(Error::Bind(_))
        ));
    }

    #[test]
    fn test_function_resolution() {
        let plan = plan_sql("SELECT UPPER(b), LENGTH(b), RANDOM(), RANDOM() FROM t").unwrap();
        assert_eq!(plan.columns[0].data_type, DataType::Str);
        assert_eq!(plan.columns[1].data_type, DataType::I32);
        let sites: Vec<_> = plan.projection[2..]
            .iter()
            .map(|e| match e {
                Expression::Function { call_site, .. } => *call_site,
                _ => panic!("expected function"),
            })
            .collect();
        assert_ne!(sites[0], sites[1]);

        assert!(matches!(
            plan_sql("SELECT UPPER(DISTINCT b) FROM t"),
            Err(Error::Bind(_))
        ));
    }

    #[test]
    fn test_user_functions() {
        let mut functions = FunctionRegistry::new();
        functions
            .register(
                UserFunction::new("twice", Arity::exact(1), |args| match &args[0] {
                    Value::I32(n) => Ok(Value::I32(n * 2)),
                    other => Ok(other.clone()),
                })
                .with_return_type(DataType::I32),
            )
            .unwrap();
        let plan = plan_with("SELECT Twice(a) FROM t", &functions).unwrap();
        assert!(matches!(plan.projection[0], Expression::UserFunction { .. }));
        assert_eq!(plan.columns[0].data_type, DataType::I32);
        assert!(matches!(
            plan_with("SELECT twice(a, a) FROM t", &functions),
            Err(Error::Bind(message)) if message == "TWICE takes 1 argument, got 2"
        ));
    }

    #[test]
    fn test_aggregate_errors() {
        assert!(matches!(
            plan_sql("SELECT SUM(*) FROM t"),
            Err(Error::Bind(message)) if message == "SUM(*) is not supported"
        ));
        assert!(matches!(
            plan_sql("SELECT STRING_AGG(b, a) FROM t"),
            Err(Error::Bind(message)) if message.contains("separator")
        ));
        let plan = plan_sql("SELECT COUNT(DISTINCT b), STRING_AGG(b, ';') FROM t").unwrap();
        let grouping = plan.grouping.unwrap();
        assert!(grouping.aggregates[0].distinct);
        assert_eq!(grouping.aggregates[1].separator.as_deref(), Some(";"));
    }

    #[test]
    fn test_having_alias() {
        let plan = plan_sql("SELECT b, COUNT(*) AS n FROM t GROUP BY b HAVING n > 1").unwrap();
        let Some(Expression::GreaterThan(lhs, _)) = &plan.having else {
            panic!("expected comparison");
        };
        assert!(matches!(**lhs, Expression::Aggregate(0)));
    }

    #[test]
    fn test_in_subquery_shape() {
        assert!(matches!(
            plan_sql("SELECT a FROM t WHERE a IN (SELECT a, b FROM t)"),
            Err(Error::Bind(message)) if message == "IN subquery must return exactly one column, found 2"
        ));
        assert!(plan_sql("SELECT a FROM t WHERE a IN (SELECT a FROM t)").is_ok());
    }
}
