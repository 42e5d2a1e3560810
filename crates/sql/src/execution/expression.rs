//! Expression evaluation for query execution
//!
//! Evaluates bound expressions against a row environment. Columns are read by
//! position, possibly from an enclosing row; subqueries rerun the pipeline
//! with the current row as their outer environment.

use super::pipeline;
use crate::error::{Error, Result};
use crate::operators::{
    AddOperator, AndOperator, BinaryOperator, ConcatOperator, DivideOperator, EqualOperator,
    GreaterThanOperator, GreaterThanOrEqualOperator, IdentityOperator, LessThanOperator,
    LessThanOrEqualOperator, LikePattern, MultiplyOperator, NegateOperator, NotEqualOperator,
    NotOperator, OrOperator, RemainderOperator, SubtractOperator, UnaryOperator, escape_char,
    sql_equal, truth,
};
use crate::planning::SelectPlan;
use crate::types::{ExecutionContext, Expression, RowEnvironment, Value};

/// Evaluate an expression to a value for the given row.
pub fn evaluate(expr: &Expression, env: &RowEnvironment, context: &ExecutionContext) -> Result<Value> {
    use Expression::*;

    let rules = context.rules;
    let binary = |operator: &dyn BinaryOperator, lhs: &Expression, rhs: &Expression| {
        let l = evaluate(lhs, env, context)?;
        let r = evaluate(rhs, env, context)?;
        operator.execute(&l, &r, rules)
    };

    Ok(match expr {
        Constant(value) => value.clone(),

        Column { depth, index } => env
            .enclosing(*depth)?
            .values
            .get(*index)
            .cloned()
            .ok_or_else(|| Error::Evaluation(format!("column #{} is out of range", index)))?,

        Parameter(index) => context.parameter(*index)?,

        GroupKey(index) => group_value(env, |group| group.keys.get(*index))?,
        Aggregate(index) => group_value(env, |group| group.aggregates.get(*index))?,

        // AND/OR stop at a decisive left operand, so a subquery on the right
        // is not rerun needlessly.
        And(lhs, rhs) => {
            let l = evaluate(lhs, env, context)?;
            if truth(&l, "AND")? == Some(false) {
                return Ok(Value::Bool(false));
            }
            AndOperator.execute(&l, &evaluate(rhs, env, context)?, rules)?
        }
        Or(lhs, rhs) => {
            let l = evaluate(lhs, env, context)?;
            if truth(&l, "OR")? == Some(true) {
                return Ok(Value::Bool(true));
            }
            OrOperator.execute(&l, &evaluate(rhs, env, context)?, rules)?
        }
        Not(expr) => NotOperator.execute(&evaluate(expr, env, context)?)?,

        Equal(lhs, rhs) => binary(&EqualOperator, lhs, rhs)?,
        NotEqual(lhs, rhs) => binary(&NotEqualOperator, lhs, rhs)?,
        GreaterThan(lhs, rhs) => binary(&GreaterThanOperator, lhs, rhs)?,
        GreaterThanOrEqual(lhs, rhs) => binary(&GreaterThanOrEqualOperator, lhs, rhs)?,
        LessThan(lhs, rhs) => binary(&LessThanOperator, lhs, rhs)?,
        LessThanOrEqual(lhs, rhs) => binary(&LessThanOrEqualOperator, lhs, rhs)?,
        IsNull(expr, negated) => Value::Bool(evaluate(expr, env, context)?.is_null() != *negated),

        Add(lhs, rhs) => binary(&AddOperator, lhs, rhs)?,
        Concat(lhs, rhs) => binary(&ConcatOperator, lhs, rhs)?,
        Subtract(lhs, rhs) => binary(&SubtractOperator, lhs, rhs)?,
        Multiply(lhs, rhs) => binary(&MultiplyOperator, lhs, rhs)?,
        Divide(lhs, rhs) => binary(&DivideOperator, lhs, rhs)?,
        Remainder(lhs, rhs) => binary(&RemainderOperator, lhs, rhs)?,
        Identity(expr) => IdentityOperator.execute(&evaluate(expr, env, context)?)?,
        Negate(expr) => NegateOperator.execute(&evaluate(expr, env, context)?)?,

        Like {
            expr,
            pattern,
            escape,
            compiled,
            negated,
        } => {
            let value = evaluate(expr, env, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let text = match &value {
                Value::Str(s) => s.clone(),
                other => other.to_string(),
            };
            let matched = match compiled {
                Some(compiled) => compiled.is_match(&text),
                None => {
                    let pattern = match evaluate(pattern, env, context)? {
                        Value::Null => return Ok(Value::Null),
                        Value::Str(s) => s,
                        other => other.to_string(),
                    };
                    let escape = match escape {
                        Some(escape) => match evaluate(escape, env, context)? {
                            Value::Null => return Ok(Value::Null),
                            other => Some(escape_char(&other.to_string())?),
                        },
                        None => None,
                    };
                    LikePattern::new(&pattern, escape)?.is_match(&text)
                }
            };
            Value::Bool(matched != *negated)
        }

        Between(expr, low, high, negated) => {
            let value = evaluate(expr, env, context)?;
            let low = evaluate(low, env, context)?;
            let high = evaluate(high, env, context)?;
            let above = GreaterThanOrEqualOperator.execute(&value, &low, rules)?;
            let below = LessThanOrEqualOperator.execute(&value, &high, rules)?;
            let between = AndOperator.execute(&above, &below, rules)?;
            match negated {
                true => NotOperator.execute(&between)?,
                false => between,
            }
        }

        InList(expr, list, negated) => {
            let probe = evaluate(expr, env, context)?;
            let candidates = list.iter().map(|item| evaluate(item, env, context));
            membership(&probe, candidates, *negated, context)?
        }

        InSubquery(expr, plan, negated) => {
            let probe = evaluate(expr, env, context)?;
            let rows = subquery(plan, env, context)?;
            let candidates = rows.map(|row| row.map(|row| row.into_iter().next().unwrap_or(Value::Null)));
            membership(&probe, candidates, *negated, context)?
        }

        Exists(plan) => match subquery(plan, env, context)?.next() {
            Some(row) => {
                row?;
                Value::Bool(true)
            }
            None => Value::Bool(false),
        },

        Subquery(plan) => {
            let mut rows = subquery(plan, env, context)?;
            let value = match rows.next().transpose()? {
                Some(row) => row.into_iter().next().unwrap_or(Value::Null),
                None => return Ok(Value::Null),
            };
            if rows.next().transpose()?.is_some() {
                return Err(Error::Evaluation(
                    "scalar subquery returned more than one row".into(),
                ));
            }
            value
        }

        Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            let operand = operand
                .as_ref()
                .map(|operand| evaluate(operand, env, context))
                .transpose()?;
            for (when, then) in when_clauses {
                let when = evaluate(when, env, context)?;
                let matched = match &operand {
                    Some(operand) => sql_equal(operand, &when, rules)?,
                    None => truth(&when, "CASE WHEN")?,
                };
                if matched == Some(true) {
                    return evaluate(then, env, context);
                }
            }
            match else_clause {
                Some(else_clause) => evaluate(else_clause, env, context)?,
                None => Value::Null,
            }
        }

        Function {
            function,
            args,
            call_site,
        } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env, context))
                .collect::<Result<Vec<_>>>()?;
            function.evaluate(&args, env, context, *call_site)?
        }

        UserFunction { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env, context))
                .collect::<Result<Vec<_>>>()?;
            function.call(&args)?
        }
    })
}

/// Reads a finalized group value of the row being projected.
fn group_value<'e>(
    env: &'e RowEnvironment,
    select: impl FnOnce(&'e crate::types::GroupValues) -> Option<&'e Value>,
) -> Result<Value> {
    env.group
        .and_then(select)
        .cloned()
        .ok_or_else(|| Error::Evaluation("group value read outside of a group".into()))
}

/// Runs a subquery with the current row as its enclosing row.
fn subquery<'a>(
    plan: &'a SelectPlan,
    env: &'a RowEnvironment<'a>,
    context: &'a ExecutionContext<'a>,
) -> Result<pipeline::Rows<'a>> {
    tracing::trace!(line = env.line, "running subquery");
    pipeline::execute(plan, context, Some(env))
}

/// Three-valued IN: true on a match, NULL when there is no match but a NULL
/// took part, false otherwise. An empty candidate set is false even for a
/// NULL probe.
fn membership(
    probe: &Value,
    candidates: impl Iterator<Item = Result<Value>>,
    negated: bool,
    context: &ExecutionContext,
) -> Result<Value> {
    let mut unknown = false;
    for candidate in candidates {
        match sql_equal(probe, &candidate?, context.rules)? {
            Some(true) => return Ok(Value::Bool(!negated)),
            Some(false) => {}
            None => unknown = true,
        }
    }
    Ok(match unknown {
        true => Value::Null,
        false => Value::Bool(negated),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CancelHandle, GroupValues};
    use flatsql_value::ConversionRules;

    fn constant(value: Value) -> Box<Expression> {
        Box::new(Expression::Constant(value))
    }

    fn eval(expr: &Expression) -> Result<Value> {
        eval_with(expr, &[], &[])
    }

    fn eval_with(expr: &Expression, row: &[Value], params: &[Value]) -> Result<Value> {
        let rules = ConversionRules::default();
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(params, &rules, Some(7), &cancel);
        let env = RowEnvironment::new(row, 3, None);
        evaluate(expr, &env, &context)
    }

    #[test]
    fn test_kleene_short_circuit() {
        // The right operand would fail if it were evaluated.
        let failing = Box::new(Expression::Divide(constant(Value::I32(1)), constant(Value::I32(0))));
        let and = Expression::And(constant(Value::Bool(false)), failing.clone());
        assert_eq!(eval(&and), Ok(Value::Bool(false)));
        let or = Expression::Or(constant(Value::Bool(true)), failing);
        assert_eq!(eval(&or), Ok(Value::Bool(true)));

        let unknown = Expression::And(constant(Value::Null), constant(Value::Bool(true)));
        assert_eq!(eval(&unknown), Ok(Value::Null));
        let not = Expression::Not(constant(Value::Null));
        assert_eq!(eval(&not), Ok(Value::Null));
    }

    #[test]
    fn test_columns_and_parameters() {
        let expr = Expression::Add(
            Box::new(Expression::Column { depth: 0, index: 1 }),
            Box::new(Expression::Parameter(0)),
        );
        assert_eq!(
            eval_with(&expr, &[Value::Null, Value::I32(40)], &[Value::I32(2)]),
            Ok(Value::I32(42))
        );
        assert!(matches!(
            eval_with(&Expression::Parameter(1), &[], &[Value::I32(1)]),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_outer_columns() {
        let rules = ConversionRules::default();
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(&[], &rules, None, &cancel);
        let outer_row = [Value::Str("outer".into())];
        let outer = RowEnvironment::new(&outer_row, 1, None);
        let inner_row = [Value::Str("inner".into())];
        let inner = RowEnvironment::new(&inner_row, 1, Some(&outer));
        let expr = Expression::Column { depth: 1, index: 0 };
        assert_eq!(evaluate(&expr, &inner, &context), Ok(Value::Str("outer".into())));
    }

    #[test]
    fn test_group_values() {
        let rules = ConversionRules::default();
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(&[], &rules, None, &cancel);
        let group = GroupValues {
            keys: vec![Value::Str("PM".into())],
            aggregates: vec![Value::I64(3)],
        };
        let env = RowEnvironment::new(&[], 0, None).with_group(&group);
        assert_eq!(
            evaluate(&Expression::Aggregate(0), &env, &context),
            Ok(Value::I64(3))
        );
        assert_eq!(
            evaluate(&Expression::GroupKey(0), &env, &context),
            Ok(Value::Str("PM".into()))
        );
    }

    #[test]
    fn test_between_and_in() {
        let between = |value: Value, negated| {
            Expression::Between(constant(value), constant(Value::I32(1)), constant(Value::I32(5)), negated)
        };
        assert_eq!(eval(&between(Value::I32(3), false)), Ok(Value::Bool(true)));
        assert_eq!(eval(&between(Value::F64(5.5), false)), Ok(Value::Bool(false)));
        assert_eq!(eval(&between(Value::I32(7), true)), Ok(Value::Bool(true)));
        assert_eq!(eval(&between(Value::Null, false)), Ok(Value::Null));

        let list = vec![Expression::Constant(Value::I32(1)), Expression::Constant(Value::Null)];
        let in_list = |value: Value| Expression::InList(constant(value), list.clone(), false);
        assert_eq!(eval(&in_list(Value::F64(1.0))), Ok(Value::Bool(true)));
        assert_eq!(eval(&in_list(Value::I32(2))), Ok(Value::Null));
        let not_in = Expression::InList(constant(Value::I32(2)), vec![Expression::Constant(Value::I32(1))], true);
        assert_eq!(eval(&not_in), Ok(Value::Bool(true)));

        let null_in = |list: Vec<Expression>, negated| Expression::InList(constant(Value::Null), list, negated);
        assert_eq!(eval(&null_in(Vec::new(), false)), Ok(Value::Bool(false)));
        assert_eq!(eval(&null_in(Vec::new(), true)), Ok(Value::Bool(true)));
        assert_eq!(eval(&null_in(vec![Expression::Constant(Value::I32(1))], false)), Ok(Value::Null));
    }

    #[test]
    fn test_like_with_runtime_pattern() {
        let like = |text: &str, pattern: &str| Expression::Like {
            expr: constant(Value::Str(text.into())),
            pattern: constant(Value::Str(pattern.into())),
            escape: None,
            compiled: None,
            negated: false,
        };
        assert_eq!(eval(&like("Smith", "Sm_th%")), Ok(Value::Bool(true)));
        assert_eq!(eval(&like("Smith", "sm%")), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_case() {
        let simple = Expression::Case {
            operand: Some(constant(Value::I32(2))),
            when_clauses: vec![
                (Expression::Constant(Value::I32(1)), Expression::Constant(Value::Str("one".into()))),
                (Expression::Constant(Value::I64(2)), Expression::Constant(Value::Str("two".into()))),
            ],
            else_clause: None,
        };
        assert_eq!(eval(&simple), Ok(Value::Str("two".into())));

        let searched = Expression::Case {
            operand: None,
            when_clauses: vec![(Expression::Constant(Value::Null), Expression::Constant(Value::I32(1)))],
            else_clause: None,
        };
        assert_eq!(eval(&searched), Ok(Value::Null));
    }
}
