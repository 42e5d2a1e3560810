//! The SELECT pipeline
//!
//! A plan runs as a chain of row iterators: scan, filter, group, having,
//! project, distinct, sort, offset/limit. Scan, filter and projection stream;
//! grouping and sorting materialize their input.

use super::aggregator::Aggregator;
use super::expression::evaluate;
use crate::error::{Error, Result, SourceError};
use crate::operators::truth;
use crate::parsing::ast::Direction;
use crate::planning::{Grouping, SelectPlan, TableScan};
use crate::types::{DataType, ExecutionContext, Expression, GroupValues, Row, RowEnvironment, Value};
use flatsql_value::ConversionRules;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Rows produced by a plan. Each row holds the visible columns only.
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// A row between scan and projection.
struct Staged {
    values: Row,
    line: u64,
    group: Option<GroupValues>,
}

type Staging<'a> = Box<dyn Iterator<Item = Result<Staged>> + 'a>;

impl Staged {
    fn environment<'r>(&'r self, outer: Option<&'r RowEnvironment<'r>>) -> RowEnvironment<'r> {
        let env = RowEnvironment::new(&self.values, self.line, outer);
        match &self.group {
            Some(group) => env.with_group(group),
            None => env,
        }
    }
}

/// Execute a plan. `outer` is the enclosing row when the plan is a
/// subquery.
///
/// LIMIT and OFFSET are evaluated before the source is opened, so their
/// errors never follow a partial read.
pub fn execute<'a>(
    plan: &'a SelectPlan,
    context: &'a ExecutionContext<'a>,
    outer: Option<&'a RowEnvironment<'a>>,
) -> Result<Rows<'a>> {
    let offset = pagination(plan.offset.as_ref(), "OFFSET", context)?.unwrap_or(0);
    let limit = pagination(plan.limit.as_ref(), "LIMIT", context)?;

    let mut rows = scan(plan.scan.as_ref(), context)?;
    if let Some(predicate) = &plan.filter {
        rows = filter(rows, predicate, "WHERE", context, outer);
    }
    if let Some(grouping) = &plan.grouping {
        let width = plan.scan.as_ref().map_or(0, |scan| scan.columns.len());
        rows = group(rows, grouping, width, context, outer)?;
    }
    if let Some(predicate) = &plan.having {
        rows = filter(rows, predicate, "HAVING", context, outer);
    }

    let mut rows: Rows<'a> = Box::new(rows.map(move |row| {
        let row = row?;
        let env = row.environment(outer);
        plan.projection
            .iter()
            .map(|expr| evaluate(expr, &env, context))
            .collect::<Result<Row>>()
    }));

    let width = plan.width();
    if plan.distinct {
        let mut seen = HashSet::new();
        rows = Box::new(rows.filter(move |row| match row {
            Ok(row) => seen.insert(row[..width.min(row.len())].to_vec()),
            Err(_) => true,
        }));
    }
    if !plan.order_by.is_empty() {
        rows = sort(rows, &plan.order_by)?;
    }

    let mut skipped = 0;
    let rows = rows
        .filter(move |row| match row {
            Ok(_) if skipped < offset => {
                skipped += 1;
                false
            }
            _ => true,
        })
        .take(limit.unwrap_or(usize::MAX))
        .map(move |row| {
            row.map(|mut row| {
                row.truncate(width);
                row
            })
        });
    Ok(Box::new(rows))
}

/// Reads the table, converting the referenced fields of each raw row.
/// Without a table, a single empty row is produced.
fn scan<'a>(scan: Option<&'a TableScan>, context: &'a ExecutionContext<'a>) -> Result<Staging<'a>> {
    let Some(scan) = scan else {
        return Ok(Box::new(std::iter::once(Ok(Staged {
            values: Vec::new(),
            line: 0,
            group: None,
        }))));
    };
    tracing::trace!(table = %scan.table, "opening row source");
    let rows = scan.source.rows()?;
    Ok(Box::new(rows.map(move |row| {
        context.cancel.check()?;
        let row = row?;
        let values = convert_fields(scan, &row.fields, row.line, context.rules)?;
        Ok(Staged {
            values,
            line: row.line,
            group: None,
        })
    })))
}

fn convert_fields(
    scan: &TableScan,
    fields: &[Option<String>],
    line: u64,
    rules: &ConversionRules,
) -> Result<Row> {
    scan.columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            if !scan.referenced.get(i).copied().unwrap_or(false) {
                return Ok(Value::Null);
            }
            match fields.get(i).and_then(Option::as_deref) {
                None => Ok(Value::Null),
                Some(raw) => rules.convert(raw, &column.data_type).map_err(|err| {
                    SourceError::Malformed {
                        line,
                        reason: format!("column {}: {}", column.name, err),
                    }
                    .into()
                }),
            }
        })
        .collect()
}

/// Keeps the rows for which the predicate is true. NULL drops the row.
fn filter<'a>(
    rows: Staging<'a>,
    predicate: &'a Expression,
    clause: &'static str,
    context: &'a ExecutionContext<'a>,
    outer: Option<&'a RowEnvironment<'a>>,
) -> Staging<'a> {
    Box::new(rows.filter_map(move |row| match row {
        Ok(row) => {
            let passes = {
                let env = row.environment(outer);
                evaluate(predicate, &env, context).and_then(|value| truth(&value, clause))
            };
            match passes {
                Ok(Some(true)) => Some(Ok(row)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        }
        Err(e) => Some(Err(e)),
    }))
}

/// Drains the input into groups. Grouped rows carry no line number.
fn group<'a>(
    rows: Staging<'a>,
    grouping: &'a Grouping,
    width: usize,
    context: &'a ExecutionContext<'a>,
    outer: Option<&'a RowEnvironment<'a>>,
) -> Result<Staging<'a>> {
    let mut aggregator = Aggregator::new(grouping, width);
    for row in rows {
        let row = row?;
        aggregator.add(row.values, row.line, context, outer)?;
    }
    let groups = aggregator.finalize()?;
    tracing::trace!(groups = groups.len(), "aggregated input");
    Ok(Box::new(groups.into_iter().map(|grouped| {
        Ok(Staged {
            values: grouped.values,
            line: 0,
            group: Some(grouped.group),
        })
    })))
}

/// Stable sort on projected positions. NULL sorts before every value, so it
/// comes first ascending and last descending.
fn sort<'a>(rows: Rows<'a>, order_by: &[(usize, Direction)]) -> Result<Rows<'a>> {
    let mut collected = rows.collect::<Result<Vec<_>>>()?;
    collected.sort_by(|a, b| {
        for (index, direction) in order_by {
            let ordering = match (a.get(*index), b.get(*index)) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
            }
        }
        Ordering::Equal
    });
    Ok(Box::new(collected.into_iter().map(Ok)))
}

/// Evaluates a LIMIT or OFFSET expression. NULL means no bound.
fn pagination(expr: Option<&Expression>, clause: &str, context: &ExecutionContext) -> Result<Option<usize>> {
    let Some(expr) = expr else {
        return Ok(None);
    };
    let env = RowEnvironment::new(&[], 0, None);
    let value = match evaluate(expr, &env, context)? {
        Value::Str(s) => context.rules.convert(&s, &DataType::I64).map_err(|_| {
            Error::Evaluation(format!("{} must be an integer, found '{}'", clause, s))
        })?,
        value => value,
    };
    match value {
        Value::Null => Ok(None),
        value if value.is_integer() => match value.to_i64() {
            Some(n) if n >= 0 => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
            _ => Err(Error::Evaluation(format!("{} must not be negative, found {}", clause, value))),
        },
        other => Err(Error::Evaluation(format!("{} must be an integer, found {}", clause, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, MemoryTable, SourceColumn};
    use crate::config::EngineConfig;
    use crate::functions::FunctionRegistry;
    use crate::parsing::parse_sql;
    use crate::planning::Planner;
    use crate::types::CancelHandle;

    fn catalog() -> MemoryCatalog {
        let people = MemoryTable::new(vec![
            SourceColumn::new("Id", DataType::I32),
            SourceColumn::new("Name", DataType::Str),
            SourceColumn::new("Dept", DataType::Str),
            SourceColumn::new("Salary", DataType::F64),
        ])
        .with_row(&["1", "Ann", "PM", "100"])
        .with_row(&["2", "Bob", "FM", ""])
        .with_row(&["3", "Cid", "PM", "300"])
        .with_row(&["4", "Dee", "FM", "50"]);
        MemoryCatalog::new().with_table("people", people)
    }

    fn run(sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let catalog = catalog();
        let config = EngineConfig::default();
        let rules = ConversionRules::default();
        let functions = FunctionRegistry::new();
        let statement = parse_sql(sql)?;
        let plan = Planner::new(&catalog, &config, &rules, &functions).plan(&statement)?;
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(params, &rules, Some(1), &cancel);
        let rows = execute(&plan, &context, None)?;
        rows.collect()
    }

    fn ints(values: &[i32]) -> Vec<Row> {
        values.iter().map(|n| vec![Value::I32(*n)]).collect()
    }

    #[test]
    fn test_filter_and_order() {
        let rows = run("SELECT Id FROM people WHERE Salary > 60 ORDER BY Salary DESC", &[]).unwrap();
        assert_eq!(rows, ints(&[3, 1]));

        // The NULL salary fails the predicate, it is not an error.
        let rows = run("SELECT Id FROM people WHERE NOT Salary > 60 ORDER BY Id", &[]).unwrap();
        assert_eq!(rows, ints(&[4]));
    }

    #[test]
    fn test_nulls_sort_first_ascending() {
        let rows = run("SELECT Id FROM people ORDER BY Salary", &[]).unwrap();
        assert_eq!(rows, ints(&[2, 4, 1, 3]));
        let rows = run("SELECT Id FROM people ORDER BY Salary DESC", &[]).unwrap();
        assert_eq!(rows, ints(&[3, 1, 4, 2]));
    }

    #[test]
    fn test_hidden_order_column_is_dropped() {
        let rows = run("SELECT Name FROM people ORDER BY Id DESC LIMIT 2", &[]).unwrap();
        assert_eq!(
            rows,
            vec![vec![Value::Str("Dee".into())], vec![Value::Str("Cid".into())]]
        );
    }

    #[test]
    fn test_group_by_with_having() {
        let rows = run(
            "SELECT Dept, COUNT(*), SUM(Salary) FROM people GROUP BY Dept HAVING COUNT(Salary) > 1",
            &[],
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![vec![Value::Str("PM".into()), Value::I64(2), Value::F64(400.0)]]
        );
    }

    #[test]
    fn test_global_aggregate_over_no_rows() {
        let rows = run("SELECT COUNT(*), MAX(Salary) FROM people WHERE Id > 10", &[]).unwrap();
        assert_eq!(rows, vec![vec![Value::I64(0), Value::Null]]);

        let rows = run("SELECT Dept, COUNT(*) FROM people WHERE Id > 10 GROUP BY Dept", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let rows = run("SELECT DISTINCT Dept FROM people", &[]).unwrap();
        assert_eq!(
            rows,
            vec![vec![Value::Str("PM".into())], vec![Value::Str("FM".into())]]
        );
    }

    #[test]
    fn test_offset_and_limit() {
        let rows = run("SELECT Id FROM people ORDER BY Id LIMIT 2 OFFSET 1", &[]).unwrap();
        assert_eq!(rows, ints(&[2, 3]));

        let rows = run("SELECT Id FROM people ORDER BY Id LIMIT ? OFFSET ?", &[Value::I32(1), Value::Null])
            .unwrap();
        assert_eq!(rows, ints(&[1]));

        assert!(matches!(
            run("SELECT Id FROM people LIMIT ?", &[Value::I32(-1)]),
            Err(Error::Evaluation(_))
        ));
    }

    #[test]
    fn test_select_without_from() {
        let rows = run("SELECT 1 + 2", &[]).unwrap();
        assert_eq!(rows, ints(&[3]));
    }

    #[test]
    fn test_correlated_subquery() {
        let rows = run(
            "SELECT p.Id FROM people p WHERE p.Salary = (SELECT MAX(Salary) FROM people q WHERE q.Dept = p.Dept) ORDER BY p.Id",
            &[],
        )
        .unwrap();
        assert_eq!(rows, ints(&[3, 4]));
    }

    #[test]
    fn test_malformed_field() {
        let table = MemoryTable::new(vec![SourceColumn::new("N", DataType::I32)])
            .with_row(&["1"])
            .with_row(&["x"]);
        let catalog = MemoryCatalog::new().with_table("t", table);
        let config = EngineConfig::default();
        let rules = ConversionRules::default();
        let functions = FunctionRegistry::new();
        let statement = parse_sql("SELECT N FROM t").unwrap();
        let plan = Planner::new(&catalog, &config, &rules, &functions).plan(&statement).unwrap();
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(&[], &rules, None, &cancel);
        let rows: Vec<_> = execute(&plan, &context, None).unwrap().collect();
        assert_eq!(rows[0], Ok(vec![Value::I32(1)]));
        assert!(matches!(
            &rows[1],
            Err(Error::Source(SourceError::Malformed { line: 2, .. }))
        ));
    }

    #[test]
    fn test_cancellation_stops_scan() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let rules = ConversionRules::default();
        let functions = FunctionRegistry::new();
        let statement = parse_sql("SELECT Id FROM people").unwrap();
        let plan = Planner::new(&catalog, &config, &rules, &functions).plan(&statement).unwrap();
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(&[], &rules, None, &cancel);
        let mut rows = execute(&plan, &context, None).unwrap();
        assert_eq!(rows.next(), Some(Ok(vec![Value::I32(1)])));
        cancel.cancel();
        assert_eq!(rows.next(), Some(Err(Error::Cancelled)));
    }
}
