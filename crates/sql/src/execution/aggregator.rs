//! Aggregation for GROUP BY queries
//!
//! Rows are bucketed by the values of the group keys, in first-seen order.
//! Each bucket keeps its first row (the values non-aggregated expressions are
//! read from) and one accumulator per aggregate slot.

use super::expression::evaluate;
use crate::error::{Error, Result};
use crate::functions::AggregateKind;
use crate::operators::{AddOperator, BinaryOperator, compare};
use crate::planning::{AggregateCall, Grouping};
use crate::types::{DataType, ExecutionContext, GroupValues, Row, RowEnvironment, Value};
use indexmap::IndexMap;
use indexmap::map::Entry;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashSet;

/// One finished group, ready for HAVING and projection.
pub(super) struct GroupedRow {
    pub values: Row,
    pub group: GroupValues,
}

/// Groups rows by key and computes the aggregate slots of each group
pub(super) struct Aggregator<'p> {
    grouping: &'p Grouping,
    /// Width of the scanned rows, for the all-NULL row of an empty global group
    width: usize,
    buckets: IndexMap<Vec<Value>, GroupAccumulator>,
}

impl<'p> Aggregator<'p> {
    pub fn new(grouping: &'p Grouping, width: usize) -> Self {
        Self {
            grouping,
            width,
            buckets: IndexMap::new(),
        }
    }

    /// Add a filtered row.
    pub fn add(
        &mut self,
        values: Row,
        line: u64,
        context: &ExecutionContext,
        outer: Option<&RowEnvironment>,
    ) -> Result<()> {
        let (key, args) = {
            let env = RowEnvironment::new(&values, line, outer);
            let key = self
                .grouping
                .keys
                .iter()
                .map(|expr| evaluate(expr, &env, context))
                .collect::<Result<Vec<_>>>()?;
            let args = self
                .grouping
                .aggregates
                .iter()
                .map(|call| match &call.arg {
                    Some(arg) => evaluate(arg, &env, context),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<_>>>()?;
            (key, args)
        };

        let bucket = match self.buckets.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(GroupAccumulator::new(values, &self.grouping.aggregates)),
        };
        bucket.add(&args, context)
    }

    /// Finalize every group. A query without GROUP BY keys always yields one
    /// group, even over no rows.
    pub fn finalize(mut self) -> Result<Vec<GroupedRow>> {
        if self.buckets.is_empty() && self.grouping.keys.is_empty() {
            let empty = GroupAccumulator::new(vec![Value::Null; self.width], &self.grouping.aggregates);
            self.buckets.insert(Vec::new(), empty);
        }
        self.buckets
            .into_iter()
            .map(|(keys, bucket)| {
                let (values, aggregates) = bucket.finalize()?;
                Ok(GroupedRow {
                    values,
                    group: GroupValues { keys, aggregates },
                })
            })
            .collect()
    }
}

/// Accumulator for a single group
struct GroupAccumulator {
    representative: Row,
    accumulators: Vec<Box<dyn Accumulator>>,
}

impl GroupAccumulator {
    fn new(representative: Row, calls: &[AggregateCall]) -> Self {
        Self {
            representative,
            accumulators: calls.iter().map(create_accumulator).collect(),
        }
    }

    fn add(&mut self, args: &[Value], context: &ExecutionContext) -> Result<()> {
        for (accumulator, value) in self.accumulators.iter_mut().zip(args) {
            accumulator.add(value, context)?;
        }
        Ok(())
    }

    fn finalize(self) -> Result<(Row, Vec<Value>)> {
        let aggregates = self
            .accumulators
            .into_iter()
            .map(|accumulator| accumulator.finalize())
            .collect::<Result<Vec<_>>>()?;
        Ok((self.representative, aggregates))
    }
}

/// Trait for aggregate accumulators
trait Accumulator {
    /// Add a value to the accumulator
    fn add(&mut self, value: &Value, context: &ExecutionContext) -> Result<()>;

    /// Finalize and return the aggregate result
    fn finalize(self: Box<Self>) -> Result<Value>;
}

fn create_accumulator(call: &AggregateCall) -> Box<dyn Accumulator> {
    let accumulator: Box<dyn Accumulator> = match (call.kind, &call.arg) {
        (AggregateKind::Count, None) => Box::new(CountRowsAccumulator::default()),
        (AggregateKind::Count, Some(_)) => Box::new(CountAccumulator::default()),
        (AggregateKind::Sum, _) => Box::new(SumAccumulator::default()),
        (AggregateKind::Avg, _) => Box::new(AvgAccumulator::default()),
        (AggregateKind::Min, _) => Box::new(ExtremeAccumulator::new(Ordering::Less)),
        (AggregateKind::Max, _) => Box::new(ExtremeAccumulator::new(Ordering::Greater)),
        (AggregateKind::StringAgg, _) => Box::new(StringAggAccumulator {
            separator: call.separator.clone().unwrap_or_default(),
            parts: Vec::new(),
        }),
        (AggregateKind::ArrayAgg, _) => Box::new(ArrayAggAccumulator::default()),
    };
    match call.distinct {
        true => Box::new(DistinctAccumulator {
            seen: HashSet::new(),
            inner: accumulator,
        }),
        false => accumulator,
    }
}

/// COUNT(*) accumulator
#[derive(Default)]
struct CountRowsAccumulator {
    count: i64,
}

impl Accumulator for CountRowsAccumulator {
    fn add(&mut self, _value: &Value, _context: &ExecutionContext) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(Value::I64(self.count))
    }
}

/// COUNT(expr) accumulator
#[derive(Default)]
struct CountAccumulator {
    count: i64,
}

impl Accumulator for CountAccumulator {
    fn add(&mut self, value: &Value, _context: &ExecutionContext) -> Result<()> {
        if !value.is_null() {
            self.count += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(Value::I64(self.count))
    }
}

/// Reads a value to sum: integers widen to Long, floats to Double. Strings
/// are read as decimals with the active rules.
fn summand(function: &str, value: &Value, context: &ExecutionContext) -> Result<Value> {
    let value = crate::functions::numeric_argument(function, value, context)?;
    Ok(match value.data_type() {
        t if t.is_integer() => value.widen(&DataType::I64)?,
        DataType::F32 => value.widen(&DataType::F64)?,
        _ => value,
    })
}

/// SUM aggregate accumulator
#[derive(Default)]
struct SumAccumulator {
    sum: Option<Value>,
}

impl Accumulator for SumAccumulator {
    fn add(&mut self, value: &Value, context: &ExecutionContext) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let value = summand("SUM", value, context)?;
        self.sum = Some(match self.sum.take() {
            Some(sum) => AddOperator.execute(&sum, &value, context.rules)?,
            None => value,
        });
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.sum.unwrap_or(Value::Null))
    }
}

/// AVG aggregate accumulator
#[derive(Default)]
struct AvgAccumulator {
    sum: Option<Value>,
    count: i64,
}

impl Accumulator for AvgAccumulator {
    fn add(&mut self, value: &Value, context: &ExecutionContext) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let value = summand("AVG", value, context)?;
        self.sum = Some(match self.sum.take() {
            Some(sum) => AddOperator.execute(&sum, &value, context.rules)?,
            None => value,
        });
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        let Some(sum) = self.sum else {
            return Ok(Value::Null);
        };
        Ok(match sum {
            Value::Decimal(sum) => Value::Decimal(
                sum.checked_div(Decimal::from(self.count))
                    .ok_or_else(|| Error::Evaluation("numeric overflow in AVG".into()))?,
            ),
            other => Value::F64(other.to_f64().unwrap_or(f64::NAN) / self.count as f64),
        })
    }
}

/// MIN and MAX: keeps the value that compares as `keep` against the others.
struct ExtremeAccumulator {
    keep: Ordering,
    current: Option<Value>,
}

impl ExtremeAccumulator {
    fn new(keep: Ordering) -> Self {
        Self {
            keep,
            current: None,
        }
    }
}

impl Accumulator for ExtremeAccumulator {
    fn add(&mut self, value: &Value, context: &ExecutionContext) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let replace = match &self.current {
            None => true,
            Some(current) => compare(value, current, context.rules)? == Some(self.keep),
        };
        if replace {
            self.current = Some(value.clone());
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.current.unwrap_or(Value::Null))
    }
}

/// STRING_AGG accumulator
struct StringAggAccumulator {
    separator: String,
    parts: Vec<String>,
}

impl Accumulator for StringAggAccumulator {
    fn add(&mut self, value: &Value, _context: &ExecutionContext) -> Result<()> {
        match value {
            Value::Null => {}
            Value::Str(s) => self.parts.push(s.clone()),
            other => self.parts.push(other.to_string()),
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(match self.parts.is_empty() {
            true => Value::Null,
            false => Value::Str(self.parts.join(&self.separator)),
        })
    }
}

/// ARRAY_AGG accumulator. NULL elements are kept.
#[derive(Default)]
struct ArrayAggAccumulator {
    values: Vec<Value>,
}

impl Accumulator for ArrayAggAccumulator {
    fn add(&mut self, value: &Value, _context: &ExecutionContext) -> Result<()> {
        self.values.push(value.clone());
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        if self.values.is_empty() {
            return Ok(Value::Null);
        }
        let element = self
            .values
            .iter()
            .find(|value| !value.is_null())
            .map(Value::data_type)
            .unwrap_or(DataType::Null);
        Ok(Value::Array(element, self.values))
    }
}

/// Feeds each distinct value to the wrapped accumulator once.
struct DistinctAccumulator {
    seen: HashSet<Value>,
    inner: Box<dyn Accumulator>,
}

impl Accumulator for DistinctAccumulator {
    fn add(&mut self, value: &Value, context: &ExecutionContext) -> Result<()> {
        if self.seen.insert(value.clone()) {
            self.inner.add(value, context)?;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        self.inner.finalize()
    }
}
