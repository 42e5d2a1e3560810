//! Execution-scoped and row-scoped state for expression evaluation
//!
//! An `ExecutionContext` lives for one execution and holds everything that is
//! shared by all rows: parameters, conversion rules, the random sequence, the
//! execution clock and the cancellation flag. A `RowEnvironment` describes the
//! row currently being evaluated and links to the enclosing row for
//! correlated subqueries.

use crate::error::{Error, Result};
use flatsql_value::{ConversionRules, Timestamp, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag, shared between an execution, its cursor
/// and whoever wants to stop them.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag before a new execution starts.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Fails with `Error::Cancelled` once the flag is set.
    pub fn check(&self) -> Result<()> {
        match self.is_cancelled() {
            true => Err(Error::Cancelled),
            false => Ok(()),
        }
    }
}

/// State shared by every row of one execution.
pub struct ExecutionContext<'a> {
    pub params: &'a [Value],
    pub rules: &'a ConversionRules,
    /// The execution clock. CURRENT_DATE/TIME/TIMESTAMP read this, so they
    /// are stable for the whole execution.
    pub now: Timestamp,
    pub cancel: &'a CancelHandle,
    rng: RefCell<StdRng>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        params: &'a [Value],
        rules: &'a ConversionRules,
        seed: Option<u64>,
        cancel: &'a CancelHandle,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = Timestamp::new(chrono::Utc::now().with_timezone(&rules.zone));
        Self {
            params,
            rules,
            now,
            cancel,
            rng: RefCell::new(rng),
        }
    }

    pub fn parameter(&self, index: usize) -> Result<Value> {
        self.params.get(index).cloned().ok_or_else(|| {
            Error::Usage(format!("parameter {} has not been set", index + 1))
        })
    }

    /// Draws the next value in [0, 1) from the execution's random sequence.
    pub fn next_random(&self) -> f64 {
        self.rng.borrow_mut().r#gen::<f64>()
    }
}

/// The finalized values of one group: its key values and its aggregate
/// results, in slot order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupValues {
    pub keys: Vec<Value>,
    pub aggregates: Vec<Value>,
}

/// The row an expression is evaluated against.
pub struct RowEnvironment<'a> {
    /// Typed values of the current row, in source column order. Columns the
    /// query never references are NULL.
    pub values: &'a [Value],
    /// 1-based physical line of the row, 0 when projecting a whole-table
    /// aggregate.
    pub line: u64,
    pub group: Option<&'a GroupValues>,
    /// The row of the enclosing query, for correlated subqueries.
    pub outer: Option<&'a RowEnvironment<'a>>,
    cache: RefCell<HashMap<usize, Value>>,
}

impl<'a> RowEnvironment<'a> {
    pub fn new(values: &'a [Value], line: u64, outer: Option<&'a RowEnvironment<'a>>) -> Self {
        Self {
            values,
            line,
            group: None,
            outer,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_group(mut self, group: &'a GroupValues) -> Self {
        self.group = Some(group);
        self
    }

    /// Walks `depth` levels out to an enclosing row.
    pub fn enclosing(&self, depth: usize) -> Result<&RowEnvironment<'a>> {
        let mut env = self;
        for _ in 0..depth {
            env = env
                .outer
                .ok_or_else(|| Error::Evaluation("outer reference without an enclosing row".into()))?;
        }
        Ok(env)
    }

    /// Returns the cached result of a call site for this row, computing it
    /// on first use.
    pub fn cached(&self, call_site: usize, compute: impl FnOnce() -> Value) -> Value {
        self.cache
            .borrow_mut()
            .entry(call_site)
            .or_insert_with(compute)
            .clone()
    }
}
