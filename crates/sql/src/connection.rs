//! Connection-level API
//!
//! A `Connection` wraps an `Engine` with statement text handling: parsing
//! through a cache, prepared statements with late-bound parameters, a row
//! cap and ownership of the one open cursor.

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::cursor::ResultCursor;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::functions::UserFunction;
use crate::parsing::{CachingParser, Statement};
use crate::planning::ColumnDescription;
use crate::types::{CancelHandle, Value};
use std::sync::Arc;

pub struct Connection {
    engine: Engine,
    parser: CachingParser,
    cancel: CancelHandle,
    cursor: Option<ResultCursor>,
    max_rows: Option<usize>,
    closed: bool,
}

impl Connection {
    pub fn open(catalog: Arc<dyn Catalog>, config: EngineConfig) -> Result<Self> {
        Ok(Self::with_engine(Engine::new(catalog, config)?))
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            parser: CachingParser::new(),
            cancel: CancelHandle::new(),
            cursor: None,
            max_rows: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        match self.closed {
            true => Err(Error::Usage("the connection is closed".into())),
            false => Ok(()),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn register_function(&mut self, function: UserFunction) -> Result<()> {
        self.ensure_open()?;
        self.engine.register_function(function)
    }

    fn parse(&mut self, sql: &str) -> Result<Statement> {
        let statements = self.parser.parse_script(sql)?;
        match statements.as_slice() {
            [statement] => Ok(statement.clone()),
            other => Err(Error::Usage(format!(
                "expected exactly one statement, found {}",
                other.len()
            ))),
        }
    }

    /// Runs a statement and returns its cursor. The previous cursor of this
    /// connection is closed first.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<&mut ResultCursor> {
        self.ensure_open()?;
        let statement = self.parse(sql)?;
        tracing::debug!(sql, "executing statement");
        self.run(&statement, params)
    }

    pub fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.ensure_open()?;
        let statement = self.parse(sql)?;
        let plan = self.engine.plan(&statement)?;
        Ok(PreparedStatement {
            parameters: vec![None; statement.parameter_count()],
            columns: plan.columns,
            statement,
        })
    }

    /// Runs a prepared statement with its current parameters. Every
    /// placeholder must have been set.
    pub fn execute_prepared(&mut self, prepared: &PreparedStatement) -> Result<&mut ResultCursor> {
        self.ensure_open()?;
        let params = prepared.bound()?;
        self.run(&prepared.statement, &params)
    }

    fn run(&mut self, statement: &Statement, params: &[Value]) -> Result<&mut ResultCursor> {
        if let Some(mut previous) = self.cursor.take() {
            previous.close();
        }
        self.cancel.reset();
        let cursor = self
            .engine
            .execute_with_max_rows(statement, params, &self.cancel, self.max_rows)?;
        Ok(self.cursor.insert(cursor))
    }

    /// The open cursor, if the last execution produced one.
    pub fn cursor(&mut self) -> Option<&mut ResultCursor> {
        self.cursor.as_mut()
    }

    /// Caps the rows of later executions. 0 removes the cap.
    pub fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = (max_rows > 0).then_some(max_rows);
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows.unwrap_or(0)
    }

    /// A handle that cancels the running execution and its cursor.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.engine.catalog().table_names())
    }

    /// Closes the open cursor and the connection. Closing twice is allowed.
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
        self.parser.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A parsed and bound statement with positional parameters.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    statement: Statement,
    columns: Vec<ColumnDescription>,
    parameters: Vec<Option<Value>>,
}

impl PreparedStatement {
    /// Binds the 1-based parameter `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let count = self.parameters.len();
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.parameters.get_mut(i))
            .ok_or_else(|| Error::Usage(format!("parameter index {} is out of range 1..={}", index, count)))?;
        *slot = Some(value.into());
        Ok(())
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Output columns as planned at prepare time.
    pub fn columns(&self) -> &[ColumnDescription] {
        &self.columns
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    fn bound(&self) -> Result<Vec<Value>> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.clone()
                    .ok_or_else(|| Error::Usage(format!("parameter {} has not been set", i + 1)))
            })
            .collect()
    }
}
