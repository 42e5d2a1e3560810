//! The query engine
//!
//! Plans a parsed statement against the catalog, runs the pipeline and
//! materializes the output into a `ResultCursor`.

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::cursor::ResultCursor;
use crate::error::{Error, Result};
use crate::execution;
use crate::functions::{FunctionRegistry, UserFunction};
use crate::parsing::Statement;
use crate::planning::{Planner, SelectPlan};
use crate::types::{CancelHandle, ExecutionContext, Value};
use flatsql_value::ConversionRules;
use std::sync::Arc;

pub struct Engine {
    catalog: Arc<dyn Catalog>,
    config: EngineConfig,
    rules: ConversionRules,
    functions: FunctionRegistry,
}

impl Engine {
    /// Creates an engine. Fails when the configured zone, locale or formats
    /// are invalid.
    pub fn new(catalog: Arc<dyn Catalog>, config: EngineConfig) -> Result<Self> {
        let rules = config.conversion_rules()?;
        Ok(Self {
            catalog,
            config,
            rules,
            functions: FunctionRegistry::new(),
        })
    }

    pub fn register_function(&mut self, function: UserFunction) -> Result<()> {
        self.functions.register(function)
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &ConversionRules {
        &self.rules
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Binds a statement without running it.
    pub fn plan(&self, statement: &Statement) -> Result<SelectPlan> {
        Planner::new(&*self.catalog, &self.config, &self.rules, &self.functions).plan(statement)
    }

    /// Runs a statement with positional parameters.
    pub fn execute(&self, statement: &Statement, params: &[Value], cancel: &CancelHandle) -> Result<ResultCursor> {
        self.execute_with_max_rows(statement, params, cancel, None)
    }

    /// Runs a statement, keeping at most `max_rows` output rows.
    pub fn execute_with_max_rows(
        &self,
        statement: &Statement,
        params: &[Value],
        cancel: &CancelHandle,
        max_rows: Option<usize>,
    ) -> Result<ResultCursor> {
        let expected = statement.parameter_count();
        if params.len() < expected {
            return Err(Error::Usage(format!(
                "statement has {} parameters but {} were bound",
                expected,
                params.len()
            )));
        }

        let plan = self.plan(statement)?;
        cancel.check()?;

        let context = ExecutionContext::new(params, &self.rules, self.config.random_seed, cancel);
        let rows = execution::execute(&plan, &context, None)?
            .take(max_rows.unwrap_or(usize::MAX))
            .collect::<Result<Vec<_>>>()
            .inspect_err(|err| {
                if *err == Error::Cancelled {
                    tracing::warn!("execution cancelled");
                }
            })?;

        tracing::debug!(rows = rows.len(), columns = plan.width(), "executed query");
        Ok(ResultCursor::new(plan.columns, rows, cancel.clone()))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tables", &self.catalog.table_names())
            .field("config", &self.config)
            .field("functions", &self.functions)
            .finish()
    }
}
