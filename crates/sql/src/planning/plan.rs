//! Bound query plans
//!
//! A `SelectPlan` is a fully resolved SELECT: every name is a position, every
//! function an implementation, and every subquery a nested plan. Executing it
//! needs only the row source and an execution context.

use crate::catalog::{RowSource, SourceColumn};
use crate::functions::AggregateKind;
use crate::parsing::ast::Direction;
use crate::types::{DataType, Expression};
use std::fmt;
use std::sync::Arc;

/// Name and type of one output column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: DataType,
}

/// The table a plan reads from.
#[derive(Clone)]
pub struct TableScan {
    pub table: String,
    pub source: Arc<dyn RowSource>,
    /// Columns with their effective types, after configured overrides.
    pub columns: Vec<SourceColumn>,
    /// Which columns the query references. Only those are converted.
    pub referenced: Vec<bool>,
}

impl fmt::Debug for TableScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableScan")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("referenced", &self.referenced)
            .finish_non_exhaustive()
    }
}

/// One aggregate slot.
#[derive(Clone, Debug)]
pub struct AggregateCall {
    pub kind: AggregateKind,
    /// The argument, or None for COUNT(*).
    pub arg: Option<Expression>,
    pub distinct: bool,
    /// STRING_AGG separator.
    pub separator: Option<String>,
}

/// GROUP BY keys and aggregate slots. A grouping without keys aggregates the
/// whole filtered input into one group.
#[derive(Clone, Debug, Default)]
pub struct Grouping {
    pub keys: Vec<Expression>,
    pub aggregates: Vec<AggregateCall>,
}

#[derive(Clone, Debug)]
pub struct SelectPlan {
    /// None for a SELECT without FROM, which evaluates over one empty row.
    pub scan: Option<TableScan>,
    pub filter: Option<Expression>,
    pub grouping: Option<Grouping>,
    pub having: Option<Expression>,
    /// Visible columns followed by hidden ORDER BY columns.
    pub projection: Vec<Expression>,
    /// Descriptions of the visible columns.
    pub columns: Vec<ColumnDescription>,
    pub distinct: bool,
    /// Sort keys as projection positions.
    pub order_by: Vec<(usize, Direction)>,
    pub offset: Option<Expression>,
    pub limit: Option<Expression>,
}

impl SelectPlan {
    /// Number of visible output columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
