//! Query planning: AST to bound plan
//!
//! This module contains:
//! - `planner` - scopes, clause planning and the entry point
//! - `expression_resolver` - binding of individual expressions
//! - `aggregate_planner` - aggregate detection, group keys and slots
//! - `plan` - the bound plan executed by the pipeline

pub mod plan;
pub mod planner;

mod aggregate_planner;
mod expression_resolver;

pub use plan::{AggregateCall, ColumnDescription, Grouping, SelectPlan, TableScan};
pub use planner::Planner;
