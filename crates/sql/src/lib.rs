//! An embeddable SQL SELECT engine over flat tabular sources
//!
//! This crate answers SELECT queries against tables that are not databases,
//! e.g. delimited text or fixed-width records. It provides:
//! - A parser for a SELECT dialect with subqueries and `?` placeholders
//! - A typed evaluator with three-valued logic and numeric/temporal coercion
//! - A pull-based pipeline: filter, group, aggregate, distinct, sort, paginate
//! - Scrollable result cursors
//!
//! Tables are supplied through the [`Catalog`] and [`RowSource`] traits.

pub mod catalog;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod engine;
pub mod error;
mod execution;
pub mod functions;
pub mod operators;
pub mod parsing;
pub mod planning;
pub mod types;

pub use catalog::{Catalog, MemoryCatalog, MemoryTable, RowSource, SourceColumn, SourceRow, SourceRows};
pub use config::EngineConfig;
pub use connection::{Connection, PreparedStatement};
pub use cursor::{FetchOrientation, ResultCursor};
pub use engine::Engine;
pub use error::{Error, Result, SourceError};
pub use functions::{Arity, FunctionRegistry, UserFunction};
pub use parsing::{Parser, Statement, parse_sql};
pub use planning::ColumnDescription;
pub use types::{CancelHandle, DataType, Row, Value};
