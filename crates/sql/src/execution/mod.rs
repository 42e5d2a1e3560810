//! Query execution
//!
//! This module contains:
//! - `pipeline` - runs a bound plan as a chain of row iterators
//! - `expression` - evaluates bound expressions against a row
//! - `aggregator` - GROUP BY buckets and aggregate accumulators

mod aggregator;
pub(crate) mod expression;
pub(crate) mod pipeline;

pub use pipeline::{Rows, execute};
