//! flatsql-value - typed values for the flatsql query engine
//!
//! This crate provides:
//! - `Value`, the tagged value type with cross-representation numeric equality
//! - `DataType` and the numeric promotion order
//! - zone-aware `Date`, `Time` and `Timestamp`
//! - `ConversionRules` for turning raw source fields into values

pub mod coercion;
pub mod data_type;
pub mod error;
pub mod temporal;
pub mod value;

pub use coercion::{ConversionRules, NumberFormat};
pub use data_type::DataType;
pub use error::{Error, Result};
pub use temporal::{Date, Time, Timestamp};
pub use value::{Row, Value};
