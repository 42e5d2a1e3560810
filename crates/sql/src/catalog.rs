//! Row sources and table resolution
//!
//! A `RowSource` describes one table: its columns and a fresh sequence of raw
//! rows per execution. A `Catalog` resolves table names to row sources. The
//! in-memory implementations back embedded use and tests.

use crate::error::SourceError;
use crate::types::DataType;
use flatsql_value::ConversionRules;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A column as declared or inferred by its source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceColumn {
    pub name: String,
    pub data_type: DataType,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// One raw row: fields aligned with the source's columns, plus the 1-based
/// physical line it came from. A missing field is `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRow {
    pub line: u64,
    pub fields: Vec<Option<String>>,
}

pub type SourceRows<'a> = Box<dyn Iterator<Item = Result<SourceRow, SourceError>> + 'a>;

/// Supplies the rows of one table.
pub trait RowSource: Send + Sync {
    fn columns(&self) -> &[SourceColumn];

    /// Starts a new, independent pass over the rows.
    fn rows(&self) -> Result<SourceRows<'_>, SourceError>;
}

/// Resolves table names to row sources.
pub trait Catalog: Send + Sync {
    fn resolve(&self, table: &str) -> Result<Arc<dyn RowSource>, SourceError>;

    fn table_names(&self) -> Vec<String>;
}

/// A table held in memory as raw text fields.
#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
    columns: Vec<SourceColumn>,
    rows: Vec<Vec<Option<String>>>,
}

impl MemoryTable {
    pub fn new(columns: Vec<SourceColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from headers and raw rows, inferring each column's
    /// type from its fields.
    pub fn infer<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>], rules: &ConversionRules) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let samples = rows.iter().filter_map(|row| row.get(i)).map(|field| field.as_ref());
                SourceColumn::new(*name, rules.infer_type(samples))
            })
            .collect();
        let mut table = Self::new(columns);
        for row in rows {
            table.push(row.iter().map(|field| Some(field.as_ref().to_string())).collect());
        }
        table
    }

    /// Appends a row. Rows with a different field count than the table has
    /// columns are reported as malformed when scanned.
    pub fn push(&mut self, fields: Vec<Option<String>>) {
        self.rows.push(fields);
    }

    pub fn with_row<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.push(fields.iter().map(|field| Some(field.as_ref().to_string())).collect());
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for MemoryTable {
    fn columns(&self) -> &[SourceColumn] {
        &self.columns
    }

    fn rows(&self) -> Result<SourceRows<'_>, SourceError> {
        let width = self.columns.len();
        Ok(Box::new(self.rows.iter().enumerate().map(move |(i, fields)| {
            let line = i as u64 + 1;
            if fields.len() != width {
                return Err(SourceError::Malformed {
                    line,
                    reason: format!("expected {} fields, found {}", width, fields.len()),
                });
            }
            Ok(SourceRow {
                line,
                fields: fields.clone(),
            })
        })))
    }
}

/// A catalog of in-memory tables. Table names resolve case-insensitively.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, (String, Arc<dyn RowSource>)>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, source: impl RowSource + 'static) {
        self.register_source(name, Arc::new(source));
    }

    pub fn register_source(&mut self, name: impl Into<String>, source: Arc<dyn RowSource>) {
        let name = name.into();
        tracing::debug!(table = %name, columns = source.columns().len(), "registered table");
        self.tables.insert(name.to_lowercase(), (name, source));
    }

    pub fn with_table(mut self, name: impl Into<String>, source: impl RowSource + 'static) -> Self {
        self.register(name, source);
        self
    }
}

impl Catalog for MemoryCatalog {
    fn resolve(&self, table: &str) -> Result<Arc<dyn RowSource>, SourceError> {
        self.tables
            .get(&table.to_lowercase())
            .map(|(_, source)| source.clone())
            .ok_or_else(|| SourceError::NotFound(table.to_string()))
    }

    fn table_names(&self) -> Vec<String> {
        self.tables.values().map(|(name, _)| name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_types() {
        let rules = ConversionRules::default();
        let table = MemoryTable::infer(
            &["ID", "Name", "Joined"],
            &[vec!["1", "Ann", "2020-01-05"], vec!["2", "Bob", ""]],
            &rules,
        );
        let types: Vec<_> = table.columns().iter().map(|c| c.data_type.clone()).collect();
        assert_eq!(types, vec![DataType::I32, DataType::Str, DataType::Date]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_rows_are_restartable() {
        let table = MemoryTable::new(vec![SourceColumn::new("A", DataType::Str)])
            .with_row(&["x"])
            .with_row(&["y"]);
        let first: Vec<_> = table.rows().unwrap().map(|r| r.unwrap().line).collect();
        let second: Vec<_> = table.rows().unwrap().map(|r| r.unwrap().line).collect();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_row() {
        let table = MemoryTable::new(vec![
            SourceColumn::new("A", DataType::Str),
            SourceColumn::new("B", DataType::Str),
        ])
        .with_row(&["only one"]);
        let result = table.rows().unwrap().next().unwrap();
        assert!(matches!(result, Err(SourceError::Malformed { line: 1, .. })));
    }

    #[test]
    fn test_catalog_resolution() {
        let catalog = MemoryCatalog::new()
            .with_table("People", MemoryTable::new(vec![SourceColumn::new("A", DataType::Str)]));
        assert!(catalog.resolve("people").is_ok());
        assert!(catalog.resolve("PEOPLE").is_ok());
        assert_eq!(
            catalog.resolve("missing").err(),
            Some(SourceError::NotFound("missing".into()))
        );
        assert_eq!(catalog.table_names(), vec!["People".to_string()]);
    }
}
