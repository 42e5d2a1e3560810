//! Common test utilities for SQL integration tests
#![allow(dead_code)]

use flatsql::{
    Connection, DataType, EngineConfig, Error, MemoryCatalog, MemoryTable, ResultCursor, SourceColumn, Value,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Test context holding in-memory tables and a connection over them
pub struct TestContext {
    pub catalog: MemoryCatalog,
    pub config: EngineConfig,
    connection: Option<Connection>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            catalog: MemoryCatalog::new(),
            config,
            connection: None,
        }
    }

    /// Register (or replace) a table. The connection is reopened on next use.
    pub fn register(&mut self, name: &str, table: MemoryTable) {
        self.catalog.register(name, table);
        self.connection = None;
    }

    /// The connection, opened over the current tables
    pub fn connection(&mut self) -> &mut Connection {
        let catalog = Arc::new(self.catalog.clone());
        let config = self.config.clone();
        self.connection.get_or_insert_with(|| {
            Connection::open(catalog, config).expect("failed to open connection")
        })
    }

    /// Execute SQL and return the open cursor
    pub fn cursor(&mut self, sql: &str, params: &[Value]) -> &mut ResultCursor {
        match self.connection().execute(sql, params) {
            Ok(cursor) => cursor,
            Err(err) => panic!("Query failed: {} - Error: {}", sql, err),
        }
    }

    /// Execute SQL with parameters and return rows as value vectors
    pub fn rows_with(&mut self, sql: &str, params: &[Value]) -> Vec<Vec<Value>> {
        let cursor = self.cursor(sql, params);
        let mut rows = Vec::new();
        while cursor.next().unwrap() {
            rows.push(cursor.row().unwrap().clone());
        }
        rows
    }

    /// Execute SQL and return rows as value vectors
    pub fn rows(&mut self, sql: &str) -> Vec<Vec<Value>> {
        self.rows_with(sql, &[])
    }

    /// Query SQL and return rows keyed by output column name
    pub fn query(&mut self, sql: &str) -> Vec<HashMap<String, Value>> {
        let cursor = self.cursor(sql, &[]);
        let columns: Vec<String> = cursor.columns().unwrap().iter().map(|c| c.name.clone()).collect();
        let mut results = Vec::new();
        while cursor.next().unwrap() {
            let row = cursor.row().unwrap();
            results.push(columns.iter().cloned().zip(row.iter().cloned()).collect());
        }
        results
    }

    /// Query a single value: first column of the only row
    pub fn scalar(&mut self, sql: &str) -> Value {
        let rows = self.rows(sql);
        assert_eq!(rows.len(), 1, "Query '{}' returned {} rows, expected 1", sql, rows.len());
        rows[0][0].clone()
    }

    /// Execute SQL expecting an error
    pub fn error(&mut self, sql: &str) -> Error {
        self.error_with(sql, &[])
    }

    pub fn error_with(&mut self, sql: &str, params: &[Value]) -> Error {
        match self.connection().execute(sql, params) {
            Ok(_) => panic!("Expected error for SQL: {}", sql),
            Err(err) => err,
        }
    }

    /// Assert query returns expected number of rows
    pub fn assert_row_count(&mut self, sql: &str, expected: usize) {
        let count = self.rows(sql).len();
        assert_eq!(
            count, expected,
            "Query '{}' returned {} rows, expected {}",
            sql, count, expected
        );
    }

    /// Assert the first row's column holds the expected value
    pub fn assert_query_value(&mut self, sql: &str, column: &str, expected: Value) {
        let results = self.query(sql);
        assert!(!results.is_empty(), "Query '{}' returned no results", sql);

        let value = results[0]
            .get(column)
            .unwrap_or_else(|| panic!("Column '{}' not found in results", column));

        assert_eq!(
            value, &expected,
            "Query '{}' column '{}' = '{:?}', expected '{:?}'",
            sql, column, value, expected
        );
    }

    /// Assert error message contains expected text
    pub fn assert_error_contains(&mut self, sql: &str, expected: &str) {
        let error = self.error(sql).to_string();
        assert!(
            error.contains(expected),
            "Error '{}' does not contain '{}'",
            error,
            expected
        );
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for test tables. Every call re-registers the table, so the
/// builder can be dropped at any point.
pub struct TableBuilder<'a> {
    ctx: &'a mut TestContext,
    table_name: String,
    table: MemoryTable,
}

impl<'a> TableBuilder<'a> {
    pub fn new(ctx: &'a mut TestContext, table_name: &str) -> Self {
        Self {
            ctx,
            table_name: table_name.to_string(),
            table: MemoryTable::default(),
        }
    }

    /// Declare columns as `Name Type, Name Type`, with type names such as
    /// `Int`, `Long`, `Double`, `String`, `Date`.
    pub fn create_simple(&mut self, columns: &str) -> &mut Self {
        let columns = columns
            .split(',')
            .map(|column| {
                let mut parts = column.split_whitespace();
                let name = parts.next().expect("column name");
                let data_type: DataType = parts.next().expect("column type").parse().expect("known type");
                SourceColumn::new(name, data_type)
            })
            .collect();
        self.table = MemoryTable::new(columns);
        self.ctx.register(&self.table_name, self.table.clone());
        self
    }

    /// Append raw rows. An empty field reads as NULL for non-string columns.
    pub fn insert_rows(&mut self, rows: &[&[&str]]) -> &mut Self {
        for row in rows {
            self.table.push(row.iter().map(|field| Some(field.to_string())).collect());
        }
        self.ctx.register(&self.table_name, self.table.clone());
        self
    }
}

/// Helper to create a test context with the staff table
///
/// | Id | Name  | Dept | Salary | Hired      |
/// |----|-------|------|--------|------------|
/// | 1  | Alice | PM   | 5000   | 2020-01-15 |
/// | 2  | Bob   | PM   | 4000   | 2021-06-01 |
/// | 3  | Carol | FM   | 4500   | 2019-03-20 |
/// | 4  | Dave  | PM   |        | 2022-11-30 |
/// | 5  | Eve   |      | 3000   |            |
pub fn setup_with_staff() -> TestContext {
    let mut ctx = TestContext::new();
    TableBuilder::new(&mut ctx, "staff")
        .create_simple("Id Int, Name String, Dept String, Salary Double, Hired Date")
        .insert_rows(&[
            &["1", "Alice", "PM", "5000", "2020-01-15"],
            &["2", "Bob", "PM", "4000", "2021-06-01"],
            &["3", "Carol", "FM", "4500", "2019-03-20"],
            &["4", "Dave", "PM", "", "2022-11-30"],
            &["5", "Eve", "", "3000", ""],
        ]);
    ctx
}

/// The {PM, PM, FM, PM} grouping table
pub fn setup_with_codes() -> TestContext {
    let mut ctx = TestContext::new();
    TableBuilder::new(&mut ctx, "codes")
        .create_simple("Code String, Amount Int")
        .insert_rows(&[&["PM", "1"], &["PM", "2"], &["FM", "3"], &["PM", "4"]]);
    ctx
}

/// Shorthand for a string value
pub fn s(value: &str) -> Value {
    Value::Str(value.to_string())
}
