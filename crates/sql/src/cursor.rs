//! Materialized, scrollable query results
//!
//! A `ResultCursor` holds every output row of one execution. Its position
//! ranges over `0..=len + 1`: 0 is before the first row and `len + 1` is
//! after the last one. Moves that overshoot land on the nearest of the two.

use crate::error::{Error, Result};
use crate::planning::ColumnDescription;
use crate::types::{CancelHandle, Row, Value};

/// Where a move goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrientation {
    Next,
    Prior,
    First,
    Last,
    BeforeFirst,
    AfterLast,
    /// 1-based row; negative counts from the end, 0 is before the first row.
    Absolute(i64),
    Relative(i64),
}

#[derive(Debug)]
pub struct ResultCursor {
    columns: Vec<ColumnDescription>,
    rows: Vec<Row>,
    position: usize,
    closed: bool,
    cancel: CancelHandle,
}

impl ResultCursor {
    pub(crate) fn new(columns: Vec<ColumnDescription>, rows: Vec<Row>, cancel: CancelHandle) -> Self {
        Self {
            columns,
            rows,
            position: 0,
            closed: false,
            cancel,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::CursorClosed);
        }
        self.cancel.check()
    }

    /// Moves the cursor and reports whether it is on a row.
    pub fn fetch(&mut self, orientation: FetchOrientation) -> Result<bool> {
        self.ensure_open()?;
        let after_last = self.rows.len() as i64 + 1;
        let target = match orientation {
            FetchOrientation::Next => self.position as i64 + 1,
            FetchOrientation::Prior => self.position as i64 - 1,
            FetchOrientation::First => 1,
            FetchOrientation::Last => after_last - 1,
            FetchOrientation::BeforeFirst => 0,
            FetchOrientation::AfterLast => after_last,
            FetchOrientation::Absolute(n) if n < 0 => after_last + n,
            FetchOrientation::Absolute(n) => n,
            FetchOrientation::Relative(delta) => (self.position as i64).saturating_add(delta),
        };
        // An empty result has no last row; LAST lands before the first.
        self.position = target.clamp(0, after_last) as usize;
        Ok(self.on_row())
    }

    pub fn next(&mut self) -> Result<bool> {
        self.fetch(FetchOrientation::Next)
    }

    pub fn previous(&mut self) -> Result<bool> {
        self.fetch(FetchOrientation::Prior)
    }

    pub fn first(&mut self) -> Result<bool> {
        self.fetch(FetchOrientation::First)
    }

    pub fn last(&mut self) -> Result<bool> {
        self.fetch(FetchOrientation::Last)
    }

    pub fn absolute(&mut self, row: i64) -> Result<bool> {
        self.fetch(FetchOrientation::Absolute(row))
    }

    pub fn relative(&mut self, delta: i64) -> Result<bool> {
        self.fetch(FetchOrientation::Relative(delta))
    }

    pub fn before_first(&mut self) -> Result<()> {
        self.fetch(FetchOrientation::BeforeFirst).map(|_| ())
    }

    pub fn after_last(&mut self) -> Result<()> {
        self.fetch(FetchOrientation::AfterLast).map(|_| ())
    }

    fn on_row(&self) -> bool {
        (1..=self.rows.len()).contains(&self.position)
    }

    pub fn is_before_first(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(!self.rows.is_empty() && self.position == 0)
    }

    pub fn is_after_last(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(!self.rows.is_empty() && self.position == self.rows.len() + 1)
    }

    pub fn is_first(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(!self.rows.is_empty() && self.position == 1)
    }

    pub fn is_last(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(!self.rows.is_empty() && self.position == self.rows.len())
    }

    /// The current row number, or 0 when not on a row.
    pub fn row_number(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(if self.on_row() { self.position } else { 0 })
    }

    /// The current row.
    pub fn row(&self) -> Result<&Row> {
        self.ensure_open()?;
        match self.on_row() {
            true => Ok(&self.rows[self.position - 1]),
            false => Err(Error::Usage("the cursor is not positioned on a row".into())),
        }
    }

    /// Value of a 1-based column in the current row.
    pub fn get(&self, column: usize) -> Result<&Value> {
        let row = self.row()?;
        column
            .checked_sub(1)
            .and_then(|index| row.get(index))
            .ok_or_else(|| {
                Error::Usage(format!(
                    "column index {} is out of range 1..={}",
                    column,
                    self.columns.len()
                ))
            })
    }

    /// Value of a column by name, matched case-insensitively. The first
    /// matching column wins.
    pub fn get_by_name(&self, name: &str) -> Result<&Value> {
        self.ensure_open()?;
        let index = self
            .columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Usage(format!("no column named {}", name)))?;
        self.get(index + 1)
    }

    pub fn columns(&self) -> Result<&[ColumnDescription]> {
        self.ensure_open()?;
        Ok(&self.columns)
    }

    pub fn len(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Releases the rows. Closing twice is allowed.
    pub fn close(&mut self) {
        self.closed = true;
        self.rows = Vec::new();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn cursor(n: i32) -> ResultCursor {
        let columns = vec![ColumnDescription {
            name: "N".into(),
            data_type: DataType::I32,
        }];
        let rows = (1..=n).map(|i| vec![Value::I32(i)]).collect();
        ResultCursor::new(columns, rows, CancelHandle::new())
    }

    #[test]
    fn test_forward_iteration() {
        let mut cursor = cursor(3);
        assert!(cursor.is_before_first().unwrap());
        let mut seen = Vec::new();
        while cursor.next().unwrap() {
            seen.push(cursor.get(1).unwrap().clone());
        }
        assert_eq!(seen, vec![Value::I32(1), Value::I32(2), Value::I32(3)]);
        assert!(cursor.is_after_last().unwrap());
        assert!(!cursor.next().unwrap());
        assert_eq!(cursor.row_number().unwrap(), 0);
    }

    #[test]
    fn test_absolute_and_relative() {
        let mut cursor = cursor(5);
        assert!(cursor.absolute(-1).unwrap());
        assert!(cursor.is_last().unwrap());
        assert!(cursor.absolute(2).unwrap());
        assert!(cursor.relative(2).unwrap());
        assert_eq!(cursor.row_number().unwrap(), 4);

        assert!(!cursor.relative(-10).unwrap());
        assert!(cursor.is_before_first().unwrap());
        assert!(!cursor.absolute(9).unwrap());
        assert!(cursor.is_after_last().unwrap());
        assert!(!cursor.absolute(-6).unwrap());
        assert!(cursor.is_before_first().unwrap());
        assert!(!cursor.absolute(0).unwrap());
    }

    #[test]
    fn test_round_trips() {
        for n in 0..4 {
            for i in 1..=n as i64 {
                for d in 0..=n as i64 + 1 {
                    let mut cursor = cursor(n);
                    cursor.absolute(i).unwrap();
                    let on_row = cursor.relative(-d).unwrap();
                    assert_eq!(on_row, i - d >= 1);
                    if on_row {
                        assert_eq!(cursor.get(1).unwrap(), &Value::I32((i - d) as i32));
                    }
                }
            }
        }

        let mut cursor = cursor(3);
        cursor.first().unwrap();
        assert!(!cursor.previous().unwrap());
        assert!(cursor.is_before_first().unwrap());
        cursor.last().unwrap();
        assert!(!cursor.next().unwrap());
        assert!(cursor.is_after_last().unwrap());
    }

    #[test]
    fn test_reading_off_row() {
        let mut cursor = cursor(1);
        assert!(matches!(cursor.get(1), Err(Error::Usage(_))));
        cursor.next().unwrap();
        assert!(matches!(cursor.get(0), Err(Error::Usage(_))));
        assert!(matches!(cursor.get(2), Err(Error::Usage(_))));
        assert_eq!(cursor.get_by_name("n").unwrap(), &Value::I32(1));
        assert!(matches!(cursor.get_by_name("missing"), Err(Error::Usage(_))));
    }

    #[test]
    fn test_empty_result() {
        let mut cursor = cursor(0);
        assert!(!cursor.first().unwrap());
        assert!(!cursor.last().unwrap());
        assert!(!cursor.is_before_first().unwrap());
        assert!(!cursor.is_after_last().unwrap());
        assert!(cursor.is_empty().unwrap());
    }

    #[test]
    fn test_closed_and_cancelled() {
        let mut cursor = cursor(2);
        cursor.close();
        assert!(cursor.is_closed());
        assert_eq!(cursor.next(), Err(Error::CursorClosed));
        assert_eq!(cursor.len(), Err(Error::CursorClosed));

        let cancel = CancelHandle::new();
        let mut cursor = ResultCursor::new(Vec::new(), vec![vec![]], cancel.clone());
        assert!(cursor.next().unwrap());
        cancel.cancel();
        assert_eq!(cursor.row().map(|_| ()), Err(Error::Cancelled));
        assert_eq!(cursor.next(), Err(Error::Cancelled));
    }
}
