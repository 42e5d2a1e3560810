//! Three-valued logic

mod common;

use common::{TestContext, s, setup_with_staff};
use flatsql::Value;

#[test]
fn test_and_or_not() {
    let mut ctx = TestContext::new();
    let cases = [
        ("SELECT NULL AND FALSE", Value::Bool(false)),
        ("SELECT NULL AND TRUE", Value::Null),
        ("SELECT NULL OR TRUE", Value::Bool(true)),
        ("SELECT NULL OR FALSE", Value::Null),
        ("SELECT NOT NULL", Value::Null),
        ("SELECT NOT FALSE", Value::Bool(true)),
    ];
    for (sql, expected) in cases {
        assert_eq!(ctx.scalar(sql), expected, "{}", sql);
    }
}

#[test]
fn test_comparisons_with_null() {
    let mut ctx = TestContext::new();
    let cases = [
        ("SELECT NULL = NULL", Value::Null),
        ("SELECT 1 <> NULL", Value::Null),
        ("SELECT NULL IS NULL", Value::Bool(true)),
        ("SELECT 1 IS NOT NULL", Value::Bool(true)),
        ("SELECT 1 IN (1, NULL)", Value::Bool(true)),
        ("SELECT 1 IN (2, NULL)", Value::Null),
        ("SELECT 1 NOT IN (2, NULL)", Value::Null),
        ("SELECT 1 NOT IN (2, 3)", Value::Bool(true)),
        ("SELECT NULL BETWEEN 1 AND 2", Value::Null),
    ];
    for (sql, expected) in cases {
        assert_eq!(ctx.scalar(sql), expected, "{}", sql);
    }
}

#[test]
fn test_where_drops_unknown() {
    let mut ctx = setup_with_staff();
    ctx.assert_row_count("SELECT Id FROM staff WHERE Salary > 0", 4);
    ctx.assert_row_count("SELECT Id FROM staff WHERE NOT (Salary > 0)", 0);
    ctx.assert_row_count("SELECT Id FROM staff WHERE Salary > 0 OR Salary <= 0", 4);

    let rows = ctx.rows("SELECT Name FROM staff WHERE Salary IS NULL");
    assert_eq!(rows, vec![vec![s("Dave")]]);
}

#[test]
fn test_null_handling_functions() {
    let mut ctx = setup_with_staff();
    assert_eq!(
        ctx.scalar("SELECT COALESCE(Salary, 0) FROM staff WHERE Id = 4"),
        Value::I32(0)
    );
    assert_eq!(ctx.scalar("SELECT NULLIF(Dept, 'PM') FROM staff WHERE Id = 1"), Value::Null);
    assert_eq!(ctx.scalar("SELECT NULLIF(Dept, 'PM') FROM staff WHERE Id = 3"), s("FM"));
}

#[test]
fn test_blank_fields() {
    let mut ctx = setup_with_staff();
    // A blank string field is the empty string, a blank typed field is NULL.
    assert_eq!(ctx.scalar("SELECT Dept FROM staff WHERE Id = 5"), s(""));
    assert_eq!(ctx.scalar("SELECT Hired FROM staff WHERE Id = 5"), Value::Null);
}
