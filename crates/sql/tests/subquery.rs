//! Scalar, IN and EXISTS subqueries, correlated and uncorrelated

mod common;

use common::{TableBuilder, s, setup_with_staff};
use flatsql::{Error, Value};

#[test]
fn test_scalar_subquery_cardinality() {
    let mut ctx = setup_with_staff();
    assert_eq!(ctx.scalar("SELECT (SELECT Name FROM staff WHERE Id = 99)"), Value::Null);
    assert_eq!(ctx.scalar("SELECT (SELECT Name FROM staff WHERE Id = 1)"), s("Alice"));

    let err = ctx.error("SELECT (SELECT Name FROM staff WHERE Id < 3)");
    assert!(matches!(err, Error::Evaluation(_)), "{:?}", err);
    ctx.assert_error_contains("SELECT (SELECT Name FROM staff)", "more than one row");
}

#[test]
fn test_subquery_shape_is_checked_at_bind_time() {
    let mut ctx = setup_with_staff();
    let err = ctx.error("SELECT (SELECT Id, Name FROM staff WHERE Id = 1)");
    assert!(matches!(err, Error::Bind(_)), "{:?}", err);
    ctx.assert_error_contains(
        "SELECT Name FROM staff WHERE Id IN (SELECT Id, Name FROM staff)",
        "exactly one column",
    );
}

#[test]
fn test_uncorrelated_in() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows("SELECT Name FROM staff WHERE Id IN (SELECT Id FROM staff WHERE Salary > 4200) ORDER BY Id");
    assert_eq!(rows, vec![vec![s("Alice")], vec![s("Carol")]]);

    let rows = ctx.rows("SELECT Name FROM staff WHERE Id NOT IN (SELECT Id FROM staff WHERE Dept = 'PM') ORDER BY Id");
    assert_eq!(rows, vec![vec![s("Carol")], vec![s("Eve")]]);
}

#[test]
fn test_correlated_scalar() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows(
        "SELECT Name FROM staff s WHERE Salary = \
         (SELECT MAX(Salary) FROM staff t WHERE t.Dept = s.Dept) ORDER BY Name",
    );
    assert_eq!(rows, vec![vec![s("Alice")], vec![s("Carol")], vec![s("Eve")]]);

    let rows = ctx.rows(
        "SELECT Name, (SELECT COUNT(*) FROM staff t WHERE t.Dept = s.Dept) AS peers \
         FROM staff s WHERE Id <= 3 ORDER BY Id",
    );
    assert_eq!(
        rows,
        vec![
            vec![s("Alice"), Value::I64(3)],
            vec![s("Bob"), Value::I64(3)],
            vec![s("Carol"), Value::I64(1)],
        ]
    );
}

#[test]
fn test_correlated_exists() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows(
        "SELECT Name FROM staff s WHERE EXISTS \
         (SELECT 1 FROM staff t WHERE t.Dept = s.Dept AND t.Id <> s.Id) ORDER BY Id",
    );
    assert_eq!(rows, vec![vec![s("Alice")], vec![s("Bob")], vec![s("Dave")]]);

    let rows = ctx.rows(
        "SELECT Name FROM staff s WHERE NOT EXISTS \
         (SELECT 1 FROM staff t WHERE t.Dept = s.Dept AND t.Id <> s.Id) ORDER BY Id",
    );
    assert_eq!(rows, vec![vec![s("Carol")], vec![s("Eve")]]);
}

#[test]
fn test_subquery_over_another_table() {
    let mut ctx = setup_with_staff();
    TableBuilder::new(&mut ctx, "depts")
        .create_simple("Code String, Title String")
        .insert_rows(&[&["PM", "Product"], &["FM", "Finance"]]);
    let rows = ctx.rows(
        "SELECT Name, (SELECT Title FROM depts WHERE Code = staff.Dept) FROM staff \
         WHERE Dept IN (SELECT Code FROM depts) ORDER BY Id",
    );
    assert_eq!(rows[0], vec![s("Alice"), s("Product")]);
    assert_eq!(rows[2], vec![s("Carol"), s("Finance")]);
    assert_eq!(rows.len(), 4);
}

#[test]
fn test_aliased_inner_scope_hides_its_table_name() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows(
        "SELECT Id FROM staff WHERE EXISTS \
         (SELECT 1 FROM staff u WHERE u.Id = staff.Id + 1) ORDER BY Id",
    );
    assert_eq!(
        rows,
        vec![vec![Value::I32(1)], vec![Value::I32(2)], vec![Value::I32(3)], vec![Value::I32(4)]]
    );

    let rows = ctx.rows(
        "SELECT Id FROM staff x WHERE EXISTS \
         (SELECT 1 FROM staff u WHERE u.Id = x.Id + 1) ORDER BY Id",
    );
    assert_eq!(rows.len(), 4);

    let err = ctx.error("SELECT u.Id FROM staff u WHERE staff.Id = 1");
    assert!(matches!(err, Error::Bind(_)), "{:?}", err);
}

#[test]
fn test_null_in_empty_subquery_is_false() {
    let mut ctx = setup_with_staff();
    ctx.assert_row_count("SELECT Id FROM staff WHERE NOT (NULL IN (SELECT Id FROM staff WHERE Id > 10))", 5);
    ctx.assert_row_count("SELECT Id FROM staff WHERE NULL NOT IN (SELECT Id FROM staff WHERE Id > 10)", 5);
    ctx.assert_row_count("SELECT Id FROM staff WHERE NULL IN (SELECT Id FROM staff WHERE Id > 10)", 0);

    // A non-empty candidate set keeps the NULL probe unknown.
    ctx.assert_row_count("SELECT Id FROM staff WHERE NOT (NULL IN (SELECT Id FROM staff))", 0);
    assert_eq!(
        ctx.scalar("SELECT Hired IN (SELECT Hired FROM staff WHERE Id > 10) FROM staff WHERE Id = 5"),
        Value::Bool(false)
    );
}
