//! Projection, filtering, ordering and pagination

mod common;

use common::{TestContext, TableBuilder, s, setup_with_staff};
use flatsql::Value;

fn ids(rows: Vec<Vec<Value>>) -> Vec<i32> {
    rows.into_iter()
        .map(|row| match row[0] {
            Value::I32(id) => id,
            ref other => panic!("expected an Int id, found {:?}", other),
        })
        .collect()
}

#[test]
fn test_select_star() {
    let mut ctx = setup_with_staff();
    let cursor = ctx.cursor("SELECT * FROM staff", &[]);
    let names: Vec<_> = cursor.columns().unwrap().iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["Id", "Name", "Dept", "Salary", "Hired"]);
    assert_eq!(cursor.len().unwrap(), 5);
}

#[test]
fn test_where_and_order() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows("SELECT Name FROM staff WHERE Salary > 4200 ORDER BY Name");
    assert_eq!(rows, vec![vec![s("Alice")], vec![s("Carol")]]);

    let rows = ctx.rows("SELECT Name FROM staff WHERE Dept = 'PM' AND Salary < 4500");
    assert_eq!(rows, vec![vec![s("Bob")]]);
}

#[test]
fn test_aliases_and_qualified_names() {
    let mut ctx = setup_with_staff();
    ctx.assert_query_value("SELECT st.Name AS who FROM staff AS st WHERE st.Id = 2", "who", s("Bob"));
    ctx.assert_query_value("SELECT staff.Name FROM staff WHERE ID = 3", "Name", s("Carol"));
}

#[test]
fn test_order_by_nulls() {
    let mut ctx = setup_with_staff();
    assert_eq!(ids(ctx.rows("SELECT Id FROM staff ORDER BY Salary DESC")), vec![1, 3, 2, 5, 4]);
    assert_eq!(ids(ctx.rows("SELECT Id FROM staff ORDER BY Salary")), vec![4, 5, 2, 3, 1]);
}

#[test]
fn test_order_by_ordinal_and_alias() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows("SELECT Name, Salary FROM staff WHERE Salary IS NOT NULL ORDER BY 2");
    let names: Vec<_> = rows.into_iter().map(|row| row[0].clone()).collect();
    assert_eq!(names, vec![s("Eve"), s("Bob"), s("Carol"), s("Alice")]);

    let rows = ctx.rows("SELECT Id AS k FROM staff ORDER BY k DESC LIMIT 2");
    assert_eq!(ids(rows), vec![5, 4]);
}

#[test]
fn test_sort_is_stable() {
    let mut ctx = setup_with_staff();
    assert_eq!(ids(ctx.rows("SELECT Id FROM staff ORDER BY Dept")), vec![5, 3, 1, 2, 4]);
}

#[test]
fn test_multi_key_sort() {
    let mut ctx = TestContext::new();
    TableBuilder::new(&mut ctx, "t")
        .create_simple("A Int, B Int")
        .insert_rows(&[&["1", "2"], &["2", "1"], &["1", "1"], &["2", "2"]]);
    let rows = ctx.rows("SELECT A, B FROM t ORDER BY A DESC, B");
    let expected: Vec<Vec<Value>> = [(2, 1), (2, 2), (1, 1), (1, 2)]
        .iter()
        .map(|(a, b)| vec![Value::I32(*a), Value::I32(*b)])
        .collect();
    assert_eq!(rows, expected);
}

#[test]
fn test_limit_offset_window() {
    let mut ctx = setup_with_staff();
    let all = ids(ctx.rows("SELECT Id FROM staff ORDER BY Id"));
    for offset in 0..7 {
        for limit in 0..7 {
            let sql = format!("SELECT Id FROM staff ORDER BY Id LIMIT {} OFFSET {}", limit, offset);
            let expected: Vec<i32> = all.iter().copied().skip(offset).take(limit).collect();
            assert_eq!(ids(ctx.rows(&sql)), expected, "{}", sql);
        }
    }
}

#[test]
fn test_distinct() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows("SELECT DISTINCT Dept FROM staff ORDER BY Dept");
    assert_eq!(rows, vec![vec![s("")], vec![s("FM")], vec![s("PM")]]);

    ctx.assert_row_count("SELECT DISTINCT Dept, Name FROM staff", 5);
}

#[test]
fn test_select_without_from() {
    let mut ctx = TestContext::new();
    assert_eq!(ctx.scalar("SELECT 'a' || 'b'"), s("ab"));
    assert_eq!(ctx.scalar("SELECT 1 + 2 * 3"), Value::I32(7));
}

#[test]
fn test_line_number() {
    let mut ctx = setup_with_staff();
    assert_eq!(ctx.scalar("SELECT LINE_NUMBER() FROM staff WHERE Id = 3"), Value::I64(3));
}

#[test]
fn test_case_expression() {
    let mut ctx = setup_with_staff();
    let rows = ctx.rows(
        "SELECT CASE WHEN Salary >= 4500 THEN 'high' WHEN Salary IS NULL THEN 'unknown' ELSE 'low' END \
         FROM staff ORDER BY Id",
    );
    let labels: Vec<_> = rows.into_iter().map(|row| row[0].clone()).collect();
    assert_eq!(labels, vec![s("high"), s("low"), s("high"), s("unknown"), s("low")]);
}

#[test]
fn test_like() {
    let mut ctx = setup_with_staff();
    assert_eq!(ids(ctx.rows("SELECT Id FROM staff WHERE Name LIKE '%a%' ORDER BY Id")), vec![3, 4]);
    assert_eq!(ids(ctx.rows("SELECT Id FROM staff WHERE Name NOT LIKE '_o%' ORDER BY Id")), vec![1, 3, 4, 5]);
}
