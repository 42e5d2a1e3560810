//! Aggregate planning utilities
//!
//! Detects aggregate calls in the AST and collects the group keys and
//! aggregate slots of a grouped query while it is being bound. Keys and slots
//! are identified by a canonical rendering of their expression, so repeated
//! occurrences of the same call share one slot.

use super::plan::{AggregateCall, Grouping};
use crate::functions::AggregateKind;
use crate::parsing::ast::Expression as AstExpression;
use crate::types::{DataType, Expression};

/// Helper for recognizing aggregates in the AST
pub struct AggregatePlanner;

impl AggregatePlanner {
    /// Check if an expression is an aggregate function call
    pub fn is_aggregate_expr(expr: &AstExpression) -> bool {
        match expr {
            AstExpression::Function { name, .. } => AggregateKind::lookup(name).is_some(),
            _ => false,
        }
    }

    /// Check if an expression contains an aggregate call. Subqueries are not
    /// searched, their aggregates belong to them.
    pub fn contains_aggregate_expr(expr: &AstExpression) -> bool {
        expr.contains(&Self::is_aggregate_expr)
    }
}

/// Group keys and aggregate slots collected for one grouped SELECT.
#[derive(Debug, Default)]
pub(super) struct Aggregation {
    key_names: Vec<String>,
    key_types: Vec<DataType>,
    slot_names: Vec<String>,
    slot_types: Vec<DataType>,
    grouping: Grouping,
}

impl Aggregation {
    pub fn add_key(&mut self, canonical: String, key: Expression, data_type: DataType) {
        self.key_names.push(canonical);
        self.key_types.push(data_type);
        self.grouping.keys.push(key);
    }

    /// Position and type of the group key with this canonical form.
    pub fn key(&self, canonical: &str) -> Option<(usize, DataType)> {
        let index = self.key_names.iter().position(|name| name == canonical)?;
        Some((index, self.key_types[index].clone()))
    }

    /// Whether a plain column of this scope is one of the group keys. Such a
    /// column holds the same value on every row of a group.
    pub fn groups_column(&self, index: usize) -> bool {
        self.grouping
            .keys
            .iter()
            .any(|key| matches!(key, Expression::Column { depth: 0, index: i } if *i == index))
    }

    /// Position and type of an existing aggregate slot.
    pub fn slot(&self, canonical: &str) -> Option<(usize, DataType)> {
        let index = self.slot_names.iter().position(|name| name == canonical)?;
        Some((index, self.slot_types[index].clone()))
    }

    pub fn add_slot(&mut self, canonical: String, call: AggregateCall, data_type: DataType) -> usize {
        self.slot_names.push(canonical);
        self.slot_types.push(data_type);
        self.grouping.aggregates.push(call);
        self.grouping.aggregates.len() - 1
    }

    pub fn into_grouping(self) -> Grouping {
        self.grouping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{Statement, parse_sql};

    fn select_item(sql: &str) -> AstExpression {
        let Statement::Select(select) = parse_sql(sql).unwrap();
        select.select[0].0.clone()
    }

    #[test]
    fn test_detects_nested_aggregates() {
        assert!(AggregatePlanner::is_aggregate_expr(&select_item("SELECT count(*) FROM t")));
        assert!(AggregatePlanner::contains_aggregate_expr(&select_item(
            "SELECT ROUND(AVG(a), 2) + 1 FROM t"
        )));
        assert!(!AggregatePlanner::contains_aggregate_expr(&select_item(
            "SELECT UPPER(a) FROM t"
        )));
        // The subquery's aggregate is its own.
        assert!(!AggregatePlanner::contains_aggregate_expr(&select_item(
            "SELECT (SELECT MAX(b) FROM u) FROM t"
        )));
    }

    #[test]
    fn test_slots_are_shared() {
        let mut aggregation = Aggregation::default();
        aggregation.add_key("#0.1".into(), Expression::Column { depth: 0, index: 1 }, DataType::Str);
        let call = AggregateCall {
            kind: AggregateKind::Count,
            arg: None,
            distinct: false,
            separator: None,
        };
        let slot = aggregation.add_slot("COUNT(*)".into(), call, DataType::I64);
        assert_eq!(slot, 0);
        assert_eq!(aggregation.slot("COUNT(*)"), Some((0, DataType::I64)));
        assert_eq!(aggregation.key("#0.1"), Some((0, DataType::Str)));
        assert_eq!(aggregation.key("#0.2"), None);
        assert!(aggregation.groups_column(1));
        assert!(!aggregation.groups_column(0));
        let grouping = aggregation.into_grouping();
        assert_eq!(grouping.keys.len(), 1);
        assert_eq!(grouping.aggregates.len(), 1);
    }
}
