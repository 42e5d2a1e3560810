//! Query planner
//!
//! Turns a parsed SELECT into a `SelectPlan`. Planning resolves every table,
//! column, alias, ordinal and function, checks GROUP BY consistency and
//! subquery shapes, and fails with a bind error before any row is read.
//!
//! Name resolution is scoped: each SELECT (including every nested subquery)
//! opens one scope, and a name that does not resolve in the innermost scope
//! is looked up in the enclosing ones. The number of scopes walked becomes
//! the column's depth, matching the chain of row environments at execution.

use super::aggregate_planner::{AggregatePlanner, Aggregation};
use super::plan::{ColumnDescription, SelectPlan, TableScan};
use crate::catalog::{Catalog, RowSource, SourceColumn};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::functions::FunctionRegistry;
use crate::parsing::ast::{
    Expression as AstExpression, FromClause, Literal, SelectStatement, Statement,
};
use crate::types::{DataType, Expression};
use flatsql_value::ConversionRules;
use std::fmt;
use std::sync::Arc;

/// The clause an expression is bound for, used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Clause {
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Pagination,
    AggregateArgument,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "the select list",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::Pagination => "LIMIT or OFFSET",
            Self::AggregateArgument => "an aggregate argument",
        })
    }
}

/// Name resolution state of one SELECT.
pub(super) struct Scope {
    pub table: Option<String>,
    pub alias: Option<String>,
    pub source: Option<Arc<dyn RowSource>>,
    pub columns: Vec<SourceColumn>,
    pub referenced: Vec<bool>,
    /// Select-list aliases, visible to HAVING and ORDER BY.
    pub aliases: Vec<(String, AstExpression)>,
    pub aliases_active: bool,
    /// Set while binding the select list, HAVING and ORDER BY of a grouped
    /// query.
    pub aggregation: Option<Aggregation>,
    pub clause: Clause,
}

impl Scope {
    fn empty() -> Self {
        Self {
            table: None,
            alias: None,
            source: None,
            columns: Vec::new(),
            referenced: Vec::new(),
            aliases: Vec::new(),
            aliases_active: false,
            aggregation: None,
            clause: Clause::Select,
        }
    }

    /// Whether a qualifier names this scope's table. An alias hides the
    /// table name, so an outer scope over the same table stays reachable.
    pub fn answers_to(&self, qualifier: &str) -> bool {
        self.alias
            .as_ref()
            .or(self.table.as_ref())
            .is_some_and(|name| name.eq_ignore_ascii_case(qualifier))
    }

    /// The position of a column, matched case-insensitively.
    pub fn find(&self, qualifier: Option<&str>, name: &str) -> Option<usize> {
        if qualifier.is_some_and(|qualifier| !self.answers_to(qualifier)) {
            return None;
        }
        self.columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
    }

    /// The expression behind a select-list alias, while aliases are visible.
    pub fn alias_expression(&self, name: &str) -> Option<&AstExpression> {
        if !self.aliases_active {
            return None;
        }
        self.aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, expr)| expr)
    }

    /// The name columns of this scope are qualified with in `*` expansion.
    fn qualifier(&self) -> Option<String> {
        self.alias.clone().or_else(|| self.table.clone())
    }
}

/// Query planner. One planner binds one statement.
pub struct Planner<'a> {
    catalog: &'a dyn Catalog,
    config: &'a EngineConfig,
    pub(super) rules: &'a ConversionRules,
    pub(super) functions: &'a FunctionRegistry,
    pub(super) scopes: Vec<Scope>,
    call_sites: usize,
}

impl<'a> Planner<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        config: &'a EngineConfig,
        rules: &'a ConversionRules,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            catalog,
            config,
            rules,
            functions,
            scopes: Vec::new(),
            call_sites: 0,
        }
    }

    /// Plans a statement.
    pub fn plan(mut self, statement: &Statement) -> Result<SelectPlan> {
        match statement {
            Statement::Select(select) => {
                let plan = self.plan_select(select)?;
                tracing::debug!(
                    table = plan.scan.as_ref().map(|scan| scan.table.as_str()),
                    columns = plan.width(),
                    grouped = plan.grouping.is_some(),
                    "planned query"
                );
                Ok(plan)
            }
        }
    }

    /// The innermost scope.
    pub(super) fn scope(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    pub(super) fn scope_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub(super) fn next_call_site(&mut self) -> usize {
        self.call_sites += 1;
        self.call_sites
    }

    /// Plans a SELECT in a new scope. Used for the top-level statement and
    /// for every subquery.
    pub(super) fn plan_select(&mut self, select: &SelectStatement) -> Result<SelectPlan> {
        let scope = self.open_scope(select.from.as_ref())?;
        self.scopes.push(scope);
        let planned = self.plan_clauses(select);
        let scope = self.scopes.pop();
        let mut plan = planned?;
        if let Some(Scope {
            table: Some(table),
            source: Some(source),
            columns,
            referenced,
            ..
        }) = scope
        {
            plan.scan = Some(TableScan {
                table,
                source,
                columns,
                referenced,
            });
        }
        Ok(plan)
    }

    /// Resolves the FROM clause into a scope, applying declared column types.
    fn open_scope(&self, from: Option<&FromClause>) -> Result<Scope> {
        let (name, alias) = match from {
            None => return Ok(Scope::empty()),
            Some(FromClause::Table { name, alias }) => (name, alias),
            Some(FromClause::Subquery { .. }) => {
                return Err(Error::Bind(
                    "subqueries in FROM are not supported".into(),
                ));
            }
        };
        let source = self.catalog.resolve(name)?;
        let mut columns = source.columns().to_vec();
        if let Some(declared) = self.config.declared_types(name)? {
            for (column, data_type) in columns.iter_mut().zip(declared) {
                column.data_type = data_type;
            }
        }
        let referenced = vec![false; columns.len()];
        Ok(Scope {
            table: Some(name.clone()),
            alias: alias.clone(),
            source: Some(source),
            columns,
            referenced,
            ..Scope::empty()
        })
    }

    fn plan_clauses(&mut self, select: &SelectStatement) -> Result<SelectPlan> {
        let items = self.expand_select_list(select)?;

        self.scope_mut().clause = Clause::Where;
        let filter = select
            .r#where
            .as_ref()
            .map(|expr| self.bind(expr).map(|(expr, _)| expr))
            .transpose()?;

        let grouped = !select.group_by.is_empty()
            || select.having.is_some()
            || items
                .iter()
                .map(|(expr, _)| expr)
                .chain(select.order_by.iter().map(|(expr, _)| expr))
                .any(AggregatePlanner::contains_aggregate_expr);

        self.scope_mut().aliases = select
            .select
            .iter()
            .filter_map(|(expr, alias)| alias.clone().map(|alias| (alias, expr.clone())))
            .collect();

        if grouped {
            let aggregation = self.plan_group_keys(select, &items)?;
            self.scope_mut().aggregation = Some(aggregation);
        }

        self.scope_mut().clause = Clause::Select;
        let mut projection = Vec::with_capacity(items.len());
        let mut columns = Vec::with_capacity(items.len());
        let mut canonical = Vec::with_capacity(items.len());
        for (expr, alias) in &items {
            let (bound, data_type) = self.bind(expr)?;
            let name = match alias {
                Some(alias) => alias.clone(),
                None => self.output_name(expr),
            };
            canonical.push(self.canonical(expr));
            projection.push(bound);
            columns.push(ColumnDescription { name, data_type });
        }

        self.scope_mut().aliases_active = true;
        self.scope_mut().clause = Clause::Having;
        let having = select
            .having
            .as_ref()
            .map(|expr| self.bind(expr).map(|(expr, _)| expr))
            .transpose()?;

        self.scope_mut().clause = Clause::OrderBy;
        let mut order_by = Vec::with_capacity(select.order_by.len());
        for (expr, direction) in &select.order_by {
            let position = self.plan_order_key(expr, &items, &canonical, &mut projection, select.distinct)?;
            order_by.push((position, *direction));
        }

        let aggregation = self.scope_mut().aggregation.take();
        let scope = self.scope_mut();
        scope.aliases_active = false;
        scope.clause = Clause::Pagination;
        let offset = self.plan_pagination(select.offset.as_ref(), "OFFSET")?;
        let limit = self.plan_pagination(select.limit.as_ref(), "LIMIT")?;

        Ok(SelectPlan {
            scan: None,
            filter,
            grouping: aggregation.map(Aggregation::into_grouping),
            having,
            projection,
            columns,
            distinct: select.distinct,
            order_by,
            offset,
            limit,
        })
    }

    /// Expands `*` and `t.*` into qualified column references.
    fn expand_select_list(
        &self,
        select: &SelectStatement,
    ) -> Result<Vec<(AstExpression, Option<String>)>> {
        let scope = self.scope();
        let expand = || {
            let qualifier = scope.qualifier();
            scope
                .columns
                .iter()
                .map(move |column| (AstExpression::Column(qualifier.clone(), column.name.clone()), None))
        };
        let mut items = Vec::with_capacity(select.select.len());
        for (expr, alias) in &select.select {
            match expr {
                AstExpression::All if scope.table.is_none() => {
                    return Err(Error::Bind("SELECT * requires a FROM clause".into()));
                }
                AstExpression::All => items.extend(expand()),
                AstExpression::QualifiedAll(table) if scope.answers_to(table) => {
                    items.extend(expand())
                }
                AstExpression::QualifiedAll(table) => {
                    return Err(Error::Bind(format!("unknown table {}", table)));
                }
                expr => items.push((expr.clone(), alias.clone())),
            }
        }
        Ok(items)
    }

    /// Binds the GROUP BY keys. Keys may be select-list ordinals or aliases.
    fn plan_group_keys(
        &mut self,
        select: &SelectStatement,
        items: &[(AstExpression, Option<String>)],
    ) -> Result<Aggregation> {
        self.scope_mut().clause = Clause::GroupBy;
        let mut aggregation = Aggregation::default();
        for key in &select.group_by {
            let key = match key {
                AstExpression::Literal(Literal::Integer(position)) => {
                    select_item(items, *position, "GROUP BY")?.clone()
                }
                AstExpression::Column(None, name) if self.scope().find(None, name).is_none() => {
                    match items
                        .iter()
                        .find(|(_, alias)| alias.as_ref().is_some_and(|a| a.eq_ignore_ascii_case(name)))
                    {
                        Some((expr, _)) => expr.clone(),
                        None => key.clone(),
                    }
                }
                key => key.clone(),
            };
            if AggregatePlanner::contains_aggregate_expr(&key) {
                return Err(Error::Bind(format!(
                    "aggregate functions are not allowed in GROUP BY: {}",
                    key
                )));
            }
            let (bound, data_type) = self.bind(&key)?;
            aggregation.add_key(self.canonical(&key), bound, data_type);
        }
        Ok(aggregation)
    }

    /// Resolves one ORDER BY key to a projection position, appending a hidden
    /// column when it is not part of the select list.
    fn plan_order_key(
        &mut self,
        expr: &AstExpression,
        items: &[(AstExpression, Option<String>)],
        canonical: &[String],
        projection: &mut Vec<Expression>,
        distinct: bool,
    ) -> Result<usize> {
        if let AstExpression::Literal(Literal::Integer(position)) = expr {
            select_item(items, *position, "ORDER BY")?;
            return Ok(*position as usize - 1);
        }
        if let AstExpression::Column(None, name) = expr
            && let Some(position) = items
                .iter()
                .position(|(_, alias)| alias.as_ref().is_some_and(|a| a.eq_ignore_ascii_case(name)))
        {
            return Ok(position);
        }
        let (bound, _) = self.bind(expr)?;
        let key = self.canonical(expr);
        if let Some(position) = canonical.iter().position(|c| *c == key) {
            return Ok(position);
        }
        if distinct {
            return Err(Error::Bind(format!(
                "ORDER BY expression {} must appear in the select list of a SELECT DISTINCT",
                expr
            )));
        }
        projection.push(bound);
        Ok(projection.len() - 1)
    }

    fn plan_pagination(&mut self, expr: Option<&AstExpression>, clause: &str) -> Result<Option<Expression>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        let (bound, _) = self.bind(expr)?;
        if !bound.is_row_independent() {
            return Err(Error::Bind(format!(
                "{} must be a constant or a parameter, found {}",
                clause, expr
            )));
        }
        Ok(Some(bound))
    }

    /// Name of an unaliased output column: the header name for a column
    /// reference, otherwise the expression's SQL text.
    fn output_name(&self, expr: &AstExpression) -> String {
        if let AstExpression::Column(qualifier, name) = expr
            && let Some((depth, index)) = self.lookup_column(qualifier.as_deref(), name)
        {
            let scope = &self.scopes[self.scopes.len() - 1 - depth];
            return scope.columns[index].name.clone();
        }
        expr.to_string()
    }

    /// Finds a column in the scope chain without marking it referenced.
    pub(super) fn lookup_column(&self, qualifier: Option<&str>, name: &str) -> Option<(usize, usize)> {
        self.scopes
            .iter()
            .rev()
            .enumerate()
            .find_map(|(depth, scope)| scope.find(qualifier, name).map(|index| (depth, index)))
    }

    /// Canonical form of an expression: columns are rendered as their
    /// resolved position, so `dept`, `DEPT` and `t.dept` are the same key.
    pub(super) fn canonical(&self, expr: &AstExpression) -> String {
        expr.prefix_with(&|qualifier, name| match self.lookup_column(qualifier, name) {
            Some((depth, index)) => format!("#{}.{}", depth, index),
            None => match qualifier {
                Some(qualifier) => format!("{}.{}", qualifier, name).to_lowercase(),
                None => name.to_lowercase(),
            },
        })
    }
}

/// The select item at a 1-based ordinal position.
fn select_item<'i>(
    items: &'i [(AstExpression, Option<String>)],
    position: i32,
    clause: &str,
) -> Result<&'i AstExpression> {
    usize::try_from(position)
        .ok()
        .and_then(|position| position.checked_sub(1))
        .and_then(|index| items.get(index))
        .map(|(expr, _)| expr)
        .ok_or_else(|| {
            Error::Bind(format!(
                "{} position {} is not in the select list",
                clause, position
            ))
        })
}
