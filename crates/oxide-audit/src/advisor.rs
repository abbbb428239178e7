//! Column usage extraction for index advice.
//!
//! Every column reference in a statement is tagged with the role it plays,
//! across the whole statement tree including subqueries and derived tables.
//! Predicate and join-predicate columns are the index candidates.

use std::fmt;

use oxide_mysql::ast::{
    quote_identifier, Expr, InsertSource, SelectStatement, TableName, TableRef,
};
use oxide_mysql::Statement;
use serde::Serialize;

/// The syntactic role of a column reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Select list.
    Select,
    /// WHERE or HAVING.
    Predicate,
    /// GROUP BY.
    GroupBy,
    /// ORDER BY.
    OrderBy,
    /// JOIN ... USING column.
    JoinColumn,
    /// JOIN ... ON condition.
    JoinPredicate,
}

impl ColumnRole {
    /// Returns a readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select list",
            Self::Predicate => "WHERE clause",
            Self::GroupBy => "GROUP BY",
            Self::OrderBy => "ORDER BY",
            Self::JoinColumn => "JOIN USING",
            Self::JoinPredicate => "JOIN condition",
        }
    }

    /// Returns true for roles that filter rows.
    #[must_use]
    pub const fn filters_rows(&self) -> bool {
        matches!(self, Self::Predicate | Self::JoinColumn | Self::JoinPredicate)
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column reference found in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnUsage {
    /// Table name or alias qualifying the column.
    pub qualifier: Option<String>,
    /// Column name.
    pub column: String,
    /// Role of the reference.
    pub role: ColumnRole,
}

/// A suggested index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
    /// Table to index.
    pub table: String,
    /// Indexed column.
    pub column: String,
    /// Statement creating the index.
    pub sql: String,
    /// Why the index is suggested.
    pub reason: String,
}

impl Advice {
    pub(crate) fn new(table: &TableName, column: &str, role: ColumnRole, selectivity: f64) -> Self {
        let index = quote_identifier(&format!("idx_{}_{}", table.name, column));
        Self {
            table: table.to_string(),
            column: column.to_string(),
            sql: format!(
                "ALTER TABLE {table} ADD INDEX {index} ({})",
                quote_identifier(column)
            ),
            reason: format!(
                "column `{column}` is used in a {role} with selectivity {selectivity:.2} \
                 and has no index"
            ),
        }
    }
}

/// Collects every column reference of a statement.
#[must_use]
pub fn extract_columns(statement: &Statement) -> Vec<ColumnUsage> {
    let mut out = Vec::new();
    match statement {
        Statement::Select(select) => visit_select(select, &mut out),
        Statement::Update(update) => {
            visit_table_ref(&update.table, &mut out);
            for assignment in &update.assignments {
                visit_expr(&assignment.value, ColumnRole::Select, &mut out);
            }
            if let Some(predicate) = &update.where_clause {
                visit_expr(predicate, ColumnRole::Predicate, &mut out);
            }
            for order in &update.order_by {
                visit_expr(&order.expr, ColumnRole::OrderBy, &mut out);
            }
        }
        Statement::Delete(delete) => {
            if let Some(predicate) = &delete.where_clause {
                visit_expr(predicate, ColumnRole::Predicate, &mut out);
            }
            for order in &delete.order_by {
                visit_expr(&order.expr, ColumnRole::OrderBy, &mut out);
            }
        }
        Statement::Insert(insert) => {
            if let InsertSource::Query(query) = &insert.source {
                visit_select(query, &mut out);
            }
        }
        _ => {}
    }
    out
}

fn visit_select(select: &SelectStatement, out: &mut Vec<ColumnUsage>) {
    for column in &select.columns {
        visit_expr(&column.expr, ColumnRole::Select, out);
    }
    if let Some(from) = &select.from {
        visit_table_ref(from, out);
    }
    if let Some(predicate) = &select.where_clause {
        visit_expr(predicate, ColumnRole::Predicate, out);
    }
    for expr in &select.group_by {
        visit_expr(expr, ColumnRole::GroupBy, out);
    }
    if let Some(having) = &select.having {
        visit_expr(having, ColumnRole::Predicate, out);
    }
    for order in &select.order_by {
        visit_expr(&order.expr, ColumnRole::OrderBy, out);
    }
}

fn visit_table_ref(table: &TableRef, out: &mut Vec<ColumnUsage>) {
    match table {
        TableRef::Table { .. } => {}
        TableRef::Subquery { query, .. } => visit_select(query, out),
        TableRef::Join { left, join } => {
            visit_table_ref(left, out);
            visit_table_ref(&join.table, out);
            for column in &join.using {
                out.push(ColumnUsage {
                    qualifier: None,
                    column: column.clone(),
                    role: ColumnRole::JoinColumn,
                });
            }
            if let Some(on) = &join.on {
                visit_expr(on, ColumnRole::JoinPredicate, out);
            }
        }
    }
}

fn visit_expr(expr: &Expr, role: ColumnRole, out: &mut Vec<ColumnUsage>) {
    match expr {
        Expr::Column { table, name, .. } => out.push(ColumnUsage {
            qualifier: table.clone(),
            column: name.clone(),
            role,
        }),
        Expr::Binary { left, right, .. } => {
            visit_expr(left, role, out);
            visit_expr(right, role, out);
        }
        Expr::Unary { operand: inner, .. }
        | Expr::Paren(inner)
        | Expr::IsNull { expr: inner, .. }
        | Expr::Cast { expr: inner, .. }
        | Expr::Interval { value: inner, .. } => visit_expr(inner, role, out),
        Expr::Function(call) => {
            for arg in &call.args {
                visit_expr(arg, role, out);
            }
        }
        Expr::Subquery(query) | Expr::Exists(query) => visit_select(query, out),
        Expr::In { expr, list, .. } => {
            visit_expr(expr, role, out);
            for item in list {
                visit_expr(item, role, out);
            }
        }
        Expr::Between { expr, low, high, .. } => {
            visit_expr(expr, role, out);
            visit_expr(low, role, out);
            visit_expr(high, role, out);
        }
        Expr::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            if let Some(operand) = operand {
                visit_expr(operand, role, out);
            }
            for (when, then) in when_clauses {
                visit_expr(when, role, out);
                visit_expr(then, role, out);
            }
            if let Some(other) = else_clause {
                visit_expr(other, role, out);
            }
        }
        Expr::Literal(_)
        | Expr::Builtin(_)
        | Expr::Variable { .. }
        | Expr::Parameter { .. }
        | Expr::Wildcard { .. } => {}
    }
}

/// Base tables a statement reads at its top level, with their aliases.
#[must_use]
pub fn target_tables(statement: &Statement) -> Vec<(TableName, Option<String>)> {
    let owned = |(table, alias): (&TableName, Option<&str>)| {
        (table.clone(), alias.map(str::to_string))
    };
    match statement {
        Statement::Select(select) => select
            .from
            .as_ref()
            .map(|from| from.base_tables().into_iter().map(owned).collect())
            .unwrap_or_default(),
        Statement::Update(update) => update.table.base_tables().into_iter().map(owned).collect(),
        Statement::Delete(delete) => vec![(delete.table.clone(), delete.alias.clone())],
        _ => Vec::new(),
    }
}
