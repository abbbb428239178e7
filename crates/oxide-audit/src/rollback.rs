//! Rollback statement synthesis.
//!
//! DDL is inverted from the tracked table definitions. DML rollback reads the
//! rows a statement is about to change, so it needs a connection and is
//! capped by the `dml_rollback_max_rows` rule.

use std::sync::Arc;

use oxide_mysql::ast::{
    quote_identifier, quote_string, AlterTableSpec, AlterTableStatement, Constraint,
    ConstraintKind, CreateTableStatement, DeleteStatement, Expr, InsertSource, InsertStatement,
    Literal, OrderBy, TableName, TableRef, UpdateStatement,
};
use oxide_mysql::Statement;
use serde::Serialize;

use crate::auditor::Auditor;
use crate::connection::Row;
use crate::error::Result;

/// A rollback statement and why it is missing or partial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackSql {
    /// Statements undoing the audited statement, `;`-terminated, one per
    /// line. Empty when no rollback is possible or needed.
    pub sql: String,
    /// Why no rollback (or only a partial one) was produced.
    pub reason: String,
}

impl RollbackSql {
    fn statements(statements: Vec<String>) -> Self {
        Self {
            sql: statements
                .into_iter()
                .map(|statement| format!("{statement};"))
                .collect::<Vec<_>>()
                .join("\n"),
            reason: String::new(),
        }
    }

    fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            sql: String::new(),
            reason: reason.into(),
        }
    }

    fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Returns true if there is nothing to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Builds the rollback of `statement` from the session state before it runs.
pub(crate) fn generate(auditor: &mut Auditor, statement: &Statement) -> Result<RollbackSql> {
    match statement {
        Statement::CreateDatabase(stmt) => {
            if auditor.schema_exists(&stmt.name)? {
                return Ok(RollbackSql::default());
            }
            Ok(RollbackSql::statements(vec![format!(
                "DROP DATABASE IF EXISTS {}",
                quote_identifier(&stmt.name)
            )]))
        }
        Statement::DropDatabase(_) => Ok(RollbackSql::unsupported(
            "DROP DATABASE cannot be rolled back",
        )),
        Statement::CreateTable(create) => {
            if auditor.table_exists(&create.table)? {
                return Ok(RollbackSql::default());
            }
            let table = qualified(auditor, &create.table);
            Ok(RollbackSql::statements(vec![format!(
                "DROP TABLE IF EXISTS {table}"
            )]))
        }
        Statement::DropTable(drop) => {
            let mut statements = Vec::new();
            for table in &drop.tables {
                if !auditor.table_exists(table)? {
                    continue;
                }
                if let Some(definition) = auditor.create_table_stmt(table)? {
                    let mut create = CreateTableStatement::clone(&definition);
                    create.table = qualified(auditor, table);
                    create.if_not_exists = false;
                    statements.push(create.to_string());
                }
            }
            Ok(RollbackSql::statements(statements))
        }
        Statement::AlterTable(alter) => alter_rollback(auditor, alter),
        Statement::Insert(insert) => insert_rollback(auditor, insert),
        Statement::Delete(delete) => delete_rollback(auditor, delete),
        Statement::Update(update) => update_rollback(auditor, update),
        Statement::Use(_) | Statement::Select(_) | Statement::Other(_) => {
            Ok(RollbackSql::default())
        }
    }
}

fn qualified(auditor: &Auditor, table: &TableName) -> TableName {
    TableName::qualified(auditor.schema_name(table), table.name.clone())
}

// ==================== ALTER TABLE ====================

fn alter_rollback(auditor: &mut Auditor, alter: &AlterTableStatement) -> Result<RollbackSql> {
    if !auditor.table_exists(&alter.table)? {
        return Ok(RollbackSql::default());
    }
    let Some(definition) = auditor.create_table_stmt(&alter.table)? else {
        return Ok(RollbackSql::default());
    };

    let specs: Vec<AlterTableSpec> = alter
        .specs
        .iter()
        .rev()
        .flat_map(|spec| invert_spec(&definition, spec))
        .collect();
    if specs.is_empty() {
        return Ok(RollbackSql::default());
    }

    let current = qualified(auditor, &alter.table);
    // The inverse runs after the forward statement, under the new name.
    let table = match alter.renamed_to() {
        Some(renamed) => TableName {
            schema: renamed.schema.clone().or(current.schema),
            name: renamed.name.clone(),
        },
        None => current,
    };
    let inverse = AlterTableStatement { table, specs };
    Ok(RollbackSql::statements(vec![inverse.to_string()]))
}

fn invert_spec(definition: &CreateTableStatement, spec: &AlterTableSpec) -> Vec<AlterTableSpec> {
    let old_column = |name: &str| definition.column(name).cloned();
    match spec {
        AlterTableSpec::RenameTable(_) => {
            vec![AlterTableSpec::RenameTable(definition.table.clone())]
        }
        AlterTableSpec::DropColumn(name) => old_column(name)
            .map(|column| AlterTableSpec::AddColumns {
                columns: vec![column],
                position: None,
            })
            .into_iter()
            .collect(),
        AlterTableSpec::ChangeColumn {
            old_name, column, ..
        } => old_column(old_name)
            .map(|old| AlterTableSpec::ChangeColumn {
                old_name: column.name.clone(),
                column: old,
                position: None,
            })
            .into_iter()
            .collect(),
        AlterTableSpec::ModifyColumn { column, .. } => old_column(&column.name)
            .map(|old| AlterTableSpec::ModifyColumn {
                column: old,
                position: None,
            })
            .into_iter()
            .collect(),
        AlterTableSpec::AlterColumnDefault { column, .. } => old_column(column)
            .map(|old| AlterTableSpec::AlterColumnDefault {
                column: old.name.clone(),
                default: old.default_value().cloned(),
            })
            .into_iter()
            .collect(),
        AlterTableSpec::AddColumns { columns, .. } => columns
            .iter()
            .map(|column| AlterTableSpec::DropColumn(column.name.clone()))
            .collect(),
        AlterTableSpec::DropPrimaryKey => definition
            .primary_key_columns()
            .map(|columns| {
                AlterTableSpec::AddConstraint(Arc::new(Constraint::primary_key(columns)))
            })
            .into_iter()
            .collect(),
        AlterTableSpec::DropIndex(name) | AlterTableSpec::DropForeignKey(name) => definition
            .constraint(name)
            .map(|constraint| AlterTableSpec::AddConstraint(Arc::clone(constraint)))
            .into_iter()
            .collect(),
        AlterTableSpec::RenameIndex { from, to } => vec![AlterTableSpec::RenameIndex {
            from: to.clone(),
            to: from.clone(),
        }],
        AlterTableSpec::AddConstraint(constraint) => {
            drop_constraint(constraint).into_iter().collect()
        }
        AlterTableSpec::TableOptions(options) => {
            let restored: Vec<_> = options
                .iter()
                .filter_map(|option| definition.option(option.name()).cloned())
                .collect();
            if restored.is_empty() {
                Vec::new()
            } else {
                vec![AlterTableSpec::TableOptions(restored)]
            }
        }
    }
}

fn drop_constraint(constraint: &Constraint) -> Option<AlterTableSpec> {
    match &constraint.kind {
        ConstraintKind::PrimaryKey => Some(AlterTableSpec::DropPrimaryKey),
        ConstraintKind::ForeignKey(_) => constraint
            .name
            .clone()
            .map(AlterTableSpec::DropForeignKey),
        ConstraintKind::Unique | ConstraintKind::Index | ConstraintKind::Fulltext => {
            constraint.name.clone().map(AlterTableSpec::DropIndex)
        }
        ConstraintKind::Check(_) => None,
    }
}

// ==================== DML ====================

fn exceeds_cap(auditor: &Auditor, rows: u64) -> bool {
    let cap = auditor.limits().dml_rollback_max_rows;
    i64::try_from(rows).map_or(true, |rows| rows > cap)
}

fn too_many_rows(auditor: &Auditor) -> RollbackSql {
    RollbackSql::unsupported(format!(
        "affects more than {} rows, not rolled back",
        auditor.limits().dml_rollback_max_rows
    ))
}

fn render_value(value: Option<&str>) -> String {
    value.map_or_else(|| String::from("NULL"), quote_string)
}

fn insert_rollback(auditor: &mut Auditor, insert: &InsertStatement) -> Result<RollbackSql> {
    let rows: Vec<Vec<(String, Expr)>> = match &insert.source {
        InsertSource::Values(rows) => {
            let columns = if insert.columns.is_empty() {
                match auditor.create_table_stmt(&insert.table)? {
                    Some(definition) => definition.columns.iter().map(|c| c.name.clone()).collect(),
                    None => return Ok(RollbackSql::default()),
                }
            } else {
                insert.columns.clone()
            };
            rows.iter()
                .map(|row| columns.iter().cloned().zip(row.iter().cloned()).collect())
                .collect()
        }
        InsertSource::Set(assignments) => vec![assignments
            .iter()
            .map(|a| (a.column.clone(), a.value.clone()))
            .collect()],
        InsertSource::Query(_) => {
            return Ok(RollbackSql::unsupported("INSERT ... SELECT is not rolled back"))
        }
    };

    let Some(definition) = auditor.create_table_stmt(&insert.table)? else {
        return Ok(RollbackSql::default());
    };
    let Some(primary_key) = definition.primary_key_columns() else {
        return Ok(RollbackSql::unsupported("table has no primary key"));
    };
    if exceeds_cap(auditor, rows.len() as u64) {
        return Ok(too_many_rows(auditor));
    }

    let table = qualified(auditor, &insert.table);
    let mut statements = Vec::with_capacity(rows.len());
    for row in rows {
        let mut predicates = Vec::with_capacity(primary_key.len());
        for key in &primary_key {
            let value = row
                .iter()
                .find(|(column, _)| column.eq_ignore_ascii_case(key))
                .map(|(_, value)| value);
            match value {
                Some(value) if value.is_constant() => {
                    predicates.push(Expr::column(key.clone()).eq(value.clone()));
                }
                _ => {
                    return Ok(RollbackSql::unsupported(format!(
                        "primary key `{key}` has no literal value"
                    )))
                }
            }
        }
        if let Some(predicate) = Expr::conjunction(predicates) {
            statements.push(format!("DELETE FROM {table} WHERE {predicate}"));
        }
    }
    Ok(RollbackSql::statements(statements))
}

/// Renders `FROM ... [WHERE ...] [ORDER BY ...] [LIMIT ...]` for reading
/// the rows a statement touches.
fn row_source(
    table: &TableName,
    alias: Option<&str>,
    where_clause: Option<&Expr>,
    order_by: &[OrderBy],
    limit: Option<&Expr>,
) -> String {
    let mut sql = format!("FROM {table}");
    if let Some(alias) = alias {
        sql.push_str(&format!(" AS {}", quote_identifier(alias)));
    }
    if let Some(predicate) = where_clause {
        sql.push_str(&format!(" WHERE {predicate}"));
    }
    if !order_by.is_empty() {
        let order: Vec<String> = order_by.iter().map(ToString::to_string).collect();
        sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

/// Counts the rows a statement touches, honouring a literal LIMIT.
fn affected_rows(
    auditor: &mut Auditor,
    source_without_limit: &str,
    limit: Option<&Expr>,
) -> Result<u64> {
    let count = auditor.count(&format!("SELECT COUNT(*) AS count {source_without_limit}"))?;
    let limit = match limit {
        Some(Expr::Literal(Literal::Integer(n))) => u64::try_from(*n).ok(),
        _ => None,
    };
    Ok(limit.map_or(count, |limit| count.min(limit)))
}

fn delete_rollback(auditor: &mut Auditor, delete: &DeleteStatement) -> Result<RollbackSql> {
    if auditor.create_table_stmt(&delete.table)?.is_none() {
        return Ok(RollbackSql::default());
    }
    let table = qualified(auditor, &delete.table);
    let alias = delete.alias.as_deref();
    let counted = row_source(&table, alias, delete.where_clause.as_ref(), &[], None);
    let count = affected_rows(auditor, &counted, delete.limit.as_ref())?;
    if exceeds_cap(auditor, count) {
        return Ok(too_many_rows(auditor));
    }
    if count == 0 {
        return Ok(RollbackSql::default());
    }

    let source = row_source(
        &table,
        alias,
        delete.where_clause.as_ref(),
        &delete.order_by,
        delete.limit.as_ref(),
    );
    let rows = auditor.rows(&format!("SELECT * {source}"))?;
    let Some(first) = rows.first() else {
        return Ok(RollbackSql::default());
    };

    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|(name, _)| quote_identifier(name))
        .collect();
    let tuples: Vec<String> = rows.iter().map(value_tuple).collect();
    Ok(RollbackSql::statements(vec![format!(
        "INSERT INTO {table} ({}) VALUES {}",
        columns.join(", "),
        tuples.join(", ")
    )]))
}

fn value_tuple(row: &Row) -> String {
    let values: Vec<String> = row
        .columns()
        .iter()
        .map(|(_, value)| render_value(value.as_deref()))
        .collect();
    format!("({})", values.join(", "))
}

fn update_rollback(auditor: &mut Auditor, update: &UpdateStatement) -> Result<RollbackSql> {
    let (target, alias) = match &update.table {
        TableRef::Table { table, alias } => (table, alias.as_deref()),
        _ => {
            return Ok(RollbackSql::unsupported(
                "multi-table UPDATE is not rolled back",
            ))
        }
    };
    let Some(definition) = auditor.create_table_stmt(target)? else {
        return Ok(RollbackSql::default());
    };
    let Some(primary_key) = definition.primary_key_columns() else {
        return Ok(RollbackSql::unsupported("table has no primary key"));
    };

    let table = qualified(auditor, target);
    let counted = row_source(&table, alias, update.where_clause.as_ref(), &[], None);
    let count = affected_rows(auditor, &counted, update.limit.as_ref())?;
    if exceeds_cap(auditor, count) {
        return Ok(too_many_rows(auditor));
    }
    if count == 0 {
        return Ok(RollbackSql::default());
    }

    let is_key = |column: &str| primary_key.iter().any(|key| key.eq_ignore_ascii_case(column));
    let mut restored: Vec<&str> = Vec::new();
    let mut skipped_key = false;
    for assignment in &update.assignments {
        if is_key(&assignment.column) {
            skipped_key = true;
        } else if !restored
            .iter()
            .any(|column| column.eq_ignore_ascii_case(&assignment.column))
        {
            restored.push(&assignment.column);
        }
    }

    let source = row_source(
        &table,
        alias,
        update.where_clause.as_ref(),
        &update.order_by,
        update.limit.as_ref(),
    );
    let rows = auditor.rows(&format!("SELECT * {source}"))?;

    let mut statements = Vec::with_capacity(rows.len());
    for row in &rows {
        if restored.is_empty() {
            break;
        }
        let set: Vec<String> = restored
            .iter()
            .map(|column| {
                format!("{} = {}", quote_identifier(column), render_value(row.get(column)))
            })
            .collect();
        let filter: Vec<String> = primary_key
            .iter()
            .map(|key| match row.get(key) {
                Some(value) => format!("{} = {}", quote_identifier(key), quote_string(value)),
                None => format!("{} IS NULL", quote_identifier(key)),
            })
            .collect();
        statements.push(format!(
            "UPDATE {table} SET {} WHERE {}",
            set.join(", "),
            filter.join(" AND ")
        ));
    }

    let rollback = RollbackSql::statements(statements);
    Ok(if skipped_key {
        rollback.reason("primary key assignments are not rolled back")
    } else {
        rollback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_mysql::Parser;

    fn create(sql: &str) -> Arc<CreateTableStatement> {
        match Parser::new(sql).parse_statement().unwrap() {
            Statement::CreateTable(create) => create,
            other => panic!("Expected CREATE TABLE, got {other:?}"),
        }
    }

    fn alter(sql: &str) -> Arc<AlterTableStatement> {
        match Parser::new(sql).parse_statement().unwrap() {
            Statement::AlterTable(alter) => alter,
            other => panic!("Expected ALTER TABLE, got {other:?}"),
        }
    }

    fn inverse(definition: &CreateTableStatement, sql: &str) -> Vec<String> {
        alter(sql)
            .specs
            .iter()
            .rev()
            .flat_map(|spec| invert_spec(definition, spec))
            .map(|spec| spec.to_string())
            .collect()
    }

    #[test]
    fn test_invert_columns() {
        let table = create("CREATE TABLE t (id INT, v VARCHAR(10) DEFAULT 'x', w INT)");
        assert_eq!(
            inverse(
                &table,
                "ALTER TABLE t DROP COLUMN w, CHANGE v v2 TEXT, ADD COLUMN z INT, \
                 ALTER COLUMN id SET DEFAULT 3"
            ),
            vec![
                "ALTER COLUMN `id` DROP DEFAULT",
                "DROP COLUMN `z`",
                "CHANGE COLUMN `v2` `v` VARCHAR(10) DEFAULT 'x'",
                "ADD COLUMN `w` INT",
            ]
        );
    }

    #[test]
    fn test_invert_keys_and_options() {
        let table = create(
            "CREATE TABLE t (id INT, c INT, PRIMARY KEY (id), KEY idx_c (c)) ENGINE=InnoDB",
        );
        assert_eq!(
            inverse(
                &table,
                "ALTER TABLE t DROP PRIMARY KEY, DROP INDEX idx_c, ADD UNIQUE KEY uk_c (c), \
                 RENAME INDEX a TO b, ENGINE=MyISAM"
            ),
            vec![
                "ENGINE=InnoDB",
                "RENAME INDEX `b` TO `a`",
                "DROP INDEX `uk_c`",
                "ADD KEY `idx_c` (`c`)",
                "ADD PRIMARY KEY (`id`)",
            ]
        );
    }
}
