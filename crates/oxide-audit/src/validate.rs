//! Statement validation.
//!
//! Offline checks look only at the statement itself. Online checks add
//! existence checks against the session's view of the server, which already
//! includes the effect of earlier statements.

use std::collections::HashSet;

use oxide_mysql::ast::{
    AlterTableSpec, AlterTableStatement, ConstraintKind, CreateTableStatement, Expr,
    InsertSource, InsertStatement, SelectStatement, TableName, TableRef,
};
use oxide_mysql::Statement;

use crate::auditor::Auditor;
use crate::error::Result;

/// Returns the problems visible in the statement alone.
#[must_use]
pub fn validate_offline(statement: &Statement) -> Vec<String> {
    let mut problems = Vec::new();
    match statement {
        Statement::CreateTable(create) => check_create_table(create, &mut problems),
        Statement::AlterTable(alter) => check_alter_table(alter, &mut problems),
        Statement::Insert(insert) => check_insert_width(insert, None, &mut problems),
        _ => {}
    }
    problems
}

/// Returns the offline problems plus existence problems.
pub(crate) fn validate_online(auditor: &mut Auditor, statement: &Statement) -> Result<Vec<String>> {
    let mut problems = validate_offline(statement);
    match statement {
        Statement::Use(stmt) => {
            if !auditor.schema_exists(&stmt.schema)? {
                problems.push(schema_not_exist(&stmt.schema));
            }
        }
        Statement::CreateDatabase(stmt) => {
            if !stmt.if_not_exists && auditor.schema_exists(&stmt.name)? {
                problems.push(format!("schema `{}` already exists", stmt.name));
            }
        }
        Statement::DropDatabase(stmt) => {
            if !stmt.if_exists && !auditor.schema_exists(&stmt.name)? {
                problems.push(schema_not_exist(&stmt.name));
            }
        }
        Statement::CreateTable(create) => {
            let schema = auditor.schema_name(&create.table);
            if !auditor.schema_exists(&schema)? {
                problems.push(schema_not_exist(&schema));
            } else if !create.if_not_exists && auditor.table_exists(&create.table)? {
                problems.push(format!("table {} already exists", create.table));
            }
        }
        Statement::DropTable(drop) => {
            if !drop.if_exists {
                for table in &drop.tables {
                    require_table(auditor, table, &mut problems)?;
                }
            }
        }
        Statement::AlterTable(alter) => {
            if require_table(auditor, &alter.table, &mut problems)? {
                if let Some(definition) = auditor.create_table_stmt(&alter.table)? {
                    check_alter_against(&definition, alter, &mut problems);
                }
                check_rename_target(auditor, alter, &mut problems)?;
            }
        }
        Statement::Insert(insert) => {
            if require_table(auditor, &insert.table, &mut problems)? {
                if let Some(definition) = auditor.create_table_stmt(&insert.table)? {
                    for column in &insert.columns {
                        if definition.column(column).is_none() {
                            problems.push(column_not_exist(column));
                        }
                    }
                    if insert.columns.is_empty() {
                        check_insert_width(insert, Some(definition.columns.len()), &mut problems);
                    }
                }
            }
            if let InsertSource::Query(query) = &insert.source {
                require_select_tables(auditor, query, &mut problems)?;
            }
        }
        Statement::Update(update) => {
            for (table, _) in update.table.base_tables() {
                require_table(auditor, table, &mut problems)?;
            }
        }
        Statement::Delete(delete) => {
            require_table(auditor, &delete.table, &mut problems)?;
        }
        Statement::Select(select) => require_select_tables(auditor, select, &mut problems)?,
        Statement::Other(_) => {}
    }
    Ok(problems)
}

fn schema_not_exist(schema: &str) -> String {
    format!("schema `{schema}` does not exist")
}

fn column_not_exist(column: &str) -> String {
    format!("column `{column}` does not exist")
}

fn require_table(
    auditor: &mut Auditor,
    table: &TableName,
    problems: &mut Vec<String>,
) -> Result<bool> {
    let schema = auditor.schema_name(table);
    if !auditor.schema_exists(&schema)? {
        problems.push(schema_not_exist(&schema));
        return Ok(false);
    }
    if !auditor.table_exists(table)? {
        problems.push(format!("table {table} does not exist"));
        return Ok(false);
    }
    Ok(true)
}

/// An unqualified rename target stays in the schema of the altered table.
fn check_rename_target(
    auditor: &mut Auditor,
    alter: &AlterTableStatement,
    problems: &mut Vec<String>,
) -> Result<()> {
    let Some(renamed) = alter.renamed_to() else {
        return Ok(());
    };
    let schema = auditor.schema_name(&alter.table);
    let target = TableName::qualified(renamed.schema_or(&schema), renamed.name.clone());
    let case_insensitive = auditor.catalog().is_case_insensitive();
    let same = |a: &str, b: &str| {
        if case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    };
    let unchanged =
        same(&target.name, &alter.table.name) && same(renamed.schema_or(&schema), &schema);
    if !unchanged && auditor.table_exists(&target)? {
        problems.push(format!("table {target} already exists"));
    }
    Ok(())
}

fn require_select_tables(
    auditor: &mut Auditor,
    select: &SelectStatement,
    problems: &mut Vec<String>,
) -> Result<()> {
    if let Some(from) = &select.from {
        for (table, _) in from.base_tables() {
            require_table(auditor, table, problems)?;
        }
        for query in derived_tables(from) {
            require_select_tables(auditor, query, problems)?;
        }
    }
    Ok(())
}

fn derived_tables(table: &TableRef) -> Vec<&SelectStatement> {
    match table {
        TableRef::Table { .. } => Vec::new(),
        TableRef::Subquery { query, .. } => vec![query.as_ref()],
        TableRef::Join { left, join } => {
            let mut out = derived_tables(left);
            out.extend(derived_tables(&join.table));
            out
        }
    }
}

fn check_create_table(create: &CreateTableStatement, problems: &mut Vec<String>) {
    let mut columns = HashSet::new();
    for column in &create.columns {
        if !columns.insert(column.name.to_ascii_lowercase()) {
            problems.push(format!("column `{}` is duplicated", column.name));
        }
    }

    let mut indexes = HashSet::new();
    for name in create.constraints.iter().filter_map(|c| c.name.as_deref()) {
        if !indexes.insert(name.to_ascii_lowercase()) {
            problems.push(format!("index `{name}` is duplicated"));
        }
    }

    let primary_keys = create.constraints.iter().filter(|c| c.is_primary_key()).count()
        + create.columns.iter().filter(|c| c.is_primary_key()).count();
    if primary_keys > 1 {
        problems.push(String::from("multiple primary keys defined"));
    }

    for constraint in &create.constraints {
        if matches!(constraint.kind, ConstraintKind::Check(_)) {
            continue;
        }
        for part in &constraint.columns {
            if create.column(&part.name).is_none() {
                problems.push(format!("key column `{}` does not exist", part.name));
            }
        }
    }
}

fn check_alter_table(alter: &AlterTableStatement, problems: &mut Vec<String>) {
    let mut added = HashSet::new();
    for spec in &alter.specs {
        if let AlterTableSpec::AddColumns { columns, .. } = spec {
            for column in columns {
                if !added.insert(column.name.to_ascii_lowercase()) {
                    problems.push(format!("column `{}` is duplicated", column.name));
                }
            }
        }
    }
}

/// Checks an ALTER TABLE against the current definition of its table.
fn check_alter_against(
    definition: &CreateTableStatement,
    alter: &AlterTableStatement,
    problems: &mut Vec<String>,
) {
    let index_exists = |name: &str| definition.constraint(name).is_some();
    for spec in &alter.specs {
        match spec {
            AlterTableSpec::DropColumn(name)
            | AlterTableSpec::ChangeColumn { old_name: name, .. } => {
                if definition.column(name).is_none() {
                    problems.push(column_not_exist(name));
                }
            }
            AlterTableSpec::AlterColumnDefault { column, .. } => {
                if definition.column(column).is_none() && !adds_column(alter, column) {
                    problems.push(column_not_exist(column));
                }
            }
            AlterTableSpec::ModifyColumn { column, .. } => {
                if definition.column(&column.name).is_none() {
                    problems.push(column_not_exist(&column.name));
                }
            }
            AlterTableSpec::AddColumns { columns, .. } => {
                for column in columns {
                    if definition.column(&column.name).is_some() {
                        problems.push(format!("column `{}` already exists", column.name));
                    }
                }
            }
            AlterTableSpec::AddConstraint(constraint) => {
                if constraint.is_primary_key() {
                    if definition.has_primary_key() {
                        problems.push(String::from("primary key already exists"));
                    }
                } else if let Some(name) = constraint.name.as_deref().filter(|n| index_exists(n)) {
                    problems.push(format!("index `{name}` already exists"));
                }
            }
            AlterTableSpec::DropPrimaryKey => {
                if !definition.has_primary_key() {
                    problems.push(String::from("primary key does not exist"));
                }
            }
            AlterTableSpec::DropIndex(name)
            | AlterTableSpec::DropForeignKey(name)
            | AlterTableSpec::RenameIndex { from: name, .. } => {
                if !index_exists(name) {
                    problems.push(format!("index `{name}` does not exist"));
                }
            }
            AlterTableSpec::RenameTable(_) | AlterTableSpec::TableOptions(_) => {}
        }
    }
}

fn adds_column(alter: &AlterTableStatement, name: &str) -> bool {
    alter.specs.iter().any(|spec| match spec {
        AlterTableSpec::AddColumns { columns, .. } => columns.iter().any(|c| c.is_named(name)),
        _ => false,
    })
}

fn check_insert_width(
    insert: &InsertStatement,
    table_width: Option<usize>,
    problems: &mut Vec<String>,
) {
    let InsertSource::Values(rows) = &insert.source else {
        return;
    };
    let expected = if insert.columns.is_empty() {
        table_width.or_else(|| rows.first().map(Vec::len))
    } else {
        Some(insert.columns.len())
    };
    let Some(expected) = expected else {
        return;
    };
    for (index, row) in rows.iter().enumerate() {
        if row.len() != expected && !is_default_row(row) {
            problems.push(format!(
                "column count doesn't match value count at row {}",
                index + 1
            ));
        }
    }
}

/// `VALUES ()` inserts a row of defaults.
fn is_default_row(row: &[Expr]) -> bool {
    row.is_empty()
}
