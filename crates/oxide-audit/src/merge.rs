//! Folding ALTER TABLE statements into tracked table definitions.
//!
//! Clauses are applied in a fixed order regardless of how they are written:
//! rename, drop column, change column, modify column, alter default, add
//! columns, drop primary key, drop index, rename index, add constraint. The
//! first clause whose target is missing (or already present, for additions)
//! rejects the whole statement and the original definition is returned
//! unchanged. Table options and foreign key drops do not affect the tracked
//! definition.

use std::sync::Arc;

use oxide_mysql::ast::{
    AlterTableSpec, AlterTableStatement, ColumnDef, ColumnPosition, Constraint,
    CreateTableStatement, Expr, TableName,
};
use tracing::warn;

/// Folds `alter` into `original`.
///
/// Returns the new definition and `true`, or a clone of `original` and
/// `false` when a clause cannot be applied. `original` is never modified;
/// untouched columns and constraints are shared with the result.
#[must_use]
pub fn merge_alter_table(
    original: &Arc<CreateTableStatement>,
    alter: &AlterTableStatement,
) -> (Arc<CreateTableStatement>, bool) {
    match apply_specs(original, alter) {
        Ok(merged) => (Arc::new(merged), true),
        Err(reason) => {
            warn!(table = %original.table, reason = %reason, "ALTER TABLE not merged");
            (Arc::clone(original), false)
        }
    }
}

fn apply_specs(
    original: &CreateTableStatement,
    alter: &AlterTableStatement,
) -> Result<CreateTableStatement, String> {
    let mut table = original.clone();
    let specs = &alter.specs;

    for spec in specs {
        if let AlterTableSpec::RenameTable(name) = spec {
            table.table = TableName {
                schema: name.schema.clone().or_else(|| table.table.schema.clone()),
                name: name.name.clone(),
            };
        }
    }

    for spec in specs {
        if let AlterTableSpec::DropColumn(name) = spec {
            let index = column_index(&table, name)?;
            table.columns.remove(index);
        }
    }

    for spec in specs {
        if let AlterTableSpec::ChangeColumn {
            old_name,
            column,
            position,
        } = spec
        {
            let index = column_index(&table, old_name)?;
            replace_column(&mut table, index, Arc::clone(column), position.as_ref());
        }
    }

    for spec in specs {
        if let AlterTableSpec::ModifyColumn { column, position } = spec {
            let index = column_index(&table, &column.name)?;
            replace_column(&mut table, index, Arc::clone(column), position.as_ref());
        }
    }

    // A default may target a column added by the same statement; it is
    // applied once the column exists.
    let mut deferred_defaults = Vec::new();
    for spec in specs {
        if let AlterTableSpec::AlterColumnDefault { column, default } = spec {
            match table.columns.iter().position(|c| c.is_named(column)) {
                Some(index) => set_default(&mut table, index, default.as_ref()),
                None if adds_column(specs, column) => deferred_defaults.push((column, default)),
                None => return Err(format!("column `{column}` does not exist")),
            }
        }
    }

    for spec in specs {
        if let AlterTableSpec::AddColumns { columns, position } = spec {
            for column in columns {
                if table.column(&column.name).is_some() {
                    return Err(format!("column `{}` already exists", column.name));
                }
                insert_column(&mut table, Arc::clone(column), position.as_ref());
            }
        }
    }
    for (column, default) in deferred_defaults {
        let index = column_index(&table, column)?;
        set_default(&mut table, index, default.as_ref());
    }

    if specs.contains(&AlterTableSpec::DropPrimaryKey) {
        if !table.has_primary_key() {
            return Err(String::from("no primary key to drop"));
        }
        table.constraints.retain(|c| !c.is_primary_key());
        for column in &mut table.columns {
            if column.is_primary_key() {
                *column = Arc::new(column.without_primary_key());
            }
        }
    }

    for spec in specs {
        if let AlterTableSpec::DropIndex(name) = spec {
            let index = table
                .constraints
                .iter()
                .position(|c| c.is_named(name))
                .ok_or_else(|| format!("index `{name}` does not exist"))?;
            table.constraints.remove(index);
        }
    }

    for spec in specs {
        if let AlterTableSpec::RenameIndex { from, to } = spec {
            let index = table
                .constraints
                .iter()
                .position(|c| c.is_named(from))
                .ok_or_else(|| format!("index `{from}` does not exist"))?;
            let renamed = Constraint {
                name: Some(to.clone()),
                ..Constraint::clone(&table.constraints[index])
            };
            table.constraints[index] = Arc::new(renamed);
        }
    }

    for spec in specs {
        if let AlterTableSpec::AddConstraint(constraint) = spec {
            if constraint.is_primary_key() {
                if table.has_primary_key() {
                    return Err(String::from("primary key already exists"));
                }
            } else if let Some(name) = &constraint.name {
                if table.constraint(name).is_some() {
                    return Err(format!("index `{name}` already exists"));
                }
            }
            table.constraints.push(Arc::clone(constraint));
        }
    }

    Ok(table)
}

fn column_index(table: &CreateTableStatement, name: &str) -> Result<usize, String> {
    table
        .columns
        .iter()
        .position(|c| c.is_named(name))
        .ok_or_else(|| format!("column `{name}` does not exist"))
}

fn adds_column(specs: &[AlterTableSpec], name: &str) -> bool {
    specs.iter().any(|spec| match spec {
        AlterTableSpec::AddColumns { columns, .. } => columns.iter().any(|c| c.is_named(name)),
        _ => false,
    })
}

fn set_default(table: &mut CreateTableStatement, index: usize, default: Option<&Expr>) {
    let current = &table.columns[index];
    let updated = match default {
        Some(value) => current.with_default(value.clone()),
        None => current.without_default(),
    };
    table.columns[index] = Arc::new(updated);
}

fn replace_column(
    table: &mut CreateTableStatement,
    index: usize,
    column: Arc<ColumnDef>,
    position: Option<&ColumnPosition>,
) {
    if position.is_none() {
        table.columns[index] = column;
        return;
    }
    table.columns.remove(index);
    insert_column(table, column, position);
}

/// Inserts at FIRST / AFTER, appending when the anchor column is unknown.
fn insert_column(
    table: &mut CreateTableStatement,
    column: Arc<ColumnDef>,
    position: Option<&ColumnPosition>,
) {
    let index = match position {
        Some(ColumnPosition::First) => 0,
        Some(ColumnPosition::After(anchor)) => table
            .columns
            .iter()
            .position(|c| c.is_named(anchor))
            .map_or(table.columns.len(), |i| i + 1),
        None => table.columns.len(),
    };
    table.columns.insert(index, column);
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_mysql::{Parser, Statement};

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

    #[test]
    fn test_column_positions() {
        let table = create("CREATE TABLE t (a INT, b INT, c INT)");
        let statement = alter("ALTER TABLE t ADD COLUMN x INT AFTER a, MODIFY c INT FIRST");
        let (merged, applied) = merge_alter_table(&table, &statement);
        assert!(applied);
        let names: Vec<_> = merged.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "x", "b"]);
    }

    #[test]
    fn test_unknown_anchor_appends() {
        let table = create("CREATE TABLE t (a INT)");
        let (merged, applied) =
            merge_alter_table(&table, &alter("ALTER TABLE t ADD COLUMN x INT AFTER nope"));
        assert!(applied);
        assert_eq!(merged.columns[1].name, "x");
    }

    #[test]
    fn test_rename_keeps_schema() {
        let table = create("CREATE TABLE db.t (a INT)");
        let (merged, _) = merge_alter_table(&table, &alter("ALTER TABLE db.t RENAME TO t2"));
        assert_eq!(merged.table, TableName::qualified("db", "t2"));
    }
}
