//! Catalog loading, forking and statement tracking.

mod common;

use std::sync::Arc;

use common::*;
use oxide_audit::catalog::{Catalog, TableInfo, LOWER_CASE_TABLE_NAMES};
use oxide_mysql::ast::TableName;

fn loaded(schema: &str, tables: &[&str]) -> Catalog {
    let mut catalog = Catalog::with_current_schema(schema);
    catalog.load_schemas([schema]);
    catalog.load_tables(schema, tables.iter().copied());
    catalog
}

// ==================== Loading ====================

#[test]
fn test_load_schemas_once() {
    let mut catalog = Catalog::new();
    catalog.load_schemas(["a", "b"]);
    catalog.load_schemas(["c"]);
    assert!(catalog.schemas_loaded());
    assert_eq!(catalog.schema_names().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn test_load_tables_once() {
    let mut catalog = loaded("shop", &["orders"]);
    catalog.load_tables("shop", ["users"]);
    assert!(catalog.has_table("shop", "orders"));
    assert!(!catalog.has_table("shop", "users"));
}

#[test]
fn test_load_tables_unknown_schema() {
    let mut catalog = Catalog::new();
    catalog.load_schemas(["shop"]);
    catalog.load_tables("nope", ["t"]);
    assert!(!catalog.tables_loaded("nope"));
    assert!(!catalog.tables_loaded("shop"));
}

#[test]
fn test_loaded_tables_come_from_db() {
    let catalog = loaded("shop", &["orders"]);
    let info = catalog.table("shop", "orders").unwrap();
    assert!(info.is_loaded_from_db);
    assert!(info.definition().is_none());
    assert_eq!(info.size, None);
}

// ==================== Case sensitivity ====================

#[test]
fn test_case_insensitive_lookup() {
    let mut catalog = loaded("shop", &["t1"]);
    catalog.add_sys_var(LOWER_CASE_TABLE_NAMES, "1");
    assert!(catalog.has_table("shop", "T1"));
    assert!(catalog.has_table("SHOP", "t1"));
}

#[test]
fn test_case_sensitive_lookup() {
    let mut catalog = loaded("shop", &["t1"]);
    catalog.add_sys_var(LOWER_CASE_TABLE_NAMES, "0");
    assert!(!catalog.has_table("shop", "T1"));
    assert!(catalog.has_table("shop", "t1"));
}

// ==================== Fork ====================

#[test]
fn test_fork_isolation() {
    let mut parent = loaded("shop", &["orders"]);
    parent.update(&statement("CREATE TABLE users (id INT PRIMARY KEY)"));

    let mut child = parent.fork();
    child.update(&statement("DROP TABLE orders"));
    child.update(&statement("ALTER TABLE users ADD COLUMN name TEXT"));
    child.update(&statement("CREATE TABLE audit_log (id INT)"));

    assert!(parent.has_table("shop", "orders"));
    assert!(!parent.has_table("shop", "audit_log"));
    let users = parent.table("shop", "users").unwrap();
    assert!(users.alter_history.is_empty());
    assert_eq!(column_names(users.definition().unwrap()), vec!["id"]);

    assert!(!child.has_table("shop", "orders"));
    let users = child.table("shop", "users").unwrap();
    assert_eq!(column_names(users.definition().unwrap()), vec!["id", "name"]);
}

#[test]
fn test_fork_shares_definitions() {
    let mut parent = loaded("shop", &[]);
    parent.update(&statement("CREATE TABLE users (id INT PRIMARY KEY)"));
    let child = parent.fork();
    let a = parent.table("shop", "users").unwrap().definition().unwrap();
    let b = child.table("shop", "users").unwrap().definition().unwrap();
    assert!(Arc::ptr_eq(a, b));
}

#[test]
fn test_fork_drops_statistics() {
    let mut parent = loaded("shop", &["orders"]);
    let table = TableName::new("orders");
    parent.set_selectivity(&table, "status", 0.5);
    parent.add_execution_plan("SELECT 1", Vec::new());
    parent.add_sys_var(LOWER_CASE_TABLE_NAMES, "0");
    parent.schema_mut("shop").unwrap().default_engine = Some(String::from("InnoDB"));

    let child = parent.fork();
    assert_eq!(parent.selectivity(&table, "STATUS"), Some(0.5));
    assert_eq!(child.selectivity(&table, "status"), None);
    assert!(child.execution_plan("SELECT 1").is_none());
    assert_eq!(child.sys_var(LOWER_CASE_TABLE_NAMES), Some("0"));
    assert_eq!(
        child.schema("shop").unwrap().default_engine.as_deref(),
        Some("InnoDB")
    );
    assert_eq!(child.current_schema(), "shop");
}

// ==================== Update ====================

#[test]
fn test_sequential_consistency() {
    let mut catalog = Catalog::new();
    catalog.update(&statement("CREATE TABLE t (id int primary key)"));
    catalog.update(&statement("ALTER TABLE t ADD COLUMN name varchar(50)"));
    catalog.update(&statement("ALTER TABLE t DROP PRIMARY KEY"));

    let info = catalog.table("", "t").unwrap();
    let definition = info.definition().unwrap();
    assert_eq!(column_names(definition), vec!["id", "name"]);
    assert!(!definition.has_primary_key());
    assert_eq!(info.alter_history.len(), 2);
    assert!(!info.is_loaded_from_db);
    assert_eq!(info.size, Some(0.0));
}

#[test]
fn test_failed_merge_still_recorded() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("CREATE TABLE t (id INT)"));
    catalog.update(&statement("ALTER TABLE t DROP COLUMN missing"));

    let info = catalog.table("shop", "t").unwrap();
    assert_eq!(info.alter_history.len(), 1);
    assert!(info.merged.is_none());
    assert_eq!(column_names(info.definition().unwrap()), vec!["id"]);
}

#[test]
fn test_create_table_keeps_existing() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("CREATE TABLE t (id INT)"));
    catalog.update(&statement("CREATE TABLE IF NOT EXISTS t (other INT)"));
    let info = catalog.table("shop", "t").unwrap();
    assert_eq!(column_names(info.definition().unwrap()), vec!["id"]);
}

#[test]
fn test_create_table_in_unloaded_schema() {
    let mut catalog = Catalog::new();
    catalog.load_schemas(["shop"]);
    catalog.update(&statement("CREATE TABLE shop.t (id INT)"));
    assert!(!catalog.has_table("shop", "t"));
}

#[test]
fn test_databases() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("CREATE DATABASE archive"));
    assert!(catalog.has_schema("archive"));
    assert!(catalog.tables_loaded("archive"));

    catalog.update(&statement("USE archive"));
    assert_eq!(catalog.current_schema(), "archive");
    catalog.update(&statement("USE nope"));
    assert_eq!(catalog.current_schema(), "archive");

    catalog.update(&statement("DROP DATABASE archive"));
    assert!(!catalog.has_schema("archive"));
}

#[test]
fn test_databases_ignored_before_load() {
    let mut catalog = Catalog::new();
    catalog.update(&statement("CREATE DATABASE archive"));
    assert!(!catalog.has_schema("archive"));
}

#[test]
fn test_drop_table() {
    let mut catalog = loaded("shop", &["a", "b"]);
    catalog.update(&statement("DROP TABLE a, shop.b"));
    assert!(!catalog.has_table("shop", "a"));
    assert!(!catalog.has_table("shop", "b"));
}

#[test]
fn test_rename_moves_table() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("CREATE TABLE t (id INT)"));
    catalog.update(&statement("ALTER TABLE t RENAME TO t2"));

    assert!(!catalog.has_table("shop", "t"));
    let info = catalog.table("shop", "t2").unwrap();
    assert_eq!(info.alter_history.len(), 1);
    assert_eq!(info.definition().unwrap().table.name, "t2");
}

#[test]
fn test_failed_merge_keeps_table_name() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("CREATE TABLE t (id INT)"));
    catalog.update(&statement("ALTER TABLE t RENAME TO t2, DROP COLUMN missing"));

    assert!(!catalog.has_table("shop", "t2"));
    let info = catalog.table("shop", "t").unwrap();
    assert_eq!(info.alter_history.len(), 1);
    assert_eq!(info.definition().unwrap().table.name, "t");
}

#[test]
fn test_rename_onto_existing_table() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("CREATE TABLE a (id INT)"));
    catalog.update(&statement("CREATE TABLE b (x INT, y INT)"));
    catalog.update(&statement("ALTER TABLE a RENAME TO b"));

    let a = catalog.table("shop", "a").unwrap();
    assert_eq!(a.alter_history.len(), 1);
    assert_eq!(a.definition().unwrap().table.name, "a");
    let b = catalog.table("shop", "b").unwrap();
    assert_eq!(column_names(b.definition().unwrap()), vec!["x", "y"]);
}

#[test]
fn test_rename_changing_case_only() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("CREATE TABLE t (id INT)"));
    catalog.update(&statement("ALTER TABLE t RENAME TO T"));
    assert!(catalog.has_table("shop", "t"));
}

#[test]
fn test_alter_untracked_table() {
    let mut catalog = loaded("shop", &[]);
    catalog.update(&statement("ALTER TABLE ghost ADD COLUMN a INT"));
    assert!(!catalog.has_table("shop", "ghost"));
}

#[test]
fn test_add_and_delete_table() {
    let mut catalog = loaded("shop", &[]);
    assert!(catalog.add_table("shop", "t", TableInfo::created(create("CREATE TABLE t (id INT)"))));
    let removed = catalog.del_table("shop", "T").unwrap();
    assert!(removed.definition().is_some());
    assert!(catalog.del_table("shop", "t").is_none());
}

#[test]
fn test_add_schema_has_no_tables() {
    let mut catalog = loaded("shop", &[]);
    catalog.add_schema("archive");
    assert!(catalog.tables_loaded("archive"));
    let info = TableInfo::created(create("CREATE TABLE t (id INT)"));
    assert!(catalog.add_table("archive", "t", info));

    catalog.load_tables("archive", ["server_side"]);
    assert!(!catalog.has_table("archive", "server_side"));
}
