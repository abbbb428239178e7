//! Tests for DDL parsing: CREATE/ALTER/DROP TABLE and databases.

mod common;

use common::*;

use oxide_mysql::ast::{
    AlterTableSpec, ColumnPosition, ConstraintKind, DataType, Expr, OrderDirection,
    ReferentialAction, Statement, StatementCategory, TableName, TableOption,
};

const ORDERS_DDL: &str = "CREATE TABLE IF NOT EXISTS shop.orders (
  id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,
  user_id INT(11) NOT NULL DEFAULT 0 COMMENT 'owner',
  status ENUM('new', 'paid') NOT NULL DEFAULT 'new',
  amount DECIMAL(10, 2) DEFAULT NULL,
  note TEXT,
  created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
  PRIMARY KEY (id),
  KEY idx_user (user_id, created_at DESC),
  UNIQUE KEY uk_note (note(20)),
  CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='orders'";

// ===================================================================
// CREATE TABLE
// ===================================================================

#[test]
fn create_table_columns() {
    let create = parse_create_table(ORDERS_DDL);
    assert!(create.if_not_exists);
    assert!(!create.temporary);
    assert_eq!(create.table, TableName::qualified("shop", "orders"));
    assert_eq!(create.columns.len(), 6);

    let id = create.column("id").unwrap();
    assert_eq!(id.data_type, DataType::Bigint(None));
    assert!(id.unsigned);
    assert!(id.is_not_null());
    assert!(id.is_auto_increment());

    let user_id = create.column("USER_ID").unwrap();
    assert_eq!(user_id.data_type, DataType::Int(Some(11)));
    assert_eq!(user_id.default_value(), Some(&Expr::integer(0)));

    let status = create.column("status").unwrap();
    assert_eq!(
        status.data_type,
        DataType::Enum(vec!["new".to_string(), "paid".to_string()])
    );
    assert_eq!(status.default_value(), Some(&Expr::string("new")));

    let amount = create.column("amount").unwrap();
    assert_eq!(amount.default_value(), Some(&Expr::null()));
    assert!(!amount.is_not_null());

    let created_at = create.column("created_at").unwrap();
    assert_eq!(
        created_at.default_value(),
        Some(&Expr::Builtin("CURRENT_TIMESTAMP".to_string()))
    );
}

#[test]
fn create_table_constraints() {
    let create = parse_create_table(ORDERS_DDL);
    assert_eq!(create.constraints.len(), 4);
    assert!(create.has_primary_key());
    assert!(create.has_unique_key());
    assert_eq!(create.primary_key_columns(), Some(vec!["id".to_string()]));

    let idx = create.constraint("idx_user").unwrap();
    assert_eq!(idx.kind, ConstraintKind::Index);
    assert_eq!(idx.column_names(), vec!["user_id", "created_at"]);
    assert_eq!(idx.columns[1].direction, Some(OrderDirection::Desc));
    assert!(create.has_index_prefixed_by("user_id"));
    assert!(!create.has_index_prefixed_by("created_at"));

    let unique = create.constraint("uk_note").unwrap();
    assert_eq!(unique.kind, ConstraintKind::Unique);
    assert_eq!(unique.columns[0].length, Some(20));

    let fk = create.constraint("fk_user").unwrap();
    match &fk.kind {
        ConstraintKind::ForeignKey(reference) => {
            assert_eq!(reference.table, TableName::new("users"));
            assert_eq!(reference.columns, vec!["id"]);
            assert_eq!(reference.on_delete, Some(ReferentialAction::Cascade));
            assert_eq!(reference.on_update, None);
        }
        other => panic!("Expected FOREIGN KEY, got {other:?}"),
    }
}

#[test]
fn create_table_options() {
    let create = parse_create_table(ORDERS_DDL);
    assert_eq!(
        create.option("ENGINE"),
        Some(&TableOption::Engine("InnoDB".to_string()))
    );
    assert_eq!(
        create.option("CHARSET"),
        Some(&TableOption::Charset("utf8mb4".to_string()))
    );
    assert_eq!(
        create.option("COMMENT"),
        Some(&TableOption::Comment("orders".to_string()))
    );
    assert_eq!(create.option("COLLATE"), None);
}

#[test]
fn create_table_inline_keys() {
    let create =
        parse_create_table("CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(32) UNIQUE)");
    assert!(create.constraints.is_empty());
    assert!(create.column("id").unwrap().is_primary_key());
    assert!(create.has_primary_key());
    assert!(create.has_unique_key());
    assert_eq!(create.primary_key_columns(), Some(vec!["id".to_string()]));
}

#[test]
fn create_table_without_keys() {
    let create = parse_create_table("CREATE TABLE t (a INT, b VARCHAR(10))");
    assert!(!create.has_primary_key());
    assert!(!create.has_unique_key());
    assert_eq!(create.primary_key_columns(), None);
}

#[test]
fn create_temporary_table() {
    let create = parse_create_table("CREATE TEMPORARY TABLE tmp (a INT)");
    assert!(create.temporary);
    assert_eq!(create.table.name, "tmp");
    assert_eq!(create.table.schema, None);
}

#[test]
fn create_table_backtick_names() {
    let create = parse_create_table("CREATE TABLE `my db`.`order` (`select` INT)");
    assert_eq!(create.table, TableName::qualified("my db", "order"));
    assert!(create.column("select").is_some());
}

#[test]
fn create_table_check_and_fulltext() {
    let create = parse_create_table(
        "CREATE TABLE t (a INT, body TEXT, CHECK (a > 0), FULLTEXT KEY ft_body (body))",
    );
    assert!(matches!(create.constraints[0].kind, ConstraintKind::Check(_)));
    assert_eq!(
        create.constraint("ft_body").unwrap().kind,
        ConstraintKind::Fulltext
    );
}

// ===================================================================
// ALTER TABLE
// ===================================================================

#[test]
fn alter_table_specs() {
    let alter = parse_alter_table(
        "ALTER TABLE t ADD COLUMN c1 INT NOT NULL AFTER id, ADD (c2 INT, c3 INT), \
         ADD INDEX idx_c1 (c1), DROP COLUMN old, DROP PRIMARY KEY, DROP INDEX idx_old, \
         DROP FOREIGN KEY fk_old, CHANGE a b BIGINT FIRST, MODIFY d VARCHAR(10), \
         ALTER COLUMN e SET DEFAULT 1, ALTER f DROP DEFAULT, RENAME INDEX i1 TO i2, \
         RENAME TO t2, ENGINE=InnoDB",
    );
    assert_eq!(alter.table, TableName::new("t"));
    assert_eq!(alter.specs.len(), 14);

    match &alter.specs[0] {
        AlterTableSpec::AddColumns { columns, position } => {
            assert_eq!(columns.len(), 1);
            assert_eq!(columns[0].name, "c1");
            assert_eq!(position, &Some(ColumnPosition::After("id".to_string())));
        }
        other => panic!("Expected ADD COLUMN, got {other:?}"),
    }
    match &alter.specs[1] {
        AlterTableSpec::AddColumns { columns, position } => {
            assert_eq!(columns.len(), 2);
            assert_eq!(position, &None);
        }
        other => panic!("Expected ADD (...), got {other:?}"),
    }
    match &alter.specs[2] {
        AlterTableSpec::AddConstraint(constraint) => {
            assert!(constraint.is_named("idx_c1"));
            assert_eq!(constraint.kind, ConstraintKind::Index);
        }
        other => panic!("Expected ADD INDEX, got {other:?}"),
    }
    assert_eq!(alter.specs[3], AlterTableSpec::DropColumn("old".to_string()));
    assert_eq!(alter.specs[4], AlterTableSpec::DropPrimaryKey);
    assert_eq!(alter.specs[5], AlterTableSpec::DropIndex("idx_old".to_string()));
    assert_eq!(
        alter.specs[6],
        AlterTableSpec::DropForeignKey("fk_old".to_string())
    );
    match &alter.specs[7] {
        AlterTableSpec::ChangeColumn {
            old_name,
            column,
            position,
        } => {
            assert_eq!(old_name, "a");
            assert_eq!(column.name, "b");
            assert_eq!(column.data_type, DataType::Bigint(None));
            assert_eq!(position, &Some(ColumnPosition::First));
        }
        other => panic!("Expected CHANGE, got {other:?}"),
    }
    match &alter.specs[8] {
        AlterTableSpec::ModifyColumn { column, position } => {
            assert_eq!(column.data_type, DataType::Varchar(Some(10)));
            assert_eq!(position, &None);
        }
        other => panic!("Expected MODIFY, got {other:?}"),
    }
    assert_eq!(
        alter.specs[9],
        AlterTableSpec::AlterColumnDefault {
            column: "e".to_string(),
            default: Some(Expr::integer(1)),
        }
    );
    assert_eq!(
        alter.specs[10],
        AlterTableSpec::AlterColumnDefault {
            column: "f".to_string(),
            default: None,
        }
    );
    assert_eq!(
        alter.specs[11],
        AlterTableSpec::RenameIndex {
            from: "i1".to_string(),
            to: "i2".to_string(),
        }
    );
    assert_eq!(alter.specs[12], AlterTableSpec::RenameTable(TableName::new("t2")));
    assert_eq!(
        alter.specs[13],
        AlterTableSpec::TableOptions(vec![TableOption::Engine("InnoDB".to_string())])
    );
    assert_eq!(alter.renamed_to(), Some(&TableName::new("t2")));
}

#[test]
fn alter_table_add_primary_key() {
    let alter = parse_alter_table("ALTER TABLE db.t ADD PRIMARY KEY (id)");
    assert_eq!(alter.table, TableName::qualified("db", "t"));
    match &alter.specs[0] {
        AlterTableSpec::AddConstraint(constraint) => assert!(constraint.is_primary_key()),
        other => panic!("Expected ADD PRIMARY KEY, got {other:?}"),
    }
    assert_eq!(alter.renamed_to(), None);
}

#[test]
fn alter_table_convert_options() {
    let alter = parse_alter_table("ALTER TABLE t DEFAULT CHARSET utf8mb4, COMMENT 'x'");
    assert_eq!(
        alter.specs,
        vec![
            AlterTableSpec::TableOptions(vec![TableOption::Charset("utf8mb4".to_string())]),
            AlterTableSpec::TableOptions(vec![TableOption::Comment("x".to_string())]),
        ]
    );
}

// ===================================================================
// DROP TABLE / DATABASES
// ===================================================================

#[test]
fn drop_table_list() {
    match parse("DROP TABLE IF EXISTS a, db.b") {
        Statement::DropTable(drop) => {
            assert!(drop.if_exists);
            assert!(!drop.temporary);
            assert_eq!(
                drop.tables,
                vec![TableName::new("a"), TableName::qualified("db", "b")]
            );
        }
        other => panic!("Expected DROP TABLE, got {other:?}"),
    }
}

#[test]
fn create_database() {
    match parse(
        "CREATE DATABASE IF NOT EXISTS shop DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_bin",
    ) {
        Statement::CreateDatabase(create) => {
            assert!(create.if_not_exists);
            assert_eq!(create.name, "shop");
            assert_eq!(create.charset.as_deref(), Some("utf8mb4"));
            assert_eq!(create.collate.as_deref(), Some("utf8mb4_bin"));
        }
        other => panic!("Expected CREATE DATABASE, got {other:?}"),
    }
}

#[test]
fn drop_schema() {
    match parse("DROP SCHEMA IF EXISTS shop") {
        Statement::DropDatabase(drop) => {
            assert!(drop.if_exists);
            assert_eq!(drop.name, "shop");
        }
        other => panic!("Expected DROP DATABASE, got {other:?}"),
    }
}

#[test]
fn unmodeled_statements() {
    for (sql, keyword) in [
        ("CREATE INDEX idx ON t (a)", "CREATE"),
        ("SHOW CREATE TABLE t", "SHOW"),
        ("SET NAMES utf8mb4", "SET"),
        ("TRUNCATE TABLE t", "TRUNCATE"),
    ] {
        match parse(sql) {
            Statement::Other(other) => {
                assert_eq!(other.keyword, keyword);
                assert_eq!(other.text, sql);
            }
            other => panic!("Expected unmodeled statement for {sql}, got {other:?}"),
        }
    }
}

#[test]
fn statement_categories() {
    let parsed = parse_all(
        "USE shop; CREATE TABLE t (a INT); ALTER TABLE t ADD b INT; \
         INSERT INTO t VALUES (1, 2); SELECT * FROM t; SHOW TABLES",
    );
    let categories: Vec<_> = parsed.iter().map(|p| p.category()).collect();
    assert_eq!(
        categories,
        vec![
            StatementCategory::Other,
            StatementCategory::Ddl,
            StatementCategory::Ddl,
            StatementCategory::Dml,
            StatementCategory::Dml,
            StatementCategory::Other,
        ]
    );
    assert_eq!(parsed[1].text, "CREATE TABLE t (a INT)");
}
