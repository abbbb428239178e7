//! Audit sessions against a scripted server.

mod common;

use common::*;
use oxide_audit::config::AdvisorConfig;
use oxide_audit::prelude::*;
use oxide_mysql::ast::TableName;
use oxide_mysql::{fingerprint, StatementCategory};

const ORDERS: &str = "CREATE TABLE `orders` (\
    `id` bigint NOT NULL AUTO_INCREMENT, \
    `user_id` int NOT NULL, \
    `status` tinyint DEFAULT 0, \
    PRIMARY KEY (`id`)) ENGINE=InnoDB";

const USERS: &str = "CREATE TABLE `users` (\
    `id` int NOT NULL, \
    `name` varchar(50), \
    UNIQUE KEY `uk_name` (`name`))";

const LOGS: &str = "CREATE TABLE `logs` (`msg` text)";

fn shop() -> Script {
    let script = Script::server("1");
    script
        .schemas(&["information_schema", "mysql", "shop"])
        .tables("shop", &["orders", "users", "logs"])
        .create_table("shop", "orders", ORDERS)
        .create_table("shop", "users", USERS)
        .create_table("shop", "logs", LOGS);
    script
}

fn online(script: &Script, rules: Vec<Rule>) -> Auditor {
    Auditor::online(rules, script.connector(), "shop")
}

// ==================== Rules ====================

#[test]
fn test_offline_rules() {
    let mut auditor = Auditor::offline(vec![
        Rule::new(DDL_CHECK_PK_NOT_EXIST, RuleLevel::Warn),
        Rule::new(DML_CHECK_WHERE_IS_INVALID, RuleLevel::Error),
        Rule::new(DDL_CHECK_ALTER_TABLE_NEED_MERGE, RuleLevel::Notice),
        Rule::new(DDL_CHECK_TABLE_SIZE, RuleLevel::Warn).with_value("0"),
        Rule::new("no_such_rule", RuleLevel::Error),
    ]);

    let result = auditor.audit("CREATE TABLE t (id INT)").unwrap();
    assert_eq!(result.message(), "[warn]table `t` has no primary key");
    assert_eq!(result.level(), RuleLevel::Warn);

    let result = auditor.audit("ALTER TABLE t ADD PRIMARY KEY (id)").unwrap();
    assert!(result.is_empty());

    let result = auditor.audit("ALTER TABLE t ADD COLUMN v INT").unwrap();
    assert_eq!(result.level(), RuleLevel::Notice);
    assert!(result.message().contains("already altered 1 time(s)"));

    let result = auditor.audit("UPDATE t SET v = 1").unwrap();
    assert_eq!(result.message(), "[error]WHERE clause is missing");

    let result = auditor.audit("DELETE FROM t WHERE 1").unwrap();
    assert_eq!(result.message(), "[error]WHERE clause is always the same value");

    let result = auditor.audit("DELETE FROM t WHERE id = 1").unwrap();
    assert!(result.is_empty());

    // Rule findings never make the SQL invalid.
    assert!(!auditor.has_invalid_sql());
    assert_eq!(auditor.result().level(), RuleLevel::Normal);
}

#[test]
fn test_configured_level_is_reported() {
    let mut auditor = Auditor::offline(vec![
        Rule::new(DML_CHECK_WHERE_IS_INVALID, RuleLevel::Warn),
        Rule::new(DDL_CHECK_PK_NOT_EXIST, RuleLevel::Notice),
    ]);
    auditor.audit("CREATE TABLE t (id INT PRIMARY KEY)").unwrap();
    let result = auditor.audit("DELETE FROM t").unwrap();
    assert_eq!(result.findings().len(), 1);
    assert_eq!(result.findings()[0].level, RuleLevel::Warn);
}

#[test]
fn test_table_size_rule() {
    let script = shop();
    script.table_size("shop", "orders", 150.0);
    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_CHECK_TABLE_SIZE, RuleLevel::Warn).with_value("100")],
    );
    let result = auditor.audit("DROP TABLE orders").unwrap();
    assert_eq!(
        result.message(),
        "[warn]table `orders` is 150.00 MB, larger than 100 MB"
    );
}

#[test]
fn test_full_scan_rule_uses_plan_cache() {
    let script = shop();
    script.answer(
        "EXPLAIN SELECT",
        vec![Row::from_pairs([
            ("id", "1"),
            ("select_type", "SIMPLE"),
            ("table", "orders"),
            ("type", "ALL"),
            ("rows", "5000"),
            ("Extra", "Using where"),
        ])],
    );
    let mut auditor = online(
        &script,
        vec![Rule::new(DML_CHECK_EXPLAIN_FULL_TABLE_SCAN, RuleLevel::Warn).with_value("1000")],
    );

    let sql = "SELECT * FROM orders WHERE status = 1";
    let result = auditor.audit(sql).unwrap();
    assert_eq!(
        result.message(),
        "[warn]full table scan on orders reads about 5000 rows"
    );
    auditor.audit(sql).unwrap();
    assert_eq!(script.count_matching("EXPLAIN "), 1);
}

// ==================== Validation ====================

#[test]
fn test_invalid_sql_skips_rules() {
    let script = shop();
    let mut auditor = online(&script, vec![Rule::new(DDL_CHECK_PK_NOT_EXIST, RuleLevel::Warn)]);

    let result = auditor.audit("CREATE TABLE orders (v INT)").unwrap();
    assert_eq!(result.message(), "[error]table `orders` already exists");
    assert!(auditor.has_invalid_sql());

    // The flag is sticky but rules run again for valid statements.
    let result = auditor.audit("CREATE TABLE items (v INT)").unwrap();
    assert_eq!(result.message(), "[warn]table `items` has no primary key");
    assert!(auditor.has_invalid_sql());
    assert!(auditor.catalog().has_table("shop", "items"));
}

#[test]
fn test_online_validation_messages() {
    let script = shop();
    let mut auditor = online(&script, vec![]);
    let cases = [
        ("INSERT INTO missing (a) VALUES (1)", "table `missing` does not exist"),
        ("USE nowhere", "schema `nowhere` does not exist"),
        ("CREATE DATABASE shop", "schema `shop` already exists"),
        ("ALTER TABLE orders DROP COLUMN nope", "column `nope` does not exist"),
        ("ALTER TABLE orders ADD COLUMN status INT", "column `status` already exists"),
        ("ALTER TABLE orders ADD PRIMARY KEY (user_id)", "primary key already exists"),
        ("ALTER TABLE users DROP PRIMARY KEY", "primary key does not exist"),
        ("ALTER TABLE users DROP INDEX nope", "index `nope` does not exist"),
        ("INSERT INTO orders (id, nope) VALUES (1, 2)", "column `nope` does not exist"),
        (
            "SELECT * FROM shop.orders o JOIN other.t x ON o.id = x.id",
            "schema `other` does not exist",
        ),
        ("ALTER TABLE orders RENAME TO users", "table `shop`.`users` already exists"),
    ];
    for (sql, expected) in cases {
        let result = auditor.audit(sql).unwrap();
        assert_eq!(result.level(), RuleLevel::Error, "{sql}");
        assert!(result.message().contains(expected), "{sql}: {}", result.message());
    }

    for sql in [
        "INSERT INTO orders VALUES (1, 2, 3)",
        "SELECT * FROM orders o JOIN users u ON o.user_id = u.id",
        "ALTER TABLE orders ADD COLUMN note TEXT, ALTER COLUMN note SET DEFAULT 'x'",
        "CREATE DATABASE IF NOT EXISTS shop",
        "DROP TABLE IF EXISTS missing",
        "INSERT INTO orders VALUES (1, 2, 3, 'x')",
        "ALTER TABLE orders RENAME TO ORDERS",
    ] {
        let result = auditor.audit(sql).unwrap();
        assert!(result.is_empty(), "{sql}: {}", result.message());
    }
}

#[test]
fn test_later_statements_see_earlier_ones() {
    let script = shop();
    let mut auditor = online(&script, vec![]);
    assert!(auditor.audit("CREATE DATABASE archive").unwrap().is_empty());
    assert!(auditor.audit("CREATE TABLE archive.t (id INT PRIMARY KEY)").unwrap().is_empty());
    assert!(auditor.audit("ALTER TABLE archive.t ADD COLUMN v INT").unwrap().is_empty());
    assert!(auditor.audit("INSERT INTO archive.t (id, v) VALUES (1, 2)").unwrap().is_empty());
    assert!(auditor.audit("DROP TABLE orders").unwrap().is_empty());
    let result = auditor.audit("SELECT * FROM orders").unwrap();
    assert_eq!(result.message(), "[error]table `orders` does not exist");
    // The new schema never reaches the server.
    assert_eq!(script.count_matching("`archive`"), 0);
}

#[test]
fn test_case_sensitivity() {
    for (lower_case, found) in [("1", true), ("2", true), ("0", false)] {
        let script = Script::server(lower_case);
        script.schemas(&["shop"]).tables("shop", &["t1"]);
        let mut auditor = online(&script, vec![]);
        let result = auditor.audit("SELECT * FROM T1").unwrap();
        assert_eq!(result.is_empty(), found, "lower_case_table_names = {lower_case}");
    }
}

// ==================== Parsing ====================

#[test]
fn test_single_statement_expected() {
    let mut auditor = Auditor::offline(vec![Rule::new(DDL_CHECK_PK_NOT_EXIST, RuleLevel::Error)]);
    let result = auditor.audit("CREATE TABLE a (id INT); CREATE TABLE b (id INT)").unwrap();
    assert!(result.is_empty());
    assert!(auditor.catalog().table("", "a").is_none());
    assert!(auditor.audit("").unwrap().is_empty());
}

#[test]
fn test_parse_error() {
    let mut auditor = Auditor::offline(vec![]);
    assert!(matches!(
        auditor.audit("ALTER TABLE t FROBNICATE"),
        Err(AuditError::Parse(_))
    ));
}

#[test]
fn test_parse_fingerprints() {
    let sql = "SELECT * FROM T WHERE id = 1; INSERT INTO t VALUES (1, 'a'); USE shop";

    let mut auditor = Auditor::offline(vec![]);
    let nodes = auditor.parse(sql).unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].category, StatementCategory::Dml);
    assert_eq!(nodes[2].category, StatementCategory::Other);
    assert_eq!(nodes[0].fingerprint, fingerprint(&nodes[0].text, false).unwrap());

    let script = Script::server("0");
    let mut auditor = online(&script, vec![]);
    let nodes = auditor.parse(sql).unwrap();
    assert_eq!(nodes[0].fingerprint, fingerprint(&nodes[0].text, true).unwrap());
}

// ==================== Online schema change ====================

#[test]
fn test_gh_ost_threshold() {
    let script = shop();
    script
        .table_size("shop", "orders", 150.0)
        .table_size("shop", "users", 50.0);
    let backend = RecordingBackend::default();
    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_GH_OST_MIN_SIZE, RuleLevel::Normal).with_value("100")],
    )
    .with_online_ddl(Box::new(backend.clone()));
    assert_eq!(auditor.limits().ddl_gh_ost_min_size, 100);

    let small = "ALTER TABLE users ADD COLUMN note TEXT";
    let result = auditor.exec(small).unwrap().unwrap();
    assert!(!result.online_ddl);
    assert!(backend.runs().is_empty());
    assert_eq!(script.count_matching(small), 1);

    let big = "ALTER TABLE orders ADD COLUMN note TEXT";
    let result = auditor.exec(big).unwrap().unwrap();
    assert!(result.online_ddl);
    assert_eq!(
        backend.runs(),
        vec![
            (String::from("shop"), String::from(big), true),
            (String::from("shop"), String::from(big), false),
        ]
    );
    assert_eq!(script.count_matching(big), 0);
}

#[test]
fn test_gh_ost_dry_run_failure() {
    let script = shop();
    script.table_size("shop", "orders", 150.0);
    let backend = RecordingBackend::failing_dry_run();
    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_GH_OST_MIN_SIZE, RuleLevel::Normal).with_value("100")],
    )
    .with_online_ddl(Box::new(backend.clone()));

    let err = auditor.exec("ALTER TABLE orders ADD COLUMN note TEXT").unwrap_err();
    assert!(err.to_string().starts_with("dry-run gh-ost: "));
    assert!(matches!(err.root(), AuditError::OnlineDdl(_)));
    assert_eq!(backend.runs().len(), 1);

    // The session stays usable.
    assert!(auditor.exec("DELETE FROM orders WHERE id = 1").unwrap().is_some());
}

#[test]
fn test_gh_ost_run_failure() {
    let script = shop();
    script.table_size("shop", "orders", 150.0);
    let backend = RecordingBackend::failing_run();
    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_GH_OST_MIN_SIZE, RuleLevel::Normal).with_value("100")],
    )
    .with_online_ddl(Box::new(backend.clone()));

    let big = "ALTER TABLE orders ADD COLUMN note TEXT";
    let err = auditor.exec(big).unwrap_err();
    assert!(err.to_string().starts_with("run gh-ost: "));
    assert!(matches!(err.root(), AuditError::OnlineDdl(_)));
    assert_eq!(
        backend.runs(),
        vec![
            (String::from("shop"), String::from(big), true),
            (String::from("shop"), String::from(big), false),
        ]
    );
    assert_eq!(script.count_matching(big), 0);
}

#[test]
fn test_gh_ost_without_backend() {
    let script = shop();
    script.table_size("shop", "orders", 150.0);
    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_GH_OST_MIN_SIZE, RuleLevel::Normal)],
    );
    assert_eq!(auditor.limits().ddl_gh_ost_min_size, 1024);
    assert!(auditor.exec("ALTER TABLE orders ADD COLUMN note TEXT").unwrap().is_some());

    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_GH_OST_MIN_SIZE, RuleLevel::Normal).with_value("1")],
    );
    assert!(matches!(
        auditor.exec("ALTER TABLE orders ADD COLUMN note TEXT"),
        Err(AuditError::OnlineDdl(_))
    ));
}

#[test]
fn test_pt_osc_notice() {
    let script = shop();
    script
        .table_size("shop", "orders", 20.0)
        .table_size("shop", "logs", 20.0)
        .table_size("shop", "users", 5.0);
    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_OSC_MIN_SIZE, RuleLevel::Normal).with_value("10")],
    );

    let result = auditor.audit("ALTER TABLE orders ADD COLUMN note TEXT").unwrap();
    assert_eq!(result.level(), RuleLevel::Notice);
    assert_eq!(
        result.message(),
        "[notice][osc]pt-online-schema-change D=shop,t=orders \
         --alter=\"ADD COLUMN `note` TEXT\" --execute"
    );

    let result = auditor.audit("ALTER TABLE logs ADD COLUMN note TEXT").unwrap();
    assert!(result
        .message()
        .starts_with("[notice][osc]table `logs` has no primary or unique key"));

    let result = auditor.audit("ALTER TABLE users ADD COLUMN note TEXT").unwrap();
    assert!(result.is_empty());

    let result = auditor.audit("ALTER TABLE orders RENAME TO orders_old").unwrap();
    assert!(result.message().contains("cannot rename"));
}

#[test]
fn test_pt_osc_template() {
    let script = shop();
    script.table_size("shop", "orders", 20.0);
    let mut auditor = online(
        &script,
        vec![Rule::new(DDL_OSC_MIN_SIZE, RuleLevel::Normal).with_value("10")],
    )
    .with_pt_osc_template("pt-osc --alter '{alter}' D={schema},t={table}");
    let result = auditor.audit("ALTER TABLE orders DROP COLUMN status").unwrap();
    assert_eq!(
        result.findings()[0].message,
        "[osc]pt-osc --alter 'DROP COLUMN `status`' D=shop,t=orders"
    );
}

// ==================== Rollback ====================

#[test]
fn test_rollback_suppressed_after_invalid_sql() {
    let script = shop();
    let mut auditor = online(&script, vec![]);
    let sql = "CREATE TABLE items (id INT PRIMARY KEY)";

    let rollback = auditor.gen_rollback_sql(sql).unwrap();
    assert_eq!(rollback.sql, "DROP TABLE IF EXISTS `shop`.`items`;");

    auditor.audit("DROP TABLE missing").unwrap();
    assert!(auditor.has_invalid_sql());
    let rollback = auditor.gen_rollback_sql("CREATE TABLE other (id INT)").unwrap();
    assert!(rollback.is_empty());
    assert!(rollback.reason.is_empty());
}

#[test]
fn test_rollback_offline_is_empty() {
    let mut auditor = Auditor::offline(vec![]);
    assert_eq!(
        auditor.gen_rollback_sql("CREATE TABLE t (id INT)").unwrap(),
        RollbackSql::default()
    );
}

// ==================== Metadata ====================

#[test]
fn test_lazy_loading_happens_once() {
    let script = shop();
    let mut auditor = online(&script, vec![]);
    auditor.audit("SELECT * FROM orders").unwrap();
    auditor.audit("SELECT * FROM users").unwrap();
    auditor.audit("INSERT INTO orders (id) VALUES (1)").unwrap();
    auditor.audit("INSERT INTO orders (id) VALUES (2)").unwrap();

    assert_eq!(script.connects(), 1);
    assert_eq!(script.count_matching("SHOW DATABASES"), 1);
    assert_eq!(script.count_matching("SHOW FULL TABLES"), 1);
    assert_eq!(script.count_matching("lower_case_table_names"), 1);
    assert_eq!(script.count_matching("SHOW CREATE TABLE"), 1);
}

#[test]
fn test_schema_defaults_are_cached() {
    let script = shop();
    script
        .answer(
            "@@default_storage_engine",
            vec![Row::from_pairs([("value", "InnoDB")])],
        )
        .answer(
            "information_schema.SCHEMATA",
            vec![Row::from_pairs([
                ("charset", "utf8mb4"),
                ("collation", "utf8mb4_general_ci"),
            ])],
        );
    let mut auditor = online(&script, vec![]);

    assert_eq!(auditor.default_engine("shop").unwrap(), "InnoDB");
    assert_eq!(auditor.default_engine("shop").unwrap(), "InnoDB");
    assert_eq!(auditor.default_charset("shop").unwrap(), "utf8mb4");
    assert_eq!(auditor.default_collation("shop").unwrap(), "utf8mb4_general_ci");
    assert_eq!(auditor.default_engine("nowhere").unwrap(), "");
    assert_eq!(script.count_matching("@@default_storage_engine"), 1);
    assert_eq!(script.count_matching("SCHEMATA"), 1);
}

#[test]
fn test_sys_var() {
    let mut auditor = Auditor::offline(vec![]);
    assert_eq!(auditor.sys_var("lower_case_table_names").unwrap(), "");
    assert_eq!(auditor.catalog().sys_var("lower_case_table_names"), None);

    let script = shop();
    let mut auditor = online(&script, vec![]);
    assert_eq!(auditor.sys_var("lower_case_table_names").unwrap(), "1");
    assert!(matches!(
        auditor.sys_var("max_connections"),
        Err(AuditError::UnexpectedResult(_))
    ));
}

#[test]
fn test_selectivity() {
    let script = shop();
    script
        .answer(
            "SHOW TABLE STATUS FROM `shop` LIKE 'orders'",
            vec![Row::from_pairs([("Name", "orders"), ("Rows", "1000")])],
        )
        .answer(
            "COUNT(DISTINCT `status`)",
            vec![Row::from_pairs([("cardinality", "10")])],
        );
    let orders = TableName::new("orders");

    let mut auditor = online(&script, vec![]);
    assert_eq!(auditor.selectivity(&orders, "status").unwrap(), Some(0.01));
    assert_eq!(auditor.selectivity(&orders, "status").unwrap(), Some(0.01));
    assert_eq!(script.count_matching("COUNT(DISTINCT"), 1);

    let mut auditor = online(&script, vec![]).with_advisor(AdvisorConfig {
        calc_selectivity_max_rows: 500,
        ..AdvisorConfig::default()
    });
    assert_eq!(auditor.selectivity(&orders, "status").unwrap(), None);
    assert_eq!(auditor.selectivity(&TableName::new("missing"), "a").unwrap(), None);
    assert_eq!(script.count_matching("COUNT(DISTINCT"), 1);
}

// ==================== Connection ====================

#[test]
fn test_close_at_most_once() {
    let script = shop();
    let mut auditor = online(&script, vec![]);
    auditor.ping().unwrap();
    auditor.close().unwrap();
    auditor.close().unwrap();
    assert!(matches!(auditor.ping(), Err(AuditError::Connection(_))));
    drop(auditor);
    assert_eq!(script.connects(), 1);
    assert_eq!(script.closes(), 1);
}

#[test]
fn test_drop_closes_connection() {
    let script = shop();
    let mut auditor = online(&script, vec![]);
    assert_eq!(auditor.schemas().unwrap(), vec!["shop"]);
    drop(auditor);
    assert_eq!(script.closes(), 1);

    let auditor = online(&script, vec![]);
    drop(auditor);
    assert_eq!(script.connects(), 1);
}

#[test]
fn test_connect_failure_surfaces() {
    let script = shop();
    script.fail_connect();
    let mut auditor = online(&script, vec![]);
    assert!(matches!(
        auditor.audit("SELECT * FROM orders"),
        Err(AuditError::Connection(_))
    ));
    assert!(auditor.ping().is_err());
}

#[test]
fn test_offline_helpers() {
    let mut auditor = Auditor::offline(vec![]);
    assert!(auditor.is_offline());
    assert_eq!(auditor.exec("DELETE FROM t").unwrap(), None);
    auditor.ping().unwrap();
    assert!(auditor.schemas().unwrap().is_empty());
    assert!(auditor.execution_plan("SELECT 1").unwrap().is_empty());
    auditor.close().unwrap();
}

#[test]
fn test_exec_direct() {
    let script = shop();
    let mut auditor = online(&script, vec![]);
    let result = auditor.exec("DELETE FROM orders WHERE id = 1").unwrap().unwrap();
    assert_eq!(result.rows_affected, 1);
    assert!(!result.online_ddl);
    assert_eq!(script.count_matching("DELETE FROM orders"), 1);
}

// ==================== Fork ====================

#[test]
fn test_fork() {
    let script = shop();
    let mut parent = online(&script, vec![Rule::new(DML_ROLLBACK_MAX_ROWS, RuleLevel::Notice)]);
    parent.audit("CREATE TABLE items (id INT PRIMARY KEY)").unwrap();

    let mut child = parent.fork();
    assert!(child.is_offline());
    assert_eq!(child.limits(), parent.limits());
    child.audit("ALTER TABLE items ADD COLUMN v INT").unwrap();

    let columns = |auditor: &Auditor| {
        let definition = auditor
            .catalog()
            .table("shop", "items")
            .and_then(TableInfo::definition)
            .cloned()
            .unwrap();
        column_names(&definition)
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    };
    assert_eq!(columns(&parent), vec!["id"]);
    assert_eq!(columns(&child), vec!["id", "v"]);
    assert_eq!(script.connects(), 1);
}
