//! Audit rules and the built-in rule handlers.

use std::collections::BTreeMap;
use std::fmt;

use oxide_mysql::ast::TableName;
use oxide_mysql::{ParsedStatement, Statement};
use serde::{Deserialize, Serialize};

use crate::auditor::Auditor;
use crate::error::Result;

/// Maximum rows a DML rollback may touch.
pub const DML_ROLLBACK_MAX_ROWS: &str = "dml_rollback_max_rows";
/// Table size (MB) from which pt-online-schema-change is suggested.
pub const DDL_OSC_MIN_SIZE: &str = "ddl_osc_min_size";
/// Table size (MB) from which ALTER TABLE runs through gh-ost.
pub const DDL_GH_OST_MIN_SIZE: &str = "ddl_gh_ost_min_size";
/// CREATE TABLE without a primary key.
pub const DDL_CHECK_PK_NOT_EXIST: &str = "ddl_check_pk_not_exist";
/// Several ALTER TABLE statements on the same table.
pub const DDL_CHECK_ALTER_TABLE_NEED_MERGE: &str = "ddl_check_alter_table_need_merge";
/// UPDATE / DELETE without a usable WHERE clause.
pub const DML_CHECK_WHERE_IS_INVALID: &str = "dml_check_where_is_invalid";
/// DDL on a large table.
pub const DDL_CHECK_TABLE_SIZE: &str = "ddl_check_table_size";
/// DML whose plan scans a large table.
pub const DML_CHECK_EXPLAIN_FULL_TABLE_SCAN: &str = "dml_check_explain_full_table_scan";

/// Severity of a rule or finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    /// No problem.
    #[default]
    Normal,
    /// Informational.
    Notice,
    /// Should be looked at.
    Warn,
    /// Must be fixed.
    Error,
}

impl RuleLevel {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Notice => "notice",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RuleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name, matching a registered handler.
    pub name: String,
    /// Severity of the findings it reports.
    #[serde(default)]
    pub level: RuleLevel,
    /// Rule parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Rule {
    /// Creates a rule without a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, level: RuleLevel) -> Self {
        Self {
            name: name.into(),
            level,
            value: None,
        }
    }

    /// Sets the parameter.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Returns the parameter as an integer, or `default` when missing or
    /// malformed.
    #[must_use]
    pub fn value_i64(&self, default: i64) -> i64 {
        self.value
            .as_deref()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// A rule handler: inspects one statement and reports findings on the
/// auditor.
pub type RuleFn = fn(&Rule, &mut Auditor, &ParsedStatement) -> Result<()>;

/// Registration of a rule.
#[derive(Clone)]
pub struct RuleHandler {
    /// The rule with its default level and value.
    pub rule: Rule,
    /// What the rule checks.
    pub description: &'static str,
    /// The check, `None` for configuration-only rules.
    pub func: Option<RuleFn>,
    /// Whether the check works without a database connection.
    pub allow_offline: bool,
}

impl fmt::Debug for RuleHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleHandler")
            .field("rule", &self.rule)
            .field("description", &self.description)
            .field("has_func", &self.func.is_some())
            .field("allow_offline", &self.allow_offline)
            .finish()
    }
}

/// Rule handlers by name.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    handlers: BTreeMap<String, RuleHandler>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in rules.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(RuleHandler {
            rule: Rule::new(DML_ROLLBACK_MAX_ROWS, RuleLevel::Notice).with_value("1000"),
            description: "maximum rows a DML rollback may read",
            func: None,
            allow_offline: true,
        });
        registry.register(RuleHandler {
            rule: Rule::new(DDL_OSC_MIN_SIZE, RuleLevel::Normal).with_value("16"),
            description: "table size (MB) from which pt-online-schema-change is suggested",
            func: None,
            allow_offline: true,
        });
        registry.register(RuleHandler {
            rule: Rule::new(DDL_GH_OST_MIN_SIZE, RuleLevel::Normal).with_value("1024"),
            description: "table size (MB) from which ALTER TABLE runs through gh-ost",
            func: None,
            allow_offline: true,
        });
        registry.register(RuleHandler {
            rule: Rule::new(DDL_CHECK_PK_NOT_EXIST, RuleLevel::Error),
            description: "tables must have a primary key",
            func: Some(check_pk_not_exist),
            allow_offline: true,
        });
        registry.register(RuleHandler {
            rule: Rule::new(DDL_CHECK_ALTER_TABLE_NEED_MERGE, RuleLevel::Notice),
            description: "ALTER TABLE statements on one table should be merged",
            func: Some(check_alter_table_need_merge),
            allow_offline: true,
        });
        registry.register(RuleHandler {
            rule: Rule::new(DML_CHECK_WHERE_IS_INVALID, RuleLevel::Error),
            description: "UPDATE and DELETE need a WHERE clause",
            func: Some(check_where_is_invalid),
            allow_offline: true,
        });
        registry.register(RuleHandler {
            rule: Rule::new(DDL_CHECK_TABLE_SIZE, RuleLevel::Warn).with_value("1024"),
            description: "DDL on tables larger than the value (MB)",
            func: Some(check_table_size),
            allow_offline: false,
        });
        registry.register(RuleHandler {
            rule: Rule::new(DML_CHECK_EXPLAIN_FULL_TABLE_SCAN, RuleLevel::Warn).with_value("10000"),
            description: "full table scans over more rows than the value",
            func: Some(check_explain_full_table_scan),
            allow_offline: false,
        });
        registry
    }

    /// Registers or replaces a handler.
    pub fn register(&mut self, handler: RuleHandler) {
        self.handlers.insert(handler.rule.name.clone(), handler);
    }

    /// Returns the handler for a rule name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuleHandler> {
        self.handlers.get(name)
    }

    /// Returns the registered rule names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Returns the integer value of a configured rule, falling back to the
    /// registered default. `None` when the rule is not configured.
    #[must_use]
    pub fn configured_value(&self, rules: &[Rule], name: &str) -> Option<i64> {
        let rule = rules.iter().find(|rule| rule.name == name)?;
        let default = self
            .get(name)
            .map_or(-1, |handler| handler.rule.value_i64(-1));
        Some(rule.value_i64(default))
    }
}

// ==================== Built-in handlers ====================

fn check_pk_not_exist(rule: &Rule, auditor: &mut Auditor, node: &ParsedStatement) -> Result<()> {
    if let Statement::CreateTable(create) = &node.statement {
        if !create.has_primary_key() {
            auditor.report(rule, format!("table {} has no primary key", create.table));
        }
    }
    Ok(())
}

fn check_alter_table_need_merge(
    rule: &Rule,
    auditor: &mut Auditor,
    node: &ParsedStatement,
) -> Result<()> {
    let Statement::AlterTable(alter) = &node.statement else {
        return Ok(());
    };
    let schema = auditor.schema_name(&alter.table);
    let previous = auditor
        .catalog()
        .table(&schema, &alter.table.name)
        .map_or(0, |info| info.alter_history.len());
    if previous > 0 {
        auditor.report(
            rule,
            format!(
                "table {} was already altered {previous} time(s), merge the ALTER TABLE statements",
                alter.table
            ),
        );
    }
    Ok(())
}

fn check_where_is_invalid(
    rule: &Rule,
    auditor: &mut Auditor,
    node: &ParsedStatement,
) -> Result<()> {
    let where_clause = match &node.statement {
        Statement::Update(update) => &update.where_clause,
        Statement::Delete(delete) => &delete.where_clause,
        _ => return Ok(()),
    };
    match where_clause {
        None => auditor.report(rule, "WHERE clause is missing"),
        Some(expr) if expr.is_constant() => {
            auditor.report(rule, "WHERE clause is always the same value");
        }
        Some(_) => {}
    }
    Ok(())
}

fn check_table_size(rule: &Rule, auditor: &mut Auditor, node: &ParsedStatement) -> Result<()> {
    let tables: Vec<TableName> = match &node.statement {
        Statement::AlterTable(alter) => vec![alter.table.clone()],
        Statement::DropTable(drop) => drop.tables.clone(),
        _ => return Ok(()),
    };
    let limit = rule.value_i64(1024);
    #[allow(clippy::cast_precision_loss)]
    let limit_mb = limit as f64;
    for table in tables {
        let size = auditor.table_size(&table)?;
        if size > limit_mb {
            auditor.report(
                rule,
                format!("table {table} is {size:.2} MB, larger than {limit} MB"),
            );
        }
    }
    Ok(())
}

fn check_explain_full_table_scan(
    rule: &Rule,
    auditor: &mut Auditor,
    node: &ParsedStatement,
) -> Result<()> {
    if !matches!(
        node.statement,
        Statement::Select(_) | Statement::Update(_) | Statement::Delete(_) | Statement::Insert(_)
    ) {
        return Ok(());
    }
    let limit = u64::try_from(rule.value_i64(10_000)).unwrap_or(0);
    let plan = auditor.execution_plan(&node.text)?;
    if let Some(record) = plan
        .iter()
        .find(|record| record.is_full_scan() && record.rows > limit)
    {
        let message = format!(
            "full table scan on {} reads about {} rows",
            record.table, record.rows
        );
        auditor.report(rule, message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(RuleLevel::Normal < RuleLevel::Notice);
        assert!(RuleLevel::Notice < RuleLevel::Warn);
        assert!(RuleLevel::Warn < RuleLevel::Error);
    }

    #[test]
    fn test_value_fallback() {
        let rule = Rule::new("x", RuleLevel::Warn).with_value("abc");
        assert_eq!(rule.value_i64(7), 7);
        assert_eq!(Rule::new("x", RuleLevel::Warn).with_value(" 42 ").value_i64(7), 42);
    }

    #[test]
    fn test_configured_value() {
        let registry = RuleRegistry::builtin();
        let rules = vec![
            Rule::new(DDL_GH_OST_MIN_SIZE, RuleLevel::Normal).with_value("100"),
            Rule::new(DML_ROLLBACK_MAX_ROWS, RuleLevel::Notice),
        ];
        assert_eq!(registry.configured_value(&rules, DDL_GH_OST_MIN_SIZE), Some(100));
        assert_eq!(registry.configured_value(&rules, DML_ROLLBACK_MAX_ROWS), Some(1000));
        assert_eq!(registry.configured_value(&rules, DDL_OSC_MIN_SIZE), None);
    }

    #[test]
    fn test_level_serde() {
        let rule: Rule = serde_json::from_str(r#"{"name": "a", "level": "warn"}"#).unwrap();
        assert_eq!(rule.level, RuleLevel::Warn);
        assert_eq!(rule.value, None);
    }
}
