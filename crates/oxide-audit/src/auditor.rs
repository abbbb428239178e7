//! The audit session.
//!
//! An [`Auditor`] audits statements one at a time, in execution order. Each
//! audited statement is folded into the session catalog, so later statements
//! are checked against the schema as it will be once the earlier ones ran.
//!
//! A session is offline when it has no [`Connector`]. Offline sessions only
//! see what the audited statements themselves create; every live lookup
//! returns an empty value instead.

use std::sync::Arc;

use oxide_mysql::ast::{AlterTableStatement, CreateTableStatement, TableName};
use oxide_mysql::{fingerprint, ParsedStatement, Parser, Statement, StatementCategory};
use tracing::{debug, info, warn};

use crate::advisor::{extract_columns, target_tables, Advice};
use crate::catalog::{Catalog, TableInfo, LOWER_CASE_TABLE_NAMES};
use crate::config::{AdvisorConfig, AuditConfig, DEFAULT_PT_OSC_TEMPLATE};
use crate::connection::{Connection, Connector, MySqlConnector, Row};
use crate::error::{AuditError, Result};
use crate::executor::{ExplainRecord, Executor};
use crate::onlineddl::{render_pt_osc, GhostBackend, OnlineDdlBackend};
use crate::result::AuditResult;
use crate::rollback::{self, RollbackSql};
use crate::rules::{
    Rule, RuleLevel, RuleRegistry, DDL_GH_OST_MIN_SIZE, DDL_OSC_MIN_SIZE, DML_ROLLBACK_MAX_ROWS,
};
use crate::validate::{validate_offline, validate_online};

/// Thresholds taken from the configuration rules. `-1` disables the
/// corresponding feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Maximum rows a DML rollback may read.
    pub dml_rollback_max_rows: i64,
    /// Table size (MB) from which the pt-online-schema-change notice is added.
    pub ddl_osc_min_size: i64,
    /// Table size (MB) above which ALTER TABLE runs through gh-ost.
    pub ddl_gh_ost_min_size: i64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            dml_rollback_max_rows: -1,
            ddl_osc_min_size: -1,
            ddl_gh_ost_min_size: -1,
        }
    }
}

impl SessionLimits {
    fn from_rules(registry: &RuleRegistry, rules: &[Rule]) -> Self {
        let value = |name| registry.configured_value(rules, name).unwrap_or(-1);
        Self {
            dml_rollback_max_rows: value(DML_ROLLBACK_MAX_ROWS),
            ddl_osc_min_size: value(DDL_OSC_MIN_SIZE),
            ddl_gh_ost_min_size: value(DDL_GH_OST_MIN_SIZE),
        }
    }
}

/// One statement of a parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Source text of the statement.
    pub text: String,
    /// DDL, DML or other.
    pub category: StatementCategory,
    /// Normalized form with literals removed.
    pub fingerprint: String,
}

/// Outcome of [`Auditor::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows reported by the server, 0 for online schema changes.
    pub rows_affected: u64,
    /// Whether the statement ran through the online schema change tool.
    pub online_ddl: bool,
}

enum ConnState {
    Idle,
    Open(Box<dyn Connection>),
    Closed,
}

#[allow(clippy::cast_precision_loss)]
fn megabytes(limit: i64) -> f64 {
    limit as f64
}

/// An audit session.
pub struct Auditor {
    catalog: Catalog,
    rules: Vec<Rule>,
    registry: Arc<RuleRegistry>,
    limits: SessionLimits,
    advisor: AdvisorConfig,
    pt_osc_template: String,
    result: AuditResult,
    has_invalid_sql: bool,
    connector: Option<Box<dyn Connector>>,
    conn: ConnState,
    online_ddl: Option<Box<dyn OnlineDdlBackend>>,
}

impl Auditor {
    fn with_parts(
        rules: Vec<Rule>,
        connector: Option<Box<dyn Connector>>,
        catalog: Catalog,
    ) -> Self {
        let registry = Arc::new(RuleRegistry::builtin());
        let limits = SessionLimits::from_rules(&registry, &rules);
        Self {
            catalog,
            rules,
            registry,
            limits,
            advisor: AdvisorConfig::default(),
            pt_osc_template: String::from(DEFAULT_PT_OSC_TEMPLATE),
            result: AuditResult::new(),
            has_invalid_sql: false,
            connector,
            conn: ConnState::Idle,
            online_ddl: None,
        }
    }

    /// Creates a session without a database connection.
    #[must_use]
    pub fn offline(rules: Vec<Rule>) -> Self {
        Self::with_parts(rules, None, Catalog::new())
    }

    /// Creates a session that connects through `connector` on first use,
    /// with `schema` as the current schema.
    #[must_use]
    pub fn online(
        rules: Vec<Rule>,
        connector: Box<dyn Connector>,
        schema: impl Into<String>,
    ) -> Self {
        Self::with_parts(rules, Some(connector), Catalog::with_current_schema(schema))
    }

    /// Creates a session from a configuration file's contents. The session
    /// is online when a DSN is configured.
    #[must_use]
    pub fn from_config(config: &AuditConfig) -> Self {
        let mut auditor = match &config.dsn {
            Some(dsn) => Self::online(
                config.rules.clone(),
                Box::new(MySqlConnector::new(dsn.clone())),
                dsn.database.clone(),
            ),
            None => Self::offline(config.rules.clone()),
        };
        if let (Some(gh_ost), Some(dsn)) = (&config.gh_ost, &config.dsn) {
            auditor = auditor.with_online_ddl(Box::new(GhostBackend::new(gh_ost, dsn.clone())));
        }
        auditor
            .with_advisor(config.advisor.clone())
            .with_pt_osc_template(config.pt_osc_template())
    }

    /// Sets the backend running large ALTER TABLE statements.
    #[must_use]
    pub fn with_online_ddl(mut self, backend: Box<dyn OnlineDdlBackend>) -> Self {
        self.online_ddl = Some(backend);
        self
    }

    /// Replaces the rule registry.
    #[must_use]
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.limits = SessionLimits::from_rules(&registry, &self.rules);
        self.registry = Arc::new(registry);
        self
    }

    /// Sets the advisor settings.
    #[must_use]
    pub fn with_advisor(mut self, advisor: AdvisorConfig) -> Self {
        self.advisor = advisor;
        self
    }

    /// Sets the pt-online-schema-change command template.
    #[must_use]
    pub fn with_pt_osc_template(mut self, template: impl Into<String>) -> Self {
        self.pt_osc_template = template.into();
        self
    }

    /// Starts from an existing catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    // ==================== Session state ====================

    /// Returns true if the session has no database connection.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.connector.is_none()
    }

    /// Returns the thresholds in effect.
    #[must_use]
    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the catalog for modification.
    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Returns the findings of the last audited statement.
    #[must_use]
    pub fn result(&self) -> &AuditResult {
        &self.result
    }

    /// Returns true once a statement failed validation. Rollback generation
    /// stops for the rest of the session.
    #[must_use]
    pub fn has_invalid_sql(&self) -> bool {
        self.has_invalid_sql
    }

    /// Adds a finding at the rule's level.
    pub fn report(&mut self, rule: &Rule, message: impl Into<String>) {
        self.result.add(rule.level, message);
    }

    /// Adds a finding at an explicit level.
    pub fn add_finding(&mut self, level: RuleLevel, message: impl Into<String>) {
        self.result.add(level, message);
    }

    /// Returns the schema of `table`, defaulting to the current schema.
    #[must_use]
    pub fn schema_name(&self, table: &TableName) -> String {
        table.schema_or(self.catalog.current_schema()).to_string()
    }

    /// Returns an independent offline session over a copy of the catalog.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            catalog: self.catalog.fork(),
            rules: self.rules.clone(),
            registry: Arc::clone(&self.registry),
            limits: self.limits,
            advisor: self.advisor.clone(),
            pt_osc_template: self.pt_osc_template.clone(),
            result: AuditResult::new(),
            has_invalid_sql: false,
            connector: None,
            conn: ConnState::Idle,
            online_ddl: None,
        }
    }

    // ==================== Connection ====================

    fn connection(&mut self) -> Result<&mut dyn Connection> {
        if matches!(self.conn, ConnState::Idle) {
            let connector = self.connector.as_ref().ok_or(AuditError::Offline)?;
            let schema = self.catalog.current_schema();
            let conn = connector.connect((!schema.is_empty()).then_some(schema))?;
            debug!(schema, "Connected");
            self.conn = ConnState::Open(conn);
        }
        match &mut self.conn {
            ConnState::Open(conn) => Ok(conn.as_mut()),
            ConnState::Closed => Err(AuditError::Connection(String::from(
                "connection is closed",
            ))),
            ConnState::Idle => Err(AuditError::Offline),
        }
    }

    /// Checks that the server answers. Offline sessions always succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened or the ping fails.
    pub fn ping(&mut self) -> Result<()> {
        if self.is_offline() {
            return Ok(());
        }
        self.connection()?.ping()
    }

    /// Lists the user schemas on the server, empty when offline.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn schemas(&mut self) -> Result<Vec<String>> {
        if self.is_offline() {
            return Ok(Vec::new());
        }
        Executor::new(self.connection()?).show_databases(true)
    }

    /// Closes the connection. Only the first call after it was opened has an
    /// effect.
    ///
    /// # Errors
    ///
    /// Returns an error if closing fails. The connection is not reused either
    /// way.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.conn, ConnState::Closed) {
            ConnState::Open(mut conn) => {
                debug!("Closing connection");
                conn.close()
            }
            ConnState::Idle => {
                self.conn = ConnState::Idle;
                Ok(())
            }
            ConnState::Closed => Ok(()),
        }
    }

    // ==================== Metadata ====================

    /// Returns a global system variable, empty when offline.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub fn sys_var(&mut self, name: &str) -> Result<String> {
        if let Some(value) = self.catalog.sys_var(name) {
            return Ok(value.to_string());
        }
        if self.is_offline() {
            return Ok(String::new());
        }
        let value = Executor::new(self.connection()?).show_variable(name)?;
        self.catalog.add_sys_var(name, value.clone());
        Ok(value)
    }

    /// Returns true if the schema exists, loading the schema list once.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn schema_exists(&mut self, schema: &str) -> Result<bool> {
        if !self.is_offline() {
            self.sys_var(LOWER_CASE_TABLE_NAMES)?;
            if !self.catalog.schemas_loaded() {
                let names = Executor::new(self.connection()?).show_databases(false)?;
                debug!(count = names.len(), "Loaded schemas");
                self.catalog.load_schemas(names);
            }
        }
        Ok(self.catalog.has_schema(schema))
    }

    /// Returns true if the table exists, loading its schema's table list
    /// once.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn table_exists(&mut self, table: &TableName) -> Result<bool> {
        let schema = self.schema_name(table);
        if !self.schema_exists(&schema)? {
            return Ok(false);
        }
        if !self.is_offline() && !self.catalog.tables_loaded(&schema) {
            let resolved = self
                .catalog
                .resolve_schema(&schema)
                .unwrap_or(&schema)
                .to_string();
            let names = Executor::new(self.connection()?).show_tables(&resolved)?;
            debug!(schema = %resolved, count = names.len(), "Loaded tables");
            self.catalog.load_tables(&schema, names);
        }
        Ok(self.catalog.has_table(&schema, &table.name))
    }

    /// Returns the table's data plus index size in MB, 0 when unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn table_size(&mut self, table: &TableName) -> Result<f64> {
        if !self.table_exists(table)? {
            return Ok(0.0);
        }
        let schema = self.schema_name(table);
        if let Some(size) = self.catalog.table(&schema, &table.name).and_then(|t| t.size) {
            return Ok(size);
        }
        if self.is_offline() {
            return Ok(0.0);
        }
        let size = Executor::new(self.connection()?).table_size_mb(&schema, &table.name)?;
        if let Some(info) = self.catalog.table_mut(&schema, &table.name) {
            info.size = Some(size);
        }
        Ok(size)
    }

    /// Returns the current definition of a table, fetching it from the
    /// server the first time.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails or the server's definition cannot
    /// be parsed.
    pub fn create_table_stmt(
        &mut self,
        table: &TableName,
    ) -> Result<Option<Arc<CreateTableStatement>>> {
        if !self.table_exists(table)? {
            return Ok(None);
        }
        let schema = self.schema_name(table);
        if let Some(definition) = self
            .catalog
            .table(&schema, &table.name)
            .and_then(TableInfo::definition)
        {
            return Ok(Some(Arc::clone(definition)));
        }
        if self.is_offline() {
            return Ok(None);
        }
        let Some(text) = Executor::new(self.connection()?).show_create_table(&schema, &table.name)?
        else {
            return Ok(None);
        };
        let create = match Parser::new(&text).parse_statement()? {
            Statement::CreateTable(create) => create,
            other => {
                return Err(AuditError::UnexpectedResult(format!(
                    "SHOW CREATE TABLE returned a {} statement",
                    other.category().as_str()
                )))
            }
        };
        if let Some(info) = self.catalog.table_mut(&schema, &table.name) {
            info.original = Some(Arc::clone(&create));
        }
        Ok(Some(create))
    }

    /// Returns the default storage engine for tables of `schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn default_engine(&mut self, schema: &str) -> Result<String> {
        if !self.schema_exists(schema)? {
            return Ok(String::new());
        }
        if let Some(engine) = self.catalog.schema(schema).and_then(|s| s.default_engine.clone()) {
            return Ok(engine);
        }
        if self.is_offline() {
            return Ok(String::new());
        }
        let engine = Executor::new(self.connection()?).default_engine()?;
        if let Some(info) = self.catalog.schema_mut(schema) {
            info.default_engine = Some(engine.clone());
        }
        Ok(engine)
    }

    /// Returns the default character set of `schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn default_charset(&mut self, schema: &str) -> Result<String> {
        Ok(self.schema_defaults(schema)?.0)
    }

    /// Returns the default collation of `schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn default_collation(&mut self, schema: &str) -> Result<String> {
        Ok(self.schema_defaults(schema)?.1)
    }

    fn schema_defaults(&mut self, schema: &str) -> Result<(String, String)> {
        if !self.schema_exists(schema)? {
            return Ok(Default::default());
        }
        if let Some(info) = self.catalog.schema(schema) {
            if let (Some(charset), Some(collation)) =
                (&info.default_charset, &info.default_collation)
            {
                return Ok((charset.clone(), collation.clone()));
            }
        }
        if self.is_offline() {
            return Ok(Default::default());
        }
        let Some((charset, collation)) = Executor::new(self.connection()?).schema_defaults(schema)?
        else {
            return Ok(Default::default());
        };
        if let Some(info) = self.catalog.schema_mut(schema) {
            info.default_charset = Some(charset.clone());
            info.default_collation = Some(collation.clone());
        }
        Ok((charset, collation))
    }

    /// Returns the EXPLAIN output of a statement, cached by exact text.
    /// Empty when offline.
    ///
    /// # Errors
    ///
    /// Returns an error if EXPLAIN fails.
    pub fn execution_plan(&mut self, sql: &str) -> Result<Vec<ExplainRecord>> {
        if let Some(plan) = self.catalog.execution_plan(sql) {
            return Ok(plan.to_vec());
        }
        if self.is_offline() {
            return Ok(Vec::new());
        }
        let plan = Executor::new(self.connection()?).explain(sql)?;
        self.catalog.add_execution_plan(sql, plan.clone());
        Ok(plan)
    }

    /// Returns `distinct values / rows` for a column, or `None` when it
    /// cannot be computed cheaply.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn selectivity(&mut self, table: &TableName, column: &str) -> Result<Option<f64>> {
        if let Some(selectivity) = self.catalog.selectivity(table, column) {
            return Ok(Some(selectivity));
        }
        if self.is_offline() || !self.table_exists(table)? {
            return Ok(None);
        }
        let schema = self.schema_name(table);
        let rows = Executor::new(self.connection()?).table_rows(&schema, &table.name)?;
        let max_rows = self.advisor.calc_selectivity_max_rows;
        let Some(rows) = rows.filter(|&rows| rows > 0 && rows <= max_rows) else {
            debug!(table = %table, rows, "Selectivity not computed");
            return Ok(None);
        };
        let distinct =
            Executor::new(self.connection()?).distinct_count(&schema, &table.name, column)?;
        #[allow(clippy::cast_precision_loss)]
        let selectivity = distinct as f64 / rows as f64;
        self.catalog.set_selectivity(table, column, selectivity);
        Ok(Some(selectivity))
    }

    pub(crate) fn count(&mut self, sql: &str) -> Result<u64> {
        Executor::new(self.connection()?).count(sql)
    }

    pub(crate) fn rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        Executor::new(self.connection()?).rows(sql)
    }

    // ==================== Statements ====================

    /// Parses a script into statements with their fingerprints.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be parsed.
    pub fn parse(&mut self, sql: &str) -> Result<Vec<Node>> {
        let case_sensitive = self.sys_var(LOWER_CASE_TABLE_NAMES)? == "0";
        oxide_mysql::parse(sql)?
            .into_iter()
            .map(|node| -> Result<Node> {
                Ok(Node {
                    fingerprint: fingerprint(&node.text, case_sensitive)?,
                    category: node.category(),
                    text: node.text,
                })
            })
            .collect()
    }

    fn parse_one(sql: &str) -> Result<Option<ParsedStatement>> {
        let mut nodes = oxide_mysql::parse(sql)?;
        match nodes.len() {
            1 => Ok(nodes.pop()),
            0 => Ok(None),
            count => {
                warn!(count, "Expected a single statement, input ignored");
                Ok(None)
            }
        }
    }

    /// Audits one statement and records its effect in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be parsed or a lookup or
    /// rule fails.
    pub fn audit(&mut self, sql: &str) -> Result<AuditResult> {
        self.result = AuditResult::new();
        let Some(node) = Self::parse_one(sql)? else {
            return Ok(self.result.clone());
        };

        let problems = if self.is_offline() {
            validate_offline(&node.statement)
        } else {
            validate_online(self, &node.statement)?
        };
        for problem in problems {
            self.result.add(RuleLevel::Error, problem);
        }

        if self.result.level() == RuleLevel::Error {
            self.has_invalid_sql = true;
            warn!(sql = %node.text, "Invalid SQL, rules skipped");
        } else {
            self.run_rules(&node)?;
            if let Statement::AlterTable(alter) = &node.statement {
                self.osc_notice(alter)?;
            }
        }

        self.catalog.update(&node.statement);
        Ok(self.result.clone())
    }

    fn run_rules(&mut self, node: &ParsedStatement) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let offline = self.is_offline();
        let rules = self.rules.clone();
        for rule in &rules {
            let Some(handler) = registry.get(&rule.name) else {
                debug!(rule = %rule.name, "Unknown rule");
                continue;
            };
            let Some(func) = handler.func else {
                continue;
            };
            if offline && !handler.allow_offline {
                continue;
            }
            func(rule, self, node)?;
        }
        Ok(())
    }

    fn osc_notice(&mut self, alter: &AlterTableStatement) -> Result<()> {
        let min_size = self.limits.ddl_osc_min_size;
        if min_size == -1 || self.table_size(&alter.table)? < megabytes(min_size) {
            return Ok(());
        }
        let message = if alter.renamed_to().is_some() {
            String::from(
                "[osc]pt-online-schema-change cannot rename a table, run the rename on its own",
            )
        } else if !self
            .create_table_stmt(&alter.table)?
            .is_some_and(|definition| definition.has_unique_key())
        {
            format!(
                "[osc]table {} has no primary or unique key, \
                 pt-online-schema-change cannot run on it",
                alter.table
            )
        } else {
            let schema = self.schema_name(&alter.table);
            format!("[osc]{}", render_pt_osc(&self.pt_osc_template, &schema, alter))
        };
        self.result.add(RuleLevel::Notice, message);
        Ok(())
    }

    /// Builds the statements undoing `sql` and records its effect in the
    /// catalog. Empty when offline or once invalid SQL was seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be parsed or a lookup fails.
    pub fn gen_rollback_sql(&mut self, sql: &str) -> Result<RollbackSql> {
        if self.is_offline() || self.has_invalid_sql {
            return Ok(RollbackSql::default());
        }
        let Some(node) = Self::parse_one(sql)? else {
            return Ok(RollbackSql::default());
        };
        let rollback = rollback::generate(self, &node.statement)?;
        self.catalog.update(&node.statement);
        Ok(rollback)
    }

    /// Executes a statement. Large ALTER TABLE statements run through the
    /// online schema change backend instead. Offline sessions execute
    /// nothing and return `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if execution or the online schema change fails.
    pub fn exec(&mut self, sql: &str) -> Result<Option<ExecResult>> {
        if self.is_offline() {
            debug!("Offline, statement not executed");
            return Ok(None);
        }
        let threshold = self.limits.ddl_gh_ost_min_size;
        if threshold != -1 {
            if let Some(alter) = single_alter(sql) {
                if self.table_size(&alter.table)? > megabytes(threshold) {
                    let schema = self.schema_name(&alter.table);
                    self.run_online_ddl(&schema, sql)?;
                    return Ok(Some(ExecResult {
                        rows_affected: 0,
                        online_ddl: true,
                    }));
                }
            }
        }
        let rows_affected = self.connection()?.exec(sql)?;
        Ok(Some(ExecResult {
            rows_affected,
            online_ddl: false,
        }))
    }

    fn run_online_ddl(&mut self, schema: &str, sql: &str) -> Result<()> {
        let backend = self.online_ddl.as_mut().ok_or_else(|| {
            AuditError::OnlineDdl(String::from("no online schema change backend configured"))
        })?;
        info!(schema, "dry-run gh-ost");
        backend
            .run(schema, sql, true)
            .map_err(|err| err.context("dry-run gh-ost"))?;
        info!(schema, "run gh-ost");
        backend
            .run(schema, sql, false)
            .map_err(|err| err.context("run gh-ost"))?;
        info!(schema, "gh-ost OK");
        Ok(())
    }

    /// Suggests indexes for the filtering columns of one statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be parsed or a lookup fails.
    pub fn advise(&mut self, sql: &str) -> Result<Vec<Advice>> {
        let Some(node) = Self::parse_one(sql)? else {
            return Ok(Vec::new());
        };
        let tables = target_tables(&node.statement);
        let mut advice: Vec<Advice> = Vec::new();

        for usage in extract_columns(&node.statement) {
            if !usage.role.filters_rows() {
                continue;
            }
            let candidates = tables.iter().filter(|(table, alias)| {
                usage.qualifier.as_deref().map_or(true, |qualifier| {
                    alias
                        .as_deref()
                        .unwrap_or(&table.name)
                        .eq_ignore_ascii_case(qualifier)
                })
            });
            let mut owners = Vec::new();
            for (table, _) in candidates {
                if let Some(definition) = self.create_table_stmt(table)? {
                    if definition.column(&usage.column).is_some() {
                        owners.push((table.clone(), definition));
                    }
                }
            }
            let [(table, definition)] = owners.as_slice() else {
                continue;
            };
            let Some(column) = definition.column(&usage.column) else {
                continue;
            };
            if definition.has_index_prefixed_by(&column.name) {
                continue;
            }
            let target = TableName::qualified(self.schema_name(table), table.name.clone());
            let rendered = target.to_string();
            if advice
                .iter()
                .any(|a| a.table == rendered && a.column.eq_ignore_ascii_case(&column.name))
            {
                continue;
            }
            let Some(selectivity) = self.selectivity(table, &column.name)? else {
                continue;
            };
            if selectivity < self.advisor.min_selectivity {
                continue;
            }
            advice.push(Advice::new(&target, &column.name, usage.role, selectivity));
        }
        Ok(advice)
    }
}

fn single_alter(sql: &str) -> Option<Arc<AlterTableStatement>> {
    let mut nodes = oxide_mysql::parse(sql).ok()?;
    if nodes.len() != 1 {
        return None;
    }
    match nodes.pop()?.statement {
        Statement::AlterTable(alter) => Some(alter),
        _ => None,
    }
}

impl Drop for Auditor {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "Failed to close connection");
        }
    }
}
