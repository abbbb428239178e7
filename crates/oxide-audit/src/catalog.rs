//! In-memory schema catalog.
//!
//! The catalog tracks what a session knows about the server: which schemas
//! and tables exist, their definitions as observed and as altered by the
//! statements audited so far, and a few caches (sizes, system variables,
//! execution plans, column selectivity).
//!
//! Schemas and tables are loaded lazily and at most once. Table definitions
//! are shared through [`Arc`] and never modified in place, so [`Catalog::fork`]
//! only has to copy the maps.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use oxide_mysql::ast::{AlterTableStatement, CreateTableStatement, TableName};
use oxide_mysql::Statement;
use tracing::{debug, warn};

use crate::executor::ExplainRecord;
use crate::merge::merge_alter_table;

/// System variable controlling identifier case sensitivity.
pub const LOWER_CASE_TABLE_NAMES: &str = "lower_case_table_names";

/// What the session knows about one table.
#[derive(Debug, Clone, Default)]
pub struct TableInfo {
    /// Data plus index size in MB, `None` until loaded.
    pub size: Option<f64>,
    /// Whether the table was found on the server rather than created in
    /// this session.
    pub is_loaded_from_db: bool,
    /// Definition as last observed (server or CREATE TABLE).
    pub original: Option<Arc<CreateTableStatement>>,
    /// Definition after folding every ALTER TABLE of this session.
    pub merged: Option<Arc<CreateTableStatement>>,
    /// ALTER TABLE statements applied in this session, oldest first.
    pub alter_history: Vec<Arc<AlterTableStatement>>,
    column_stats: HashMap<String, f64>,
}

impl TableInfo {
    /// Creates an entry for a table that exists on the server.
    #[must_use]
    pub fn from_db() -> Self {
        Self {
            is_loaded_from_db: true,
            ..Self::default()
        }
    }

    /// Creates an entry for a table created by `create`.
    #[must_use]
    pub fn created(create: Arc<CreateTableStatement>) -> Self {
        Self {
            size: Some(0.0),
            original: Some(create),
            ..Self::default()
        }
    }

    /// Returns the most recent definition known.
    #[must_use]
    pub fn definition(&self) -> Option<&Arc<CreateTableStatement>> {
        self.merged.as_ref().or(self.original.as_ref())
    }

    /// Returns the cached selectivity of a column.
    #[must_use]
    pub fn selectivity(&self, column: &str) -> Option<f64> {
        self.column_stats.get(&column.to_ascii_lowercase()).copied()
    }

    /// Merges `alter` into the current definition. `None` when there is no
    /// definition or the merge soft-failed.
    fn try_merge(&self, alter: &AlterTableStatement) -> Option<Arc<CreateTableStatement>> {
        let (merged, applied) = merge_alter_table(self.definition()?, alter);
        applied.then_some(merged)
    }
}

/// What the session knows about one schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaInfo {
    /// Default storage engine, `None` until loaded.
    pub default_engine: Option<String>,
    /// Default character set, `None` until loaded.
    pub default_charset: Option<String>,
    /// Default collation, `None` until loaded.
    pub default_collation: Option<String>,
    tables: Option<BTreeMap<String, TableInfo>>,
}

impl SchemaInfo {
    /// Returns true once the table list has been loaded.
    #[must_use]
    pub fn tables_loaded(&self) -> bool {
        self.tables.is_some()
    }

    /// Returns the table names known so far.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().flat_map(|tables| tables.keys().map(String::as_str))
    }

    /// A schema created in this session starts without tables.
    fn created() -> Self {
        Self {
            tables: Some(BTreeMap::new()),
            ..Self::default()
        }
    }
}

/// Per-session schema catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    current_schema: String,
    schemas: BTreeMap<String, SchemaInfo>,
    schemas_loaded: bool,
    execution_plans: HashMap<String, Vec<ExplainRecord>>,
    sys_vars: HashMap<String, String>,
}

fn find_key<'a, V>(
    map: &'a BTreeMap<String, V>,
    name: &str,
    case_insensitive: bool,
) -> Option<&'a str> {
    if let Some((key, _)) = map.get_key_value(name) {
        return Some(key);
    }
    if case_insensitive {
        let upper = name.to_ascii_uppercase();
        return map
            .keys()
            .find(|key| key.to_ascii_uppercase() == upper)
            .map(String::as_str);
    }
    None
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty catalog whose current schema is `schema`.
    #[must_use]
    pub fn with_current_schema(schema: impl Into<String>) -> Self {
        Self {
            current_schema: schema.into(),
            ..Self::default()
        }
    }

    /// Returns the current schema, empty when none is selected.
    #[must_use]
    pub fn current_schema(&self) -> &str {
        &self.current_schema
    }

    /// Returns true unless `lower_case_table_names` is known to be `0`.
    #[must_use]
    pub fn is_case_insensitive(&self) -> bool {
        self.sys_vars
            .get(LOWER_CASE_TABLE_NAMES)
            .map_or(true, |value| value != "0")
    }

    // ==================== Schemas ====================

    /// Returns true once the schema list has been loaded.
    #[must_use]
    pub fn schemas_loaded(&self) -> bool {
        self.schemas_loaded
    }

    /// Registers the server's schemas. Only the first call has an effect.
    pub fn load_schemas<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) {
        if self.schemas_loaded {
            return;
        }
        for name in names {
            self.schemas.entry(name.as_ref().to_string()).or_default();
        }
        self.schemas_loaded = true;
    }

    /// Returns the tracked spelling of a schema name.
    #[must_use]
    pub fn resolve_schema(&self, name: &str) -> Option<&str> {
        find_key(&self.schemas, name, self.is_case_insensitive())
    }

    /// Returns true if the schema is known.
    #[must_use]
    pub fn has_schema(&self, name: &str) -> bool {
        self.resolve_schema(name).is_some()
    }

    /// Returns the schema entry.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&SchemaInfo> {
        let key = self.resolve_schema(name)?;
        self.schemas.get(key)
    }

    /// Returns the schema entry for modification.
    pub fn schema_mut(&mut self, name: &str) -> Option<&mut SchemaInfo> {
        let key = self.resolve_schema(name)?.to_string();
        self.schemas.get_mut(&key)
    }

    /// Returns the known schema names.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Adds a schema if it is not known yet. A new schema has no tables.
    pub fn add_schema(&mut self, name: &str) {
        if !self.has_schema(name) {
            self.schemas.insert(name.to_string(), SchemaInfo::created());
        }
    }

    /// Removes a schema and its tables.
    pub fn del_schema(&mut self, name: &str) {
        if let Some(key) = self.resolve_schema(name).map(str::to_string) {
            self.schemas.remove(&key);
        }
    }

    /// Switches the current schema if it is known.
    pub fn use_schema(&mut self, name: &str) {
        if let Some(key) = self.resolve_schema(name) {
            self.current_schema = key.to_string();
        }
    }

    // ==================== Tables ====================

    /// Returns true once the tables of `schema` have been loaded.
    #[must_use]
    pub fn tables_loaded(&self, schema: &str) -> bool {
        self.schema(schema).is_some_and(SchemaInfo::tables_loaded)
    }

    /// Registers the server's tables of a known schema. Only the first call
    /// per schema has an effect.
    pub fn load_tables<S: AsRef<str>>(&mut self, schema: &str, names: impl IntoIterator<Item = S>) {
        let Some(info) = self.schema_mut(schema) else {
            return;
        };
        if info.tables.is_some() {
            return;
        }
        info.tables = Some(
            names
                .into_iter()
                .map(|name| (name.as_ref().to_string(), TableInfo::from_db()))
                .collect(),
        );
    }

    fn resolve_table(&self, schema: &str, table: &str) -> Option<(String, String)> {
        let schema_key = self.resolve_schema(schema)?;
        let tables = self.schemas.get(schema_key)?.tables.as_ref()?;
        let table_key = find_key(tables, table, self.is_case_insensitive())?;
        Some((schema_key.to_string(), table_key.to_string()))
    }

    /// Returns true if the table is known.
    #[must_use]
    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.resolve_table(schema, table).is_some()
    }

    /// Returns the table entry.
    #[must_use]
    pub fn table(&self, schema: &str, table: &str) -> Option<&TableInfo> {
        let (schema_key, table_key) = self.resolve_table(schema, table)?;
        self.schemas.get(&schema_key)?.tables.as_ref()?.get(&table_key)
    }

    /// Returns the table entry for modification.
    pub fn table_mut(&mut self, schema: &str, table: &str) -> Option<&mut TableInfo> {
        let (schema_key, table_key) = self.resolve_table(schema, table)?;
        self.schemas
            .get_mut(&schema_key)?
            .tables
            .as_mut()?
            .get_mut(&table_key)
    }

    /// Adds a table to a schema whose tables are loaded. Returns false when
    /// the table list is not available.
    pub fn add_table(&mut self, schema: &str, table: &str, info: TableInfo) -> bool {
        let Some(tables) = self.schema_mut(schema).and_then(|s| s.tables.as_mut()) else {
            return false;
        };
        tables.insert(table.to_string(), info);
        true
    }

    /// Removes a table, returning its entry.
    pub fn del_table(&mut self, schema: &str, table: &str) -> Option<TableInfo> {
        let (schema_key, table_key) = self.resolve_table(schema, table)?;
        self.schemas
            .get_mut(&schema_key)?
            .tables
            .as_mut()?
            .remove(&table_key)
    }

    // ==================== Caches ====================

    /// Returns the cached selectivity of a column.
    #[must_use]
    pub fn selectivity(&self, table: &TableName, column: &str) -> Option<f64> {
        let schema = table.schema_or(&self.current_schema);
        self.table(schema, &table.name)?.selectivity(column)
    }

    /// Caches the selectivity of a column of a tracked table.
    pub fn set_selectivity(&mut self, table: &TableName, column: &str, selectivity: f64) {
        let schema = table.schema_or(&self.current_schema).to_string();
        if let Some(info) = self.table_mut(&schema, &table.name) {
            info.column_stats
                .insert(column.to_ascii_lowercase(), selectivity);
        }
    }

    /// Returns a cached system variable.
    #[must_use]
    pub fn sys_var(&self, name: &str) -> Option<&str> {
        self.sys_vars.get(name).map(String::as_str)
    }

    /// Caches a system variable.
    pub fn add_sys_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.sys_vars.insert(name.into(), value.into());
    }

    /// Returns the cached plan for exactly this statement text.
    #[must_use]
    pub fn execution_plan(&self, sql: &str) -> Option<&[ExplainRecord]> {
        self.execution_plans.get(sql).map(Vec::as_slice)
    }

    /// Caches the plan of a statement.
    pub fn add_execution_plan(&mut self, sql: impl Into<String>, plan: Vec<ExplainRecord>) {
        self.execution_plans.insert(sql.into(), plan);
    }

    // ==================== Session ====================

    /// Returns an independent copy for a new session.
    ///
    /// Definitions stay shared. Selectivity and execution plans are not
    /// carried over.
    #[must_use]
    pub fn fork(&self) -> Self {
        let mut schemas = self.schemas.clone();
        for table in schemas
            .values_mut()
            .filter_map(|schema| schema.tables.as_mut())
            .flat_map(BTreeMap::values_mut)
        {
            table.column_stats.clear();
        }
        Self {
            current_schema: self.current_schema.clone(),
            schemas,
            schemas_loaded: self.schemas_loaded,
            execution_plans: HashMap::new(),
            sys_vars: self.sys_vars.clone(),
        }
    }

    /// Applies the effect of an executed statement.
    ///
    /// Statements must be given in execution order.
    pub fn update(&mut self, statement: &Statement) {
        match statement {
            Statement::Use(stmt) => self.use_schema(&stmt.schema),
            Statement::CreateDatabase(stmt) => {
                if self.schemas_loaded {
                    self.add_schema(&stmt.name);
                }
            }
            Statement::DropDatabase(stmt) => {
                if self.schemas_loaded {
                    self.del_schema(&stmt.name);
                }
            }
            Statement::CreateTable(stmt) => {
                let schema = stmt.table.schema_or(&self.current_schema).to_string();
                if self.has_table(&schema, &stmt.table.name) {
                    return;
                }
                if !self.schemas_loaded && !self.has_schema(&schema) {
                    self.schemas.insert(schema.clone(), SchemaInfo::created());
                }
                let added = self.add_table(
                    &schema,
                    &stmt.table.name,
                    TableInfo::created(Arc::clone(stmt)),
                );
                debug!(schema = %schema, table = %stmt.table.name, added, "Tracked CREATE TABLE");
            }
            Statement::DropTable(stmt) => {
                if !self.schemas_loaded {
                    return;
                }
                for table in &stmt.tables {
                    let schema = table.schema_or(&self.current_schema).to_string();
                    self.del_table(&schema, &table.name);
                }
            }
            Statement::AlterTable(stmt) => self.apply_alter(stmt),
            Statement::Select(_)
            | Statement::Insert(_)
            | Statement::Update(_)
            | Statement::Delete(_)
            | Statement::Other(_) => {}
        }
    }

    fn apply_alter(&mut self, alter: &Arc<AlterTableStatement>) {
        let schema = alter.table.schema_or(&self.current_schema).to_string();
        let Some(info) = self.table(&schema, &alter.table.name) else {
            debug!(schema = %schema, table = %alter.table.name, "ALTER TABLE on untracked table");
            return;
        };
        let merged = info.try_merge(alter);
        let renamed = match (&merged, info.definition()) {
            (Some(merged), _) => Some(merged.table.clone()),
            (None, Some(_)) => None,
            (None, None) => alter.renamed_to().cloned(),
        };

        let source = self.resolve_table(&schema, &alter.table.name);
        let moved_to = renamed
            .map(|name| (name.schema_or(&schema).to_string(), name.name))
            .filter(|(target_schema, target)| self.resolve_table(target_schema, target) != source);
        let collides = moved_to
            .as_ref()
            .is_some_and(|(target_schema, target)| self.has_table(target_schema, target));
        if collides {
            warn!(schema = %schema, table = %alter.table.name, "Rename target already exists");
        }

        let Some(info) = self.table_mut(&schema, &alter.table.name) else {
            return;
        };
        info.alter_history.push(Arc::clone(alter));
        if collides {
            return;
        }
        if merged.is_some() {
            info.merged = merged;
        }

        if let Some((target_schema, target)) = moved_to {
            if let Some(info) = self.del_table(&schema, &alter.table.name) {
                if !self.add_table(&target_schema, &target, info) {
                    debug!(
                        schema = %target_schema,
                        table = %target,
                        "Rename target schema not loaded"
                    );
                }
            }
        }
    }
}
