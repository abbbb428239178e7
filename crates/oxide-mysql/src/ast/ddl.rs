//! Data definition AST types.
//!
//! Column and constraint definitions are reference counted so that a table
//! definition can be cloned cheaply and partially rewritten, leaving every
//! untouched column or constraint shared with the original.

use std::sync::Arc;

use super::expression::Expr;
use super::statement::OrderDirection;
use super::types::DataType;

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TableName {
    /// Schema name (optional).
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
}

impl TableName {
    /// Creates an unqualified table name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a schema-qualified table name.
    #[must_use]
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Returns the schema, falling back to `default` when unqualified.
    #[must_use]
    pub fn schema_or<'a>(&'a self, default: &'a str) -> &'a str {
        match &self.schema {
            Some(schema) if !schema.is_empty() => schema,
            _ => default,
        }
    }
}

/// An attribute attached to a column definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOption {
    /// NULL.
    Null,
    /// NOT NULL.
    NotNull,
    /// DEFAULT expr.
    Default(Expr),
    /// AUTO_INCREMENT.
    AutoIncrement,
    /// PRIMARY KEY written inline.
    PrimaryKey,
    /// UNIQUE [KEY] written inline.
    UniqueKey,
    /// COMMENT 'text'.
    Comment(String),
    /// COLLATE name.
    Collate(String),
    /// CHARACTER SET name.
    CharacterSet(String),
    /// ON UPDATE expr.
    OnUpdate(Expr),
}

/// A column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Data type.
    pub data_type: DataType,
    /// UNSIGNED attribute.
    pub unsigned: bool,
    /// ZEROFILL attribute.
    pub zerofill: bool,
    /// Column options in source order.
    pub options: Vec<ColumnOption>,
}

impl ColumnDef {
    /// Creates a new column definition without options.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            unsigned: false,
            zerofill: false,
            options: Vec::new(),
        }
    }

    /// Appends an option.
    #[must_use]
    pub fn option(mut self, option: ColumnOption) -> Self {
        self.options.push(option);
        self
    }

    /// Returns true if the column name matches, ignoring ASCII case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns the DEFAULT expression, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Expr> {
        self.options.iter().find_map(|option| match option {
            ColumnOption::Default(expr) => Some(expr),
            _ => None,
        })
    }

    /// Returns true if the column is declared PRIMARY KEY inline.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.options
            .iter()
            .any(|option| matches!(option, ColumnOption::PrimaryKey))
    }

    /// Returns true if the column is declared NOT NULL (or inline PRIMARY KEY).
    #[must_use]
    pub fn is_not_null(&self) -> bool {
        self.options
            .iter()
            .any(|option| matches!(option, ColumnOption::NotNull | ColumnOption::PrimaryKey))
    }

    /// Returns true if the column is AUTO_INCREMENT.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.options
            .iter()
            .any(|option| matches!(option, ColumnOption::AutoIncrement))
    }

    /// Returns a copy with any DEFAULT option removed.
    #[must_use]
    pub fn without_default(&self) -> Self {
        let mut column = self.clone();
        column
            .options
            .retain(|option| !matches!(option, ColumnOption::Default(_)));
        column
    }

    /// Returns a copy whose DEFAULT options are replaced by `value`, or with
    /// `value` appended when the column had no default.
    #[must_use]
    pub fn with_default(&self, value: Expr) -> Self {
        let mut column = self.clone();
        let mut replaced = false;
        for option in &mut column.options {
            if let ColumnOption::Default(expr) = option {
                *expr = value.clone();
                replaced = true;
            }
        }
        if !replaced {
            column.options.push(ColumnOption::Default(value));
        }
        column
    }

    /// Returns a copy without the inline PRIMARY KEY option.
    #[must_use]
    pub fn without_primary_key(&self) -> Self {
        let mut column = self.clone();
        column
            .options
            .retain(|option| !matches!(option, ColumnOption::PrimaryKey));
        column
    }
}

/// A key part in an index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Prefix length.
    pub length: Option<u32>,
    /// Explicit direction.
    pub direction: Option<OrderDirection>,
}

impl IndexColumn {
    /// Creates a key part on a whole column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: None,
            direction: None,
        }
    }
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    /// RESTRICT.
    Restrict,
    /// CASCADE.
    Cascade,
    /// SET NULL.
    SetNull,
    /// SET DEFAULT.
    SetDefault,
    /// NO ACTION.
    NoAction,
}

impl ReferentialAction {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// The target of a FOREIGN KEY.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyReference {
    /// Referenced table.
    pub table: TableName,
    /// Referenced columns.
    pub columns: Vec<String>,
    /// ON DELETE action.
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action.
    pub on_update: Option<ReferentialAction>,
}

/// Kind of a table constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// PRIMARY KEY.
    PrimaryKey,
    /// UNIQUE KEY.
    Unique,
    /// Plain KEY / INDEX.
    Index,
    /// FULLTEXT KEY.
    Fulltext,
    /// FOREIGN KEY ... REFERENCES.
    ForeignKey(ForeignKeyReference),
    /// CHECK (expr).
    Check(Expr),
}

/// A table-level constraint or index.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Index or constraint name. Primary keys are always unnamed.
    pub name: Option<String>,
    /// The kind of constraint.
    pub kind: ConstraintKind,
    /// Key parts (empty for CHECK).
    pub columns: Vec<IndexColumn>,
}

impl Constraint {
    /// Creates a PRIMARY KEY over the given columns.
    #[must_use]
    pub fn primary_key<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: None,
            kind: ConstraintKind::PrimaryKey,
            columns: columns.into_iter().map(IndexColumn::new).collect(),
        }
    }

    /// Creates a named plain index over the given columns.
    #[must_use]
    pub fn index<S: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            kind: ConstraintKind::Index,
            columns: columns.into_iter().map(IndexColumn::new).collect(),
        }
    }

    /// Returns true for PRIMARY KEY constraints.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey)
    }

    /// Returns true for PRIMARY KEY and UNIQUE constraints.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey | ConstraintKind::Unique)
    }

    /// Returns true if the constraint name matches, ignoring ASCII case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(name))
    }

    /// Returns the key part column names.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A table option such as `ENGINE=InnoDB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOption {
    /// ENGINE.
    Engine(String),
    /// DEFAULT CHARSET / CHARACTER SET.
    Charset(String),
    /// COLLATE.
    Collate(String),
    /// AUTO_INCREMENT.
    AutoIncrement(u64),
    /// COMMENT.
    Comment(String),
    /// Any other `NAME = value` option.
    Other {
        /// Upper-cased option name.
        name: String,
        /// Value text.
        value: String,
        /// Whether the value was a quoted string.
        quoted: bool,
    },
}

impl TableOption {
    /// Returns the upper-cased option name, used to pair options across
    /// definitions.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Engine(_) => "ENGINE",
            Self::Charset(_) => "CHARSET",
            Self::Collate(_) => "COLLATE",
            Self::AutoIncrement(_) => "AUTO_INCREMENT",
            Self::Comment(_) => "COMMENT",
            Self::Other { name, .. } => name,
        }
    }
}

/// CREATE TABLE statement, also used as the tracked table definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateTableStatement {
    /// CREATE TEMPORARY TABLE.
    pub temporary: bool,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
    /// Table name.
    pub table: TableName,
    /// Column definitions.
    pub columns: Vec<Arc<ColumnDef>>,
    /// Table constraints and indexes.
    pub constraints: Vec<Arc<Constraint>>,
    /// Table options.
    pub options: Vec<TableOption>,
}

impl CreateTableStatement {
    /// Creates an empty definition for the named table.
    #[must_use]
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    /// Finds a column by name, ignoring ASCII case.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Arc<ColumnDef>> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    /// Finds a named constraint, ignoring ASCII case.
    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&Arc<Constraint>> {
        self.constraints.iter().find(|c| c.is_named(name))
    }

    /// Returns true when a primary key is declared, either as a table
    /// constraint or inline on a column.
    #[must_use]
    pub fn has_primary_key(&self) -> bool {
        self.constraints.iter().any(|c| c.is_primary_key())
            || self.columns.iter().any(|c| c.is_primary_key())
    }

    /// Returns the primary key column names, if a primary key exists.
    #[must_use]
    pub fn primary_key_columns(&self) -> Option<Vec<String>> {
        if let Some(pk) = self.constraints.iter().find(|c| c.is_primary_key()) {
            return Some(pk.columns.iter().map(|c| c.name.clone()).collect());
        }
        let inline: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.is_primary_key())
            .map(|c| c.name.clone())
            .collect();
        (!inline.is_empty()).then_some(inline)
    }

    /// Returns true if a primary key or any unique key exists.
    #[must_use]
    pub fn has_unique_key(&self) -> bool {
        self.has_primary_key()
            || self.constraints.iter().any(|c| c.is_unique())
            || self
                .columns
                .iter()
                .any(|c| c.options.contains(&ColumnOption::UniqueKey))
    }

    /// Returns true if some index starts with the given column.
    #[must_use]
    pub fn has_index_prefixed_by(&self, column: &str) -> bool {
        let leading = |c: &Constraint| {
            !matches!(c.kind, ConstraintKind::Check(_))
                && c
                    .columns
                    .first()
                    .is_some_and(|first| first.name.eq_ignore_ascii_case(column))
        };
        self.constraints.iter().any(|c| leading(c))
            || self.column(column).is_some_and(|c| {
                c.is_primary_key() || c.options.contains(&ColumnOption::UniqueKey)
            })
    }

    /// Finds a table option by its upper-cased name.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&TableOption> {
        self.options.iter().find(|o| o.name() == name)
    }
}

/// Position of a column added or changed by ALTER TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    /// FIRST.
    First,
    /// AFTER column.
    After(String),
}

/// One clause of an ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableSpec {
    /// ADD [COLUMN] col or ADD [COLUMN] (col, ...).
    AddColumns {
        /// Added columns.
        columns: Vec<Arc<ColumnDef>>,
        /// Position for the single-column form.
        position: Option<ColumnPosition>,
    },
    /// ADD constraint / index.
    AddConstraint(Arc<Constraint>),
    /// DROP [COLUMN] name.
    DropColumn(String),
    /// DROP PRIMARY KEY.
    DropPrimaryKey,
    /// DROP {INDEX|KEY} name.
    DropIndex(String),
    /// DROP FOREIGN KEY name.
    DropForeignKey(String),
    /// CHANGE [COLUMN] old new_definition.
    ChangeColumn {
        /// Existing column name.
        old_name: String,
        /// Replacement definition.
        column: Arc<ColumnDef>,
        /// New position.
        position: Option<ColumnPosition>,
    },
    /// MODIFY [COLUMN] definition.
    ModifyColumn {
        /// Replacement definition (matched by name).
        column: Arc<ColumnDef>,
        /// New position.
        position: Option<ColumnPosition>,
    },
    /// ALTER [COLUMN] name {SET DEFAULT expr | DROP DEFAULT}.
    AlterColumnDefault {
        /// Column name.
        column: String,
        /// New default, `None` for DROP DEFAULT.
        default: Option<Expr>,
    },
    /// RENAME [TO|AS] new_name.
    RenameTable(TableName),
    /// RENAME {INDEX|KEY} from TO to.
    RenameIndex {
        /// Existing index name.
        from: String,
        /// New index name.
        to: String,
    },
    /// Table options such as ENGINE=InnoDB.
    TableOptions(Vec<TableOption>),
}

/// ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStatement {
    /// Target table.
    pub table: TableName,
    /// Clauses in source order.
    pub specs: Vec<AlterTableSpec>,
}

impl AlterTableStatement {
    /// Returns the new table name if the statement renames the table.
    #[must_use]
    pub fn renamed_to(&self) -> Option<&TableName> {
        self.specs.iter().rev().find_map(|spec| match spec {
            AlterTableSpec::RenameTable(name) => Some(name),
            _ => None,
        })
    }
}

/// DROP TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTableStatement {
    /// DROP TEMPORARY TABLE.
    pub temporary: bool,
    /// IF EXISTS.
    pub if_exists: bool,
    /// Dropped tables.
    pub tables: Vec<TableName>,
}

/// CREATE DATABASE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabaseStatement {
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
    /// Database name.
    pub name: String,
    /// Default character set.
    pub charset: Option<String>,
    /// Default collation.
    pub collate: Option<String>,
}

/// DROP DATABASE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropDatabaseStatement {
    /// IF EXISTS.
    pub if_exists: bool,
    /// Database name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> CreateTableStatement {
        let mut table = CreateTableStatement::new(TableName::new("users"));
        table.columns = vec![
            Arc::new(ColumnDef::new("id", DataType::Bigint(None)).option(ColumnOption::PrimaryKey)),
            Arc::new(
                ColumnDef::new("email", DataType::Varchar(Some(255)))
                    .option(ColumnOption::Default(Expr::string(""))),
            ),
        ];
        table.constraints = vec![Arc::new(Constraint::index("idx_email", ["email"]))];
        table
    }

    #[test]
    fn test_lookups_ignore_case() {
        let table = users();
        assert!(table.column("EMAIL").is_some());
        assert!(table.constraint("IDX_Email").is_some());
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_inline_primary_key() {
        let table = users();
        assert!(table.has_primary_key());
        assert_eq!(table.primary_key_columns(), Some(vec![String::from("id")]));
        assert!(table.has_index_prefixed_by("id"));
        assert!(table.has_index_prefixed_by("email"));
    }

    #[test]
    fn test_default_rewrites_leave_original_untouched() {
        let table = users();
        let email = &table.columns[1];
        let changed = email.with_default(Expr::string("n/a"));
        let dropped = email.without_default();

        assert_eq!(changed.default_value(), Some(&Expr::string("n/a")));
        assert_eq!(dropped.default_value(), None);
        assert_eq!(email.default_value(), Some(&Expr::string("")));
    }

    #[test]
    fn test_renamed_to() {
        let alter = AlterTableStatement {
            table: TableName::new("a"),
            specs: vec![
                AlterTableSpec::DropColumn(String::from("x")),
                AlterTableSpec::RenameTable(TableName::new("b")),
            ],
        };
        assert_eq!(alter.renamed_to(), Some(&TableName::new("b")));
    }

    #[test]
    fn test_schema_or() {
        assert_eq!(TableName::new("t").schema_or("db"), "db");
        assert_eq!(TableName::qualified("x", "t").schema_or("db"), "x");
    }
}
