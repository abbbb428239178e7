//! SQL statement AST types.

use std::sync::Arc;

use super::ddl::{
    AlterTableStatement, CreateDatabaseStatement, CreateTableStatement, DropDatabaseStatement,
    DropTableStatement, TableName,
};
use super::expression::Expr;
use crate::lexer::Span;

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ORDER BY clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The expression to order by.
    pub expr: Expr,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN.
    Inner,
    /// LEFT OUTER JOIN.
    Left,
    /// RIGHT OUTER JOIN.
    Right,
    /// CROSS JOIN (also used for comma joins).
    Cross,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// The type of join.
    pub join_type: JoinType,
    /// The table to join.
    pub table: TableRef,
    /// The join condition.
    pub on: Option<Expr>,
    /// USING columns (alternative to ON).
    pub using: Vec<String>,
}

/// A table reference in a FROM clause or DML target.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// A base table.
    Table {
        /// Table name.
        table: TableName,
        /// Alias.
        alias: Option<String>,
    },
    /// A derived table.
    Subquery {
        /// The subquery.
        query: Box<SelectStatement>,
        /// Alias (required for derived tables).
        alias: String,
    },
    /// A joined table.
    Join {
        /// Left side of the join.
        left: Box<TableRef>,
        /// The join clause.
        join: Box<JoinClause>,
    },
}

impl TableRef {
    /// Creates a simple table reference.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            table: TableName::new(name),
            alias: None,
        }
    }

    /// Creates a table reference with schema.
    #[must_use]
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Table {
            table: TableName::qualified(schema, name),
            alias: None,
        }
    }

    /// Adds an alias to this table reference.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> Self {
        match self {
            Self::Table { table, .. } => Self::Table {
                table,
                alias: Some(alias.into()),
            },
            Self::Subquery { query, .. } => Self::Subquery {
                query,
                alias: alias.into(),
            },
            Self::Join { left, join } => Self::Join {
                left: Box::new((*left).alias(alias)),
                join,
            },
        }
    }

    /// Collects the base tables referenced at this level, with their
    /// aliases, in source order. Derived tables are not descended into.
    #[must_use]
    pub fn base_tables(&self) -> Vec<(&TableName, Option<&str>)> {
        let mut out = Vec::new();
        self.collect_base_tables(&mut out);
        out
    }

    fn collect_base_tables<'a>(&'a self, out: &mut Vec<(&'a TableName, Option<&'a str>)>) {
        match self {
            Self::Table { table, alias } => out.push((table, alias.as_deref())),
            Self::Subquery { .. } => {}
            Self::Join { left, join } => {
                left.collect_base_tables(out);
                join.table.collect_base_tables(out);
            }
        }
    }
}

/// A column in SELECT clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    /// The expression.
    pub expr: Expr,
    /// Column alias.
    pub alias: Option<String>,
}

impl SelectColumn {
    /// Creates a new select column.
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    /// Creates a select column with an alias.
    #[must_use]
    pub fn with_alias(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Whether to select DISTINCT values.
    pub distinct: bool,
    /// The columns to select.
    pub columns: Vec<SelectColumn>,
    /// The FROM clause.
    pub from: Option<TableRef>,
    /// The WHERE clause.
    pub where_clause: Option<Expr>,
    /// GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// HAVING clause.
    pub having: Option<Expr>,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// LIMIT clause.
    pub limit: Option<Expr>,
    /// OFFSET clause.
    pub offset: Option<Expr>,
    /// FOR UPDATE.
    pub for_update: bool,
}

/// Source of data for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// VALUES (...), (...), ...
    Values(Vec<Vec<Expr>>),
    /// SELECT ...
    Query(Box<SelectStatement>),
    /// SET col = expr, ...
    Set(Vec<UpdateAssignment>),
}

/// An INSERT or REPLACE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// REPLACE instead of INSERT.
    pub replace: bool,
    /// INSERT IGNORE.
    pub ignore: bool,
    /// Target table.
    pub table: TableName,
    /// Column names (optional).
    pub columns: Vec<String>,
    /// Values to insert.
    pub source: InsertSource,
    /// ON DUPLICATE KEY UPDATE assignments.
    pub on_duplicate: Vec<UpdateAssignment>,
}

/// An assignment in UPDATE SET.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    /// Table qualifier (optional).
    pub table: Option<String>,
    /// Column name.
    pub column: String,
    /// Value expression.
    pub value: Expr,
}

/// An UPDATE statement. Multi-table updates carry a join in `table`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table reference.
    pub table: TableRef,
    /// SET assignments.
    pub assignments: Vec<UpdateAssignment>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// LIMIT clause.
    pub limit: Option<Expr>,
}

/// A single-table DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table.
    pub table: TableName,
    /// Alias.
    pub alias: Option<String>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// LIMIT clause.
    pub limit: Option<Expr>,
}

/// USE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseStatement {
    /// Schema name.
    pub schema: String,
}

/// A statement the parser recognizes only by its leading keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherStatement {
    /// Upper-cased leading word.
    pub keyword: String,
    /// Source text.
    pub text: String,
}

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// USE statement.
    Use(UseStatement),
    /// CREATE DATABASE statement.
    CreateDatabase(CreateDatabaseStatement),
    /// DROP DATABASE statement.
    DropDatabase(DropDatabaseStatement),
    /// CREATE TABLE statement.
    CreateTable(Arc<CreateTableStatement>),
    /// DROP TABLE statement.
    DropTable(DropTableStatement),
    /// ALTER TABLE statement.
    AlterTable(Arc<AlterTableStatement>),
    /// SELECT statement.
    Select(SelectStatement),
    /// INSERT or REPLACE statement.
    Insert(InsertStatement),
    /// UPDATE statement.
    Update(UpdateStatement),
    /// DELETE statement.
    Delete(DeleteStatement),
    /// Anything else.
    Other(OtherStatement),
}

/// Coarse statement classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementCategory {
    /// Data definition.
    Ddl,
    /// Data manipulation (including SELECT).
    Dml,
    /// Everything else.
    Other,
}

impl StatementCategory {
    /// Returns a lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ddl => "ddl",
            Self::Dml => "dml",
            Self::Other => "other",
        }
    }
}

impl Statement {
    /// Returns the statement category.
    #[must_use]
    pub const fn category(&self) -> StatementCategory {
        match self {
            Self::CreateDatabase(_)
            | Self::DropDatabase(_)
            | Self::CreateTable(_)
            | Self::DropTable(_)
            | Self::AlterTable(_) => StatementCategory::Ddl,
            Self::Select(_) | Self::Insert(_) | Self::Update(_) | Self::Delete(_) => {
                StatementCategory::Dml
            }
            Self::Use(_) | Self::Other(_) => StatementCategory::Other,
        }
    }
}

/// A parsed statement together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    /// The statement.
    pub statement: Statement,
    /// Source text, without the trailing semicolon.
    pub text: String,
    /// Location in the input.
    pub span: Span,
}

impl ParsedStatement {
    /// Returns the statement category.
    #[must_use]
    pub const fn category(&self) -> StatementCategory {
        self.statement.category()
    }
}
