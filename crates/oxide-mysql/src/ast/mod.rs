//! Abstract Syntax Tree (AST) types for MySQL statements.

mod ddl;
mod display;
mod expression;
mod statement;
mod types;

pub use ddl::{
    AlterTableSpec, AlterTableStatement, ColumnDef, ColumnOption, ColumnPosition, Constraint,
    ConstraintKind, CreateDatabaseStatement, CreateTableStatement, DropDatabaseStatement,
    DropTableStatement, ForeignKeyReference, IndexColumn, ReferentialAction, TableName,
    TableOption,
};
pub use display::{quote_identifier, quote_string};
pub use expression::{BinaryOp, Expr, FunctionCall, Literal, UnaryOp};
pub use statement::{
    DeleteStatement, InsertSource, InsertStatement, JoinClause, JoinType, OrderBy, OrderDirection,
    OtherStatement, ParsedStatement, SelectColumn, SelectStatement, Statement, StatementCategory,
    TableRef, UpdateAssignment, UpdateStatement, UseStatement,
};
pub use types::DataType;
