//! # oxide-mysql
//!
//! A MySQL statement parser.
//!
//! This crate provides:
//! - A hand-written lexer for the MySQL dialect (backtick identifiers,
//!   `#` comments, user and system variables)
//! - A recursive descent parser with Pratt expression parsing that keeps the
//!   source text of every statement
//! - `Display` rendering of every AST node back to MySQL
//! - Statement fingerprints for grouping statements that differ only in
//!   their literal values
//!
//! ```rust
//! use oxide_mysql::{parse, Statement};
//!
//! let statements = parse("USE shop; ALTER TABLE orders ADD COLUMN note TEXT").unwrap();
//! assert_eq!(statements.len(), 2);
//! assert!(matches!(statements[1].statement, Statement::AlterTable(_)));
//! assert_eq!(statements[1].text, "ALTER TABLE orders ADD COLUMN note TEXT");
//! ```

pub mod ast;
pub mod fingerprint;
pub mod lexer;
pub mod parser;

pub use ast::{ParsedStatement, Statement, StatementCategory};
pub use fingerprint::fingerprint;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};

/// Parses every statement in `sql`.
///
/// # Errors
///
/// Returns a `ParseError` for the first statement that fails to parse.
pub fn parse(sql: &str) -> Result<Vec<ParsedStatement>, ParseError> {
    Parser::new(sql).parse_statements()
}
