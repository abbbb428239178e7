//! MySQL parser implementation.

use std::sync::Arc;

use super::error::ParseError;
use super::pratt::{
    infix_binding_power, prefix_binding_power, token_to_binary_op, token_to_unary_op,
};
use crate::ast::{
    AlterTableSpec, AlterTableStatement, BinaryOp, ColumnDef, ColumnOption, ColumnPosition,
    Constraint, ConstraintKind, CreateDatabaseStatement, CreateTableStatement, DataType,
    DeleteStatement, DropDatabaseStatement, DropTableStatement, Expr, ForeignKeyReference,
    FunctionCall, IndexColumn, InsertSource, InsertStatement, JoinClause, JoinType, Literal,
    OrderBy, OrderDirection, OtherStatement, ParsedStatement, ReferentialAction, SelectColumn,
    SelectStatement, Statement, TableName, TableOption, TableRef, UpdateAssignment,
    UpdateStatement, UseStatement,
};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Niladic functions that may be written without parentheses.
const BARE_BUILTINS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_USER",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "UTC_TIMESTAMP",
    "UTC_DATE",
    "UTC_TIME",
];

/// MySQL Parser.
pub struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    /// Parameter counter for ? placeholders.
    param_counter: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            input,
            lexer,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            param_counter: 0,
        }
    }

    /// Parses every statement in the input. Statements are separated by
    /// semicolons; empty statements are skipped and empty input yields an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for the first statement that fails to parse.
    pub fn parse_statements(&mut self) -> Result<Vec<ParsedStatement>, ParseError> {
        let mut statements = vec![];
        loop {
            while self.check(&TokenKind::Semicolon) {
                self.advance();
            }
            if self.current.is_eof() {
                break;
            }

            let start = self.current.span.start;
            self.param_counter = 0;
            let statement = self.parse_statement()?;
            let end = self.previous.span.end;

            if !self.check(&TokenKind::Semicolon) && !self.current.is_eof() {
                return Err(self.unexpected("';' or end of input"));
            }

            statements.push(ParsedStatement {
                statement,
                text: self.input.get(start..end).unwrap_or_default().to_string(),
                span: Span::new(start, end),
            });
        }
        Ok(statements)
    }

    /// Parses a single SQL statement.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the input is not a valid SQL statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.current.kind {
            TokenKind::Keyword(Keyword::Select) => {
                Ok(Statement::Select(self.parse_select_statement()?))
            }
            TokenKind::Keyword(Keyword::Insert | Keyword::Replace) => {
                Ok(Statement::Insert(self.parse_insert_statement()?))
            }
            TokenKind::Keyword(Keyword::Update) => {
                Ok(Statement::Update(self.parse_update_statement()?))
            }
            TokenKind::Keyword(Keyword::Delete) => {
                Ok(Statement::Delete(self.parse_delete_statement()?))
            }
            TokenKind::Keyword(Keyword::Use) => {
                self.advance();
                let schema = self.expect_identifier()?;
                Ok(Statement::Use(UseStatement { schema }))
            }
            TokenKind::Keyword(Keyword::Create) => match self.peek_kind() {
                TokenKind::Keyword(Keyword::Database | Keyword::Schema) => {
                    Ok(Statement::CreateDatabase(self.parse_create_database()?))
                }
                TokenKind::Keyword(Keyword::Table) => {
                    Ok(Statement::CreateTable(Arc::new(self.parse_create_table()?)))
                }
                TokenKind::Identifier(word) if word.eq_ignore_ascii_case("TEMPORARY") => {
                    Ok(Statement::CreateTable(Arc::new(self.parse_create_table()?)))
                }
                _ => self.parse_other(),
            },
            TokenKind::Keyword(Keyword::Drop) => match self.peek_kind() {
                TokenKind::Keyword(Keyword::Database | Keyword::Schema) => {
                    Ok(Statement::DropDatabase(self.parse_drop_database()?))
                }
                TokenKind::Keyword(Keyword::Table) => {
                    Ok(Statement::DropTable(self.parse_drop_table()?))
                }
                TokenKind::Identifier(word) if word.eq_ignore_ascii_case("TEMPORARY") => {
                    Ok(Statement::DropTable(self.parse_drop_table()?))
                }
                _ => self.parse_other(),
            },
            TokenKind::Keyword(Keyword::Alter) => match self.peek_kind() {
                TokenKind::Keyword(Keyword::Table) => {
                    Ok(Statement::AlterTable(Arc::new(self.parse_alter_table()?)))
                }
                _ => self.parse_other(),
            },
            TokenKind::Eof => Err(ParseError::unexpected_eof(
                "statement",
                self.current.span,
            )),
            _ => self.parse_other(),
        }
    }

    /// Consumes a statement the parser does not model, up to the next
    /// semicolon.
    fn parse_other(&mut self) -> Result<Statement, ParseError> {
        let start = self.current.span.start;
        let keyword = match &self.current.kind {
            TokenKind::Keyword(kw) => kw.as_str().to_string(),
            TokenKind::Identifier(word) => word.to_ascii_uppercase(),
            _ => return Err(self.unexpected("statement")),
        };

        while !self.check(&TokenKind::Semicolon) && !self.current.is_eof() {
            if matches!(self.current.kind, TokenKind::Error(_)) {
                return Err(self.unexpected("token"));
            }
            self.advance();
        }

        let end = self.previous.span.end;
        Ok(Statement::Other(OtherStatement {
            keyword,
            text: self.input.get(start..end).unwrap_or_default().to_string(),
        }))
    }

    // --- DDL ---

    /// Parses CREATE {DATABASE|SCHEMA}.
    fn parse_create_database(&mut self) -> Result<CreateDatabaseStatement, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        self.advance(); // DATABASE or SCHEMA
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.expect_identifier()?;

        let mut charset = None;
        let mut collate = None;
        loop {
            self.consume_keyword(Keyword::Default);
            if self.consume_keyword(Keyword::Character) {
                self.expect_keyword(Keyword::Set)?;
                self.consume(&TokenKind::Eq);
                charset = Some(self.parse_name_or_string()?);
            } else if self.consume_word("CHARSET") {
                self.consume(&TokenKind::Eq);
                charset = Some(self.parse_name_or_string()?);
            } else if self.consume_keyword(Keyword::Collate) {
                self.consume(&TokenKind::Eq);
                collate = Some(self.parse_name_or_string()?);
            } else {
                break;
            }
        }

        Ok(CreateDatabaseStatement {
            if_not_exists,
            name,
            charset,
            collate,
        })
    }

    /// Parses DROP {DATABASE|SCHEMA}.
    fn parse_drop_database(&mut self) -> Result<DropDatabaseStatement, ParseError> {
        self.expect_keyword(Keyword::Drop)?;
        self.advance(); // DATABASE or SCHEMA
        let if_exists = self.parse_if_exists()?;
        let name = self.expect_identifier()?;
        Ok(DropDatabaseStatement { if_exists, name })
    }

    /// Parses DROP [TEMPORARY] TABLE.
    fn parse_drop_table(&mut self) -> Result<DropTableStatement, ParseError> {
        self.expect_keyword(Keyword::Drop)?;
        let temporary = self.consume_word("TEMPORARY");
        self.expect_keyword(Keyword::Table)?;
        let if_exists = self.parse_if_exists()?;

        let mut tables = vec![self.parse_table_name()?];
        while self.consume(&TokenKind::Comma) {
            tables.push(self.parse_table_name()?);
        }

        if !self.consume_keyword(Keyword::Restrict) {
            self.consume_keyword(Keyword::Cascade);
        }

        Ok(DropTableStatement {
            temporary,
            if_exists,
            tables,
        })
    }

    /// Parses CREATE [TEMPORARY] TABLE.
    fn parse_create_table(&mut self) -> Result<CreateTableStatement, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        let temporary = self.consume_word("TEMPORARY");
        self.expect_keyword(Keyword::Table)?;
        let if_not_exists = self.parse_if_not_exists()?;
        let table = self.parse_table_name()?;

        self.expect(&TokenKind::LeftParen)?;
        let mut columns = vec![];
        let mut constraints = vec![];
        loop {
            if self.is_constraint_start() {
                constraints.push(Arc::new(self.parse_constraint()?));
            } else {
                columns.push(Arc::new(self.parse_column_def()?));
            }
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let options = self.parse_table_options(true)?;

        Ok(CreateTableStatement {
            temporary,
            if_not_exists,
            table,
            columns,
            constraints,
            options,
        })
    }

    /// Parses ALTER TABLE.
    fn parse_alter_table(&mut self) -> Result<AlterTableStatement, ParseError> {
        self.expect_keyword(Keyword::Alter)?;
        self.expect_keyword(Keyword::Table)?;
        let table = self.parse_table_name()?;

        let mut specs = vec![self.parse_alter_spec()?];
        while self.consume(&TokenKind::Comma) {
            specs.push(self.parse_alter_spec()?);
        }

        Ok(AlterTableStatement { table, specs })
    }

    /// Parses one ALTER TABLE clause.
    fn parse_alter_spec(&mut self) -> Result<AlterTableSpec, ParseError> {
        match &self.current.kind {
            TokenKind::Keyword(Keyword::Add) => {
                self.advance();
                if self.consume_keyword(Keyword::Column) {
                    return self.parse_add_columns();
                }
                if self.is_constraint_start() {
                    return Ok(AlterTableSpec::AddConstraint(Arc::new(
                        self.parse_constraint()?,
                    )));
                }
                self.parse_add_columns()
            }
            TokenKind::Keyword(Keyword::Drop) => {
                self.advance();
                if self.consume_keyword(Keyword::Primary) {
                    self.expect_keyword(Keyword::Key)?;
                    Ok(AlterTableSpec::DropPrimaryKey)
                } else if self.consume_keyword(Keyword::Index) || self.consume_keyword(Keyword::Key)
                {
                    Ok(AlterTableSpec::DropIndex(self.expect_identifier()?))
                } else if self.consume_keyword(Keyword::Foreign) {
                    self.expect_keyword(Keyword::Key)?;
                    Ok(AlterTableSpec::DropForeignKey(self.expect_identifier()?))
                } else {
                    self.consume_keyword(Keyword::Column);
                    Ok(AlterTableSpec::DropColumn(self.expect_identifier()?))
                }
            }
            TokenKind::Keyword(Keyword::Change) => {
                self.advance();
                self.consume_keyword(Keyword::Column);
                let old_name = self.expect_identifier()?;
                let column = Arc::new(self.parse_column_def()?);
                let position = self.parse_column_position()?;
                Ok(AlterTableSpec::ChangeColumn {
                    old_name,
                    column,
                    position,
                })
            }
            TokenKind::Identifier(word) if word.eq_ignore_ascii_case("MODIFY") => {
                self.advance();
                self.consume_keyword(Keyword::Column);
                let column = Arc::new(self.parse_column_def()?);
                let position = self.parse_column_position()?;
                Ok(AlterTableSpec::ModifyColumn { column, position })
            }
            TokenKind::Keyword(Keyword::Alter) => {
                self.advance();
                self.consume_keyword(Keyword::Column);
                let column = self.expect_identifier()?;
                let default = if self.consume_keyword(Keyword::Set) {
                    self.expect_keyword(Keyword::Default)?;
                    Some(self.parse_expression(0)?)
                } else {
                    self.expect_keyword(Keyword::Drop)?;
                    self.expect_keyword(Keyword::Default)?;
                    None
                };
                Ok(AlterTableSpec::AlterColumnDefault { column, default })
            }
            TokenKind::Keyword(Keyword::Rename) => {
                self.advance();
                if self.consume_keyword(Keyword::Index) || self.consume_keyword(Keyword::Key) {
                    let from = self.expect_identifier()?;
                    self.expect_keyword(Keyword::To)?;
                    let to = self.expect_identifier()?;
                    return Ok(AlterTableSpec::RenameIndex { from, to });
                }
                if !self.consume_keyword(Keyword::To) {
                    self.consume_keyword(Keyword::As);
                }
                Ok(AlterTableSpec::RenameTable(self.parse_table_name()?))
            }
            _ if self.is_table_option_start() => Ok(AlterTableSpec::TableOptions(
                self.parse_table_options(false)?,
            )),
            _ => Err(self.unexpected("ALTER TABLE clause")),
        }
    }

    /// Parses the column part of ADD [COLUMN].
    fn parse_add_columns(&mut self) -> Result<AlterTableSpec, ParseError> {
        if self.consume(&TokenKind::LeftParen) {
            let mut columns = vec![Arc::new(self.parse_column_def()?)];
            while self.consume(&TokenKind::Comma) {
                columns.push(Arc::new(self.parse_column_def()?));
            }
            self.expect(&TokenKind::RightParen)?;
            return Ok(AlterTableSpec::AddColumns {
                columns,
                position: None,
            });
        }

        let column = Arc::new(self.parse_column_def()?);
        let position = self.parse_column_position()?;
        Ok(AlterTableSpec::AddColumns {
            columns: vec![column],
            position,
        })
    }

    /// Parses an optional FIRST / AFTER col.
    fn parse_column_position(&mut self) -> Result<Option<ColumnPosition>, ParseError> {
        if self.consume_word("FIRST") {
            Ok(Some(ColumnPosition::First))
        } else if self.consume_word("AFTER") {
            Ok(Some(ColumnPosition::After(self.expect_identifier()?)))
        } else {
            Ok(None)
        }
    }

    /// Parses a column definition.
    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;

        let mut unsigned = false;
        let mut zerofill = false;
        loop {
            if self.consume_word("UNSIGNED") {
                unsigned = true;
            } else if self.consume_word("ZEROFILL") {
                zerofill = true;
            } else if !self.consume_word("SIGNED") {
                break;
            }
        }

        let mut options = vec![];
        loop {
            let option = match &self.current.kind {
                TokenKind::Keyword(Keyword::Null) => {
                    self.advance();
                    ColumnOption::Null
                }
                TokenKind::Keyword(Keyword::Not) => {
                    self.advance();
                    self.expect_keyword(Keyword::Null)?;
                    ColumnOption::NotNull
                }
                TokenKind::Keyword(Keyword::Default) => {
                    self.advance();
                    ColumnOption::Default(self.parse_expression(0)?)
                }
                TokenKind::Keyword(Keyword::Primary) => {
                    self.advance();
                    self.expect_keyword(Keyword::Key)?;
                    ColumnOption::PrimaryKey
                }
                TokenKind::Keyword(Keyword::Key) => {
                    self.advance();
                    ColumnOption::PrimaryKey
                }
                TokenKind::Keyword(Keyword::Unique) => {
                    self.advance();
                    self.consume_keyword(Keyword::Key);
                    ColumnOption::UniqueKey
                }
                TokenKind::Keyword(Keyword::Collate) => {
                    self.advance();
                    ColumnOption::Collate(self.parse_name_or_string()?)
                }
                TokenKind::Keyword(Keyword::Character) => {
                    self.advance();
                    self.expect_keyword(Keyword::Set)?;
                    ColumnOption::CharacterSet(self.parse_name_or_string()?)
                }
                TokenKind::Keyword(Keyword::On) => {
                    self.advance();
                    self.expect_keyword(Keyword::Update)?;
                    ColumnOption::OnUpdate(self.parse_expression(0)?)
                }
                TokenKind::Identifier(word) => match word.to_ascii_uppercase().as_str() {
                    "AUTO_INCREMENT" => {
                        self.advance();
                        ColumnOption::AutoIncrement
                    }
                    "COMMENT" => {
                        self.advance();
                        ColumnOption::Comment(self.expect_string()?)
                    }
                    "CHARSET" => {
                        self.advance();
                        ColumnOption::CharacterSet(self.parse_name_or_string()?)
                    }
                    _ => break,
                },
                _ => break,
            };
            options.push(option);
        }

        Ok(ColumnDef {
            name,
            data_type,
            unsigned,
            zerofill,
            options,
        })
    }

    /// Parses a data type.
    fn parse_data_type(&mut self) -> Result<DataType, ParseError> {
        let span = self.current.span;
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.to_ascii_uppercase(),
            TokenKind::Keyword(Keyword::Set) => String::from("SET"),
            TokenKind::Keyword(Keyword::Character) => String::from("CHARACTER"),
            _ => return Err(self.unexpected("data type")),
        };
        self.advance();
        if name == "DOUBLE" {
            self.consume_word("PRECISION");
        }

        let mut args = vec![];
        let mut values = vec![];
        if self.consume(&TokenKind::LeftParen) {
            if name == "ENUM" || name == "SET" {
                values.push(self.expect_string()?);
                while self.consume(&TokenKind::Comma) {
                    values.push(self.expect_string()?);
                }
            } else {
                args.push(self.expect_u32()?);
                while self.consume(&TokenKind::Comma) {
                    args.push(self.expect_u32()?);
                }
            }
            self.expect(&TokenKind::RightParen)?;
        }

        DataType::from_parts(&name, &args, values)
            .ok_or_else(|| ParseError::new(format!("Invalid arguments for type {name}"), span))
    }

    /// Returns true if the current token starts a table constraint.
    fn is_constraint_start(&self) -> bool {
        matches!(
            &self.current.kind,
            TokenKind::Keyword(
                Keyword::Primary
                    | Keyword::Key
                    | Keyword::Index
                    | Keyword::Unique
                    | Keyword::Fulltext
                    | Keyword::Foreign
                    | Keyword::Constraint
                    | Keyword::Check
            )
        )
    }

    /// Parses a table constraint or index definition.
    fn parse_constraint(&mut self) -> Result<Constraint, ParseError> {
        let symbol = if self.consume_keyword(Keyword::Constraint) {
            self.parse_optional_name()
        } else {
            None
        };

        match &self.current.kind {
            TokenKind::Keyword(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let columns = self.parse_key_parts()?;
                Ok(Constraint {
                    name: None,
                    kind: ConstraintKind::PrimaryKey,
                    columns,
                })
            }
            TokenKind::Keyword(kw @ (Keyword::Unique | Keyword::Fulltext)) => {
                let kind = if *kw == Keyword::Unique {
                    ConstraintKind::Unique
                } else {
                    ConstraintKind::Fulltext
                };
                self.advance();
                if !self.consume_keyword(Keyword::Key) {
                    self.consume_keyword(Keyword::Index);
                }
                let name = self.parse_optional_name().or(symbol);
                let columns = self.parse_key_parts()?;
                Ok(Constraint {
                    name,
                    kind,
                    columns,
                })
            }
            TokenKind::Keyword(Keyword::Key | Keyword::Index) => {
                self.advance();
                let name = self.parse_optional_name();
                let columns = self.parse_key_parts()?;
                Ok(Constraint {
                    name,
                    kind: ConstraintKind::Index,
                    columns,
                })
            }
            TokenKind::Keyword(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let index_name = self.parse_optional_name();
                let columns = self.parse_key_parts()?;
                let reference = self.parse_foreign_key_reference()?;
                Ok(Constraint {
                    name: symbol.or(index_name),
                    kind: ConstraintKind::ForeignKey(reference),
                    columns,
                })
            }
            TokenKind::Keyword(Keyword::Check) => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let expr = self.parse_expression(0)?;
                self.expect(&TokenKind::RightParen)?;
                if self.check_keyword(Keyword::Not) && self.peek_word_is("ENFORCED") {
                    self.advance();
                }
                self.consume_word("ENFORCED");
                Ok(Constraint {
                    name: symbol,
                    kind: ConstraintKind::Check(expr),
                    columns: vec![],
                })
            }
            _ => Err(self.unexpected("constraint")),
        }
    }

    /// Parses `(col [(len)] [ASC|DESC], ...)` followed by index options.
    fn parse_key_parts(&mut self) -> Result<Vec<IndexColumn>, ParseError> {
        self.skip_index_type()?;
        self.expect(&TokenKind::LeftParen)?;
        let mut parts = vec![];
        loop {
            let name = self.expect_identifier()?;
            let length = if self.consume(&TokenKind::LeftParen) {
                let length = self.expect_u32()?;
                self.expect(&TokenKind::RightParen)?;
                Some(length)
            } else {
                None
            };
            let direction = if self.consume_keyword(Keyword::Asc) {
                Some(OrderDirection::Asc)
            } else if self.consume_keyword(Keyword::Desc) {
                Some(OrderDirection::Desc)
            } else {
                None
            };
            parts.push(IndexColumn {
                name,
                length,
                direction,
            });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;

        // Index options are accepted but not kept.
        loop {
            if self.check_keyword(Keyword::Using) {
                self.skip_index_type()?;
            } else if self.consume_word("COMMENT") {
                self.expect_string()?;
            } else if self.consume_word("KEY_BLOCK_SIZE") {
                self.consume(&TokenKind::Eq);
                self.expect_u32()?;
            } else if !(self.consume_word("VISIBLE") || self.consume_word("INVISIBLE")) {
                break;
            }
        }
        Ok(parts)
    }

    /// Skips `USING {BTREE|HASH}`.
    fn skip_index_type(&mut self) -> Result<(), ParseError> {
        if self.consume_keyword(Keyword::Using) {
            self.parse_word()?;
        }
        Ok(())
    }

    /// Parses `REFERENCES tbl (cols) [ON DELETE action] [ON UPDATE action]`.
    fn parse_foreign_key_reference(&mut self) -> Result<ForeignKeyReference, ParseError> {
        self.expect_keyword(Keyword::References)?;
        let table = self.parse_table_name()?;
        self.expect(&TokenKind::LeftParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(&TokenKind::RightParen)?;

        let mut on_delete = None;
        let mut on_update = None;
        while self.consume_keyword(Keyword::On) {
            if self.consume_keyword(Keyword::Delete) {
                on_delete = Some(self.parse_referential_action()?);
            } else {
                self.expect_keyword(Keyword::Update)?;
                on_update = Some(self.parse_referential_action()?);
            }
        }

        Ok(ForeignKeyReference {
            table,
            columns,
            on_delete,
            on_update,
        })
    }

    fn parse_referential_action(&mut self) -> Result<ReferentialAction, ParseError> {
        if self.consume_keyword(Keyword::Restrict) {
            Ok(ReferentialAction::Restrict)
        } else if self.consume_keyword(Keyword::Cascade) {
            Ok(ReferentialAction::Cascade)
        } else if self.consume_keyword(Keyword::Set) {
            if self.consume_keyword(Keyword::Null) {
                Ok(ReferentialAction::SetNull)
            } else {
                self.expect_keyword(Keyword::Default)?;
                Ok(ReferentialAction::SetDefault)
            }
        } else if self.consume_word("NO") {
            self.expect_word("ACTION")?;
            Ok(ReferentialAction::NoAction)
        } else {
            Err(self.unexpected("referential action"))
        }
    }

    /// Returns true if the current token starts a table option.
    fn is_table_option_start(&self) -> bool {
        match &self.current.kind {
            TokenKind::Keyword(Keyword::Default | Keyword::Character | Keyword::Collate) => true,
            TokenKind::Identifier(word) => !word.eq_ignore_ascii_case("MODIFY"),
            _ => false,
        }
    }

    /// Parses table options. Commas between options are only accepted in
    /// CREATE TABLE, where they cannot separate ALTER clauses.
    fn parse_table_options(&mut self, allow_comma: bool) -> Result<Vec<TableOption>, ParseError> {
        let mut options = vec![];
        loop {
            if allow_comma && !options.is_empty() && self.check(&TokenKind::Comma) {
                self.advance();
            }
            if !self.is_table_option_start() {
                break;
            }
            options.push(self.parse_table_option()?);
        }
        Ok(options)
    }

    fn parse_table_option(&mut self) -> Result<TableOption, ParseError> {
        self.consume_keyword(Keyword::Default);

        if self.consume_keyword(Keyword::Character) {
            self.expect_keyword(Keyword::Set)?;
            self.consume(&TokenKind::Eq);
            return Ok(TableOption::Charset(self.parse_name_or_string()?));
        }
        if self.consume_keyword(Keyword::Collate) {
            self.consume(&TokenKind::Eq);
            return Ok(TableOption::Collate(self.parse_name_or_string()?));
        }

        let name = match &self.current.kind {
            TokenKind::Identifier(word) => word.to_ascii_uppercase(),
            _ => return Err(self.unexpected("table option")),
        };
        self.advance();
        self.consume(&TokenKind::Eq);

        match name.as_str() {
            "ENGINE" => Ok(TableOption::Engine(self.parse_name_or_string()?)),
            "CHARSET" => Ok(TableOption::Charset(self.parse_name_or_string()?)),
            "AUTO_INCREMENT" => Ok(TableOption::AutoIncrement(self.expect_u64()?)),
            "COMMENT" => Ok(TableOption::Comment(self.expect_string()?)),
            _ => {
                let (value, quoted) = match &self.current.kind {
                    TokenKind::String(s) => (s.clone(), true),
                    TokenKind::Integer(n) => (n.to_string(), false),
                    TokenKind::Identifier(word) => (word.clone(), false),
                    TokenKind::Keyword(kw) => (kw.as_str().to_string(), false),
                    _ => return Err(self.unexpected("option value")),
                };
                self.advance();
                Ok(TableOption::Other {
                    name,
                    value,
                    quoted,
                })
            }
        }
    }

    fn parse_if_not_exists(&mut self) -> Result<bool, ParseError> {
        if self.consume_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_if_exists(&mut self) -> Result<bool, ParseError> {
        if self.consume_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Exists)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // --- DML ---

    /// Parses a SELECT statement.
    fn parse_select_statement(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect_keyword(Keyword::Select)?;

        // DISTINCT or ALL
        let distinct = if self.consume_keyword(Keyword::Distinct) {
            true
        } else {
            self.consume_keyword(Keyword::All);
            false
        };

        let columns = self.parse_select_columns()?;

        // FROM clause (optional for expressions like SELECT 1+1)
        let from = if self.consume_keyword(Keyword::From) {
            Some(self.parse_table_ref()?)
        } else {
            None
        };

        let where_clause = self.parse_optional_where()?;

        let group_by = if self.consume_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            self.parse_expression_list()?
        } else {
            vec![]
        };

        let having = if self.consume_keyword(Keyword::Having) {
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        let order_by = self.parse_optional_order_by()?;

        // LIMIT n | LIMIT m, n | LIMIT n OFFSET m
        let (limit, offset) = if self.consume_keyword(Keyword::Limit) {
            let first = self.parse_expression(0)?;
            if self.consume(&TokenKind::Comma) {
                (Some(self.parse_expression(0)?), Some(first))
            } else if self.consume_word("OFFSET") {
                (Some(first), Some(self.parse_expression(0)?))
            } else {
                (Some(first), None)
            }
        } else {
            (None, None)
        };

        let for_update = if self.consume_keyword(Keyword::For) {
            self.expect_keyword(Keyword::Update)?;
            true
        } else {
            false
        };

        Ok(SelectStatement {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
            for_update,
        })
    }

    /// Parses SELECT columns.
    fn parse_select_columns(&mut self) -> Result<Vec<SelectColumn>, ParseError> {
        let mut columns = vec![];

        loop {
            let expr = self.parse_expression(0)?;

            // Check for alias (AS name or just name)
            let alias = if self.consume_keyword(Keyword::As) {
                Some(self.parse_name_or_string()?)
            } else if matches!(&self.current.kind, TokenKind::Identifier(_)) {
                Some(self.expect_identifier()?)
            } else {
                None
            };

            columns.push(SelectColumn { expr, alias });

            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        Ok(columns)
    }

    /// Parses a table reference with joins. Comma joins become CROSS joins.
    fn parse_table_ref(&mut self) -> Result<TableRef, ParseError> {
        let mut table_ref = self.parse_table_factor()?;

        loop {
            if self.consume(&TokenKind::Comma) {
                let right = self.parse_table_factor()?;
                table_ref = TableRef::Join {
                    left: Box::new(table_ref),
                    join: Box::new(JoinClause {
                        join_type: JoinType::Cross,
                        table: right,
                        on: None,
                        using: vec![],
                    }),
                };
                continue;
            }
            if !self.is_join_keyword() {
                break;
            }

            let join_type = self.parse_join_type()?;
            let right = self.parse_table_factor()?;
            let (on, using) = if self.consume_keyword(Keyword::On) {
                (Some(self.parse_expression(0)?), vec![])
            } else if self.consume_keyword(Keyword::Using) {
                self.expect(&TokenKind::LeftParen)?;
                let cols = self.parse_identifier_list()?;
                self.expect(&TokenKind::RightParen)?;
                (None, cols)
            } else if matches!(join_type, JoinType::Left | JoinType::Right) {
                return Err(ParseError::new(
                    "Expected ON or USING clause",
                    self.current.span,
                ));
            } else {
                (None, vec![])
            };
            table_ref = TableRef::Join {
                left: Box::new(table_ref),
                join: Box::new(JoinClause {
                    join_type,
                    table: right,
                    on,
                    using,
                }),
            };
        }

        Ok(table_ref)
    }

    /// Parses a table name, a derived table, or a parenthesized join.
    fn parse_table_factor(&mut self) -> Result<TableRef, ParseError> {
        if self.consume(&TokenKind::LeftParen) {
            if self.check_keyword(Keyword::Select) {
                let query = self.parse_select_statement()?;
                self.expect(&TokenKind::RightParen)?;
                let alias = self.parse_optional_alias()?.ok_or_else(|| {
                    ParseError::new("Every derived table must have an alias", self.current.span)
                })?;
                return Ok(TableRef::Subquery {
                    query: Box::new(query),
                    alias,
                });
            }
            let inner = self.parse_table_ref()?;
            self.expect(&TokenKind::RightParen)?;
            return Ok(inner);
        }

        let table = self.parse_table_name()?;
        let alias = self.parse_optional_alias()?;
        Ok(TableRef::Table { table, alias })
    }

    /// Checks if current token is a join keyword.
    fn is_join_keyword(&self) -> bool {
        matches!(
            &self.current.kind,
            TokenKind::Keyword(
                Keyword::Join | Keyword::Inner | Keyword::Left | Keyword::Right | Keyword::Cross
            )
        )
    }

    /// Parses a join type.
    fn parse_join_type(&mut self) -> Result<JoinType, ParseError> {
        let join_type = match &self.current.kind {
            TokenKind::Keyword(Keyword::Join) => JoinType::Inner,
            TokenKind::Keyword(Keyword::Inner) => {
                self.advance();
                JoinType::Inner
            }
            TokenKind::Keyword(Keyword::Cross) => {
                self.advance();
                JoinType::Cross
            }
            TokenKind::Keyword(kw @ (Keyword::Left | Keyword::Right)) => {
                let join_type = if *kw == Keyword::Left {
                    JoinType::Left
                } else {
                    JoinType::Right
                };
                self.advance();
                self.consume_keyword(Keyword::Outer);
                join_type
            }
            _ => return Err(self.unexpected("JOIN keyword")),
        };
        self.expect_keyword(Keyword::Join)?;
        Ok(join_type)
    }

    /// Parses an optional table alias.
    fn parse_optional_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.consume_keyword(Keyword::As) {
            Ok(Some(self.expect_identifier()?))
        } else if matches!(&self.current.kind, TokenKind::Identifier(_)) {
            Ok(Some(self.expect_identifier()?))
        } else {
            Ok(None)
        }
    }

    /// Parses an INSERT or REPLACE statement.
    fn parse_insert_statement(&mut self) -> Result<InsertStatement, ParseError> {
        let replace = self.check_keyword(Keyword::Replace);
        self.advance();

        for modifier in ["LOW_PRIORITY", "DELAYED", "HIGH_PRIORITY"] {
            self.consume_word(modifier);
        }
        let ignore = self.consume_keyword(Keyword::Ignore);
        self.consume_keyword(Keyword::Into);
        let table = self.parse_table_name()?;

        // Column list (optional)
        let columns = if self.check(&TokenKind::LeftParen) && !self.peek_is_select() {
            self.advance();
            let cols = if self.check(&TokenKind::RightParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(&TokenKind::RightParen)?;
            cols
        } else {
            vec![]
        };

        let source = if self.consume_keyword(Keyword::Values) || self.consume_word("VALUE") {
            let mut rows = vec![];
            loop {
                self.expect(&TokenKind::LeftParen)?;
                let row = if self.check(&TokenKind::RightParen) {
                    vec![]
                } else {
                    self.parse_expression_list()?
                };
                self.expect(&TokenKind::RightParen)?;
                rows.push(row);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            InsertSource::Values(rows)
        } else if self.check_keyword(Keyword::Select) {
            InsertSource::Query(Box::new(self.parse_select_statement()?))
        } else if self.check(&TokenKind::LeftParen) {
            self.advance();
            let query = self.parse_select_statement()?;
            self.expect(&TokenKind::RightParen)?;
            InsertSource::Query(Box::new(query))
        } else if self.consume_keyword(Keyword::Set) {
            InsertSource::Set(self.parse_assignments()?)
        } else {
            return Err(self.unexpected("VALUES, SELECT, or SET"));
        };

        let on_duplicate = if self.consume_keyword(Keyword::On) {
            self.expect_word("DUPLICATE")?;
            self.expect_keyword(Keyword::Key)?;
            self.expect_keyword(Keyword::Update)?;
            self.parse_assignments()?
        } else {
            vec![]
        };

        Ok(InsertStatement {
            replace,
            ignore,
            table,
            columns,
            source,
            on_duplicate,
        })
    }

    /// Parses an UPDATE statement.
    fn parse_update_statement(&mut self) -> Result<UpdateStatement, ParseError> {
        self.expect_keyword(Keyword::Update)?;
        self.consume_word("LOW_PRIORITY");
        self.consume_keyword(Keyword::Ignore);

        let table = self.parse_table_ref()?;
        self.expect_keyword(Keyword::Set)?;
        let assignments = self.parse_assignments()?;
        let where_clause = self.parse_optional_where()?;
        let order_by = self.parse_optional_order_by()?;
        let limit = self.parse_optional_limit()?;

        Ok(UpdateStatement {
            table,
            assignments,
            where_clause,
            order_by,
            limit,
        })
    }

    /// Parses a single-table DELETE statement.
    fn parse_delete_statement(&mut self) -> Result<DeleteStatement, ParseError> {
        self.expect_keyword(Keyword::Delete)?;
        for modifier in ["LOW_PRIORITY", "QUICK"] {
            self.consume_word(modifier);
        }
        self.consume_keyword(Keyword::Ignore);
        self.expect_keyword(Keyword::From)?;

        let table = self.parse_table_name()?;
        let alias = self.parse_optional_alias()?;
        let where_clause = self.parse_optional_where()?;
        let order_by = self.parse_optional_order_by()?;
        let limit = self.parse_optional_limit()?;

        Ok(DeleteStatement {
            table,
            alias,
            where_clause,
            order_by,
            limit,
        })
    }

    /// Parses `col = expr, ...` with optionally qualified columns.
    fn parse_assignments(&mut self) -> Result<Vec<UpdateAssignment>, ParseError> {
        let mut assignments = vec![];
        loop {
            let first = self.expect_identifier()?;
            let (table, column) = if self.consume(&TokenKind::Dot) {
                (Some(first), self.expect_identifier()?)
            } else {
                (None, first)
            };
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expression(0)?;
            assignments.push(UpdateAssignment {
                table,
                column,
                value,
            });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(assignments)
    }

    fn parse_optional_where(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.consume_keyword(Keyword::Where) {
            Ok(Some(self.parse_expression(0)?))
        } else {
            Ok(None)
        }
    }

    fn parse_optional_order_by(&mut self) -> Result<Vec<OrderBy>, ParseError> {
        if self.consume_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()
        } else {
            Ok(vec![])
        }
    }

    fn parse_optional_limit(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.consume_keyword(Keyword::Limit) {
            Ok(Some(self.parse_expression(0)?))
        } else {
            Ok(None)
        }
    }

    /// Parses an ORDER BY list.
    fn parse_order_by_list(&mut self) -> Result<Vec<OrderBy>, ParseError> {
        let mut items = vec![];
        loop {
            let expr = self.parse_expression(0)?;
            let direction = if self.consume_keyword(Keyword::Desc) {
                OrderDirection::Desc
            } else {
                self.consume_keyword(Keyword::Asc);
                OrderDirection::Asc
            };
            items.push(OrderBy { expr, direction });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    // --- Expressions ---

    /// Parses an expression using Pratt parsing.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        while let Some((l_bp, r_bp)) = infix_binding_power(&self.current.kind) {
            if l_bp < min_bp {
                break;
            }

            match &self.current.kind {
                TokenKind::Keyword(Keyword::Is) => {
                    self.advance();
                    let negated = self.consume_keyword(Keyword::Not);
                    self.expect_keyword(Keyword::Null)?;
                    lhs = Expr::IsNull {
                        expr: Box::new(lhs),
                        negated,
                    };
                }
                TokenKind::Keyword(Keyword::Not) => {
                    // Infix NOT only introduces NOT IN / NOT LIKE / NOT BETWEEN
                    if !matches!(
                        self.peek_kind(),
                        TokenKind::Keyword(Keyword::In | Keyword::Like | Keyword::Between)
                    ) {
                        break;
                    }
                    self.advance();
                    lhs = self.parse_predicate(lhs, true, r_bp)?;
                }
                TokenKind::Keyword(Keyword::In | Keyword::Like | Keyword::Between) => {
                    lhs = self.parse_predicate(lhs, false, r_bp)?;
                }
                _ => {
                    let Some(op) = token_to_binary_op(&self.current.kind) else {
                        break;
                    };
                    self.advance();
                    let rhs = self.parse_expression(r_bp)?;
                    lhs = lhs.binary(op, rhs);
                }
            }
        }

        Ok(lhs)
    }

    /// Parses the tail of `[NOT] IN`, `[NOT] LIKE` and `[NOT] BETWEEN`.
    fn parse_predicate(&mut self, lhs: Expr, negated: bool, r_bp: u8) -> Result<Expr, ParseError> {
        if self.consume_keyword(Keyword::In) {
            self.expect(&TokenKind::LeftParen)?;
            let list = if self.check_keyword(Keyword::Select) {
                vec![Expr::Subquery(Box::new(self.parse_select_statement()?))]
            } else {
                self.parse_expression_list()?
            };
            self.expect(&TokenKind::RightParen)?;
            return Ok(Expr::In {
                expr: Box::new(lhs),
                list,
                negated,
            });
        }

        if self.consume_keyword(Keyword::Between) {
            let low = self.parse_expression(r_bp)?;
            self.expect_keyword(Keyword::And)?;
            let high = self.parse_expression(r_bp)?;
            return Ok(Expr::Between {
                expr: Box::new(lhs),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }

        self.expect_keyword(Keyword::Like)?;
        let pattern = self.parse_expression(r_bp)?;
        let op = if negated {
            BinaryOp::NotLike
        } else {
            BinaryOp::Like
        };
        Ok(lhs.binary(op, pattern))
    }

    /// Parses a prefix expression.
    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        if let (Some(op), Some(bp)) = (
            token_to_unary_op(&self.current.kind),
            prefix_binding_power(&self.current.kind),
        ) {
            self.advance();
            let operand = self.parse_expression(bp)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current.clone();
        match token.kind {
            // Literals
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(f)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Blob(b) => {
                self.advance();
                Ok(Expr::Literal(Literal::Blob(b)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Variable(name) => {
                self.advance();
                Ok(Expr::Variable {
                    name,
                    system: false,
                })
            }
            TokenKind::SystemVariable(name) => {
                self.advance();
                Ok(Expr::Variable { name, system: true })
            }
            // Parameter placeholders
            TokenKind::Question => {
                self.param_counter += 1;
                let position = self.param_counter;
                self.advance();
                Ok(Expr::Parameter { position })
            }
            // Wildcard
            TokenKind::Star => {
                self.advance();
                Ok(Expr::Wildcard { table: None })
            }
            // Parenthesized expression or subquery
            TokenKind::LeftParen => {
                self.advance();
                if self.check_keyword(Keyword::Select) {
                    let subquery = self.parse_select_statement()?;
                    self.expect(&TokenKind::RightParen)?;
                    Ok(Expr::Subquery(Box::new(subquery)))
                } else {
                    let expr = self.parse_expression(0)?;
                    self.expect(&TokenKind::RightParen)?;
                    Ok(Expr::Paren(Box::new(expr)))
                }
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case_expression(),
            TokenKind::Keyword(Keyword::Cast) => {
                self.advance();
                self.parse_cast_expression()
            }
            TokenKind::Keyword(Keyword::Exists) => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let subquery = self.parse_select_statement()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(Expr::Exists(Box::new(subquery)))
            }
            // `DEFAULT` as a value in INSERT or SET DEFAULT
            TokenKind::Keyword(Keyword::Default) if !self.peek_is(&TokenKind::LeftParen) => {
                self.advance();
                Ok(Expr::Builtin(String::from("DEFAULT")))
            }
            // Reserved words that are also function names
            TokenKind::Keyword(
                kw @ (Keyword::If
                | Keyword::Replace
                | Keyword::Left
                | Keyword::Right
                | Keyword::Insert
                | Keyword::Database
                | Keyword::Schema
                | Keyword::Values
                | Keyword::Mod
                | Keyword::Default),
            ) if self.peek_is(&TokenKind::LeftParen) => {
                self.advance();
                self.parse_function_call(kw.as_str().to_string())
            }
            // Identifier (column reference or function call)
            TokenKind::Identifier(name) => {
                let span = token.span;
                self.advance();

                if self.check(&TokenKind::LeftParen) {
                    return self.parse_function_call(name);
                }

                if self.check(&TokenKind::Dot) {
                    self.advance();
                    if self.consume(&TokenKind::Star) {
                        return Ok(Expr::Wildcard { table: Some(name) });
                    }
                    let column = self.expect_identifier()?;
                    return Ok(Expr::Column {
                        table: Some(name),
                        name: column,
                        span: span.merge(self.previous.span),
                    });
                }

                let upper = name.to_ascii_uppercase();
                if upper == "INTERVAL" && self.starts_expression() {
                    let value = self.parse_expression(0)?;
                    let unit = self.parse_word()?.to_ascii_uppercase();
                    return Ok(Expr::Interval {
                        value: Box::new(value),
                        unit,
                    });
                }
                if BARE_BUILTINS.contains(&upper.as_str()) {
                    return Ok(Expr::Builtin(upper));
                }

                Ok(Expr::Column {
                    table: None,
                    name,
                    span,
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Returns true if the current token can start an operand.
    fn starts_expression(&self) -> bool {
        self.current.kind.is_literal()
            || matches!(
                &self.current.kind,
                TokenKind::Identifier(_)
                    | TokenKind::Question
                    | TokenKind::LeftParen
                    | TokenKind::Minus
                    | TokenKind::Variable(_)
            )
    }

    /// Parses a function call.
    fn parse_function_call(&mut self, name: String) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LeftParen)?;

        let distinct = self.consume_keyword(Keyword::Distinct);

        let args = if self.check(&TokenKind::RightParen) {
            vec![]
        } else if self.check(&TokenKind::Star) {
            self.advance();
            vec![Expr::Wildcard { table: None }]
        } else {
            self.parse_expression_list()?
        };

        self.expect(&TokenKind::RightParen)?;

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            distinct,
        }))
    }

    /// Parses the tail of a CAST expression.
    fn parse_cast_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let expr = self.parse_expression(0)?;
        self.expect_keyword(Keyword::As)?;

        let data_type = if self.consume_word("SIGNED") || self.check_word("UNSIGNED") {
            let name = if self.consume_word("UNSIGNED") {
                "UNSIGNED"
            } else {
                "SIGNED"
            };
            if !self.consume_word("INTEGER") {
                self.consume_word("INT");
            }
            DataType::Custom(name.to_string())
        } else {
            self.parse_data_type()?
        };

        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            data_type,
        })
    }

    /// Parses a CASE expression.
    fn parse_case_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Case)?;

        // Simple CASE (CASE expr WHEN ...)
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };

        let mut when_clauses = vec![];
        while self.consume_keyword(Keyword::When) {
            let when_expr = self.parse_expression(0)?;
            self.expect_keyword(Keyword::Then)?;
            let then_expr = self.parse_expression(0)?;
            when_clauses.push((when_expr, then_expr));
        }
        if when_clauses.is_empty() {
            return Err(self.unexpected("WHEN"));
        }

        let else_clause = if self.consume_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expression(0)?))
        } else {
            None
        };

        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parses a comma-separated list of expressions.
    fn parse_expression_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![];
        loop {
            exprs.push(self.parse_expression(0)?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    /// Parses a comma-separated list of identifiers.
    fn parse_identifier_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut idents = vec![];
        loop {
            idents.push(self.expect_identifier()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(idents)
    }

    /// Parses `[schema.]table`.
    fn parse_table_name(&mut self) -> Result<TableName, ParseError> {
        let first = self.expect_identifier()?;
        if self.consume(&TokenKind::Dot) {
            let name = self.expect_identifier()?;
            Ok(TableName::qualified(first, name))
        } else {
            Ok(TableName::new(first))
        }
    }

    /// Parses an index or constraint name when one is present.
    fn parse_optional_name(&mut self) -> Option<String> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// Parses a bare word or a quoted string (charset and collation names).
    fn parse_name_or_string(&mut self) -> Result<String, ParseError> {
        if let TokenKind::String(value) = &self.current.kind {
            let value = value.clone();
            self.advance();
            return Ok(value);
        }
        self.parse_word()
    }

    // --- Helper methods ---

    /// Advances to the next token.
    fn advance(&mut self) {
        self.previous = core::mem::replace(&mut self.current, self.lexer.next_token());
    }

    /// Returns the kind of the token after the current one.
    fn peek_kind(&self) -> TokenKind {
        self.lexer.clone().next_token().kind
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.peek_kind()) == core::mem::discriminant(kind)
    }

    fn peek_is_select(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Select))
    }

    fn peek_word_is(&self, word: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(w) if w.eq_ignore_ascii_case(word))
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current.kind) == core::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current.kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Checks if the current token is the given non-reserved word.
    fn check_word(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(w) if w.eq_ignore_ascii_case(word))
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        let matched = self.check(kind);
        if matched {
            self.advance();
        }
        matched
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        let matched = self.check_keyword(keyword);
        if matched {
            self.advance();
        }
        matched
    }

    fn consume_word(&mut self, word: &str) -> bool {
        let matched = self.check_word(word);
        if matched {
            self.advance();
        }
        matched
    }

    /// Builds an error for the current token.
    fn unexpected(&self, expected: &str) -> ParseError {
        if self.current.is_eof() {
            ParseError::unexpected_eof(expected, self.current.span)
        } else {
            ParseError::unexpected(expected, self.current.kind.clone(), self.current.span)
        }
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.consume(kind) {
            Ok(())
        } else {
            let expected = kind.symbol().map_or_else(|| format!("{kind:?}"), |s| format!("'{s}'"));
            Err(self.unexpected(&expected))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.consume_word(word) {
            Ok(())
        } else {
            Err(self.unexpected(word))
        }
    }

    /// Expects and returns an identifier.
    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Returns the text of an identifier or keyword.
    fn parse_word(&mut self) -> Result<String, ParseError> {
        let word = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Keyword(kw) => kw.as_str().to_string(),
            _ => return Err(self.unexpected("word")),
        };
        self.advance();
        Ok(word)
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::String(value) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("string")),
        }
    }

    fn expect_u32(&mut self) -> Result<u32, ParseError> {
        match &self.current.kind {
            TokenKind::Integer(n) => {
                let value = u32::try_from(*n)
                    .map_err(|_| ParseError::new("Number out of range", self.current.span))?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    fn expect_u64(&mut self) -> Result<u64, ParseError> {
        match &self.current.kind {
            TokenKind::Integer(n) => {
                let value = u64::try_from(*n)
                    .map_err(|_| ParseError::new("Number out of range", self.current.span))?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("integer")),
        }
    }
}
