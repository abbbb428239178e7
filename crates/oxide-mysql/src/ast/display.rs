//! SQL rendering for AST nodes.
//!
//! Rendering is stable: parsing the output and rendering it again yields the
//! same text. Identifiers are always backtick-quoted.

use core::fmt::{self, Display, Formatter, Write as _};

use super::ddl::{
    AlterTableSpec, AlterTableStatement, ColumnDef, ColumnOption, ColumnPosition, Constraint,
    ConstraintKind, CreateDatabaseStatement, CreateTableStatement, DropDatabaseStatement,
    DropTableStatement, IndexColumn, TableName, TableOption,
};
use super::expression::{Expr, FunctionCall, Literal, UnaryOp};
use super::statement::{
    DeleteStatement, InsertSource, InsertStatement, JoinClause, OrderBy, OrderDirection,
    OtherStatement, SelectColumn, SelectStatement, Statement, TableRef, UpdateAssignment,
    UpdateStatement, UseStatement,
};

/// Quotes an identifier with backticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a string literal with single quotes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_identifiers(f: &mut Formatter<'_>, names: &[String]) -> fmt::Result {
    f.write_char('(')?;
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&quote_identifier(name))?;
    }
    f.write_char(')')
}

fn write_order_limit(
    f: &mut Formatter<'_>,
    order_by: &[OrderBy],
    limit: Option<&Expr>,
) -> fmt::Result {
    if !order_by.is_empty() {
        f.write_str(" ORDER BY ")?;
        write_list(f, order_by)?;
    }
    if let Some(limit) = limit {
        write!(f, " LIMIT {limit}")?;
    }
    Ok(())
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{v:.1}")
            }
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(&quote_string(s)),
            Self::Blob(bytes) => {
                f.write_str("X'")?;
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                f.write_char('\'')
            }
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Null => f.write_str("NULL"),
        }
    }
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write_list(f, &self.args)?;
        f.write_char(')')
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Column { table, name, .. } => {
                if let Some(table) = table {
                    write!(f, "{}.", quote_identifier(table))?;
                }
                f.write_str(&quote_identifier(name))
            }
            Self::Binary { left, op, right } => write!(f, "{left} {} {right}", op.as_str()),
            Self::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {operand}"),
                UnaryOp::Neg | UnaryOp::BitNot => {
                    let operand = operand.to_string();
                    // `--` opens a comment
                    let sep = if operand.starts_with('-') { " " } else { "" };
                    write!(f, "{}{sep}{operand}", op.as_str())
                }
            },
            Self::Function(call) => write!(f, "{call}"),
            Self::Builtin(name) => f.write_str(name),
            Self::Variable { name, system } => {
                if *system {
                    write!(f, "@@{name}")
                } else {
                    write!(f, "@{name}")
                }
            }
            Self::Subquery(query) => write!(f, "({query})"),
            Self::Exists(query) => write!(f, "EXISTS ({query})"),
            Self::IsNull { expr, negated } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} IS {not}NULL")
            }
            Self::In {
                expr,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                if let [Self::Subquery(query)] = list.as_slice() {
                    return write!(f, "{expr} {not}IN ({query})");
                }
                write!(f, "{expr} {not}IN (")?;
                write_list(f, list)?;
                f.write_char(')')
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}BETWEEN {low} AND {high}")
            }
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(else_clause) = else_clause {
                    write!(f, " ELSE {else_clause}")?;
                }
                f.write_str(" END")
            }
            Self::Cast { expr, data_type } => write!(f, "CAST({expr} AS {data_type})"),
            Self::Interval { value, unit } => write!(f, "INTERVAL {value} {unit}"),
            Self::Paren(inner) => write!(f, "({inner})"),
            Self::Parameter { .. } => f.write_char('?'),
            Self::Wildcard { table } => match table {
                Some(table) => write!(f, "{}.*", quote_identifier(table)),
                None => f.write_char('*'),
            },
        }
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_identifier(schema))?;
        }
        f.write_str(&quote_identifier(&self.name))
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderDirection::Asc => write!(f, "{}", self.expr),
            OrderDirection::Desc => write!(f, "{} DESC", self.expr),
        }
    }
}

impl Display for JoinClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.join_type.as_str(), self.table)?;
        if let Some(on) = &self.on {
            write!(f, " ON {on}")?;
        }
        if !self.using.is_empty() {
            f.write_str(" USING ")?;
            write_identifiers(f, &self.using)?;
        }
        Ok(())
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { table, alias } => {
                write!(f, "{table}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {}", quote_identifier(alias))?;
                }
                Ok(())
            }
            Self::Subquery { query, alias } => {
                write!(f, "({query}) AS {}", quote_identifier(alias))
            }
            Self::Join { left, join } => write!(f, "{left} {join}"),
        }
    }
}

impl Display for SelectColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_identifier(alias))?;
        }
        Ok(())
    }
}

impl Display for SelectStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write_list(f, &self.columns)?;
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        write_order_limit(f, &self.order_by, self.limit.as_ref())?;
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        if self.for_update {
            f.write_str(" FOR UPDATE")?;
        }
        Ok(())
    }
}

impl Display for UpdateAssignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{}.", quote_identifier(table))?;
        }
        write!(f, "{} = {}", quote_identifier(&self.column), self.value)
    }
}

impl Display for InsertStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(if self.replace { "REPLACE " } else { "INSERT " })?;
        if self.ignore {
            f.write_str("IGNORE ")?;
        }
        write!(f, "INTO {}", self.table)?;
        if !self.columns.is_empty() {
            f.write_char(' ')?;
            write_identifiers(f, &self.columns)?;
        }
        match &self.source {
            InsertSource::Values(rows) => {
                f.write_str(" VALUES ")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_char('(')?;
                    write_list(f, row)?;
                    f.write_char(')')?;
                }
            }
            InsertSource::Query(query) => write!(f, " {query}")?,
            InsertSource::Set(assignments) => {
                f.write_str(" SET ")?;
                write_list(f, assignments)?;
            }
        }
        if !self.on_duplicate.is_empty() {
            f.write_str(" ON DUPLICATE KEY UPDATE ")?;
            write_list(f, &self.on_duplicate)?;
        }
        Ok(())
    }
}

impl Display for UpdateStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET ", self.table)?;
        write_list(f, &self.assignments)?;
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }
        write_order_limit(f, &self.order_by, self.limit.as_ref())
    }
}

impl Display for DeleteStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_identifier(alias))?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }
        write_order_limit(f, &self.order_by, self.limit.as_ref())
    }
}

impl Display for ColumnOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::NotNull => f.write_str("NOT NULL"),
            Self::Default(expr) => write!(f, "DEFAULT {expr}"),
            Self::AutoIncrement => f.write_str("AUTO_INCREMENT"),
            Self::PrimaryKey => f.write_str("PRIMARY KEY"),
            Self::UniqueKey => f.write_str("UNIQUE KEY"),
            Self::Comment(text) => write!(f, "COMMENT {}", quote_string(text)),
            Self::Collate(name) => write!(f, "COLLATE {name}"),
            Self::CharacterSet(name) => write!(f, "CHARACTER SET {name}"),
            Self::OnUpdate(expr) => write!(f, "ON UPDATE {expr}"),
        }
    }
}

impl Display for ColumnDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_identifier(&self.name), self.data_type)?;
        if self.unsigned {
            f.write_str(" UNSIGNED")?;
        }
        if self.zerofill {
            f.write_str(" ZEROFILL")?;
        }
        for option in &self.options {
            write!(f, " {option}")?;
        }
        Ok(())
    }
}

impl Display for IndexColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_identifier(&self.name))?;
        if let Some(length) = self.length {
            write!(f, "({length})")?;
        }
        if let Some(direction) = self.direction {
            write!(f, " {}", direction.as_str())?;
        }
        Ok(())
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().map(quote_identifier);
        let key_parts = |f: &mut Formatter<'_>| -> fmt::Result {
            f.write_str(" (")?;
            write_list(f, &self.columns)?;
            f.write_char(')')
        };
        match &self.kind {
            ConstraintKind::PrimaryKey => {
                f.write_str("PRIMARY KEY")?;
                key_parts(f)
            }
            ConstraintKind::Unique | ConstraintKind::Index | ConstraintKind::Fulltext => {
                f.write_str(match self.kind {
                    ConstraintKind::Unique => "UNIQUE KEY",
                    ConstraintKind::Fulltext => "FULLTEXT KEY",
                    _ => "KEY",
                })?;
                if let Some(name) = &name {
                    write!(f, " {name}")?;
                }
                key_parts(f)
            }
            ConstraintKind::ForeignKey(reference) => {
                if let Some(name) = &name {
                    write!(f, "CONSTRAINT {name} ")?;
                }
                f.write_str("FOREIGN KEY")?;
                key_parts(f)?;
                write!(f, " REFERENCES {} ", reference.table)?;
                write_identifiers(f, &reference.columns)?;
                if let Some(action) = reference.on_delete {
                    write!(f, " ON DELETE {}", action.as_str())?;
                }
                if let Some(action) = reference.on_update {
                    write!(f, " ON UPDATE {}", action.as_str())?;
                }
                Ok(())
            }
            ConstraintKind::Check(expr) => {
                if let Some(name) = &name {
                    write!(f, "CONSTRAINT {name} ")?;
                }
                write!(f, "CHECK ({expr})")
            }
        }
    }
}

impl Display for TableOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(engine) => write!(f, "ENGINE={engine}"),
            Self::Charset(charset) => write!(f, "DEFAULT CHARSET={charset}"),
            Self::Collate(collate) => write!(f, "COLLATE={collate}"),
            Self::AutoIncrement(n) => write!(f, "AUTO_INCREMENT={n}"),
            Self::Comment(text) => write!(f, "COMMENT={}", quote_string(text)),
            Self::Other {
                name,
                value,
                quoted: true,
            } => write!(f, "{name}={}", quote_string(value)),
            Self::Other { name, value, .. } => write!(f, "{name}={value}"),
        }
    }
}

impl Display for CreateTableStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.temporary {
            f.write_str("TEMPORARY ")?;
        }
        f.write_str("TABLE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{} (", self.table)?;
        let definitions = self
            .columns
            .iter()
            .map(ToString::to_string)
            .chain(self.constraints.iter().map(ToString::to_string));
        for (i, definition) in definitions.enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "\n  {definition}")?;
        }
        f.write_str("\n)")?;
        for option in &self.options {
            write!(f, " {option}")?;
        }
        Ok(())
    }
}

impl Display for ColumnPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("FIRST"),
            Self::After(column) => write!(f, "AFTER {}", quote_identifier(column)),
        }
    }
}

impl Display for AlterTableSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let position = |f: &mut Formatter<'_>, position: &Option<ColumnPosition>| match position {
            Some(position) => write!(f, " {position}"),
            None => Ok(()),
        };
        match self {
            Self::AddColumns { columns, position: pos } => {
                if let [column] = columns.as_slice() {
                    write!(f, "ADD COLUMN {column}")?;
                    position(f, pos)
                } else {
                    f.write_str("ADD COLUMN (")?;
                    write_list(f, columns)?;
                    f.write_char(')')
                }
            }
            Self::AddConstraint(constraint) => write!(f, "ADD {constraint}"),
            Self::DropColumn(name) => write!(f, "DROP COLUMN {}", quote_identifier(name)),
            Self::DropPrimaryKey => f.write_str("DROP PRIMARY KEY"),
            Self::DropIndex(name) => write!(f, "DROP INDEX {}", quote_identifier(name)),
            Self::DropForeignKey(name) => write!(f, "DROP FOREIGN KEY {}", quote_identifier(name)),
            Self::ChangeColumn {
                old_name,
                column,
                position: pos,
            } => {
                write!(f, "CHANGE COLUMN {} {column}", quote_identifier(old_name))?;
                position(f, pos)
            }
            Self::ModifyColumn {
                column,
                position: pos,
            } => {
                write!(f, "MODIFY COLUMN {column}")?;
                position(f, pos)
            }
            Self::AlterColumnDefault { column, default } => {
                write!(f, "ALTER COLUMN {} ", quote_identifier(column))?;
                match default {
                    Some(expr) => write!(f, "SET DEFAULT {expr}"),
                    None => f.write_str("DROP DEFAULT"),
                }
            }
            Self::RenameTable(name) => write!(f, "RENAME TO {name}"),
            Self::RenameIndex { from, to } => write!(
                f,
                "RENAME INDEX {} TO {}",
                quote_identifier(from),
                quote_identifier(to)
            ),
            Self::TableOptions(options) => {
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    write!(f, "{option}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for AlterTableStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {} ", self.table)?;
        write_list(f, &self.specs)
    }
}

impl Display for DropTableStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DROP ")?;
        if self.temporary {
            f.write_str("TEMPORARY ")?;
        }
        f.write_str("TABLE ")?;
        if self.if_exists {
            f.write_str("IF EXISTS ")?;
        }
        write_list(f, &self.tables)
    }
}

impl Display for CreateDatabaseStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE DATABASE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        f.write_str(&quote_identifier(&self.name))?;
        if let Some(charset) = &self.charset {
            write!(f, " DEFAULT CHARACTER SET {charset}")?;
        }
        if let Some(collate) = &self.collate {
            write!(f, " COLLATE {collate}")?;
        }
        Ok(())
    }
}

impl Display for DropDatabaseStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DROP DATABASE ")?;
        if self.if_exists {
            f.write_str("IF EXISTS ")?;
        }
        f.write_str(&quote_identifier(&self.name))
    }
}

impl Display for UseStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "USE {}", quote_identifier(&self.schema))
    }
}

impl Display for OtherStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Use(stmt) => write!(f, "{stmt}"),
            Self::CreateDatabase(stmt) => write!(f, "{stmt}"),
            Self::DropDatabase(stmt) => write!(f, "{stmt}"),
            Self::CreateTable(stmt) => write!(f, "{stmt}"),
            Self::DropTable(stmt) => write!(f, "{stmt}"),
            Self::AlterTable(stmt) => write!(f, "{stmt}"),
            Self::Select(stmt) => write!(f, "{stmt}"),
            Self::Insert(stmt) => write!(f, "{stmt}"),
            Self::Update(stmt) => write!(f, "{stmt}"),
            Self::Delete(stmt) => write!(f, "{stmt}"),
            Self::Other(stmt) => write!(f, "{stmt}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::DataType;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_identifier("a`b"), "`a``b`");
        assert_eq!(quote_string("it's"), "'it''s'");
        assert_eq!(quote_string("c:\\dir"), "'c:\\\\dir'");
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(Literal::Float(2.5).to_string(), "2.5");
        assert_eq!(Literal::Blob(vec![0xAB, 0x01]).to_string(), "X'AB01'");
        assert_eq!(Literal::Null.to_string(), "NULL");
    }

    #[test]
    fn test_expr_display() {
        let expr = Expr::column("a")
            .eq(Expr::integer(1))
            .and(Expr::column("b").is_null());
        assert_eq!(expr.to_string(), "`a` = 1 AND `b` IS NULL");
    }

    #[test]
    fn test_create_table_display() {
        let mut table = CreateTableStatement::new(TableName::qualified("db", "t"));
        table.columns.push(Arc::new(
            ColumnDef::new("id", DataType::Int(None)).option(ColumnOption::NotNull),
        ));
        table
            .constraints
            .push(Arc::new(Constraint::primary_key(["id"])));
        table.options.push(TableOption::Engine(String::from("InnoDB")));
        assert_eq!(
            table.to_string(),
            "CREATE TABLE `db`.`t` (\n  `id` INT NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB"
        );
    }

    #[test]
    fn test_alter_spec_display() {
        let spec = AlterTableSpec::AlterColumnDefault {
            column: String::from("c"),
            default: None,
        };
        assert_eq!(spec.to_string(), "ALTER COLUMN `c` DROP DEFAULT");
        let spec = AlterTableSpec::AddConstraint(Arc::new(Constraint::index("idx", ["a", "b"])));
        assert_eq!(spec.to_string(), "ADD KEY `idx` (`a`, `b`)");
    }
}
