//! Metadata queries over a [`Connection`].

use oxide_mysql::ast::{quote_identifier, quote_string};
use serde::Serialize;
use tracing::debug;

use crate::connection::{Connection, Row};
use crate::error::{AuditError, Result};

/// Schemas every MySQL server carries.
pub const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// One row of `EXPLAIN` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExplainRecord {
    /// SELECT identifier.
    pub id: String,
    /// SELECT type.
    pub select_type: String,
    /// Table the row refers to.
    pub table: String,
    /// Join (access) type, `ALL` for a full scan.
    pub access_type: String,
    /// Indexes MySQL could use.
    pub possible_keys: String,
    /// Index MySQL chose.
    pub key: String,
    /// Estimated rows examined.
    pub rows: u64,
    /// Additional information.
    pub extra: String,
}

impl ExplainRecord {
    fn from_row(row: &Row) -> Self {
        let text = |column: &str| row.get(column).unwrap_or_default().to_string();
        Self {
            id: text("id"),
            select_type: text("select_type"),
            table: text("table"),
            access_type: text("type"),
            possible_keys: text("possible_keys"),
            key: text("key"),
            rows: row.get("rows").and_then(|v| v.parse().ok()).unwrap_or(0),
            extra: text("Extra"),
        }
    }

    /// Returns true if the row reads the whole table.
    #[must_use]
    pub fn is_full_scan(&self) -> bool {
        self.access_type.eq_ignore_ascii_case("ALL")
    }
}

/// Runs metadata queries on a borrowed connection.
pub struct Executor<'a> {
    conn: &'a mut dyn Connection,
}

impl<'a> Executor<'a> {
    /// Creates an executor over a connection.
    pub fn new(conn: &'a mut dyn Connection) -> Self {
        Self { conn }
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        debug!(sql, "Query");
        self.conn.query(sql)
    }

    /// Lists schema names, optionally hiding the system schemas.
    pub fn show_databases(&mut self, hide_system: bool) -> Result<Vec<String>> {
        let rows = self.query("SHOW DATABASES")?;
        Ok(rows
            .iter()
            .filter_map(|row| row.value(0))
            .filter(|name| {
                !hide_system
                    || !SYSTEM_SCHEMAS
                        .iter()
                        .any(|system| system.eq_ignore_ascii_case(name))
            })
            .map(str::to_string)
            .collect())
    }

    /// Lists the base tables (not views) of a schema.
    pub fn show_tables(&mut self, schema: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SHOW FULL TABLES FROM {} WHERE Table_type = 'BASE TABLE'",
            quote_identifier(schema)
        );
        let rows = self.query(&sql)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.value(0))
            .map(str::to_string)
            .collect())
    }

    /// Returns the `SHOW CREATE TABLE` text, or `None` if the table is gone.
    pub fn show_create_table(&mut self, schema: &str, table: &str) -> Result<Option<String>> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_identifier(schema),
            quote_identifier(table)
        );
        let rows = self.query(&sql)?;
        Ok(rows
            .first()
            .and_then(|row| row.get("Create Table").or_else(|| row.value(1)))
            .map(str::to_string))
    }

    /// Returns data plus index size in MB, 0 when unknown.
    pub fn table_size_mb(&mut self, schema: &str, table: &str) -> Result<f64> {
        let sql = format!(
            "SELECT (DATA_LENGTH + INDEX_LENGTH) / 1024 / 1024 AS size \
             FROM information_schema.TABLES WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
            quote_string(schema),
            quote_string(table)
        );
        let rows = self.query(&sql)?;
        match rows.first().and_then(|row| row.get("size")) {
            Some(size) => size
                .parse()
                .map_err(|_| AuditError::UnexpectedResult(format!("invalid table size '{size}'"))),
            None => Ok(0.0),
        }
    }

    /// Returns the server's default storage engine.
    pub fn default_engine(&mut self) -> Result<String> {
        let rows = self.query("SELECT @@default_storage_engine AS value")?;
        Ok(rows
            .first()
            .and_then(|row| row.value(0))
            .unwrap_or_default()
            .to_string())
    }

    /// Returns the default character set and collation of a schema.
    pub fn schema_defaults(&mut self, schema: &str) -> Result<Option<(String, String)>> {
        let sql = format!(
            "SELECT DEFAULT_CHARACTER_SET_NAME AS charset, DEFAULT_COLLATION_NAME AS collation \
             FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = {}",
            quote_string(schema)
        );
        let rows = self.query(&sql)?;
        Ok(rows.first().map(|row| {
            (
                row.get("charset").unwrap_or_default().to_string(),
                row.get("collation").unwrap_or_default().to_string(),
            )
        }))
    }

    /// Reads a global system variable. Exactly one row must come back.
    pub fn show_variable(&mut self, name: &str) -> Result<String> {
        let sql = format!("SHOW GLOBAL VARIABLES LIKE {}", quote_string(name));
        let rows = self.query(&sql)?;
        if rows.len() != 1 {
            return Err(AuditError::UnexpectedResult(format!(
                "expected one row for variable '{name}', got {}",
                rows.len()
            )));
        }
        Ok(rows[0].get("Value").unwrap_or_default().to_string())
    }

    /// Runs `EXPLAIN` for a statement.
    pub fn explain(&mut self, sql: &str) -> Result<Vec<ExplainRecord>> {
        let rows = self.query(&format!("EXPLAIN {sql}"))?;
        Ok(rows.iter().map(ExplainRecord::from_row).collect())
    }

    /// Returns the estimated row count from `SHOW TABLE STATUS`, `None`
    /// when the table is not reported.
    pub fn table_rows(&mut self, schema: &str, table: &str) -> Result<Option<u64>> {
        let sql = format!(
            "SHOW TABLE STATUS FROM {} LIKE {}",
            quote_identifier(schema),
            quote_string(table)
        );
        let rows = self.query(&sql)?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        match row.get("Rows") {
            Some(value) => value.parse().map(Some).map_err(|_| {
                AuditError::UnexpectedResult(format!("invalid row count '{value}'"))
            }),
            None => Ok(None),
        }
    }

    /// Counts distinct values of a column.
    pub fn distinct_count(&mut self, schema: &str, table: &str, column: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(DISTINCT {}) AS cardinality FROM {}.{}",
            quote_identifier(column),
            quote_identifier(schema),
            quote_identifier(table)
        );
        self.count(&sql)
    }

    /// Runs a query whose first column is a count.
    pub fn count(&mut self, sql: &str) -> Result<u64> {
        let rows = self.query(sql)?;
        let value = rows.first().and_then(|row| row.value(0)).unwrap_or("0");
        value
            .parse()
            .map_err(|_| AuditError::UnexpectedResult(format!("invalid count '{value}'")))
    }

    /// Runs a query and returns its rows.
    pub fn rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.query(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_record() {
        let row = Row::from_pairs([
            ("id", "1"),
            ("select_type", "SIMPLE"),
            ("table", "orders"),
            ("type", "ALL"),
            ("rows", "5000"),
        ]);
        let record = ExplainRecord::from_row(&row);
        assert!(record.is_full_scan());
        assert_eq!(record.rows, 5000);
        assert_eq!(record.key, "");
    }
}
