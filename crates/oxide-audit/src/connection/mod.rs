//! Blocking database connection contract.
//!
//! The audit engine is strictly sequential, so connections expose a blocking
//! interface over SQL text. [`MySqlConnector`] bridges the async `sqlx`
//! driver to it; tests substitute scripted implementations.

mod mysql;

pub use mysql::{MySqlConnector, MySqlSession};

use crate::error::Result;

/// One result row as ordered `(column, value)` pairs. SQL `NULL` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<(String, Option<String>)>,
}

impl Row {
    /// Creates a row from column/value pairs.
    #[must_use]
    pub fn new(values: Vec<(String, Option<String>)>) -> Self {
        Self { values }
    }

    /// Creates a row of non-null values.
    #[must_use]
    pub fn from_pairs<C, V>(pairs: impl IntoIterator<Item = (C, V)>) -> Self
    where
        C: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(column, value)| (column.into(), Some(value.into())))
                .collect(),
        }
    }

    /// Returns the value of the named column, ignoring ASCII case.
    /// `None` when the column is missing or the value is NULL.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|(_, value)| value.as_deref())
    }

    /// Returns the column/value pairs in result order.
    #[must_use]
    pub fn columns(&self) -> &[(String, Option<String>)] {
        &self.values
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A blocking connection to a MySQL-compatible server.
pub trait Connection {
    /// Runs a statement that returns rows.
    fn query(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Runs a statement and returns the number of affected rows.
    fn exec(&mut self, sql: &str) -> Result<u64>;

    /// Checks that the server is reachable.
    fn ping(&mut self) -> Result<()>;

    /// Closes the connection. Further calls fail.
    fn close(&mut self) -> Result<()>;
}

/// Opens connections.
pub trait Connector {
    /// Opens a connection, selecting `schema` when given.
    fn connect(&self, schema: Option<&str>) -> Result<Box<dyn Connection>>;
}
