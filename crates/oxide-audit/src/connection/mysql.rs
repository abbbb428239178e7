//! MySQL connections on top of `sqlx`.

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column as _, ConnectOptions as _, Connection as _, Row as _};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::{Connection, Connector, Row};
use crate::config::Dsn;
use crate::error::{AuditError, Result};

/// Opens [`MySqlSession`]s for a DSN.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    dsn: Dsn,
}

impl MySqlConnector {
    /// Creates a connector for the given DSN.
    #[must_use]
    pub fn new(dsn: Dsn) -> Self {
        Self { dsn }
    }
}

impl Connector for MySqlConnector {
    fn connect(&self, schema: Option<&str>) -> Result<Box<dyn Connection>> {
        Ok(Box::new(MySqlSession::open(&self.dsn, schema)?))
    }
}

/// A single MySQL connection driven by a private current-thread runtime.
///
/// Must not be used from inside another tokio runtime.
pub struct MySqlSession {
    runtime: Runtime,
    conn: Option<MySqlConnection>,
}

impl MySqlSession {
    /// Connects to the server described by `dsn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot start or the server rejects
    /// the connection.
    pub fn open(dsn: &Dsn, schema: Option<&str>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let mut options = MySqlConnectOptions::new()
            .host(&dsn.host)
            .port(dsn.port)
            .username(&dsn.user)
            .password(&dsn.password);
        if let Some(schema) = schema.filter(|s| !s.is_empty()) {
            options = options.database(schema);
        }

        debug!(host = %dsn.host, port = dsn.port, schema = ?schema, "Connecting");
        let conn = runtime.block_on(options.connect())?;
        Ok(Self {
            runtime,
            conn: Some(conn),
        })
    }
}

fn closed() -> AuditError {
    AuditError::Connection(String::from("connection is closed"))
}

impl Connection for MySqlSession {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let rows = self
            .runtime
            .block_on(sqlx::raw_sql(sql).fetch_all(&mut *conn))?;
        Ok(rows.iter().map(convert_row).collect())
    }

    fn exec(&mut self, sql: &str) -> Result<u64> {
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let result = self.runtime.block_on(sqlx::raw_sql(sql).execute(&mut *conn))?;
        Ok(result.rows_affected())
    }

    fn ping(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        self.runtime.block_on(conn.ping())?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            self.runtime.block_on(conn.close())?;
        }
        Ok(())
    }
}

fn convert_row(row: &MySqlRow) -> Row {
    Row::new(
        row.columns()
            .iter()
            .map(|column| {
                let value = decode(row, column.ordinal());
                (column.name().to_string(), value)
            })
            .collect(),
    )
}

/// Decodes any column as text. Raw SQL runs over the text protocol, so
/// every non-binary value decodes as a string; binary values are converted
/// lossily.
fn decode(row: &MySqlRow, index: usize) -> Option<String> {
    match row.try_get_unchecked::<Option<String>, _>(index) {
        Ok(value) => value,
        Err(_) => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    }
}
