//! Online schema change tools.
//!
//! Large ALTER TABLE statements are not executed directly. gh-ost runs them
//! through an [`OnlineDdlBackend`]; for pt-online-schema-change only the
//! command line is rendered, as a notice for the operator.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use oxide_mysql::ast::AlterTableStatement;
use oxide_mysql::{Parser, Statement};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{Dsn, GhostConfig};
use crate::error::{AuditError, Result};

/// Runs ALTER TABLE statements with an online schema change tool.
pub trait OnlineDdlBackend {
    /// Runs `sql` (one ALTER TABLE) against `schema`. A dry run validates
    /// without changing anything.
    fn run(&mut self, schema: &str, sql: &str, dry_run: bool) -> Result<()>;
}

/// Returns the clause list of an ALTER TABLE, without the table name.
#[must_use]
pub fn alter_clauses(alter: &AlterTableStatement) -> String {
    alter
        .specs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_alter(sql: &str) -> Result<std::sync::Arc<AlterTableStatement>> {
    match Parser::new(sql).parse_statement()? {
        Statement::AlterTable(alter) => Ok(alter),
        other => Err(AuditError::OnlineDdl(format!(
            "expected ALTER TABLE, got a {} statement",
            other.category().as_str()
        ))),
    }
}

/// Runs the gh-ost binary.
#[derive(Debug, Clone)]
pub struct GhostBackend {
    binary: PathBuf,
    extra_args: Vec<String>,
    dsn: Dsn,
}

impl GhostBackend {
    /// Creates a backend connecting with `dsn`.
    #[must_use]
    pub fn new(config: &GhostConfig, dsn: Dsn) -> Self {
        Self {
            binary: config.binary.clone(),
            extra_args: config.extra_args.clone(),
            dsn,
        }
    }

    /// Writes the user and password as a gh-ost `--conf` file. The password
    /// is never passed on the command line.
    fn write_credentials(&self) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            "[client]\nuser={}\npassword={}\n",
            self.dsn.user, self.dsn.password
        )?;
        file.flush()?;
        Ok(file)
    }

    /// Builds the command for one run, reading credentials from `conf`.
    ///
    /// # Errors
    ///
    /// Returns an error if `sql` is not an ALTER TABLE statement.
    pub fn command(&self, schema: &str, sql: &str, dry_run: bool, conf: &Path) -> Result<Command> {
        let alter = parse_alter(sql)?;
        let schema = alter.table.schema_or(schema).to_string();

        let mut command = Command::new(&self.binary);
        command
            .arg(format!("--host={}", self.dsn.host))
            .arg(format!("--port={}", self.dsn.port))
            .arg(format!("--conf={}", conf.display()))
            .arg(format!("--database={schema}"))
            .arg(format!("--table={}", alter.table.name))
            .arg(format!("--alter={}", alter_clauses(&alter)))
            .args(&self.extra_args);
        if !dry_run {
            command.arg("--execute");
        }
        Ok(command)
    }
}

impl OnlineDdlBackend for GhostBackend {
    fn run(&mut self, schema: &str, sql: &str, dry_run: bool) -> Result<()> {
        let credentials = self.write_credentials()?;
        let mut command = self.command(schema, sql, dry_run, credentials.path())?;
        debug!(binary = %self.binary.display(), dry_run, "Spawning gh-ost");
        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuditError::OnlineDdl(format!(
                "gh-ost exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        info!(schema, dry_run, "gh-ost finished");
        Ok(())
    }
}

/// Renders a pt-online-schema-change command line.
///
/// Double quotes in the clause list are escaped for the shell.
#[must_use]
pub fn render_pt_osc(template: &str, schema: &str, alter: &AlterTableStatement) -> String {
    let clauses = alter_clauses(alter).replace('"', "\\\"");
    template
        .replace("{schema}", schema)
        .replace("{table}", &alter.table.name)
        .replace("{alter}", &clauses)
}
