//! Session configuration loaded from JSON.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::Rule;

/// Default rendering of the pt-online-schema-change command line.
pub const DEFAULT_PT_OSC_TEMPLATE: &str =
    "pt-online-schema-change D={schema},t={table} --alter=\"{alter}\" --execute";

/// Connection parameters for a MySQL server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dsn {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// User name.
    pub user: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Schema selected on connect; also the session's initial current schema.
    #[serde(default)]
    pub database: String,
}

const fn default_port() -> u16 {
    3306
}

impl Dsn {
    /// Creates a DSN without password or schema.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: String::new(),
            database: String::new(),
        }
    }

    /// Sets the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets the schema.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

impl fmt::Debug for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dsn")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Index advisor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Tables with more rows than this are never scanned for distinct counts.
    pub calc_selectivity_max_rows: u64,
    /// Minimum selectivity for a column to be worth indexing.
    pub min_selectivity: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            calc_selectivity_max_rows: 100_000,
            min_selectivity: 0.1,
        }
    }
}

/// gh-ost invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    /// Path to the gh-ost binary.
    pub binary: PathBuf,
    /// Extra arguments passed to every run.
    pub extra_args: Vec<String>,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("gh-ost"),
            extra_args: Vec::new(),
        }
    }
}

/// Complete audit session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Database to connect to. Sessions without one run offline.
    pub dsn: Option<Dsn>,
    /// Enabled rules, in evaluation order.
    pub rules: Vec<Rule>,
    /// Index advisor settings.
    pub advisor: AdvisorConfig,
    /// gh-ost settings. Large ALTER TABLE statements are only executed
    /// through gh-ost when present.
    pub gh_ost: Option<GhostConfig>,
    /// pt-online-schema-change command template with `{schema}`, `{table}`
    /// and `{alter}` placeholders.
    pub pt_osc_template: Option<String>,
}

impl AuditConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serializes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the pt-online-schema-change template in effect.
    #[must_use]
    pub fn pt_osc_template(&self) -> &str {
        self.pt_osc_template
            .as_deref()
            .unwrap_or(DEFAULT_PT_OSC_TEMPLATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let dsn = Dsn::new("db.local", 3306, "audit").password("hunter2");
        let rendered = format!("{dsn:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("db.local"));
    }

    #[test]
    fn test_defaults() {
        let config = AuditConfig::from_json("{}").unwrap();
        assert!(config.dsn.is_none());
        assert!(config.rules.is_empty());
        assert_eq!(config.advisor, AdvisorConfig::default());
        assert_eq!(config.pt_osc_template(), DEFAULT_PT_OSC_TEMPLATE);
    }
}
