//! Error types for the audit engine.

use oxide_mysql::ParseError;

/// Errors that can occur while auditing or executing statements.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The statement could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Database error reported by the driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The connection is unavailable.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The operation needs a live connection but the session is offline.
    #[error("Operation requires a database connection")]
    Offline,

    /// A metadata query returned something other than what was expected.
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    /// The online schema change tool failed.
    #[error("Online schema change failed: {0}")]
    OnlineDdl(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error (reading configuration or SQL files, spawning tools).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error with the step that produced it.
    #[error("{context}: {source}")]
    Context {
        /// What was being done.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<AuditError>,
    },
}

impl AuditError {
    /// Wraps the error with a description of the failed step.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context layers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_message() {
        let err = AuditError::OnlineDdl(String::from("exit status 1")).context("dry-run gh-ost");
        assert_eq!(
            err.to_string(),
            "dry-run gh-ost: Online schema change failed: exit status 1"
        );
        assert!(matches!(err.root(), AuditError::OnlineDdl(_)));
    }
}
