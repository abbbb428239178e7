//! MySQL statement auditing with simulated schema evolution.
//!
//! `oxide-audit` checks SQL scripts statement by statement before they reach
//! a production server:
//! - Each statement is validated against the schema as it will be after the
//!   earlier statements of the script ran
//! - Configurable rules report findings at `notice`, `warn` or `error` level
//! - Rollback statements are synthesized from the tracked definitions and,
//!   for DML, from the rows about to change
//! - Large ALTER TABLE statements are routed to gh-ost, or annotated with the
//!   equivalent pt-online-schema-change command
//!
//! # Architecture
//!
//! - **Catalog** - Lazily loaded schemas and tables, definitions folded with
//!   every audited ALTER TABLE, metadata caches
//! - **Merge** - Applies an ALTER TABLE to a CREATE TABLE without mutating it
//! - **Auditor** - The session: validation, rules, rollback, execution
//! - **Advisor** - Column usage extraction, selectivity and index advice
//! - **Connection** - Blocking connection contract and its MySQL implementation
//!
//! # Example
//!
//! ```rust
//! use oxide_audit::prelude::*;
//!
//! let rules = vec![Rule::new(DDL_CHECK_PK_NOT_EXIST, RuleLevel::Error)];
//! let mut auditor = Auditor::offline(rules);
//!
//! let result = auditor.audit("CREATE TABLE shop.t (id INT)").unwrap();
//! assert_eq!(result.level(), RuleLevel::Error);
//!
//! auditor.audit("ALTER TABLE shop.t ADD PRIMARY KEY (id)").unwrap();
//! let table = auditor.catalog().table("shop", "t").unwrap();
//! assert!(table.definition().unwrap().has_primary_key());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Audit a script offline
//! oxide-audit audit schema.sql
//!
//! # Audit against a server and print rollback statements
//! oxide-audit --config audit.json audit --rollback changes.sql
//!
//! # Print statement fingerprints
//! oxide-audit fingerprint queries.sql
//! ```

pub mod advisor;
pub mod auditor;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod merge;
pub mod onlineddl;
pub mod result;
pub mod rollback;
pub mod rules;
pub mod validate;

pub use auditor::{Auditor, ExecResult, Node, SessionLimits};
pub use catalog::{Catalog, SchemaInfo, TableInfo};
pub use config::{AdvisorConfig, AuditConfig, Dsn, GhostConfig};
pub use error::{AuditError, Result};
pub use result::{AuditResult, Finding};
pub use rollback::RollbackSql;
pub use rules::{Rule, RuleHandler, RuleLevel, RuleRegistry};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::advisor::{Advice, ColumnRole, ColumnUsage};
    pub use crate::auditor::{Auditor, ExecResult, Node, SessionLimits};
    pub use crate::catalog::{Catalog, TableInfo};
    pub use crate::config::{AuditConfig, Dsn};
    pub use crate::connection::{Connection, Connector, Row};
    pub use crate::error::{AuditError, Result};
    pub use crate::merge::merge_alter_table;
    pub use crate::onlineddl::OnlineDdlBackend;
    pub use crate::result::{AuditResult, Finding};
    pub use crate::rollback::RollbackSql;
    pub use crate::rules::*;
}
