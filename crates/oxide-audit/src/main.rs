//! oxide-audit CLI
//!
//! Command-line tool for auditing MySQL scripts.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_audit::prelude::*;

/// MySQL statement auditing with simulated schema evolution.
#[derive(Parser)]
#[command(name = "oxide-audit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (JSON). Without a DSN the audit runs offline.
    #[arg(short, long, env = "OXIDE_AUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Password for the configured DSN.
    #[arg(long, env = "MYSQL_PWD", hide_env_values = true)]
    password: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit every statement of a script, in order.
    Audit {
        /// SQL script.
        file: PathBuf,

        /// Also print the statements undoing each statement.
        #[arg(short, long)]
        rollback: bool,

        /// Print one JSON object per statement.
        #[arg(long)]
        json: bool,
    },

    /// Print the fingerprint of every statement.
    Fingerprint {
        /// SQL script.
        file: PathBuf,
    },

    /// Suggest indexes for the statements of a script.
    Advise {
        /// SQL script.
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct StatementReport<'a> {
    sql: &'a str,
    level: RuleLevel,
    findings: &'a [Finding],
    #[serde(skip_serializing_if = "Option::is_none")]
    rollback: Option<RollbackSql>,
}

fn load_config(cli: &Cli) -> anyhow::Result<AuditConfig> {
    let mut config = match &cli.config {
        Some(path) => AuditConfig::from_file(path)?,
        None => AuditConfig::default(),
    };
    if let (Some(dsn), Some(password)) = (config.dsn.as_mut(), &cli.password) {
        dsn.password.clone_from(password);
    }
    Ok(config)
}

fn read_script(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(oxide_mysql::parse(&text)?
        .into_iter()
        .map(|node| node.text)
        .collect())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Audit {
            file,
            rollback,
            json,
        } => {
            let statements = read_script(file)?;
            let mut auditor = Auditor::from_config(&config);
            if auditor.is_offline() {
                info!("No DSN configured, auditing offline.");
            }

            let mut results = Vec::with_capacity(statements.len());
            for sql in &statements {
                results.push(auditor.audit(sql)?);
            }

            // Rollback needs the schema as it was before each statement, so
            // it replays the script in a fresh session.
            let mut rollbacks = Vec::new();
            if *rollback {
                if auditor.has_invalid_sql() {
                    warn!("Invalid SQL found, rollback statements not generated.");
                } else {
                    let mut session = Auditor::from_config(&config);
                    for sql in &statements {
                        rollbacks.push(session.gen_rollback_sql(sql)?);
                    }
                    session.close()?;
                }
            }
            auditor.close()?;

            let mut rollbacks = rollbacks.into_iter();
            for (sql, result) in statements.iter().zip(&results) {
                let rollback = rollbacks.next();
                if *json {
                    let report = StatementReport {
                        sql,
                        level: result.level(),
                        findings: result.findings(),
                        rollback,
                    };
                    println!("{}", serde_json::to_string(&report)?);
                    continue;
                }
                println!("{sql};");
                println!("  level: {}", result.level());
                for finding in result.findings() {
                    println!("  {finding}");
                }
                if let Some(rollback) = rollback {
                    if !rollback.is_empty() {
                        println!("  rollback:");
                        for line in rollback.sql.lines() {
                            println!("    {line}");
                        }
                    }
                    if !rollback.reason.is_empty() {
                        println!("  rollback note: {}", rollback.reason);
                    }
                }
            }
        }

        Commands::Fingerprint { file } => {
            let text = std::fs::read_to_string(file)?;
            let mut auditor = Auditor::from_config(&config);
            for node in auditor.parse(&text)? {
                println!("{}\t{}", node.category.as_str(), node.fingerprint);
            }
            auditor.close()?;
        }

        Commands::Advise { file } => {
            let statements = read_script(file)?;
            let mut auditor = Auditor::from_config(&config);
            if auditor.is_offline() {
                info!("No DSN configured, selectivity is unknown and no advice is given.");
            }
            for sql in &statements {
                for advice in auditor.advise(sql)? {
                    println!("{};", advice.sql);
                    println!("  -- {}", advice.reason);
                }
                auditor.audit(sql)?;
            }
            auditor.close()?;
        }
    }

    Ok(())
}
