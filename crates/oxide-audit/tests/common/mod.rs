#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use oxide_audit::connection::{Connection, Connector, Row};
use oxide_audit::error::{AuditError, Result};
use oxide_audit::onlineddl::OnlineDdlBackend;
use oxide_mysql::ast::{AlterTableStatement, CreateTableStatement};
use oxide_mysql::{Parser, Statement};

pub fn create(sql: &str) -> Arc<CreateTableStatement> {
    match Parser::new(sql).parse_statement() {
        Ok(Statement::CreateTable(create)) => create,
        other => panic!("Expected CREATE TABLE for: {sql}\nGot: {other:?}"),
    }
}

pub fn alter(sql: &str) -> Arc<AlterTableStatement> {
    match Parser::new(sql).parse_statement() {
        Ok(Statement::AlterTable(alter)) => alter,
        other => panic!("Expected ALTER TABLE for: {sql}\nGot: {other:?}"),
    }
}

pub fn statement(sql: &str) -> Statement {
    Parser::new(sql)
        .parse_statement()
        .unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e:?}"))
}

pub fn column_names(table: &CreateTableStatement) -> Vec<&str> {
    table.columns.iter().map(|c| c.name.as_str()).collect()
}

// ==================== Scripted server ====================

#[derive(Default)]
struct ScriptState {
    answers: Vec<(String, Vec<Row>)>,
    executed: Vec<String>,
    connects: usize,
    closes: usize,
    fail_connect: bool,
}

/// Canned answers for a fake server, shared with the connections it opens.
///
/// A statement is answered by the most recently added pattern it contains;
/// unmatched queries return no rows.
#[derive(Clone, Default)]
pub struct Script(Rc<RefCell<ScriptState>>);

impl Script {
    /// A server with `lower_case_table_names` set to `lower_case`.
    pub fn server(lower_case: &str) -> Self {
        let script = Self::default();
        script.answer(
            "SHOW GLOBAL VARIABLES LIKE 'lower_case_table_names'",
            vec![Row::from_pairs([
                ("Variable_name", "lower_case_table_names"),
                ("Value", lower_case),
            ])],
        );
        script
    }

    pub fn answer(&self, pattern: &str, rows: Vec<Row>) -> &Self {
        self.0
            .borrow_mut()
            .answers
            .push((pattern.to_string(), rows));
        self
    }

    pub fn schemas(&self, names: &[&str]) -> &Self {
        let rows = names
            .iter()
            .map(|name| Row::from_pairs([("Database", *name)]))
            .collect();
        self.answer("SHOW DATABASES", rows)
    }

    pub fn tables(&self, schema: &str, names: &[&str]) -> &Self {
        let column = format!("Tables_in_{schema}");
        let rows = names
            .iter()
            .map(|name| Row::from_pairs([(column.as_str(), *name), ("Table_type", "BASE TABLE")]))
            .collect();
        self.answer(&format!("SHOW FULL TABLES FROM `{schema}`"), rows)
    }

    pub fn create_table(&self, schema: &str, table: &str, ddl: &str) -> &Self {
        self.answer(
            &format!("SHOW CREATE TABLE `{schema}`.`{table}`"),
            vec![Row::from_pairs([("Table", table), ("Create Table", ddl)])],
        )
    }

    pub fn table_size(&self, schema: &str, table: &str, megabytes: f64) -> &Self {
        self.answer(
            &format!("TABLE_SCHEMA = '{schema}' AND TABLE_NAME = '{table}'"),
            vec![Row::from_pairs([("size", megabytes.to_string())])],
        )
    }

    pub fn fail_connect(&self) -> &Self {
        self.0.borrow_mut().fail_connect = true;
        self
    }

    pub fn connector(&self) -> Box<dyn Connector> {
        Box::new(ScriptedConnector(self.clone()))
    }

    /// Every statement sent, queries and executions alike.
    pub fn executed(&self) -> Vec<String> {
        self.0.borrow().executed.clone()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.0
            .borrow()
            .executed
            .iter()
            .filter(|sql| sql.contains(pattern))
            .count()
    }

    pub fn connects(&self) -> usize {
        self.0.borrow().connects
    }

    pub fn closes(&self) -> usize {
        self.0.borrow().closes
    }
}

pub struct ScriptedConnector(Script);

impl Connector for ScriptedConnector {
    fn connect(&self, _schema: Option<&str>) -> Result<Box<dyn Connection>> {
        let mut state = self.0 .0.borrow_mut();
        if state.fail_connect {
            return Err(AuditError::Connection(String::from("connection refused")));
        }
        state.connects += 1;
        Ok(Box::new(ScriptedConnection {
            script: self.0.clone(),
            closed: false,
        }))
    }
}

pub struct ScriptedConnection {
    script: Script,
    closed: bool,
}

impl ScriptedConnection {
    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(AuditError::Connection(String::from("connection is closed")));
        }
        Ok(())
    }
}

impl Connection for ScriptedConnection {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.check_open()?;
        let mut state = self.script.0.borrow_mut();
        state.executed.push(sql.to_string());
        Ok(state
            .answers
            .iter()
            .rev()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn exec(&mut self, sql: &str) -> Result<u64> {
        self.check_open()?;
        self.script.0.borrow_mut().executed.push(sql.to_string());
        Ok(1)
    }

    fn ping(&mut self) -> Result<()> {
        self.check_open()
    }

    fn close(&mut self) -> Result<()> {
        self.check_open()?;
        self.closed = true;
        self.script.0.borrow_mut().closes += 1;
        Ok(())
    }
}

// ==================== Online schema change ====================

/// Records online schema change runs as `(schema, sql, dry_run)`.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    runs: Rc<RefCell<Vec<(String, String, bool)>>>,
    fail_dry_run: bool,
    fail_run: bool,
}

impl RecordingBackend {
    pub fn failing_dry_run() -> Self {
        Self {
            fail_dry_run: true,
            ..Self::default()
        }
    }

    pub fn failing_run() -> Self {
        Self {
            fail_run: true,
            ..Self::default()
        }
    }

    pub fn runs(&self) -> Vec<(String, String, bool)> {
        self.runs.borrow().clone()
    }
}

impl OnlineDdlBackend for RecordingBackend {
    fn run(&mut self, schema: &str, sql: &str, dry_run: bool) -> Result<()> {
        self.runs
            .borrow_mut()
            .push((schema.to_string(), sql.to_string(), dry_run));
        if (dry_run && self.fail_dry_run) || (!dry_run && self.fail_run) {
            return Err(AuditError::OnlineDdl(String::from("exit status 1")));
        }
        Ok(())
    }
}
