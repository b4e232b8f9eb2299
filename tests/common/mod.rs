#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sql_map::prelude::*;

pub fn template_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("templates")
}

#[cfg(feature = "sqlite")]
pub fn users_db() -> Result<SqliteConnection, SqlMapError> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
         INSERT INTO users (id, name) VALUES (7, 'Ada');
         INSERT INTO users (id, name) VALUES (8, 'Grace');",
    )?;
    Ok(conn)
}

#[cfg(feature = "sqlite")]
pub fn users_map() -> Result<SqlMap<SqliteConnection>, SqlMapError> {
    Ok(SqlMap::new(users_db()?, template_root(), IsolationLevel::ReadCommitted))
}

/// Calls seen by a [`ScriptedConnection`], in order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// In-memory connection that records calls and fails on request.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    pub log: CallLog,
    pub closed: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    pub fail_isolation: bool,
    pub fail_close: bool,
    /// Statements containing this text fail with an execution error.
    pub fail_on: Option<String>,
    pub isolation: IsolationLevel,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.log.lock().unwrap().push(call.into());
    }
}

impl Connection for ScriptedConnection {
    type Cursor = ScriptedCursor;

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn cursor(&mut self) -> Result<ScriptedCursor, SqlMapError> {
        self.record("cursor");
        Ok(ScriptedCursor {
            log: Arc::clone(&self.log),
            fail_on: self.fail_on.clone(),
            fail_close: self.fail_close,
            last_query: None,
            closed: false,
        })
    }

    fn commit(&mut self) -> Result<(), SqlMapError> {
        self.record("commit");
        if self.fail_commit {
            return Err(SqlMapError::ExecutionError("commit rejected".into()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlMapError> {
        self.record("rollback");
        if self.fail_rollback {
            return Err(SqlMapError::ExecutionError("rollback failed".into()));
        }
        Ok(())
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), SqlMapError> {
        self.record(format!("isolation {level}"));
        if self.fail_isolation {
            return Err(SqlMapError::ExecutionError("isolation refused".into()));
        }
        self.isolation = level;
        Ok(())
    }

    fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }
}

#[derive(Debug)]
pub struct ScriptedCursor {
    log: CallLog,
    fail_on: Option<String>,
    fail_close: bool,
    last_query: Option<String>,
    closed: bool,
}

impl Cursor for ScriptedCursor {
    fn execute(&mut self, sql: &str, _params: &SqlParams) -> Result<Execution, SqlMapError> {
        self.log.lock().unwrap().push(format!("execute {sql}"));
        self.last_query = Some(sql.to_owned());
        if let Some(needle) = &self.fail_on
            && sql.contains(needle.as_str())
        {
            return Err(SqlMapError::ExecutionError(format!("scripted failure: {sql}")));
        }
        let mut execution = Execution::with_capacity(1);
        execution.set_column_names(vec!["n".to_owned()]);
        execution.add_row_values(vec![RowValues::Int(1)]);
        execution.set_rowcount(1);
        execution.set_status_message(command_tag(sql, 1));
        Ok(execution)
    }

    fn query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    fn close(&mut self) -> Result<(), SqlMapError> {
        self.log.lock().unwrap().push("close".into());
        self.closed = true;
        if self.fail_close {
            return Err(SqlMapError::ExecutionError("close failed".into()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Observer that keeps what it was told.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub seen: Mutex<Vec<(String, bool)>>,
}

impl StatementObserver for RecordingObserver {
    fn on_execute(
        &self,
        sql: &str,
        _params: &SqlParams,
        outcome: Result<&Execution, &SqlMapError>,
    ) {
        self.seen.lock().unwrap().push((sql.to_owned(), outcome.is_ok()));
    }
}
