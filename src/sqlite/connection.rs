use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::connection::{Connection, Cursor};
use crate::error::SqlMapError;
use crate::results::Execution;
use crate::translation::{PlaceholderStyle, bind_named_placeholders};
use crate::types::{IsolationLevel, SqlParams};

use super::params::Params;
use super::query::run_statement;

pub(crate) struct SqliteState {
    conn: Option<rusqlite::Connection>,
    isolation: IsolationLevel,
    in_transaction: bool,
}

/// Connection state shared between a connection and the cursors it hands out.
pub(crate) type SharedSqliteConnection = Arc<Mutex<SqliteState>>;

fn lock(shared: &SharedSqliteConnection) -> MutexGuard<'_, SqliteState> {
    match shared.lock() {
        Ok(guard) => guard,
        // Clear the poison and continue with the recovered data
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn begin_statement(level: IsolationLevel) -> &'static str {
    match level {
        // take the write lock up front so concurrent writers cannot interleave
        IsolationLevel::Serializable => "BEGIN IMMEDIATE",
        _ => "BEGIN DEFERRED",
    }
}

/// Blocking `SQLite` connection with DB-API style implicit transactions.
pub struct SqliteConnection {
    shared: SharedSqliteConnection,
}

impl SqliteConnection {
    /// Wrap an already opened rusqlite connection.
    #[must_use]
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SqliteState {
                conn: Some(conn),
                isolation: IsolationLevel::default(),
                in_transaction: false,
            })),
        }
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns `SqlMapError::SqliteError` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqlMapError> {
        Ok(Self::from_rusqlite(rusqlite::Connection::open_in_memory()?))
    }

    /// Run a batch of statements outside any cursor (schema setup, fixtures).
    ///
    /// # Errors
    /// Returns `SqlMapError::ConnectionClosed` or the driver's error.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlMapError> {
        let state = lock(&self.shared);
        let conn = state.conn.as_ref().ok_or(SqlMapError::ConnectionClosed)?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// True while an implicitly opened transaction has not been committed or rolled back.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        lock(&self.shared).in_transaction
    }

    /// Close the underlying database handle. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns `SqlMapError::SqliteError` if `SQLite` refuses to close; the handle stays open.
    pub fn close(&mut self) -> Result<(), SqlMapError> {
        let mut state = lock(&self.shared);
        if let Some(conn) = state.conn.take()
            && let Err((conn, err)) = conn.close()
        {
            state.conn = Some(conn);
            return Err(SqlMapError::SqliteError(err));
        }
        state.in_transaction = false;
        Ok(())
    }

    fn finish(&mut self, statement: &str) -> Result<(), SqlMapError> {
        let mut state = lock(&self.shared);
        let state = &mut *state;
        let conn = state.conn.as_ref().ok_or(SqlMapError::ConnectionClosed)?;
        if !state.in_transaction {
            return Ok(());
        }
        let result = if conn.is_autocommit() {
            Ok(())
        } else {
            conn.execute_batch(statement)
        };
        state.in_transaction = !conn.is_autocommit();
        result.map_err(SqlMapError::SqliteError)
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("SqliteConnection")
            .field("closed", &state.conn.is_none())
            .field("isolation", &state.isolation)
            .field("in_transaction", &state.in_transaction)
            .finish()
    }
}

impl Connection for SqliteConnection {
    type Cursor = SqliteCursor;

    fn is_closed(&self) -> bool {
        lock(&self.shared).conn.is_none()
    }

    fn cursor(&mut self) -> Result<SqliteCursor, SqlMapError> {
        if self.is_closed() {
            return Err(SqlMapError::ConnectionClosed);
        }
        Ok(SqliteCursor {
            shared: Arc::clone(&self.shared),
            last_query: None,
            closed: false,
        })
    }

    fn commit(&mut self) -> Result<(), SqlMapError> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), SqlMapError> {
        self.finish("ROLLBACK")
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), SqlMapError> {
        let mut state = lock(&self.shared);
        let conn = state.conn.as_ref().ok_or(SqlMapError::ConnectionClosed)?;
        conn.pragma_update(
            None,
            "read_uncommitted",
            matches!(level, IsolationLevel::ReadUncommitted),
        )?;
        state.isolation = level;
        Ok(())
    }

    fn isolation_level(&self) -> IsolationLevel {
        lock(&self.shared).isolation
    }
}

/// Cursor over a [`SqliteConnection`].
pub struct SqliteCursor {
    shared: SharedSqliteConnection,
    last_query: Option<String>,
    closed: bool,
}

impl fmt::Debug for SqliteCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCursor")
            .field("last_query", &self.last_query)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Cursor for SqliteCursor {
    fn execute(&mut self, sql: &str, params: &SqlParams) -> Result<Execution, SqlMapError> {
        if self.closed {
            return Err(SqlMapError::ConsistencyError(
                "cursor already closed".into(),
            ));
        }
        let bound = bind_named_placeholders(sql, PlaceholderStyle::Sqlite);
        let converted = Params::convert(&params.resolve(&bound.names)?);
        self.last_query = Some(bound.sql.to_string());

        let mut state = lock(&self.shared);
        let state = &mut *state;
        let conn = state.conn.as_ref().ok_or(SqlMapError::ConnectionClosed)?;
        if !state.in_transaction && !state.isolation.is_autocommit() {
            if conn.is_autocommit() {
                conn.execute_batch(begin_statement(state.isolation))?;
            }
            state.in_transaction = true;
        }
        run_statement(conn, &bound.sql, converted.as_values())
    }

    fn query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    fn close(&mut self) -> Result<(), SqlMapError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
