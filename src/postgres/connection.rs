use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Runtime;
use tokio_postgres::Client;

use crate::connection::{Connection, Cursor};
use crate::error::SqlMapError;
use crate::results::Execution;
use crate::translation::{PlaceholderStyle, bind_named_placeholders};
use crate::types::{IsolationLevel, SqlParams};

use super::params::Params;
use super::query::run_statement;

struct PostgresState {
    client: Option<Client>,
    isolation: IsolationLevel,
    in_transaction: bool,
}

/// Runtime plus client state, shared by a connection and its cursors.
struct PostgresShared {
    runtime: Runtime,
    state: Mutex<PostgresState>,
}

impl PostgresShared {
    fn lock(&self) -> MutexGuard<'_, PostgresState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Blocking Postgres connection with DB-API style implicit transactions.
///
/// Drives `tokio-postgres` on a private current-thread runtime, so it must not be used from
/// inside another Tokio runtime.
pub struct PostgresConnection {
    shared: Arc<PostgresShared>,
}

impl PostgresConnection {
    /// Connect with an already built `tokio_postgres::Config`.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConnectionError` if the runtime cannot be built, or
    /// `SqlMapError::PostgresError` if connecting fails.
    pub fn connect_with(config: &tokio_postgres::Config) -> Result<Self, SqlMapError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                SqlMapError::ConnectionError(format!("Failed to build postgres runtime: {e}"))
            })?;
        let (client, connection) = runtime.block_on(config.connect(tokio_postgres::NoTls))?;
        runtime.spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgres connection terminated");
            }
        });
        Ok(Self {
            shared: Arc::new(PostgresShared {
                runtime,
                state: Mutex::new(PostgresState {
                    client: Some(client),
                    isolation: IsolationLevel::default(),
                    in_transaction: false,
                }),
            }),
        })
    }

    /// Connect from a libpq-style connection string or URL.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConfigError` if the string does not parse, otherwise as
    /// [`PostgresConnection::connect_with`].
    pub fn connect_url(url: &str) -> Result<Self, SqlMapError> {
        let config: tokio_postgres::Config = url
            .parse()
            .map_err(|e| SqlMapError::ConfigError(format!("invalid postgres url: {e}")))?;
        Self::connect_with(&config)
    }

    /// Run a batch of statements outside any cursor (schema setup, fixtures).
    ///
    /// # Errors
    /// Returns `SqlMapError::ConnectionClosed` or the driver's error.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlMapError> {
        let state = self.shared.lock();
        let client = state.client.as_ref().ok_or(SqlMapError::ConnectionClosed)?;
        self.shared.runtime.block_on(client.batch_execute(sql))?;
        Ok(())
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.shared.lock().in_transaction
    }

    /// Drop the client, closing the session. Closing twice is a no-op.
    pub fn close(&mut self) {
        let mut state = self.shared.lock();
        state.client = None;
        state.in_transaction = false;
    }

    fn finish(&mut self, statement: &str) -> Result<(), SqlMapError> {
        let mut state = self.shared.lock();
        let state = &mut *state;
        let client = state.client.as_ref().ok_or(SqlMapError::ConnectionClosed)?;
        if !state.in_transaction {
            return Ok(());
        }
        let result = self.shared.runtime.block_on(client.batch_execute(statement));
        // the server ends the transaction even when COMMIT reports an error
        state.in_transaction = false;
        result.map_err(SqlMapError::PostgresError)
    }
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("PostgresConnection")
            .field("closed", &state.client.as_ref().is_none_or(Client::is_closed))
            .field("isolation", &state.isolation)
            .field("in_transaction", &state.in_transaction)
            .finish()
    }
}

impl Connection for PostgresConnection {
    type Cursor = PostgresCursor;

    fn is_closed(&self) -> bool {
        self.shared
            .lock()
            .client
            .as_ref()
            .is_none_or(Client::is_closed)
    }

    fn cursor(&mut self) -> Result<PostgresCursor, SqlMapError> {
        if self.is_closed() {
            return Err(SqlMapError::ConnectionClosed);
        }
        Ok(PostgresCursor {
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
        let mut state = self.shared.lock();
        if state.client.is_none() {
            return Err(SqlMapError::ConnectionClosed);
        }
        state.isolation = level;
        Ok(())
    }

    fn isolation_level(&self) -> IsolationLevel {
        self.shared.lock().isolation
    }
}

/// Cursor over a [`PostgresConnection`].
pub struct PostgresCursor {
    shared: Arc<PostgresShared>,
    last_query: Option<String>,
    closed: bool,
}

impl fmt::Debug for PostgresCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresCursor")
            .field("last_query", &self.last_query)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Cursor for PostgresCursor {
    fn execute(&mut self, sql: &str, params: &SqlParams) -> Result<Execution, SqlMapError> {
        if self.closed {
            return Err(SqlMapError::ConsistencyError(
                "cursor already closed".into(),
            ));
        }
        let bound = bind_named_placeholders(sql, PlaceholderStyle::Postgres);
        let values = params.resolve(&bound.names)?;
        let converted = Params::convert(&values);
        self.last_query = Some(bound.sql.to_string());

        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        let state = &mut *state;
        let client = state.client.as_ref().ok_or(SqlMapError::ConnectionClosed)?;
        let begin = match state.isolation.as_sql() {
            Some(level) if !state.in_transaction => Some(format!("BEGIN ISOLATION LEVEL {level}")),
            _ => None,
        };

        if let Some(begin) = begin {
            shared.runtime.block_on(client.batch_execute(&begin))?;
            state.in_transaction = true;
        }
        shared
            .runtime
            .block_on(run_statement(client, &bound.sql, &converted))
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
