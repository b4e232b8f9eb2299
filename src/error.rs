use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum SqlMapError {
    #[error("No connection attached; cannot begin a unit of work")]
    NullConnection,

    #[error("Connection is closed; cannot begin a unit of work")]
    ConnectionClosed,

    #[error("A cursor is already open; call end() before starting another unit of work")]
    CursorAlreadyOpen,

    #[error("Consistency error: {0}")]
    ConsistencyError(String),

    #[error(transparent)]
    RenderError(#[from] minijinja::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

/// Coarse classification of a [`SqlMapError`].
///
/// Driver errors keep their concrete variant so callers can inspect them, but they all
/// classify as [`ErrorKind::Execution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NullConnection,
    ConnectionClosed,
    CursorAlreadyOpen,
    Consistency,
    Render,
    Execution,
    Config,
}

impl SqlMapError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SqlMapError::NullConnection => ErrorKind::NullConnection,
            SqlMapError::ConnectionClosed => ErrorKind::ConnectionClosed,
            SqlMapError::CursorAlreadyOpen => ErrorKind::CursorAlreadyOpen,
            SqlMapError::ConsistencyError(_) => ErrorKind::Consistency,
            SqlMapError::RenderError(_) => ErrorKind::Render,
            #[cfg(feature = "postgres")]
            SqlMapError::PostgresError(_) => ErrorKind::Execution,
            #[cfg(feature = "sqlite")]
            SqlMapError::SqliteError(_) => ErrorKind::Execution,
            SqlMapError::ConnectionError(_)
            | SqlMapError::ParameterError(_)
            | SqlMapError::ExecutionError(_) => ErrorKind::Execution,
            SqlMapError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// True when the database rejected the statement or its parameters.
    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        self.kind() == ErrorKind::Execution
    }
}
