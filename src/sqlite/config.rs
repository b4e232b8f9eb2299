use serde::Deserialize;

use crate::error::SqlMapError;

use super::connection::SqliteConnection;

/// Options for opening a `SQLite` connection.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    /// Switch file-backed databases to WAL journaling on open.
    #[serde(default)]
    pub wal: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            wal: false,
        }
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open the connection described by this builder.
    ///
    /// # Errors
    /// Returns `SqlMapError` if the database cannot be opened.
    pub fn open(self) -> Result<SqliteConnection, SqlMapError> {
        SqliteConnection::open(&self.finish())
    }
}

impl SqliteConnection {
    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Open a `SQLite` database from options.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConfigError` for an empty path, `SqlMapError::SqliteError` if opening
    /// or the journal-mode pragma fails.
    pub fn open(opts: &SqliteOptions) -> Result<Self, SqlMapError> {
        if opts.db_path.trim().is_empty() {
            return Err(SqlMapError::ConfigError("db_path is required".to_string()));
        }
        let conn = rusqlite::Connection::open(&opts.db_path)?;
        if opts.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        tracing::debug!(db_path = %opts.db_path, wal = opts.wal, "opened sqlite connection");
        Ok(Self::from_rusqlite(conn))
    }
}
