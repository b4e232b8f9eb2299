use std::fmt;

use crate::connection::{Connection, Cursor};
use crate::error::SqlMapError;
use crate::types::IsolationLevel;

/// Owns the cursor of one unit of work at a time.
///
/// The manager is either idle (no cursor) or active (one open cursor). `begin` moves it to
/// active, `end` back to idle; `commit` and `rollback` only touch the connection's transaction
/// and leave the cursor open until `end`.
///
/// Calling `commit`/`rollback` outside a unit of work is the caller's responsibility: it is
/// passed straight to the connection, which treats it as a no-op when no transaction is open.
///
/// Every operation takes `&mut self`, so a manager is never driven from two threads at once.
pub struct TransactionManager<C: Connection> {
    conn: Option<C>,
    default_isolation_level: IsolationLevel,
    isolation_level: Option<IsolationLevel>,
    curs: Option<C::Cursor>,
}

impl<C: Connection> TransactionManager<C> {
    #[must_use]
    pub fn new(conn: C, default_isolation_level: IsolationLevel) -> Self {
        Self {
            conn: Some(conn),
            default_isolation_level,
            isolation_level: None,
            curs: None,
        }
    }

    /// A manager with no connection attached; `begin` fails until one is attached.
    #[must_use]
    pub fn detached(default_isolation_level: IsolationLevel) -> Self {
        Self {
            conn: None,
            default_isolation_level,
            isolation_level: None,
            curs: None,
        }
    }

    /// Start a unit of work: allocate the cursor and apply the default isolation level to
    /// the connection.
    ///
    /// `isolation_level` is recorded as the level of this unit of work (see
    /// [`TransactionManager::isolation_level`]); the connection is always configured with the
    /// manager default. Change the default to run with a different level.
    ///
    /// # Errors
    /// - `SqlMapError::NullConnection` if no connection is attached
    /// - `SqlMapError::ConnectionClosed` if the connection is closed
    /// - `SqlMapError::CursorAlreadyOpen` if a unit of work is already active (it is left untouched)
    /// - driver errors from allocating the cursor or applying the isolation level
    pub fn begin(&mut self, isolation_level: Option<IsolationLevel>) -> Result<(), SqlMapError> {
        let conn = self.conn.as_mut().ok_or(SqlMapError::NullConnection)?;
        if conn.is_closed() {
            return Err(SqlMapError::ConnectionClosed);
        }
        if self.curs.is_some() {
            return Err(SqlMapError::CursorAlreadyOpen);
        }

        let level = isolation_level.unwrap_or(self.default_isolation_level);
        let mut curs = conn.cursor()?;
        if let Err(err) = conn.set_isolation_level(self.default_isolation_level) {
            let _ = curs.close();
            return Err(err);
        }
        tracing::trace!(
            isolation = %level,
            applied = %self.default_isolation_level,
            "unit of work started"
        );
        self.isolation_level = Some(level);
        self.curs = Some(curs);
        Ok(())
    }

    /// # Errors
    /// Returns `SqlMapError::NullConnection` or the connection's commit error.
    pub fn commit(&mut self) -> Result<(), SqlMapError> {
        self.conn
            .as_mut()
            .ok_or(SqlMapError::NullConnection)?
            .commit()
    }

    /// # Errors
    /// Returns `SqlMapError::NullConnection` or the connection's rollback error.
    pub fn rollback(&mut self) -> Result<(), SqlMapError> {
        self.conn
            .as_mut()
            .ok_or(SqlMapError::NullConnection)?
            .rollback()
    }

    /// Close the open cursor and return to idle.
    ///
    /// The manager is idle afterwards even if closing the cursor reports an error.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConsistencyError` if no unit of work is active, or the cursor's
    /// close error.
    pub fn end(&mut self) -> Result<(), SqlMapError> {
        let mut curs = self.curs.take().ok_or_else(|| {
            SqlMapError::ConsistencyError("end() called without an open cursor".into())
        })?;
        self.isolation_level = None;
        tracing::trace!("unit of work ended");
        curs.close()
    }

    /// The cursor of the active unit of work.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConsistencyError` if `begin` has not been called.
    pub fn cursor_mut(&mut self) -> Result<&mut C::Cursor, SqlMapError> {
        self.curs.as_mut().ok_or_else(|| {
            SqlMapError::ConsistencyError("no open cursor; call begin() first".into())
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.curs.is_some()
    }

    /// Isolation level recorded for the active unit of work.
    #[must_use]
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.isolation_level
    }

    #[must_use]
    pub fn default_isolation_level(&self) -> IsolationLevel {
        self.default_isolation_level
    }

    pub fn set_default_isolation_level(&mut self, level: IsolationLevel) {
        self.default_isolation_level = level;
    }

    #[must_use]
    pub fn connection(&self) -> Option<&C> {
        self.conn.as_ref()
    }

    pub fn connection_mut(&mut self) -> Option<&mut C> {
        self.conn.as_mut()
    }

    /// Attach a connection, returning the previous one.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConsistencyError` while a unit of work is active.
    pub fn attach(&mut self, conn: C) -> Result<Option<C>, SqlMapError> {
        self.ensure_idle("attach")?;
        Ok(self.conn.replace(conn))
    }

    /// Detach and return the connection.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConsistencyError` while a unit of work is active.
    pub fn detach(&mut self) -> Result<Option<C>, SqlMapError> {
        self.ensure_idle("detach")?;
        Ok(self.conn.take())
    }

    fn ensure_idle(&self, ctx: &str) -> Result<(), SqlMapError> {
        if self.curs.is_some() {
            Err(SqlMapError::ConsistencyError(format!(
                "unit of work in progress; operation not permitted ({ctx})"
            )))
        } else {
            Ok(())
        }
    }
}

impl<C: Connection + fmt::Debug> fmt::Debug for TransactionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager")
            .field("conn", &self.conn)
            .field("default_isolation_level", &self.default_isolation_level)
            .field("isolation_level", &self.isolation_level)
            .field("active", &self.curs.is_some())
            .finish()
    }
}
