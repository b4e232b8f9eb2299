use crate::error::SqlMapError;
use crate::results::Execution;
use crate::types::{IsolationLevel, SqlParams};

/// A transactional database connection, as seen by the transaction manager.
///
/// Transactions are implicit: unless the isolation level is [`IsolationLevel::Autocommit`],
/// the first statement executed through any cursor after a commit/rollback opens one.
/// `commit` and `rollback` end whatever transaction is open and do nothing otherwise.
///
/// Implementations are blocking. A connection must not be shared by concurrent units of work.
pub trait Connection {
    type Cursor: Cursor;

    fn is_closed(&self) -> bool;

    /// Allocate a cursor whose rows come back keyed by column name.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConnectionClosed` if the connection is closed, or a driver error.
    fn cursor(&mut self) -> Result<Self::Cursor, SqlMapError>;

    /// # Errors
    /// Returns the driver's error if the commit is rejected.
    fn commit(&mut self) -> Result<(), SqlMapError>;

    /// # Errors
    /// Returns the driver's error if the rollback fails.
    fn rollback(&mut self) -> Result<(), SqlMapError>;

    /// Isolation used by transactions opened from now on.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConnectionClosed` or a driver error.
    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), SqlMapError>;

    fn isolation_level(&self) -> IsolationLevel;
}

/// Statement execution handle allocated by a [`Connection`].
pub trait Cursor {
    /// Execute `sql`, binding its `:name` placeholders from `params`, and buffer the result.
    ///
    /// # Errors
    /// Returns `SqlMapError::ParameterError` for unbound placeholders, or the driver's error.
    fn execute(&mut self, sql: &str, params: &SqlParams) -> Result<Execution, SqlMapError>;

    /// The last statement sent to the driver, after placeholder rewriting.
    fn query(&self) -> Option<&str>;

    /// Release the cursor. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns the driver's error if releasing fails.
    fn close(&mut self) -> Result<(), SqlMapError>;

    fn is_closed(&self) -> bool;
}
