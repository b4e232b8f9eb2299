use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{SqlMapOptions, SqlMapOptionsBuilder};
use crate::connection::Connection;
use crate::error::SqlMapError;
use crate::executor::StatementExecutor;
use crate::observer::StatementObserver;
use crate::results::Record;
use crate::template::TemplateRenderer;
use crate::transaction::TransactionManager;
use crate::types::{IsolationLevel, RowValues, SqlParams};

/// Templated SQL over one connection.
///
/// The lower-level `begin`/`commit`/`rollback`/`end` primitives and the executor operations
/// (`select`, `direct_select`, `insert`, ...) let callers group several statements into one
/// transaction. Each executor operation also has a `simple_` counterpart that runs it as its
/// own unit of work:
///
/// ```rust
/// use sql_map::prelude::*;
///
/// # fn demo() -> Result<(), SqlMapError> {
/// let conn = SqliteConnection::open_in_memory()?;
/// conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);")?;
///
/// let mut map = SqlMap::new(conn, "sql", IsolationLevel::ReadCommitted);
/// let status = map.simple_direct_insert(
///     "INSERT INTO users (id, name) VALUES (:id, :name)",
///     &SqlParams::new().with("id", 7).with("name", "Ada"),
/// )?;
/// assert_eq!(status, "INSERT 0 1");
///
/// let user = map
///     .simple_direct_select_first_row("SELECT id, name FROM users WHERE id = :id", &SqlParams::new().with("id", 7))?
///     .expect("row exists");
/// assert_eq!(user.get("name").and_then(RowValues::as_text), Some("Ada"));
/// # Ok(())
/// # }
/// # demo().unwrap();
/// ```
pub struct SqlMap<C: Connection> {
    tx: TransactionManager<C>,
    executor: StatementExecutor,
}

impl<C: Connection> SqlMap<C> {
    /// Build a map over `conn`, resolving templates against `template_root`.
    #[must_use]
    pub fn new(
        conn: C,
        template_root: impl Into<PathBuf>,
        default_isolation_level: IsolationLevel,
    ) -> Self {
        let opts = SqlMapOptions {
            default_isolation_level,
            ..SqlMapOptions::new(template_root)
        };
        Self::from_options(Some(conn), &opts)
    }

    #[must_use]
    pub fn builder(template_root: impl Into<PathBuf>) -> SqlMapOptionsBuilder {
        SqlMapOptionsBuilder::new(template_root)
    }

    /// Build a map from options. With `conn` set to `None`, `begin` reports
    /// `SqlMapError::NullConnection` until a connection is attached.
    #[must_use]
    pub fn from_options(conn: Option<C>, opts: &SqlMapOptions) -> Self {
        let tx = match conn {
            Some(conn) => TransactionManager::new(conn, opts.default_isolation_level),
            None => TransactionManager::detached(opts.default_isolation_level),
        };
        let renderer = TemplateRenderer::new(opts.template_root.clone(), opts.trim_blocks);
        Self {
            tx,
            executor: StatementExecutor::new(renderer),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StatementObserver>) -> Self {
        self.executor = self.executor.with_observer(observer);
        self
    }

    #[must_use]
    pub fn transaction_manager(&self) -> &TransactionManager<C> {
        &self.tx
    }

    #[must_use]
    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tx.is_active()
    }

    #[must_use]
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.tx.isolation_level()
    }

    /// Level applied to the connection by every following `begin`.
    pub fn set_default_isolation_level(&mut self, level: IsolationLevel) {
        self.tx.set_default_isolation_level(level);
    }

    #[must_use]
    pub fn connection(&self) -> Option<&C> {
        self.tx.connection()
    }

    pub fn connection_mut(&mut self) -> Option<&mut C> {
        self.tx.connection_mut()
    }

    /// # Errors
    /// Returns `SqlMapError::ConsistencyError` while a unit of work is active.
    pub fn attach(&mut self, conn: C) -> Result<Option<C>, SqlMapError> {
        self.tx.attach(conn)
    }

    /// # Errors
    /// Returns `SqlMapError::ConsistencyError` while a unit of work is active.
    pub fn detach(&mut self) -> Result<Option<C>, SqlMapError> {
        self.tx.detach()
    }

    // ---- transaction primitives ----

    /// # Errors
    /// See [`TransactionManager::begin`].
    pub fn begin(&mut self, isolation_level: Option<IsolationLevel>) -> Result<(), SqlMapError> {
        self.tx.begin(isolation_level)
    }

    /// # Errors
    /// See [`TransactionManager::commit`].
    pub fn commit(&mut self) -> Result<(), SqlMapError> {
        self.tx.commit()
    }

    /// # Errors
    /// See [`TransactionManager::rollback`].
    pub fn rollback(&mut self) -> Result<(), SqlMapError> {
        self.tx.rollback()
    }

    /// # Errors
    /// See [`TransactionManager::end`].
    pub fn end(&mut self) -> Result<(), SqlMapError> {
        self.tx.end()
    }

    /// Run `op` as one unit of work: begin, run, commit.
    ///
    /// If `op` or the commit fails, the transaction is rolled back and the original error is
    /// returned as-is; a failing rollback is only logged. The cursor is released on every
    /// path, so the map is idle again when this returns. A panic inside `op` is not caught:
    /// the transaction is rolled back and the cursor released while it unwinds.
    ///
    /// # Errors
    /// Errors from `begin` (nothing to clean up in that case), from `op`, from commit, or
    /// from releasing the cursor after an otherwise successful unit of work.
    pub fn unit_of_work<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, SqlMapError>,
    ) -> Result<T, SqlMapError> {
        self.begin(None)?;
        let mut guard = ReleaseOnUnwind { map: self };
        let map = &mut *guard.map;

        let outcome = op(map).and_then(|value| {
            map.commit()?;
            Ok(value)
        });
        let outcome = outcome.or_else(|err| {
            if let Err(rollback_err) = map.rollback() {
                tracing::warn!(error = %rollback_err, original = %err, "rollback failed");
            }
            Err(err)
        });

        let ended = map.end();
        match (outcome, ended) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(end_err)) => Err(end_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(end_err)) => {
                tracing::warn!(error = %end_err, "releasing cursor failed");
                Err(err)
            }
        }
    }

    // ---- executor operations on the open cursor ----

    /// Render `template`, run it, and map every row. `None` when no rows came back.
    ///
    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; render and driver errors unchanged.
    pub fn select(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<Vec<Record>>, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.select(cursor, template, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; driver errors unchanged.
    pub fn direct_select(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<Vec<Record>>, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.direct_select(cursor, sql, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; render and driver errors unchanged.
    pub fn select_first_row(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<Record>, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.select_first_row(cursor, template, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; driver errors unchanged.
    pub fn direct_select_first_row(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<Record>, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.direct_select_first_row(cursor, sql, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; render and driver errors unchanged.
    pub fn select_first_datum(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<RowValues>, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.select_first_datum(cursor, template, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; driver errors unchanged.
    pub fn direct_select_first_datum(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<RowValues>, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.direct_select_first_datum(cursor, sql, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; render and driver errors unchanged.
    pub fn insert(&mut self, template: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.insert(cursor, template, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; driver errors unchanged.
    pub fn direct_insert(&mut self, sql: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.direct_insert(cursor, sql, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; render and driver errors unchanged.
    pub fn update(&mut self, template: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.update(cursor, template, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; driver errors unchanged.
    pub fn direct_update(&mut self, sql: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.direct_update(cursor, sql, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; render and driver errors unchanged.
    pub fn delete(&mut self, template: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.delete(cursor, template, params)
    }

    /// # Errors
    /// `SqlMapError::ConsistencyError` without an open cursor; driver errors unchanged.
    pub fn direct_delete(&mut self, sql: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        let cursor = self.tx.cursor_mut()?;
        self.executor.direct_delete(cursor, sql, params)
    }

    // ---- one statement, one unit of work ----

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::select`].
    pub fn simple_select(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<Vec<Record>>, SqlMapError> {
        self.unit_of_work(|map| map.select(template, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::direct_select`].
    pub fn simple_direct_select(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<Vec<Record>>, SqlMapError> {
        self.unit_of_work(|map| map.direct_select(sql, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::select_first_row`].
    pub fn simple_select_first_row(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<Record>, SqlMapError> {
        self.unit_of_work(|map| map.select_first_row(template, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::direct_select_first_row`].
    pub fn simple_direct_select_first_row(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<Record>, SqlMapError> {
        self.unit_of_work(|map| map.direct_select_first_row(sql, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::select_first_datum`].
    pub fn simple_select_first_datum(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<RowValues>, SqlMapError> {
        self.unit_of_work(|map| map.select_first_datum(template, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::direct_select_first_datum`].
    pub fn simple_direct_select_first_datum(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<RowValues>, SqlMapError> {
        self.unit_of_work(|map| map.direct_select_first_datum(sql, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::insert`].
    pub fn simple_insert(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.unit_of_work(|map| map.insert(template, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::direct_insert`].
    pub fn simple_direct_insert(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.unit_of_work(|map| map.direct_insert(sql, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::update`].
    pub fn simple_update(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.unit_of_work(|map| map.update(template, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::direct_update`].
    pub fn simple_direct_update(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.unit_of_work(|map| map.direct_update(sql, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::delete`].
    pub fn simple_delete(
        &mut self,
        template: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.unit_of_work(|map| map.delete(template, params))
    }

    /// # Errors
    /// See [`SqlMap::unit_of_work`] and [`SqlMap::direct_delete`].
    pub fn simple_direct_delete(
        &mut self,
        sql: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.unit_of_work(|map| map.direct_delete(sql, params))
    }
}

/// Rolls back and releases the cursor of a unit of work that is unwinding from a panic.
struct ReleaseOnUnwind<'a, C: Connection> {
    map: &'a mut SqlMap<C>,
}

impl<C: Connection> Drop for ReleaseOnUnwind<'_, C> {
    fn drop(&mut self) {
        if !std::thread::panicking() || !self.map.tx.is_active() {
            return;
        }
        if let Err(err) = self.map.tx.rollback() {
            tracing::warn!(error = %err, "rollback during unwind failed");
        }
        if let Err(err) = self.map.tx.end() {
            tracing::warn!(error = %err, "releasing cursor during unwind failed");
        }
    }
}

impl<C: Connection + fmt::Debug> fmt::Debug for SqlMap<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlMap")
            .field("tx", &self.tx)
            .field("executor", &self.executor)
            .finish()
    }
}
