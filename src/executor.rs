use std::fmt;
use std::sync::Arc;

use crate::connection::Cursor;
use crate::error::SqlMapError;
use crate::observer::{DebugObserver, StatementObserver, TracingObserver};
use crate::results::{Execution, Record};
use crate::template::{StatementSource, TemplateRenderer};
use crate::types::{RowValues, SqlParams};

/// Renders, runs and shapes statements on a cursor the caller already opened.
///
/// Every operation comes in a templated flavor (a template name resolved by the renderer)
/// and a `direct_` flavor (SQL used verbatim). Row-returning shapes report `None` when the
/// statement produced fewer than one row.
pub struct StatementExecutor {
    renderer: TemplateRenderer,
    observer: Arc<dyn StatementObserver>,
}

impl StatementExecutor {
    #[must_use]
    pub fn new(renderer: TemplateRenderer) -> Self {
        Self {
            renderer,
            observer: Arc::new(TracingObserver),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StatementObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Resolve the statement, execute it and report it to the observer.
    ///
    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn run<K: Cursor>(
        &self,
        cursor: &mut K,
        source: StatementSource<'_>,
        params: &SqlParams,
    ) -> Result<Execution, SqlMapError> {
        let sql = self.renderer.resolve(source, params)?;
        let outcome = cursor.execute(&sql, params);
        let executed = cursor.query().unwrap_or(&sql);
        self.observer.on_execute(executed, params, outcome.as_ref());
        outcome
    }

    /// Every row as a record, or `None` when no rows came back.
    ///
    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn fetch_all<K: Cursor>(
        &self,
        cursor: &mut K,
        source: StatementSource<'_>,
        params: &SqlParams,
    ) -> Result<Option<Vec<Record>>, SqlMapError> {
        let execution = self.run(cursor, source, params)?;
        if execution.rowcount() < 1 {
            return Ok(None);
        }
        Ok(Some(execution.into_records()))
    }

    /// The first row as a record, or `None` when no rows came back.
    ///
    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn fetch_first_row<K: Cursor>(
        &self,
        cursor: &mut K,
        source: StatementSource<'_>,
        params: &SqlParams,
    ) -> Result<Option<Record>, SqlMapError> {
        let execution = self.run(cursor, source, params)?;
        if execution.rowcount() < 1 {
            return Ok(None);
        }
        Ok(execution.into_first_record())
    }

    /// First column of the first row, or `None` when no rows came back.
    ///
    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn fetch_first_datum<K: Cursor>(
        &self,
        cursor: &mut K,
        source: StatementSource<'_>,
        params: &SqlParams,
    ) -> Result<Option<RowValues>, SqlMapError> {
        let execution = self.run(cursor, source, params)?;
        if execution.rowcount() < 1 {
            return Ok(None);
        }
        Ok(execution.into_first_datum())
    }

    /// The status message of a data-changing statement, e.g. `INSERT 0 1`.
    ///
    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn execute_status<K: Cursor>(
        &self,
        cursor: &mut K,
        source: StatementSource<'_>,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        let execution = self.run(cursor, source, params)?;
        Ok(execution.status_message().to_owned())
    }

    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn select<K: Cursor>(
        &self,
        cursor: &mut K,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<Vec<Record>>, SqlMapError> {
        self.fetch_all(cursor, StatementSource::Template(template), params)
    }

    /// # Errors
    /// Driver errors are returned unchanged.
    pub fn direct_select<K: Cursor>(
        &self,
        cursor: &mut K,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<Vec<Record>>, SqlMapError> {
        self.fetch_all(cursor, StatementSource::Direct(sql), params)
    }

    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn select_first_row<K: Cursor>(
        &self,
        cursor: &mut K,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<Record>, SqlMapError> {
        self.fetch_first_row(cursor, StatementSource::Template(template), params)
    }

    /// # Errors
    /// Driver errors are returned unchanged.
    pub fn direct_select_first_row<K: Cursor>(
        &self,
        cursor: &mut K,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<Record>, SqlMapError> {
        self.fetch_first_row(cursor, StatementSource::Direct(sql), params)
    }

    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn select_first_datum<K: Cursor>(
        &self,
        cursor: &mut K,
        template: &str,
        params: &SqlParams,
    ) -> Result<Option<RowValues>, SqlMapError> {
        self.fetch_first_datum(cursor, StatementSource::Template(template), params)
    }

    /// # Errors
    /// Driver errors are returned unchanged.
    pub fn direct_select_first_datum<K: Cursor>(
        &self,
        cursor: &mut K,
        sql: &str,
        params: &SqlParams,
    ) -> Result<Option<RowValues>, SqlMapError> {
        self.fetch_first_datum(cursor, StatementSource::Direct(sql), params)
    }

    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn insert<K: Cursor>(
        &self,
        cursor: &mut K,
        template: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.execute_status(cursor, StatementSource::Template(template), params)
    }

    /// # Errors
    /// Driver errors are returned unchanged.
    pub fn direct_insert<K: Cursor>(
        &self,
        cursor: &mut K,
        sql: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.execute_status(cursor, StatementSource::Direct(sql), params)
    }

    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn update<K: Cursor>(
        &self,
        cursor: &mut K,
        template: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.execute_status(cursor, StatementSource::Template(template), params)
    }

    /// # Errors
    /// Driver errors are returned unchanged.
    pub fn direct_update<K: Cursor>(
        &self,
        cursor: &mut K,
        sql: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.execute_status(cursor, StatementSource::Direct(sql), params)
    }

    /// # Errors
    /// Render and driver errors are returned unchanged.
    pub fn delete<K: Cursor>(
        &self,
        cursor: &mut K,
        template: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.execute_status(cursor, StatementSource::Template(template), params)
    }

    /// # Errors
    /// Driver errors are returned unchanged.
    pub fn direct_delete<K: Cursor>(
        &self,
        cursor: &mut K,
        sql: &str,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        self.execute_status(cursor, StatementSource::Direct(sql), params)
    }
}

impl fmt::Debug for StatementExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementExecutor")
            .field("renderer", &self.renderer)
            .field("observer", &DebugObserver(self.observer.as_ref()))
            .finish()
    }
}
