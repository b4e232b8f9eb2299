use std::fmt;

use crate::error::SqlMapError;
use crate::results::Execution;
use crate::types::SqlParams;

/// Receives every statement the executor runs, whether it succeeded or not.
pub trait StatementObserver: Send + Sync {
    fn on_execute(
        &self,
        sql: &str,
        params: &SqlParams,
        outcome: Result<&Execution, &SqlMapError>,
    );
}

/// Default observer: emits a `tracing` event per statement.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StatementObserver for TracingObserver {
    fn on_execute(
        &self,
        sql: &str,
        params: &SqlParams,
        outcome: Result<&Execution, &SqlMapError>,
    ) {
        match outcome {
            Ok(execution) => tracing::debug!(
                sql,
                params = params.len(),
                rowcount = execution.rowcount(),
                status = execution.status_message(),
                "statement executed"
            ),
            Err(err) => tracing::debug!(sql, params = params.len(), error = %err, "statement failed"),
        }
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StatementObserver for NoopObserver {
    fn on_execute(&self, _: &str, _: &SqlParams, _: Result<&Execution, &SqlMapError>) {}
}

pub(crate) struct DebugObserver<'a>(pub(crate) &'a dyn StatementObserver);

impl fmt::Debug for DebugObserver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn StatementObserver")
    }
}
