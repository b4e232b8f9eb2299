//! Templated SQL run inside explicit units of work.
//!
//! [`SqlMap`] renders named `minijinja` templates (or takes SQL verbatim), binds `:name`
//! parameters for the backend driver, and maps result rows to [`Record`]s. Statements run
//! on a cursor owned by a [`TransactionManager`]; the `simple_*` operations wrap a single
//! statement in begin/commit/rollback/end so the cursor is always released.
//!
//! Backends are feature gated: `sqlite` (default) and `postgres`.

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod observer;
pub mod prelude;
pub mod results;
pub mod sql_map;
pub mod template;
pub mod transaction;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{SqlMapOptions, SqlMapOptionsBuilder};
pub use connection::{Connection, Cursor};
pub use error::{ErrorKind, SqlMapError};
pub use executor::StatementExecutor;
pub use observer::{NoopObserver, StatementObserver, TracingObserver};
pub use results::{Execution, Record};
pub use sql_map::SqlMap;
pub use template::{StatementSource, TemplateRenderer};
pub use transaction::TransactionManager;
pub use types::{IsolationLevel, RowValues, SqlParams};
