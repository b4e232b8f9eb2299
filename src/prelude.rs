//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_map::prelude::*;
//! ```

pub use crate::config::{SqlMapOptions, SqlMapOptionsBuilder};
pub use crate::connection::{Connection, Cursor};
pub use crate::error::{ErrorKind, SqlMapError};
pub use crate::executor::StatementExecutor;
pub use crate::observer::{NoopObserver, StatementObserver, TracingObserver};
pub use crate::results::{Execution, Record};
pub use crate::sql_map::SqlMap;
pub use crate::template::{StatementSource, TemplateRenderer, is_not_empty, is_present};
pub use crate::transaction::TransactionManager;
pub use crate::translation::{BoundSql, PlaceholderStyle, bind_named_placeholders, command_tag};
pub use crate::types::{IsolationLevel, RowValues, SqlParams};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteCursor, SqliteOptions, SqliteOptionsBuilder};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresConnection, PostgresCursor, PostgresOptions};
