use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::error::SqlMapError;
use crate::observer::StatementObserver;
use crate::sql_map::SqlMap;
use crate::types::IsolationLevel;

fn default_trim_blocks() -> bool {
    true
}

/// Options for building a [`SqlMap`].
///
/// Deserializable so it can live in an application's config file:
/// ```rust
/// use sql_map::prelude::*;
///
/// let opts = SqlMapOptions::from_json(
///     r#"{ "template_root": "sql", "default_isolation_level": "serializable" }"#,
/// )?;
/// assert_eq!(opts.default_isolation_level, IsolationLevel::Serializable);
/// assert!(opts.trim_blocks);
/// # Ok::<(), SqlMapError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlMapOptions {
    /// Directory template names are resolved against.
    pub template_root: PathBuf,
    #[serde(default)]
    pub default_isolation_level: IsolationLevel,
    /// Drop the first newline after a block tag, as SQL templates usually want.
    #[serde(default = "default_trim_blocks")]
    pub trim_blocks: bool,
}

impl SqlMapOptions {
    #[must_use]
    pub fn new(template_root: impl Into<PathBuf>) -> Self {
        Self {
            template_root: template_root.into(),
            default_isolation_level: IsolationLevel::default(),
            trim_blocks: default_trim_blocks(),
        }
    }

    /// Parse options from JSON.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConfigError` if the JSON is malformed or misses `template_root`.
    pub fn from_json(json: &str) -> Result<Self, SqlMapError> {
        serde_json::from_str(json)
            .map_err(|e| SqlMapError::ConfigError(format!("invalid sql map options: {e}")))
    }
}

/// Fluent builder for [`SqlMapOptions`].
#[derive(Clone)]
pub struct SqlMapOptionsBuilder {
    opts: SqlMapOptions,
    observer: Option<Arc<dyn StatementObserver>>,
}

impl SqlMapOptionsBuilder {
    #[must_use]
    pub fn new(template_root: impl Into<PathBuf>) -> Self {
        Self {
            opts: SqlMapOptions::new(template_root),
            observer: None,
        }
    }

    #[must_use]
    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.opts.default_isolation_level = level;
        self
    }

    #[must_use]
    pub fn trim_blocks(mut self, trim_blocks: bool) -> Self {
        self.opts.trim_blocks = trim_blocks;
        self
    }

    /// Report executed statements somewhere other than `tracing`.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn StatementObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqlMapOptions {
        self.opts
    }

    /// Build a [`SqlMap`] over `conn`.
    #[must_use]
    pub fn build<C: Connection>(self, conn: C) -> SqlMap<C> {
        let map = SqlMap::from_options(Some(conn), &self.opts);
        match self.observer {
            Some(observer) => map.with_observer(observer),
            None => map,
        }
    }
}
