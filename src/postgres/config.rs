use serde::Deserialize;

use crate::error::SqlMapError;

use super::connection::PostgresConnection;

/// Options for connecting to Postgres.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostgresOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl PostgresOptions {
    /// Validate the options and build a driver config.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConfigError` naming the first missing required field.
    pub fn to_config(&self) -> Result<tokio_postgres::Config, SqlMapError> {
        let dbname = self
            .dbname
            .as_deref()
            .ok_or_else(|| SqlMapError::ConfigError("dbname is required".to_string()))?;
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| SqlMapError::ConfigError("host is required".to_string()))?;
        let port = self
            .port
            .ok_or_else(|| SqlMapError::ConfigError("port is required".to_string()))?;
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| SqlMapError::ConfigError("user is required".to_string()))?;

        let mut config = tokio_postgres::Config::new();
        config.host(host).port(port).dbname(dbname).user(user);
        if let Some(password) = &self.password {
            config.password(password);
        }
        Ok(config)
    }
}

impl PostgresConnection {
    /// Connect using validated options.
    ///
    /// # Errors
    /// Returns `SqlMapError::ConfigError` for missing fields, otherwise as
    /// [`PostgresConnection::connect_with`].
    pub fn connect(opts: &PostgresOptions) -> Result<Self, SqlMapError> {
        let config = opts.to_config()?;
        tracing::debug!(host = ?opts.host, dbname = ?opts.dbname, "connecting to postgres");
        Self::connect_with(&config)
    }
}
