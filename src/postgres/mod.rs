// PostgreSQL backend
//
// - config: connection options and validation
// - connection: blocking `Connection`/`Cursor` over tokio-postgres
// - params: `RowValues` -> postgres parameter encoding
// - query: statement execution and result extraction

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::PostgresOptions;
pub use connection::{PostgresConnection, PostgresCursor};
pub use params::Params;
