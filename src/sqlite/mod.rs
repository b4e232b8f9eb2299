// SQLite backend
//
// - config: connection options and opening
// - connection: `Connection`/`Cursor` implementations with implicit transactions
// - params: parameter conversion between `RowValues` and rusqlite values
// - query: statement execution and result buffering

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::{SqliteConnection, SqliteCursor};
pub use query::run_statement;
