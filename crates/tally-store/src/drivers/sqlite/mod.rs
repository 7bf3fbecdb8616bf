//! SQLite driver: dialect and executor.

mod dialect;
mod executor;

pub use dialect::SqliteDialect;
pub use executor::SqliteExecutor;
