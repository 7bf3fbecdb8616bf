//! MySQL/MariaDB driver: dialect and executor.

mod dialect;
mod executor;

pub use dialect::MysqlDialect;
pub use executor::MysqlExecutor;
