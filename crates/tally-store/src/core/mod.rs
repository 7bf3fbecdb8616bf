//! Driver-agnostic primitives shared by the drivers and the patch engine.

pub mod traits;
pub mod value;

pub use traits::{Dialect, StatementExecutor};
pub use value::{Row, SqlValue};
