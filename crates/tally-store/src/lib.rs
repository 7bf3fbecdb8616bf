//! tally-store: schema management for a game-server analytics database.
//!
//! The store keeps player analytics (sessions, world times, kills,
//! geolocation, performance samples) in SQLite or MySQL. This crate owns the
//! schema: [`Store::open`] connects, creates any missing canonical tables,
//! registers the running server, and brings older on-disk schemas up to the
//! canonical shape through an ordered sequence of idempotent patches.
//!
//! There is no stored schema version. Each patch decides for itself whether
//! it is needed by inspecting the physical schema, so a database restored
//! from any historical backup migrates correctly, and interrupted migrations
//! resume from their staged `temp_*` tables on the next start.

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod patch;
pub mod registry;
pub mod schema;
pub mod store;

pub use config::DbConfig;
pub use drivers::{DialectImpl, ExecutorImpl};
pub use error::{ErrorKind, Result, StoreError};
pub use patch::{Patch, PatchSequence};
pub use store::Store;
