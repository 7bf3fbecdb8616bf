//! SQLite SQL dialect (Strategy pattern).

use crate::core::traits::Dialect;

/// SQLite dialect implementation.
///
/// An `INTEGER PRIMARY KEY` column aliases the rowid, so no separate
/// AUTO_INCREMENT clause or trailing constraint is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn id_column(&self) -> &'static str {
        "id INTEGER PRIMARY KEY"
    }

    fn id_constraint(&self) -> &'static str {
        ""
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!("ALTER TABLE {} RENAME TO {}", from, to)
    }

    fn foreign_key_toggle(&self, _enabled: bool) -> Option<String> {
        // SQLite does not enforce the analytics schema's references unless
        // PRAGMA foreign_keys is switched on, which this crate never does.
        None
    }
}
