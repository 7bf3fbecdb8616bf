//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+. Note that MySQL
//! auto-commits DDL, so a patch must never assume its DDL participates in a
//! surrounding transaction on this dialect.

use crate::core::traits::Dialect;

/// MySQL/MariaDB dialect implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn id_column(&self) -> &'static str {
        "id INT NOT NULL AUTO_INCREMENT"
    }

    fn id_constraint(&self) -> &'static str {
        ", PRIMARY KEY (id)"
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!("RENAME TABLE {} TO {}", from, to)
    }

    fn foreign_key_toggle(&self, enabled: bool) -> Option<String> {
        Some(format!(
            "SET foreign_key_checks = {}",
            if enabled { 1 } else { 0 }
        ))
    }
}
