//! Error types for the storage and schema patch engine.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or set up at all. Fatal, aborts startup.
    #[error("Store initialization failed: {0}")]
    Init(String),

    /// A specific schema patch failed. Fatal to the whole migration run.
    #[error("Patch {patch} failed: {source}")]
    Patch {
        patch: String,
        #[source]
        source: Box<StoreError>,
    },

    /// Invalid database configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A query returned rows of an unexpected shape, or a required row
    /// (e.g. the running server's registry entry) was missing.
    #[error("Unexpected schema state: {0}")]
    Schema(String),

    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),
}

/// Coarse error classification, so callers can separate fatal startup
/// failures from patch failures without matching on message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store unreachable or unusable before any patch ran.
    Init,
    /// A named patch failed mid-run.
    PatchApply,
    /// Bad configuration.
    Config,
    /// Driver-level or schema-shape failure outside a patch.
    Store,
}

impl StoreError {
    /// Create an initialization error from any displayable cause.
    pub fn init(cause: impl std::fmt::Display) -> Self {
        StoreError::Init(cause.to_string())
    }

    /// Wrap a failure with the name of the patch it occurred in.
    pub fn patch(name: impl Into<String>, source: StoreError) -> Self {
        StoreError::Patch {
            patch: name.into(),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Init(_) => ErrorKind::Init,
            StoreError::Patch { .. } => ErrorKind::PatchApply,
            StoreError::Config(_) => ErrorKind::Config,
            StoreError::Schema(_) | StoreError::Sqlite(_) | StoreError::Mysql(_) => {
                ErrorKind::Store
            }
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_error_carries_name_and_cause() {
        let inner = StoreError::Schema("worlds table missing".into());
        let err = StoreError::patch("WorldServerScopePatch", inner);

        assert_eq!(err.kind(), ErrorKind::PatchApply);
        let msg = err.to_string();
        assert!(msg.contains("WorldServerScopePatch"));
        assert!(msg.contains("worlds table missing"));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(StoreError::init("no route").kind(), ErrorKind::Init);
        assert_eq!(
            StoreError::Config("bad port".into()).kind(),
            ErrorKind::Config
        );
        assert_eq!(StoreError::Schema("x".into()).kind(), ErrorKind::Store);
    }
}
