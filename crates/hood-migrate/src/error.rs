//! Error types for migrations and scaffolding.

use std::path::PathBuf;

use hood::HoodError;

/// Errors that can occur while running or creating migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Database or config error from the facade.
    #[error(transparent)]
    Hood(#[from] HoodError),

    /// IO error while reading or writing project files.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration name that cannot be used in a file and module name.
    #[error("invalid migration name '{0}': use lowercase letters, digits and underscores")]
    InvalidName(String),

    /// Two migrations share a timestamp.
    #[error("duplicate migration timestamp {0}")]
    DuplicateTimestamp(i64),

    /// The recorded version has no registered migration.
    #[error("no migration registered for timestamp {0}")]
    UnknownMigration(i64),
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
