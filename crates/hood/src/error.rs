//! Error types for the execution facade.

use std::path::PathBuf;

use hood_core::{HookError, ValidationError, ValueError};
use thiserror::Error;

/// Errors returned by [`Hood`](crate::Hood) operations.
#[derive(Debug, Error)]
pub enum HoodError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The config file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// No dialect is registered under the driver name.
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),

    /// The config file has no entry for the environment.
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    /// A field constraint or a custom validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A lifecycle hook returned an error.
    #[error("hook failed: {0}")]
    Hook(HookError),

    /// A column value could not be stored into its field.
    #[error("cannot decode column {column}: {source}")]
    Decode {
        column: String,
        #[source]
        source: ValueError,
    },

    /// The driver returned a column type hood does not map.
    #[error("unsupported type {type_name} for column {column}")]
    UnsupportedType { column: String, type_name: String },

    /// A row has no column with the requested name.
    #[error("no column named {0}")]
    UnknownColumn(String),

    /// A value conversion failed outside of row scanning.
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, HoodError>;
