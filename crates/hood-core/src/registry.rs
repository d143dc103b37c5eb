//! Dialect lookup by driver name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dialect::{Dialect, PostgresDialect, SqliteDialect};

/// Maps driver names to dialects.
///
/// A registry is an ordinary value: build one at startup and pass it by
/// reference to whatever opens connections.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    dialects: BTreeMap<String, Arc<dyn Dialect>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in dialects under `postgres`,
    /// `sqlite3` and `sqlite`.
    ///
    /// There is no built-in MySQL dialect. Other databases are added with
    /// [`Registry::register`] given a [`Dialect`] implementation.
    #[must_use]
    pub fn with_defaults() -> Self {
        let sqlite: Arc<dyn Dialect> = Arc::new(SqliteDialect::new());
        let mut registry = Self::new();
        registry.register("postgres", Arc::new(PostgresDialect::new()));
        registry.register("sqlite3", Arc::clone(&sqlite));
        registry.register("sqlite", sqlite);
        registry
    }

    /// Registers a dialect, replacing any dialect with the same name.
    pub fn register(&mut self, name: impl Into<String>, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(name.into(), dialect);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        self.dialects.get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dialects.keys().map(String::as_str)
    }
}
