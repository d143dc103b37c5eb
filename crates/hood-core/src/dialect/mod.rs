//! SQL dialect support.
//!
//! A dialect captures everything that differs between database engines when
//! hood renders a statement: placeholder markers, identifier quoting, the
//! column type chosen for a [`Value`], and the DDL keyword fragments.
//! Dialects are stateless and shared behind an `Arc`.

mod postgres;
mod sqlite;

use std::fmt;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::value::Value;

/// The driver family a dialect talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

/// Default size of a `VARCHAR` column when the field declares none.
pub const DEFAULT_VARCHAR_SIZE: usize = 255;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the name the dialect is registered under.
    fn name(&self) -> &'static str;

    /// Returns the driver family used to open connections.
    fn backend(&self) -> Backend;

    /// Renders the placeholder for the zero-based argument position `pos`.
    fn marker(&self, pos: usize) -> String;

    /// Renders the placeholder for `pos` and advances it by one.
    fn next_marker(&self, pos: &mut usize) -> String {
        let marker = self.marker(*pos);
        *pos += 1;
        marker
    }

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Quotes a table, column or index name.
    fn quote(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Maps a value to a column type.
    ///
    /// `size` only applies to `VARCHAR` columns, 0 selects
    /// [`DEFAULT_VARCHAR_SIZE`].
    fn sql_type(&self, value: &Value, size: usize, auto_increment: bool) -> String;

    fn keyword_not_null(&self) -> &'static str {
        "NOT NULL"
    }

    fn keyword_default(&self, literal: &str) -> String {
        format!("DEFAULT {literal}")
    }

    fn keyword_primary_key(&self) -> &'static str {
        "PRIMARY KEY"
    }

    /// Returns the auto-increment keyword, empty if the dialect expresses
    /// auto-increment through the column type.
    fn keyword_auto_increment(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    /// Returns the clause appended to an INSERT to read back the generated
    /// primary key.
    ///
    /// `None` means the driver's last-insert-id is used instead.
    fn returning_clause(&self, _pk: &str) -> Option<String> {
        None
    }
}

pub(crate) const fn varchar_size(size: usize) -> usize {
    if size == 0 {
        DEFAULT_VARCHAR_SIZE
    } else {
        size
    }
}
