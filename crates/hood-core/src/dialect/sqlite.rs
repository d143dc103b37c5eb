//! SQLite dialect.

use super::{Backend, Dialect};
use crate::value::{Kind, Value};

/// SQLite dialect: `?` markers and `AUTOINCREMENT` primary keys.
///
/// SQLite only has storage classes, so every kind collapses onto
/// `integer`, `real` or `text`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn marker(&self, _pos: usize) -> String {
        "?".to_string()
    }

    fn sql_type(&self, value: &Value, _size: usize, _auto_increment: bool) -> String {
        match value.kind() {
            // booleans are stored as 0 or 1
            Kind::Id
            | Kind::Bool
            | Kind::I8
            | Kind::I16
            | Kind::I32
            | Kind::I64
            | Kind::U8
            | Kind::U16
            | Kind::U32
            | Kind::U64 => "integer".to_string(),
            Kind::F32 | Kind::F64 => "real".to_string(),
            Kind::Text | Kind::VarChar | Kind::Bytes | Kind::Time => "text".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::value::{Id, ToValue, VarChar};

    #[test]
    fn test_marker_is_constant_but_position_advances() {
        let d = SqliteDialect::new();
        let mut pos = 0;
        assert_eq!(d.next_marker(&mut pos), "?");
        assert_eq!(d.next_marker(&mut pos), "?");
        assert_eq!(pos, 2);
    }

    #[test]
    fn test_sql_types() {
        let d = SqliteDialect::new();
        assert_eq!(d.sql_type(&true.to_value(), 0, false), "integer");
        assert_eq!(d.sql_type(&2_u32.to_value(), 0, false), "integer");
        assert_eq!(d.sql_type(&Id(1).to_value(), 0, false), "integer");
        assert_eq!(d.sql_type(&1_i64.to_value(), 0, true), "integer");
        assert_eq!(d.sql_type(&1.8_f64.to_value(), 0, false), "real");
        assert_eq!(d.sql_type(&b"asdf".to_vec().to_value(), 0, false), "text");
        assert_eq!(d.sql_type(&"astring".to_string().to_value(), 0, false), "text");
        assert_eq!(d.sql_type(&VarChar::from("a").to_value(), 0, false), "text");
        assert_eq!(d.sql_type(&VarChar::from("b").to_value(), 128, false), "text");
        assert_eq!(d.sql_type(&NaiveDateTime::default().to_value(), 0, false), "text");
    }

    #[test]
    fn test_keywords() {
        let d = SqliteDialect::new();
        assert_eq!(d.keyword_not_null(), "NOT NULL");
        assert_eq!(d.keyword_default("'banana'"), "DEFAULT 'banana'");
        assert_eq!(d.keyword_primary_key(), "PRIMARY KEY");
        assert_eq!(d.keyword_auto_increment(), "AUTOINCREMENT");
        assert_eq!(d.returning_clause("id"), None);
    }
}
