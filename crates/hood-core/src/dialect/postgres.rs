//! PostgreSQL dialect.

use super::{varchar_size, Backend, Dialect};
use crate::value::{Kind, Value};

/// PostgreSQL dialect: numbered `$N` markers and `SERIAL` primary keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn marker(&self, pos: usize) -> String {
        format!("${}", pos + 1)
    }

    fn sql_type(&self, value: &Value, size: usize, auto_increment: bool) -> String {
        match value.kind() {
            Kind::Id => "bigserial".to_string(),
            Kind::VarChar => format!("varchar({})", varchar_size(size)),
            Kind::Time => "timestamp".to_string(),
            Kind::Bool => "boolean".to_string(),
            Kind::I8 | Kind::I16 | Kind::I32 | Kind::U8 | Kind::U16 | Kind::U32 => {
                if auto_increment {
                    "serial".to_string()
                } else {
                    "integer".to_string()
                }
            }
            Kind::I64 | Kind::U64 => {
                if auto_increment {
                    "bigserial".to_string()
                } else {
                    "bigint".to_string()
                }
            }
            Kind::F32 | Kind::F64 => "double precision".to_string(),
            Kind::Bytes => "bytea".to_string(),
            Kind::Text => "text".to_string(),
        }
    }

    // postgres has no auto increment keyword, it uses the SERIAL types
    fn keyword_auto_increment(&self) -> &'static str {
        ""
    }

    fn returning_clause(&self, pk: &str) -> Option<String> {
        Some(format!("RETURNING {}", self.quote(pk)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::value::{Id, ToValue, VarChar};

    #[test]
    fn test_markers_are_numbered() {
        let d = PostgresDialect::new();
        let mut pos = 0;
        assert_eq!(d.next_marker(&mut pos), "$1");
        assert_eq!(d.next_marker(&mut pos), "$2");
        assert_eq!(pos, 2);
        assert_eq!(d.marker(9), "$10");
    }

    #[test]
    fn test_sql_types() {
        let d = PostgresDialect::new();
        assert_eq!(d.sql_type(&true.to_value(), 0, false), "boolean");
        assert_eq!(d.sql_type(&2_u32.to_value(), 0, false), "integer");
        assert_eq!(d.sql_type(&2_i8.to_value(), 0, false), "integer");
        assert_eq!(d.sql_type(&Id(1).to_value(), 0, false), "bigserial");
        assert_eq!(d.sql_type(&1_i64.to_value(), 0, false), "bigint");
        assert_eq!(d.sql_type(&1_u64.to_value(), 0, false), "bigint");
        assert_eq!(d.sql_type(&1.8_f64.to_value(), 0, false), "double precision");
        assert_eq!(d.sql_type(&1.8_f32.to_value(), 0, false), "double precision");
        assert_eq!(d.sql_type(&b"asdf".to_vec().to_value(), 0, false), "bytea");
        assert_eq!(d.sql_type(&"astring".to_string().to_value(), 0, false), "text");
        assert_eq!(d.sql_type(&VarChar::from("a").to_value(), 0, false), "varchar(255)");
        assert_eq!(d.sql_type(&VarChar::from("b").to_value(), 128, false), "varchar(128)");
        assert_eq!(d.sql_type(&NaiveDateTime::default().to_value(), 0, false), "timestamp");
    }

    #[test]
    fn test_auto_increment_uses_serial_types() {
        let d = PostgresDialect::new();
        assert_eq!(d.sql_type(&1_i32.to_value(), 0, true), "serial");
        assert_eq!(d.sql_type(&1_i64.to_value(), 0, true), "bigserial");
        assert_eq!(d.keyword_auto_increment(), "");
    }

    #[test]
    fn test_null_keeps_its_column_type() {
        let d = PostgresDialect::new();
        assert_eq!(d.sql_type(&None::<i64>.to_value(), 0, false), "bigint");
    }

    #[test]
    fn test_quote_and_returning() {
        let d = PostgresDialect::new();
        assert_eq!(d.quote("users"), "\"users\"");
        assert_eq!(d.quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(d.returning_clause("id").as_deref(), Some("RETURNING \"id\""));
    }
}
