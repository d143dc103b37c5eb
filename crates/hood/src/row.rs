//! Result rows decoded into [`Value`]s.
//!
//! Decoding is driven by the column type the driver reports, so a row can be
//! scanned into any [`Table`] by column name without knowing its shape in
//! advance.

use chrono::{DateTime, NaiveDateTime, Utc};
use hood_core::{FromValue, Kind, Table, Value};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Decimal;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::error::{HoodError, Result};

/// One result row: column names and their decoded values, in select order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// # Panics
    ///
    /// Panics if `columns` and `values` differ in length.
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "row has {} columns but {} values",
            columns.len(),
            values.len()
        );
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of the first column named `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Reads a column as `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or cannot be converted.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .get(column)
            .ok_or_else(|| HoodError::UnknownColumn(column.to_string()))?;
        T::from_value(value).map_err(|source| HoodError::Decode {
            column: column.to_string(),
            source,
        })
    }

    /// Stores every column into the field of the same name. Columns without
    /// a matching field are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HoodError::Decode`] if a value does not fit its field.
    pub fn scan_into<T: Table>(&self, record: &mut T) -> Result<()> {
        for (column, value) in self.columns.iter().zip(&self.values) {
            record
                .assign(column, value)
                .map_err(|source| HoodError::Decode {
                    column: column.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub(crate) fn from_sqlite(row: &SqliteRow) -> Result<Self> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            let value = if raw.is_null() {
                Value::Null(sqlite_kind(column.type_info().name()))
            } else {
                // the storage class of the value, not the declared type
                let type_name = raw.type_info().name().to_string();
                match type_name.as_str() {
                    "BOOLEAN" | "INTEGER" => Value::I64(row.try_get_unchecked(index)?),
                    "REAL" | "NUMERIC" => Value::F64(row.try_get_unchecked(index)?),
                    "TEXT" | "DATE" | "TIME" | "DATETIME" => {
                        Value::Text(row.try_get_unchecked(index)?)
                    }
                    "BLOB" => Value::Bytes(row.try_get_unchecked(index)?),
                    _ => {
                        return Err(HoodError::UnsupportedType {
                            column: column.name().to_string(),
                            type_name,
                        })
                    }
                }
            };
            columns.push(column.name().to_string());
            values.push(value);
        }
        Ok(Self::new(columns, values))
    }

    pub(crate) fn from_postgres(row: &PgRow) -> Result<Self> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for column in row.columns() {
            let index = column.ordinal();
            let type_name = column.type_info().name();
            let unsupported = || HoodError::UnsupportedType {
                column: column.name().to_string(),
                type_name: type_name.to_string(),
            };
            let kind = postgres_kind(type_name).ok_or_else(unsupported)?;
            let value = if row.try_get_raw(index)?.is_null() {
                Value::Null(kind)
            } else {
                match type_name {
                    "BOOL" => Value::Bool(row.try_get(index)?),
                    "INT2" => Value::I16(row.try_get(index)?),
                    "INT4" => Value::I32(row.try_get(index)?),
                    "INT8" => Value::I64(row.try_get(index)?),
                    "FLOAT4" => Value::F32(row.try_get(index)?),
                    "FLOAT8" => Value::F64(row.try_get(index)?),
                    "BYTEA" => Value::Bytes(row.try_get(index)?),
                    "NUMERIC" => {
                        let decimal: Decimal = row.try_get(index)?;
                        Value::F64(decimal.to_string().parse().map_err(|_| unsupported())?)
                    }
                    "TIMESTAMP" => Value::Time(row.try_get::<NaiveDateTime, _>(index)?),
                    "TIMESTAMPTZ" => {
                        Value::Time(row.try_get::<DateTime<Utc>, _>(index)?.naive_utc())
                    }
                    _ => Value::Text(row.try_get(index)?),
                }
            };
            columns.push(column.name().to_string());
            values.push(value);
        }
        Ok(Self::new(columns, values))
    }
}

/// Kind of a NULL read from a column with the given declared type.
fn sqlite_kind(declared: &str) -> Kind {
    match declared {
        "BOOLEAN" => Kind::Bool,
        "INTEGER" => Kind::I64,
        "REAL" | "NUMERIC" => Kind::F64,
        "BLOB" => Kind::Bytes,
        _ => Kind::Text,
    }
}

fn postgres_kind(type_name: &str) -> Option<Kind> {
    Some(match type_name {
        "BOOL" => Kind::Bool,
        "INT2" => Kind::I16,
        "INT4" => Kind::I32,
        "INT8" => Kind::I64,
        "FLOAT4" => Kind::F32,
        "FLOAT8" | "NUMERIC" => Kind::F64,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Kind::Text,
        "BYTEA" => Kind::Bytes,
        "TIMESTAMP" | "TIMESTAMPTZ" => Kind::Time,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use hood_core::{Hooks, Model, ValueError};

    use super::*;

    #[derive(Debug, Default)]
    struct Pair {
        first: String,
        amount: i32,
    }

    impl Hooks for Pair {}

    impl Table for Pair {
        const NAME: &'static str = "pair";

        fn model(&self) -> Model {
            Model::new(Self::NAME)
        }

        fn assign(&mut self, column: &str, value: &Value) -> std::result::Result<bool, ValueError> {
            match column {
                "first" => self.first = FromValue::from_value(value)?,
                "amount" => self.amount = FromValue::from_value(value)?,
                _ => return Ok(false),
            }
            Ok(true)
        }

        fn set_primary_key(&mut self, _id: i64) -> std::result::Result<(), ValueError> {
            Ok(())
        }

        fn touch(&mut self, _now: NaiveDateTime, _inserting: bool) {}
    }

    fn row() -> Row {
        Row::new(
            vec!["first".into(), "extra".into(), "amount".into()],
            vec!["Erik".into(), Value::Null(Kind::Text), Value::I64(5)],
        )
    }

    #[test]
    fn test_get_by_name() {
        let row = row();
        assert_eq!(row.get("amount"), Some(&Value::I64(5)));
        assert!(row.get("missing").is_none());
        assert_eq!(row.try_get::<i32>("amount").unwrap(), 5);
        assert!(matches!(
            row.try_get::<i32>("missing"),
            Err(HoodError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_scan_ignores_unknown_columns() {
        let mut pair = Pair::default();
        row().scan_into(&mut pair).unwrap();
        assert_eq!(pair.first, "Erik");
        assert_eq!(pair.amount, 5);
    }

    #[test]
    fn test_scan_reports_column() {
        let row = Row::new(vec!["amount".into()], vec![Value::I64(i64::MAX)]);
        let err = row.scan_into(&mut Pair::default()).unwrap_err();
        assert!(matches!(err, HoodError::Decode { column, .. } if column == "amount"));
    }

    #[test]
    fn test_null_kinds() {
        assert_eq!(sqlite_kind("INTEGER"), Kind::I64);
        assert_eq!(sqlite_kind("NULL"), Kind::Text);
        assert_eq!(postgres_kind("TIMESTAMPTZ"), Some(Kind::Time));
        assert_eq!(postgres_kind("JSONB"), None);
    }

    #[test]
    fn test_postgres_kinds() {
        for (type_name, kind) in [
            ("BOOL", Kind::Bool),
            ("INT2", Kind::I16),
            ("INT4", Kind::I32),
            ("INT8", Kind::I64),
            ("FLOAT4", Kind::F32),
            ("FLOAT8", Kind::F64),
            ("NUMERIC", Kind::F64),
            ("VARCHAR", Kind::Text),
            ("BYTEA", Kind::Bytes),
            ("TIMESTAMP", Kind::Time),
        ] {
            assert_eq!(postgres_kind(type_name), Some(kind), "{type_name}");
        }
    }

    #[test]
    #[should_panic(expected = "row has 2 columns but 1 values")]
    fn test_new_rejects_length_mismatch() {
        let _ = Row::new(vec!["a".into(), "b".into()], vec![Value::I64(1)]);
    }
}
