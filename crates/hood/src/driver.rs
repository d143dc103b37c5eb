//! Connections, transactions and argument binding for the supported
//! backends.

use std::str::FromStr;

use chrono::NaiveDateTime;
use hood_core::{Backend, Kind, Value};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, Postgres};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;
use tracing::debug;

use crate::error::Result;
use crate::row::Row;

/// A connection pool for one of the supported backends.
#[derive(Debug, Clone)]
pub enum Pool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl Pool {
    /// Opens a pool for `backend` on the given data source.
    ///
    /// SQLite sources may be a plain file path, which is created if missing.
    /// An in-memory SQLite database is private to its connection, so such a
    /// pool is limited to a single connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is invalid or unreachable.
    pub async fn connect(backend: Backend, source: &str) -> Result<Self> {
        Ok(match backend {
            Backend::Sqlite => {
                let options = SqliteConnectOptions::from_str(source)?.create_if_missing(true);
                let mut pool = SqlitePoolOptions::new();
                if source.contains(":memory:") {
                    pool = pool.max_connections(1);
                }
                Self::Sqlite(pool.connect_with(options).await?)
            }
            Backend::Postgres => Self::Postgres(PgPoolOptions::new().connect(source).await?),
        })
    }

    #[must_use]
    pub const fn backend(&self) -> Backend {
        match self {
            Self::Sqlite(_) => Backend::Sqlite,
            Self::Postgres(_) => Backend::Postgres,
        }
    }

    /// Closes every connection of the pool.
    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }

    pub(crate) async fn begin(&self) -> Result<Tx> {
        Ok(match self {
            Self::Sqlite(pool) => Tx::Sqlite(pool.begin().await?),
            Self::Postgres(pool) => Tx::Postgres(pool.begin().await?),
        })
    }
}

impl From<SqlitePool> for Pool {
    fn from(pool: SqlitePool) -> Self {
        Self::Sqlite(pool)
    }
}

impl From<PgPool> for Pool {
    fn from(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }
}

/// An open transaction. Dropping it without commit rolls it back.
pub(crate) enum Tx {
    Sqlite(Transaction<'static, Sqlite>),
    Postgres(Transaction<'static, Postgres>),
}

impl Tx {
    pub(crate) async fn commit(self) -> Result<()> {
        match self {
            Self::Sqlite(tx) => tx.commit().await?,
            Self::Postgres(tx) => tx.commit().await?,
        }
        Ok(())
    }

    pub(crate) async fn rollback(self) -> Result<()> {
        match self {
            Self::Sqlite(tx) => tx.rollback().await?,
            Self::Postgres(tx) => tx.rollback().await?,
        }
        Ok(())
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Row id of the last insert, where the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// Where a statement runs: the pool or an open transaction.
pub(crate) enum Target<'a> {
    Pool(&'a Pool),
    Tx(&'a mut Tx),
}

impl Target<'_> {
    pub(crate) async fn execute(self, sql: &str, args: Vec<Value>) -> Result<ExecResult> {
        debug!(sql, ?args, "execute");
        Ok(match self {
            Self::Pool(Pool::Sqlite(pool)) => {
                sqlite_result(&bind_sqlite(sql, args).execute(pool).await?)
            }
            Self::Tx(Tx::Sqlite(tx)) => {
                sqlite_result(&bind_sqlite(sql, args).execute(&mut **tx).await?)
            }
            Self::Pool(Pool::Postgres(pool)) => {
                postgres_result(&bind_postgres(sql, args).execute(pool).await?)
            }
            Self::Tx(Tx::Postgres(tx)) => {
                postgres_result(&bind_postgres(sql, args).execute(&mut **tx).await?)
            }
        })
    }

    pub(crate) async fn fetch_all(self, sql: &str, args: Vec<Value>) -> Result<Vec<Row>> {
        debug!(sql, ?args, "fetch");
        match self {
            Self::Pool(Pool::Sqlite(pool)) => {
                let rows = bind_sqlite(sql, args).fetch_all(pool).await?;
                rows.iter().map(Row::from_sqlite).collect()
            }
            Self::Tx(Tx::Sqlite(tx)) => {
                let rows = bind_sqlite(sql, args).fetch_all(&mut **tx).await?;
                rows.iter().map(Row::from_sqlite).collect()
            }
            Self::Pool(Pool::Postgres(pool)) => {
                let rows = bind_postgres(sql, args).fetch_all(pool).await?;
                rows.iter().map(Row::from_postgres).collect()
            }
            Self::Tx(Tx::Postgres(tx)) => {
                let rows = bind_postgres(sql, args).fetch_all(&mut **tx).await?;
                rows.iter().map(Row::from_postgres).collect()
            }
        }
    }

    pub(crate) async fn fetch_optional(self, sql: &str, args: Vec<Value>) -> Result<Option<Row>> {
        debug!(sql, ?args, "fetch one");
        match self {
            Self::Pool(Pool::Sqlite(pool)) => bind_sqlite(sql, args)
                .fetch_optional(pool)
                .await?
                .as_ref()
                .map(Row::from_sqlite)
                .transpose(),
            Self::Tx(Tx::Sqlite(tx)) => bind_sqlite(sql, args)
                .fetch_optional(&mut **tx)
                .await?
                .as_ref()
                .map(Row::from_sqlite)
                .transpose(),
            Self::Pool(Pool::Postgres(pool)) => bind_postgres(sql, args)
                .fetch_optional(pool)
                .await?
                .as_ref()
                .map(Row::from_postgres)
                .transpose(),
            Self::Tx(Tx::Postgres(tx)) => bind_postgres(sql, args)
                .fetch_optional(&mut **tx)
                .await?
                .as_ref()
                .map(Row::from_postgres)
                .transpose(),
        }
    }
}

fn sqlite_result(result: &sqlx::sqlite::SqliteQueryResult) -> ExecResult {
    ExecResult {
        rows_affected: result.rows_affected(),
        last_insert_id: Some(result.last_insert_rowid()),
    }
}

fn postgres_result(result: &sqlx::postgres::PgQueryResult) -> ExecResult {
    ExecResult {
        rows_affected: result.rows_affected(),
        last_insert_id: None,
    }
}

/// Reinterprets the bits of a `u64`; the driver only stores signed 64-bit
/// integers.
const fn u64_bits(v: u64) -> i64 {
    i64::from_ne_bytes(v.to_ne_bytes())
}

/// SQLite stores every integer as a 64-bit signed value.
fn bind_sqlite(sql: &str, args: Vec<Value>) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    args.into_iter().fold(sqlx::query(sql), |query, value| match value {
        Value::Bool(v) => query.bind(v),
        Value::I8(v) => query.bind(i64::from(v)),
        Value::I16(v) => query.bind(i64::from(v)),
        Value::I32(v) => query.bind(i64::from(v)),
        Value::I64(v) | Value::Id(v) => query.bind(v),
        Value::U8(v) => query.bind(i64::from(v)),
        Value::U16(v) => query.bind(i64::from(v)),
        Value::U32(v) => query.bind(i64::from(v)),
        Value::U64(v) => query.bind(u64_bits(v)),
        Value::F32(v) => query.bind(f64::from(v)),
        Value::F64(v) => query.bind(v),
        Value::Text(v) | Value::VarChar(v) => query.bind(v),
        Value::Bytes(v) => query.bind(v),
        Value::Time(v) => query.bind(v),
        Value::Null(kind) => match kind {
            Kind::F32 | Kind::F64 => query.bind(None::<f64>),
            Kind::Text | Kind::VarChar => query.bind(None::<String>),
            Kind::Bytes => query.bind(None::<Vec<u8>>),
            Kind::Time => query.bind(None::<NaiveDateTime>),
            _ => query.bind(None::<i64>),
        },
    })
}

/// Postgres has no unsigned integers; each unsigned kind widens to the next
/// signed type that holds it, except `u64` which keeps its bit pattern.
fn bind_postgres(sql: &str, args: Vec<Value>) -> Query<'_, Postgres, PgArguments> {
    args.into_iter().fold(sqlx::query(sql), |query, value| match value {
        Value::Bool(v) => query.bind(v),
        Value::I8(v) => query.bind(i16::from(v)),
        Value::I16(v) => query.bind(v),
        Value::I32(v) => query.bind(v),
        Value::I64(v) | Value::Id(v) => query.bind(v),
        Value::U8(v) => query.bind(i16::from(v)),
        Value::U16(v) => query.bind(i32::from(v)),
        Value::U32(v) => query.bind(i64::from(v)),
        Value::U64(v) => query.bind(u64_bits(v)),
        Value::F32(v) => query.bind(f64::from(v)),
        Value::F64(v) => query.bind(v),
        Value::Text(v) | Value::VarChar(v) => query.bind(v),
        Value::Bytes(v) => query.bind(v),
        Value::Time(v) => query.bind(v),
        Value::Null(kind) => match kind {
            Kind::Bool => query.bind(None::<bool>),
            Kind::I8 | Kind::I16 | Kind::U8 => query.bind(None::<i16>),
            Kind::I32 | Kind::U16 => query.bind(None::<i32>),
            Kind::I64 | Kind::U32 | Kind::U64 | Kind::Id => query.bind(None::<i64>),
            Kind::F32 | Kind::F64 => query.bind(None::<f64>),
            Kind::Text | Kind::VarChar => query.bind(None::<String>),
            Kind::Bytes => query.bind(None::<Vec<u8>>),
            Kind::Time => query.bind(None::<NaiveDateTime>),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_bits() {
        assert_eq!(u64_bits(u64::MAX), -1);
        assert_eq!(u64_bits(7), 7);
    }

    #[tokio::test]
    async fn test_memory_pool_is_sqlite() {
        let pool = Pool::connect(Backend::Sqlite, "sqlite::memory:").await.unwrap();
        assert_eq!(pool.backend(), Backend::Sqlite);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_last_insert_id() {
        let pool = Pool::connect(Backend::Sqlite, "sqlite::memory:").await.unwrap();
        Target::Pool(&pool)
            .execute("CREATE TABLE t (id integer PRIMARY KEY AUTOINCREMENT, n integer)", vec![])
            .await
            .unwrap();
        let result = Target::Pool(&pool)
            .execute("INSERT INTO t (n) VALUES (?)", vec![Value::U64(u64::MAX)])
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));
        let row = Target::Pool(&pool)
            .fetch_optional("SELECT n FROM t", vec![])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.try_get::<u64>("n").unwrap(), u64::MAX);
    }
}
