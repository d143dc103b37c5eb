//! # hood
//!
//! A database-agnostic ORM. Structs map to tables through
//! `#[derive(Table)]`, queries are built on a [`Hood`] handle and rendered
//! for the handle's dialect, and rows are scanned back into structs by
//! column name.
//!
//! ```rust,no_run
//! use hood::{Hood, Id, Registry, Table};
//!
//! #[derive(Debug, Default, Table)]
//! struct Person {
//!     id: Id,
//!     #[hood(not_null, len(min = 1))]
//!     name: String,
//! }
//!
//! # async fn example() -> hood::Result<()> {
//! let registry = Registry::with_defaults();
//! let mut hd = Hood::open(&registry, "sqlite3", "sqlite::memory:").await?;
//! hd.create_table(&Person::schema()).await?;
//!
//! let mut person = Person { name: "Erik".into(), ..Person::default() };
//! let id = hd.save(&mut person).await?;
//! assert_eq!(person.id, id);
//!
//! let people: Vec<Person> = hd.where_clause("name = ?", &["Erik".into()]).find().await?;
//! assert_eq!(people.len(), 1);
//! # Ok(())
//! # }
//! ```

// lets the derive output refer to `::hood` from inside this crate
extern crate self as hood;

pub mod config;
mod driver;
pub mod error;
mod handle;
mod row;

pub use chrono::NaiveDateTime;
pub use hood_core::{
    dialect, model, query, registry, schema, statement, table, validation, value, Backend,
    Constraint, Dialect, Field, FromValue, HookError, Hooks, Id, Index, JoinKind, Kind, Model,
    PostgresDialect, Query, Registry, Schema, SqliteDialect, Table, Timestamp, ToValue,
    ValidationError, Value, ValueError, VarChar,
};
pub use hood_derive::Table;

pub use crate::config::{Config, Environments};
pub use crate::driver::{ExecResult, Pool};
pub use crate::error::{HoodError, Result};
pub use crate::handle::Hood;
pub use crate::row::Row;
