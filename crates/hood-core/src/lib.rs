//! # hood-core
//!
//! Dialect-aware SQL generation for the hood ORM.
//!
//! This crate holds everything that does not touch a database:
//! - [`Dialect`] implementations for PostgreSQL and SQLite
//! - the [`Model`] description of a table and the [`Value`]s it carries
//! - the [`Query`] accumulator for SELECT statements
//! - DDL and DML generation in [`statement`]
//! - field [`Constraint`]s and their [`ValidationError`] codes
//! - [`Schema`] tracking for migrations
//!
//! ```rust
//! use hood_core::{Field, Id, Model, PostgresDialect};
//! use hood_core::statement::insert_sql;
//!
//! let model = Model::new("sample_model")
//!     .field(Field::new("id", Id(0)))
//!     .field(Field::new("first", "Erik"))
//!     .field(Field::new("last", "Aigner"))
//!     .field(Field::new("amount", 5_i32));
//!
//! let (sql, args) = insert_sql(&PostgresDialect::new(), &model);
//! assert_eq!(
//!     sql,
//!     r#"INSERT INTO "sample_model" ("first", "last", "amount") VALUES ($1, $2, $3) RETURNING "id""#
//! );
//! assert_eq!(args.len(), 3);
//! ```

pub mod dialect;
pub mod model;
pub mod query;
pub mod registry;
pub mod schema;
pub mod statement;
pub mod table;
pub mod validation;
pub mod value;

pub use dialect::{Backend, Dialect, PostgresDialect, SqliteDialect};
pub use model::{Field, Index, Model, Timestamp};
pub use query::{JoinKind, Query};
pub use registry::Registry;
pub use schema::Schema;
pub use table::{HookError, Hooks, Table};
pub use validation::{Constraint, ValidationError};
pub use value::{FromValue, Id, Kind, ToValue, Value, ValueError, VarChar};
