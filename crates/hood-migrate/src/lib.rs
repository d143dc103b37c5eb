//! Timestamped schema migrations for hood.
//!
//! A migration is a type implementing [`Migration`]: a timestamp, a name and
//! the [`Operation`]s that apply and revert it. A [`Runner`] applies pending
//! migrations in timestamp order, each in its own transaction, and records
//! the last applied timestamp in the single-row `hood_migrations` table.
//!
//! # Example
//!
//! ```rust
//! use hood::{Field, Id, Model};
//! use hood_migrate::{Migration, Operation, Runner};
//!
//! struct CreateUsers;
//!
//! impl Migration for CreateUsers {
//!     fn timestamp(&self) -> i64 {
//!         1_700_000_000
//!     }
//!
//!     fn name(&self) -> &str {
//!         "create_users"
//!     }
//!
//!     fn up(&self) -> Vec<Operation> {
//!         vec![Operation::create_table(
//!             Model::new("users")
//!                 .field(Field::new("id", Id(0)))
//!                 .field(Field::new("name", "")),
//!         )]
//!     }
//!
//!     fn down(&self) -> Vec<Operation> {
//!         vec![Operation::drop_table("users")]
//!     }
//! }
//!
//! let mut runner = Runner::new();
//! runner.register(CreateUsers).unwrap();
//! assert_eq!(runner.pending(0).count(), 1);
//! ```
//!
//! # Project layout
//!
//! `hood create:migration <name>` writes `db/migrations/<timestamp>_<name>.rs`,
//! regenerates `db/migrations/mod.rs` with a `runner()` registering every
//! migration, and creates a runner binary at `src/bin/migrate.rs` that
//! hands the runner to [`cli::run`]. `hood db:migrate` and `hood db:rollback`
//! run that binary with `cargo run`.

pub mod cli;
pub mod error;
pub mod migration;
pub mod runner;
pub mod scaffold;

pub use error::{MigrateError, Result};
pub use migration::{Migration, Operation};
pub use runner::{MigrationInfo, Runner};
