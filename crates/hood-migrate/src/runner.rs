//! Applies and reverts migrations, recording progress in the database.

use std::sync::Arc;

use hood::{Dialect, Hood, Id, Schema, Table};
use tracing::{info, warn};

use crate::error::{MigrateError, Result};
use crate::migration::Migration;

/// The single bookkeeping row: the timestamp of the last applied migration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Table)]
#[hood(table = "hood_migrations")]
pub struct MigrationInfo {
    pub id: Id,
    /// Zero when nothing is applied.
    pub current: i64,
}

/// An ordered set of migrations.
#[derive(Default)]
pub struct Runner {
    migrations: Vec<Box<dyn Migration>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.migrations.iter().map(|m| (m.timestamp(), m.name())))
            .finish()
    }
}

impl Runner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a migration, keeping the set ordered by timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateTimestamp`] if a migration with the
    /// same timestamp is already registered.
    pub fn register(&mut self, migration: impl Migration + 'static) -> Result<&mut Self> {
        let stamp = migration.timestamp();
        match self
            .migrations
            .binary_search_by_key(&stamp, |m| m.timestamp())
        {
            Ok(_) => Err(MigrateError::DuplicateTimestamp(stamp)),
            Err(at) => {
                self.migrations.insert(at, Box::new(migration));
                Ok(self)
            }
        }
    }

    /// Registered migrations in timestamp order.
    pub fn migrations(&self) -> impl Iterator<Item = &dyn Migration> {
        self.migrations.iter().map(|m| &**m)
    }

    /// Migrations newer than `current`.
    pub fn pending(&self, current: i64) -> impl Iterator<Item = &dyn Migration> {
        self.migrations().filter(move |m| m.timestamp() > current)
    }

    /// Applies every migration newer than the recorded version, each in its
    /// own transaction. Returns the applied timestamps.
    ///
    /// # Errors
    ///
    /// Returns the first failing migration's error. That migration is
    /// rolled back; earlier ones stay applied.
    pub async fn migrate(&self, hood: &mut Hood) -> Result<Vec<i64>> {
        let mut info = load_info(hood).await?;
        let mut applied = Vec::new();
        for migration in self.pending(info.current) {
            let stamp = migration.timestamp();
            info!(stamp, name = migration.name(), "applying migration");
            let mut tx = hood.begin().await?;
            for operation in migration.up() {
                operation.apply(&mut tx).await?;
            }
            info.current = stamp;
            tx.save(&mut info).await?;
            tx.commit().await?;
            info!(stamp, name = migration.name(), "applied migration");
            applied.push(stamp);
        }
        if applied.is_empty() {
            info!(current = info.current, "no pending migrations");
        } else {
            info!(count = applied.len(), "applied migrations");
        }
        Ok(applied)
    }

    /// Reverts the most recently applied migration in one transaction and
    /// records the version before it. Returns the reverted timestamp, or
    /// `None` when nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::UnknownMigration`] if the recorded version is
    /// not registered, or the database error of a failing operation.
    pub async fn rollback(&self, hood: &mut Hood) -> Result<Option<i64>> {
        let mut info = load_info(hood).await?;
        if info.current == 0 {
            warn!("no migration to roll back");
            return Ok(None);
        }
        let stamp = info.current;
        let at = self
            .migrations
            .iter()
            .position(|m| m.timestamp() == stamp)
            .ok_or(MigrateError::UnknownMigration(stamp))?;
        let migration = &self.migrations[at];
        let previous = at
            .checked_sub(1)
            .map_or(0, |prev| self.migrations[prev].timestamp());

        info!(stamp, name = migration.name(), "rolling back migration");
        let mut tx = hood.begin().await?;
        for operation in migration.down() {
            operation.apply(&mut tx).await?;
        }
        info.current = previous;
        tx.save(&mut info).await?;
        tx.commit().await?;
        info!(stamp, name = migration.name(), current = previous, "rolled back migration");
        Ok(Some(stamp))
    }

    /// The timestamp of the last applied migration, 0 if none.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn status(&self, hood: &mut Hood) -> Result<i64> {
        Ok(load_info(hood).await?.current)
    }

    /// Replays every `up` operation on a dry handle and returns the schema
    /// they produce.
    ///
    /// # Errors
    ///
    /// Returns an error only if an operation fails on the dry handle.
    pub async fn schema(&self, dialect: Arc<dyn Dialect>) -> Result<Schema> {
        let mut hood = Hood::dry(dialect);
        for migration in self.migrations() {
            for operation in migration.up() {
                operation.apply(&mut hood).await?;
            }
        }
        Ok(hood.schema().clone())
    }
}

/// Creates the bookkeeping table if needed and reads its row.
async fn load_info(hood: &mut Hood) -> Result<MigrationInfo> {
    hood.create_table_if_not_exists(&MigrationInfo::schema())
        .await?;
    let rows = hood
        .order_by("id")
        .limit(1)
        .find::<MigrationInfo>()
        .await?;
    Ok(rows.into_iter().next().unwrap_or_default())
}
