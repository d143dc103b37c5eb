//! The execution facade.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use hood_core::statement;
use hood_core::{
    Dialect, FromValue, Hooks, Id, Index, JoinKind, Kind, Model, Query, Registry, Schema, Table,
    ValidationError, Value, ValueError,
};
use tracing::{debug, info, trace};

use crate::config::{Config, Environments};
use crate::driver::{ExecResult, Pool, Target, Tx};
use crate::error::{HoodError, Result};
use crate::row::Row;

/// A database handle: a dialect, a connection pool or an open transaction,
/// the query being built and the schema changes made so far.
///
/// Query building methods accumulate state on the handle. [`Hood::find`]
/// renders and resets it. A handle without a pool is a dry run: DDL only
/// updates the tracked [`Schema`] and no statement reaches a database.
pub struct Hood {
    dialect: Arc<dyn Dialect>,
    pool: Option<Pool>,
    tx: Option<Tx>,
    query: Query,
    schema: Schema,
}

impl fmt::Debug for Hood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hood")
            .field("dialect", &self.dialect.name())
            .field("pool", &self.pool)
            .field("transaction", &self.tx.is_some())
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl Hood {
    /// Creates a handle on an existing pool.
    pub fn new(pool: impl Into<Pool>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            pool: Some(pool.into()),
            tx: None,
            query: Query::new(),
            schema: Schema::new(),
        }
    }

    /// Creates a handle that tracks schema changes without a database.
    #[must_use]
    pub fn dry(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            pool: None,
            tx: None,
            query: Query::new(),
            schema: Schema::new(),
        }
    }

    /// Opens a pool for the dialect registered as `driver`.
    ///
    /// # Errors
    ///
    /// Returns [`HoodError::UnknownDialect`] if nothing is registered under
    /// `driver`, or the connection error.
    pub async fn open(registry: &Registry, driver: &str, source: &str) -> Result<Self> {
        let dialect = registry
            .get(driver)
            .ok_or_else(|| HoodError::UnknownDialect(driver.to_string()))?;
        let pool = Pool::connect(dialect.backend(), source).await?;
        info!(driver, "opened database");
        Ok(Self::new(pool, dialect))
    }

    /// Opens the database configured for `env` in a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be read, has no such
    /// environment, or the connection fails.
    pub async fn load(registry: &Registry, path: impl AsRef<Path>, env: &str) -> Result<Self> {
        let envs = Environments::load(path)?;
        let Config { driver, source } = envs.get(env)?;
        Self::open(registry, driver, source).await
    }

    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        self.tx.is_some()
    }

    #[must_use]
    pub const fn is_dry(&self) -> bool {
        self.pool.is_none()
    }

    /// The schema built up by the DDL run through this handle.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The tracked schema as `#[derive(Table)]` struct declarations.
    #[must_use]
    pub fn schema_definition(&self) -> String {
        self.schema.declaration()
    }

    /// Closes the underlying pool.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }

    fn target(&mut self) -> Option<Target<'_>> {
        match (&mut self.tx, &self.pool) {
            (Some(tx), _) => Some(Target::Tx(tx)),
            (None, Some(pool)) => Some(Target::Pool(pool)),
            (None, None) => None,
        }
    }

    // ==================== Transactions ====================

    /// Starts a transaction and returns a handle bound to it.
    ///
    /// The new handle copies this handle's query state and schema. A dry
    /// handle yields another dry handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn begin(&self) -> Result<Self> {
        let tx = match &self.pool {
            Some(pool) => Some(pool.begin().await?),
            None => None,
        };
        debug!("begin transaction");
        Ok(Self {
            dialect: Arc::clone(&self.dialect),
            pool: self.pool.clone(),
            tx,
            query: self.query.clone(),
            schema: self.schema.clone(),
        })
    }

    /// Commits the transaction. Does nothing on a handle without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<()> {
        match self.tx {
            Some(tx) => {
                tx.commit().await?;
                debug!("commit");
            }
            None => trace!("commit outside of a transaction"),
        }
        Ok(())
    }

    /// Rolls the transaction back. Does nothing on a handle without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<()> {
        match self.tx {
            Some(tx) => {
                tx.rollback().await?;
                debug!("rollback");
            }
            None => trace!("rollback outside of a transaction"),
        }
        Ok(())
    }

    // ==================== Query building ====================

    pub fn select(&mut self, table: &str, columns: &[&str]) -> &mut Self {
        self.query.select(table, columns);
        self
    }

    /// Selects all columns of `T`'s table.
    pub fn select_from<T: Table>(&mut self) -> &mut Self {
        self.query.select(T::NAME, &[]);
        self
    }

    /// Adds a predicate using `?` placeholders.
    pub fn where_clause(&mut self, predicate: &str, args: &[Value]) -> &mut Self {
        self.query.where_clause(predicate, args);
        self
    }

    pub fn join(
        &mut self,
        kind: JoinKind,
        table: &str,
        anchor_column: &str,
        joined_column: &str,
    ) -> &mut Self {
        self.query.join(kind, table, anchor_column, joined_column);
        self
    }

    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.query.group_by(column);
        self
    }

    pub fn having(&mut self, condition: &str, args: &[Value]) -> &mut Self {
        self.query.having(condition, args);
        self
    }

    pub fn order_by(&mut self, column: &str) -> &mut Self {
        self.query.order_by(column);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.query.limit(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.query.offset(offset);
        self
    }

    /// Discards the query being built.
    pub fn reset(&mut self) {
        self.query.reset();
    }

    // ==================== Reading ====================

    /// Runs the accumulated query and scans every row into a `T`.
    ///
    /// Without a selected table, `T`'s table is used. Columns without a
    /// matching field are ignored and fields without a column keep their
    /// default. The query state is reset whether or not this succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a value does not fit its field.
    pub async fn find<T: Table + Default>(&mut self) -> Result<Vec<T>> {
        if self.query.table().is_empty() {
            self.query.select(T::NAME, &[]);
        }
        let (sql, args) = self.query.render(&*self.dialect);
        let Some(target) = self.target() else {
            debug!(%sql, ?args, "dry run");
            return Ok(Vec::new());
        };
        let rows = target.fetch_all(&sql, args).await?;
        rows.iter()
            .map(|row| {
                let mut record = T::default();
                row.scan_into(&mut record)?;
                Ok(record)
            })
            .collect()
    }

    /// Runs a raw statement. `?` placeholders are rewritten for the dialect.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn exec(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let sql = self.query.substitute_markers(sql, &*self.dialect);
        self.query.reset();
        self.execute(&sql, args.to_vec()).await
    }

    /// Runs a raw query and returns its first row, if any.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn query_row(&mut self, sql: &str, args: &[Value]) -> Result<Option<Row>> {
        let sql = self.query.substitute_markers(sql, &*self.dialect);
        self.query.reset();
        let Some(target) = self.target() else {
            debug!(%sql, ?args, "dry run");
            return Ok(None);
        };
        target.fetch_optional(&sql, args.to_vec()).await
    }

    /// Runs the accumulated query and returns the rows untyped.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    ///
    /// # Panics
    ///
    /// Panics if no table was selected.
    pub async fn find_rows(&mut self) -> Result<Vec<Row>> {
        let (sql, args) = self.query.render(&*self.dialect);
        let Some(target) = self.target() else {
            debug!(%sql, ?args, "dry run");
            return Ok(Vec::new());
        };
        target.fetch_all(&sql, args).await
    }

    async fn execute(&mut self, sql: &str, args: Vec<Value>) -> Result<ExecResult> {
        match self.target() {
            Some(target) => target.execute(sql, args).await,
            None => {
                debug!(%sql, ?args, "dry run");
                Ok(ExecResult::default())
            }
        }
    }

    // ==================== Writing ====================

    /// Checks the field constraints of `record`, then its own
    /// [`Hooks::validate`].
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub fn validate<T: Table>(&self, record: &T) -> std::result::Result<(), ValidationError> {
        record.model().validate()?;
        Hooks::validate(record)
    }

    /// Inserts `record` if its primary key is zero, otherwise updates it.
    ///
    /// Timestamps are set before the write and a generated key is written
    /// back into the record. Returns the record's key.
    ///
    /// # Errors
    ///
    /// Returns validation, hook and database errors. Nothing is written if
    /// validation or a `before_*` hook fails, or if a new record's primary
    /// key cannot hold the generated key.
    ///
    /// # Panics
    ///
    /// Panics if the table has no primary key.
    pub async fn save<T: Table>(&mut self, record: &mut T) -> Result<Id> {
        self.validate(record)?;
        record.before_save().map_err(HoodError::Hook)?;

        let now = Utc::now().naive_utc();
        let model = record.model();
        let pk = model
            .primary_key()
            .unwrap_or_else(|| panic!("save on table {} requires a primary key", model.table));

        let id = if pk.is_zero() {
            let kind = pk.value.kind();
            if !kind.is_integer() {
                return Err(ValueError::Mismatch {
                    expected: Kind::Id,
                    found: kind,
                }
                .into());
            }
            record.before_insert().map_err(HoodError::Hook)?;
            record.touch(now, true);
            let id = self.insert_record(record).await?;
            record.after_insert().map_err(HoodError::Hook)?;
            id
        } else {
            let id = pk.value.as_i64().unwrap_or_default();
            record.before_update().map_err(HoodError::Hook)?;
            record.touch(now, false);
            let (sql, args) = statement::update_sql(&*self.dialect, &record.model());
            self.execute(&sql, args).await?;
            record.after_update().map_err(HoodError::Hook)?;
            id
        };

        record.after_save().map_err(HoodError::Hook)?;
        Ok(Id(id))
    }

    /// Inserts `record` and writes the generated key back into it.
    ///
    /// Outside of a transaction both steps run in one, so a key that does
    /// not fit the primary key field leaves no row behind.
    async fn insert_record<T: Table>(&mut self, record: &mut T) -> Result<i64> {
        if self.tx.is_some() || self.pool.is_none() {
            let id = self.insert(&record.model()).await?;
            record.set_primary_key(id)?;
            return Ok(id);
        }
        let mut tx = self.begin().await?;
        let id = tx.insert(&record.model()).await?;
        if let Err(err) = record.set_primary_key(id) {
            tx.rollback().await?;
            return Err(err.into());
        }
        tx.commit().await?;
        Ok(id)
    }

    /// Inserts a row and returns the generated key.
    async fn insert(&mut self, model: &Model) -> Result<i64> {
        let (sql, args) = statement::insert_sql(&*self.dialect, model);
        let returns_key = model
            .primary_key()
            .and_then(|pk| self.dialect.returning_clause(&pk.name))
            .is_some();
        if !returns_key {
            let result = self.execute(&sql, args).await?;
            return Ok(result.last_insert_id.unwrap_or_default());
        }
        let Some(target) = self.target() else {
            debug!(%sql, ?args, "dry run");
            return Ok(0);
        };
        let row = target.fetch_optional(&sql, args).await?;
        match row.as_ref().and_then(|row| row.values().first()) {
            Some(value) => Ok(i64::from_value(value)?),
            None => Ok(0),
        }
    }

    /// Saves each record in order and stops at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error; earlier records stay saved.
    pub async fn save_all<T: Table>(&mut self, records: &mut [T]) -> Result<Vec<Id>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.save(record).await?);
        }
        Ok(ids)
    }

    /// Deletes the row of `record` by primary key and returns the key.
    ///
    /// # Errors
    ///
    /// Returns hook and database errors.
    ///
    /// # Panics
    ///
    /// Panics if the table has no primary key.
    pub async fn delete<T: Table>(&mut self, record: &mut T) -> Result<Id> {
        record.before_delete().map_err(HoodError::Hook)?;
        let model = record.model();
        let (sql, args) = statement::delete_sql(&*self.dialect, &model);
        let id = model
            .primary_key()
            .and_then(|pk| pk.value.as_i64())
            .unwrap_or_default();
        self.execute(&sql, args).await?;
        record.after_delete().map_err(HoodError::Hook)?;
        Ok(Id(id))
    }

    /// Deletes each record in order and stops at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error; earlier records stay deleted.
    pub async fn delete_all<T: Table>(&mut self, records: &mut [T]) -> Result<Vec<Id>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.delete(record).await?);
        }
        Ok(ids)
    }

    // ==================== Schema changes ====================

    /// Runs DDL statements in one transaction, the current one if the handle
    /// has one.
    async fn run_ddl(&mut self, statements: &[String]) -> Result<()> {
        if self.tx.is_some() {
            for sql in statements {
                self.execute(sql, Vec::new()).await?;
            }
            return Ok(());
        }
        let Some(pool) = &self.pool else {
            for sql in statements {
                debug!(%sql, "dry run");
            }
            return Ok(());
        };
        let mut tx = pool.begin().await?;
        for sql in statements {
            Target::Tx(&mut tx).execute(sql, Vec::new()).await?;
        }
        tx.commit().await
    }

    async fn create_table_with(&mut self, model: &Model, if_not_exists: bool) -> Result<()> {
        info!(table = %model.table, "create table");
        let mut statements = vec![statement::create_table_sql(
            &*self.dialect,
            model,
            if_not_exists,
        )];
        statements.extend(
            model
                .indexes
                .iter()
                .map(|index| {
                    statement::create_index_sql(&*self.dialect, &model.table, index, if_not_exists)
                }),
        );
        self.run_ddl(&statements).await?;
        self.schema.create_table(model.clone());
        Ok(())
    }

    /// Creates a table and its indexes.
    ///
    /// # Errors
    ///
    /// Returns the database error; nothing is created on failure.
    pub async fn create_table(&mut self, model: &Model) -> Result<()> {
        self.create_table_with(model, false).await
    }

    /// Creates a table and its indexes unless the table exists.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn create_table_if_not_exists(&mut self, model: &Model) -> Result<()> {
        self.create_table_with(model, true).await
    }

    /// # Errors
    ///
    /// Returns the database error.
    pub async fn drop_table(&mut self, table: &str) -> Result<()> {
        info!(table, "drop table");
        self.run_ddl(&[statement::drop_table_sql(&*self.dialect, table, false)])
            .await?;
        self.schema.drop_table(table);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the database error.
    pub async fn drop_table_if_exists(&mut self, table: &str) -> Result<()> {
        info!(table, "drop table if exists");
        self.run_ddl(&[statement::drop_table_sql(&*self.dialect, table, true)])
            .await?;
        self.schema.drop_table(table);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the database error.
    pub async fn rename_table(&mut self, from: &str, to: &str) -> Result<()> {
        info!(from, to, "rename table");
        self.run_ddl(&[statement::rename_table_sql(&*self.dialect, from, to)])
            .await?;
        self.schema.rename_table(from, to);
        Ok(())
    }

    /// Adds the fields of `columns` to `table`.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    ///
    /// # Panics
    ///
    /// Panics if `columns` declares a primary key.
    pub async fn add_columns(&mut self, table: &str, columns: &Model) -> Result<()> {
        assert!(
            columns.primary_key().is_none(),
            "add_columns on table {table} cannot add a primary key"
        );
        info!(table, "add columns");
        let statements: Vec<String> = columns
            .fields
            .iter()
            .map(|field| statement::add_column_sql(&*self.dialect, table, field))
            .collect();
        self.run_ddl(&statements).await?;
        self.schema.add_columns(table, &columns.fields);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the database error.
    pub async fn rename_column(&mut self, table: &str, from: &str, to: &str) -> Result<()> {
        info!(table, from, to, "rename column");
        self.run_ddl(&[statement::rename_column_sql(&*self.dialect, table, from, to)])
            .await?;
        self.schema.rename_column(table, from, to);
        Ok(())
    }

    /// Changes the type of every column of `columns` in `table`.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn change_columns(&mut self, table: &str, columns: &Model) -> Result<()> {
        info!(table, "change columns");
        let statements: Vec<String> = columns
            .fields
            .iter()
            .map(|field| statement::change_column_sql(&*self.dialect, table, field))
            .collect();
        self.run_ddl(&statements).await?;
        self.schema.change_columns(table, &columns.fields);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the database error.
    pub async fn remove_columns(&mut self, table: &str, columns: &[&str]) -> Result<()> {
        info!(table, ?columns, "remove columns");
        let statements: Vec<String> = columns
            .iter()
            .map(|column| statement::drop_column_sql(&*self.dialect, table, column))
            .collect();
        self.run_ddl(&statements).await?;
        self.schema.remove_columns(table, columns);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the database error.
    pub async fn create_index(&mut self, table: &str, index: &Index) -> Result<()> {
        info!(table, index = %index.name, "create index");
        self.run_ddl(&[statement::create_index_sql(&*self.dialect, table, index, false)])
            .await?;
        self.schema.add_index(table, index.clone());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the database error.
    pub async fn drop_index(&mut self, table: &str, name: &str) -> Result<()> {
        info!(table, index = name, "drop index");
        self.run_ddl(&[statement::drop_index_sql(&*self.dialect, name)])
            .await?;
        self.schema.drop_index(table, name);
        Ok(())
    }
}
