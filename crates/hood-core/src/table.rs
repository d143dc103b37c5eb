//! Traits implemented by structs that map to a table.
//!
//! `#[derive(Table)]` implements [`Table`] and, unless the struct opts into
//! `#[hood(hooks)]`, an empty [`Hooks`].

use chrono::NaiveDateTime;

use crate::model::Model;
use crate::validation::ValidationError;
use crate::value::{Value, ValueError};

/// Error type returned by lifecycle hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle callbacks run around save and delete.
///
/// Every method defaults to a no-op.
pub trait Hooks {
    /// Custom validation, run after the field constraints.
    ///
    /// # Errors
    ///
    /// Returns the validation failure that aborts the save.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// # Errors
    ///
    /// An error aborts the save.
    fn before_save(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// # Errors
    ///
    /// The error is returned from the save.
    fn after_save(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// # Errors
    ///
    /// An error aborts the insert.
    fn before_insert(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// # Errors
    ///
    /// The error is returned from the save.
    fn after_insert(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// # Errors
    ///
    /// An error aborts the update.
    fn before_update(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// # Errors
    ///
    /// The error is returned from the save.
    fn after_update(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// # Errors
    ///
    /// An error aborts the delete.
    fn before_delete(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// # Errors
    ///
    /// The error is returned from the delete.
    fn after_delete(&mut self) -> Result<(), HookError> {
        Ok(())
    }
}

/// A struct that maps to one table.
pub trait Table: Hooks {
    /// The table name.
    const NAME: &'static str;

    /// Describes the table with the struct's current values.
    fn model(&self) -> Model;

    /// Stores a column read from a row into the matching field.
    ///
    /// Returns `Ok(false)` when no field maps to `column`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to the field type.
    fn assign(&mut self, column: &str, value: &Value) -> Result<bool, ValueError>;

    /// Writes a generated primary key back into the struct.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not fit the primary key field.
    fn set_primary_key(&mut self, id: i64) -> Result<(), ValueError>;

    /// Sets the `created` fields (on insert) and the `updated` fields.
    fn touch(&mut self, now: NaiveDateTime, inserting: bool);

    /// Describes the table using default values, for DDL.
    fn schema() -> Model
    where
        Self: Default,
    {
        Self::default().model()
    }
}
