//! Migrations and the schema operations they are made of.

use hood::{Hood, Index, Model, Value};
use tracing::debug;

/// A versioned schema change.
///
/// Migrations are ordered by [`timestamp`](Migration::timestamp), which must
/// be unique within a [`Runner`](crate::Runner).
pub trait Migration: Send + Sync {
    /// Version of the migration, usually seconds since the epoch at creation.
    fn timestamp(&self) -> i64;

    /// Human-readable name, e.g. `create_users`.
    fn name(&self) -> &str;

    /// Operations that apply the change.
    fn up(&self) -> Vec<Operation>;

    /// Operations that revert [`up`](Migration::up). Empty by default.
    fn down(&self) -> Vec<Operation> {
        Vec::new()
    }
}

/// A single schema operation, applied through the [`Hood`] DDL methods.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a table and its indexes.
    CreateTable {
        model: Model,
        /// Whether to use IF NOT EXISTS.
        if_not_exists: bool,
    },

    /// Drop a table.
    DropTable {
        table: String,
        /// Whether to use IF EXISTS.
        if_exists: bool,
    },

    RenameTable {
        from: String,
        to: String,
    },

    /// Add the fields of `columns` to a table.
    AddColumns {
        table: String,
        columns: Model,
    },

    RenameColumn {
        table: String,
        from: String,
        to: String,
    },

    /// Change the type of the fields of `columns`.
    ChangeColumns {
        table: String,
        columns: Model,
    },

    RemoveColumns {
        table: String,
        columns: Vec<String>,
    },

    CreateIndex {
        table: String,
        index: Index,
    },

    DropIndex {
        table: String,
        name: String,
    },

    /// Run raw SQL with bound arguments.
    Exec {
        sql: String,
        args: Vec<Value>,
    },
}

impl Operation {
    #[must_use]
    pub const fn create_table(model: Model) -> Self {
        Self::CreateTable {
            model,
            if_not_exists: false,
        }
    }

    #[must_use]
    pub const fn create_table_if_not_exists(model: Model) -> Self {
        Self::CreateTable {
            model,
            if_not_exists: true,
        }
    }

    #[must_use]
    pub fn drop_table(table: impl Into<String>) -> Self {
        Self::DropTable {
            table: table.into(),
            if_exists: false,
        }
    }

    #[must_use]
    pub fn drop_table_if_exists(table: impl Into<String>) -> Self {
        Self::DropTable {
            table: table.into(),
            if_exists: true,
        }
    }

    #[must_use]
    pub fn rename_table(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::RenameTable {
            from: from.into(),
            to: to.into(),
        }
    }

    #[must_use]
    pub fn add_columns(table: impl Into<String>, columns: Model) -> Self {
        Self::AddColumns {
            table: table.into(),
            columns,
        }
    }

    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::RenameColumn {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    #[must_use]
    pub fn change_columns(table: impl Into<String>, columns: Model) -> Self {
        Self::ChangeColumns {
            table: table.into(),
            columns,
        }
    }

    #[must_use]
    pub fn remove_columns<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RemoveColumns {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn create_index(table: impl Into<String>, index: Index) -> Self {
        Self::CreateIndex {
            table: table.into(),
            index,
        }
    }

    #[must_use]
    pub fn drop_index(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropIndex {
            table: table.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn exec(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Exec {
            sql: sql.into(),
            args,
        }
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { model, .. } => format!("create table '{}'", model.table),
            Self::DropTable { table, .. } => format!("drop table '{table}'"),
            Self::RenameTable { from, to } => format!("rename table '{from}' to '{to}'"),
            Self::AddColumns { table, columns } => {
                format!("add {} column(s) to '{table}'", columns.fields.len())
            }
            Self::RenameColumn { table, from, to } => {
                format!("rename column '{from}' to '{to}' in '{table}'")
            }
            Self::ChangeColumns { table, columns } => {
                format!("change {} column(s) in '{table}'", columns.fields.len())
            }
            Self::RemoveColumns { table, columns } => {
                format!("remove {} column(s) from '{table}'", columns.len())
            }
            Self::CreateIndex { table, index } => {
                format!("create index '{}' on '{table}'", index.name)
            }
            Self::DropIndex { name, .. } => format!("drop index '{name}'"),
            Self::Exec { .. } => "run custom SQL".to_string(),
        }
    }

    /// Applies the operation through `hood`, inside its transaction if it
    /// has one.
    ///
    /// # Errors
    ///
    /// Returns the database error of the failing statement.
    pub async fn apply(&self, hood: &mut Hood) -> hood::Result<()> {
        debug!(operation = %self.description(), "apply");
        match self {
            Self::CreateTable {
                model,
                if_not_exists: false,
            } => hood.create_table(model).await,
            Self::CreateTable {
                model,
                if_not_exists: true,
            } => hood.create_table_if_not_exists(model).await,
            Self::DropTable {
                table,
                if_exists: false,
            } => hood.drop_table(table).await,
            Self::DropTable {
                table,
                if_exists: true,
            } => hood.drop_table_if_exists(table).await,
            Self::RenameTable { from, to } => hood.rename_table(from, to).await,
            Self::AddColumns { table, columns } => hood.add_columns(table, columns).await,
            Self::RenameColumn { table, from, to } => hood.rename_column(table, from, to).await,
            Self::ChangeColumns { table, columns } => hood.change_columns(table, columns).await,
            Self::RemoveColumns { table, columns } => {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                hood.remove_columns(table, &columns).await
            }
            Self::CreateIndex { table, index } => hood.create_index(table, index).await,
            Self::DropIndex { table, name } => hood.drop_index(table, name).await,
            Self::Exec { sql, args } => hood.exec(sql, args).await.map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use hood::{Field, Registry};

    use super::*;

    fn users() -> Model {
        Model::new("users")
            .field(Field::new("id", hood::Id(0)))
            .field(Field::new("name", ""))
    }

    #[test]
    fn test_constructors() {
        assert_eq!(
            Operation::drop_table_if_exists("users"),
            Operation::DropTable {
                table: "users".into(),
                if_exists: true
            }
        );
        assert_eq!(
            Operation::remove_columns("users", ["a", "b"]),
            Operation::RemoveColumns {
                table: "users".into(),
                columns: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn test_description() {
        assert_eq!(
            Operation::create_table(users()).description(),
            "create table 'users'"
        );
        assert_eq!(
            Operation::rename_column("users", "name", "login").description(),
            "rename column 'name' to 'login' in 'users'"
        );
        assert_eq!(Operation::exec("SELECT 1", vec![]).description(), "run custom SQL");
    }

    #[tokio::test]
    async fn test_apply_tracks_schema_on_dry_handle() {
        let dialect = Registry::with_defaults().get("sqlite3").unwrap();
        let mut hood = Hood::dry(dialect);
        Operation::create_table(users()).apply(&mut hood).await.unwrap();
        Operation::rename_table("users", "accounts")
            .apply(&mut hood)
            .await
            .unwrap();
        Operation::remove_columns("accounts", ["name"])
            .apply(&mut hood)
            .await
            .unwrap();
        let model = hood.schema().table("accounts").unwrap();
        assert_eq!(model.fields.len(), 1);
        assert!(hood.schema().table("users").is_none());
    }
}
