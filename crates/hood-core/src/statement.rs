//! DML and DDL generation.
//!
//! Every function here is a pure function of its dialect and inputs. None of
//! them share state with [`Query`](crate::query::Query); marker positions
//! always start at zero.

use crate::dialect::Dialect;
use crate::model::{Field, Index, Model};
use crate::value::Value;

fn primary_key<'a>(model: &'a Model, statement: &str) -> &'a Field {
    model
        .primary_key()
        .unwrap_or_else(|| panic!("{statement} on table {} requires a primary key", model.table))
}

fn quoted_list<'a>(dialect: &dyn Dialect, names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| dialect.quote(name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `INSERT INTO "t" ("a", "b") VALUES ($1, $2)`, primary key excluded.
///
/// Dialects with a returning clause get it appended so the generated key can
/// be read from the result row.
///
/// # Panics
///
/// Panics if the model has no primary key.
#[must_use]
pub fn insert_sql(dialect: &dyn Dialect, model: &Model) -> (String, Vec<Value>) {
    let pk = primary_key(model, "INSERT");
    let mut pos = 0;
    let mut columns = Vec::new();
    let mut markers = Vec::new();
    let mut values = Vec::new();
    for field in model.data_fields() {
        columns.push(dialect.quote(&field.name));
        markers.push(dialect.next_marker(&mut pos));
        values.push(field.value.clone());
    }
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote(&model.table),
        columns.join(", "),
        markers.join(", "),
    );
    if let Some(returning) = dialect.returning_clause(&pk.name) {
        sql.push(' ');
        sql.push_str(&returning);
    }
    (sql, values)
}

/// `UPDATE "t" SET "a" = $1, "b" = $2 WHERE "pk" = $3`.
///
/// # Panics
///
/// Panics if the model has no primary key.
#[must_use]
pub fn update_sql(dialect: &dyn Dialect, model: &Model) -> (String, Vec<Value>) {
    let pk = primary_key(model, "UPDATE");
    let mut pos = 0;
    let mut pairs = Vec::new();
    let mut values = Vec::new();
    for field in model.data_fields() {
        pairs.push(format!(
            "{} = {}",
            dialect.quote(&field.name),
            dialect.next_marker(&mut pos)
        ));
        values.push(field.value.clone());
    }
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        dialect.quote(&model.table),
        pairs.join(", "),
        dialect.quote(&pk.name),
        dialect.next_marker(&mut pos),
    );
    values.push(pk.value.clone());
    (sql, values)
}

/// `DELETE FROM "t" WHERE "pk" = $1`.
///
/// # Panics
///
/// Panics if the model has no primary key.
#[must_use]
pub fn delete_sql(dialect: &dyn Dialect, model: &Model) -> (String, Vec<Value>) {
    let pk = primary_key(model, "DELETE");
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        dialect.quote(&model.table),
        dialect.quote(&pk.name),
        dialect.marker(0),
    );
    (sql, vec![pk.value.clone()])
}

fn column_definition(dialect: &dyn Dialect, field: &Field) -> String {
    let mut parts = vec![
        dialect.quote(&field.name),
        dialect.sql_type(&field.value, field.size, field.auto_increment),
    ];
    if field.not_null {
        parts.push(dialect.keyword_not_null().to_string());
    }
    if let Some(literal) = field.default.as_deref().filter(|d| !d.is_empty()) {
        parts.push(dialect.keyword_default(literal));
    }
    if field.primary_key {
        parts.push(dialect.keyword_primary_key().to_string());
        let keyword = dialect.keyword_auto_increment();
        if field.auto_increment && !keyword.is_empty() {
            parts.push(keyword.to_string());
        }
    }
    parts.join(" ")
}

/// `CREATE TABLE [IF NOT EXISTS ]"t" ( "c" type ..., ... )`.
#[must_use]
pub fn create_table_sql(dialect: &dyn Dialect, model: &Model, if_not_exists: bool) -> String {
    let columns = model
        .fields
        .iter()
        .map(|field| column_definition(dialect, field))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE {}{} ( {columns} )",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        dialect.quote(&model.table),
    )
}

/// `DROP TABLE [IF EXISTS] "t"`.
#[must_use]
pub fn drop_table_sql(dialect: &dyn Dialect, table: &str, if_exists: bool) -> String {
    format!(
        "DROP TABLE {}{}",
        if if_exists { "IF EXISTS " } else { "" },
        dialect.quote(table),
    )
}

/// `ALTER TABLE "from" RENAME TO "to"`.
#[must_use]
pub fn rename_table_sql(dialect: &dyn Dialect, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME TO {}",
        dialect.quote(from),
        dialect.quote(to)
    )
}

/// `ALTER TABLE "t" ADD COLUMN "c" type`.
#[must_use]
pub fn add_column_sql(dialect: &dyn Dialect, table: &str, column: &Field) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        dialect.quote(table),
        dialect.quote(&column.name),
        dialect.sql_type(&column.value, column.size, column.auto_increment),
    )
}

/// `ALTER TABLE "t" RENAME COLUMN "from" TO "to"`.
#[must_use]
pub fn rename_column_sql(dialect: &dyn Dialect, table: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        dialect.quote(table),
        dialect.quote(from),
        dialect.quote(to),
    )
}

/// `ALTER TABLE "t" ALTER COLUMN "c" TYPE type`.
#[must_use]
pub fn change_column_sql(dialect: &dyn Dialect, table: &str, column: &Field) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
        dialect.quote(table),
        dialect.quote(&column.name),
        dialect.sql_type(&column.value, column.size, column.auto_increment),
    )
}

/// `ALTER TABLE "t" DROP COLUMN "c"`.
#[must_use]
pub fn drop_column_sql(dialect: &dyn Dialect, table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        dialect.quote(table),
        dialect.quote(column),
    )
}

/// `CREATE [UNIQUE ]INDEX [IF NOT EXISTS ]"n" ON "t" ("a", "b")`, columns in
/// declared order.
#[must_use]
pub fn create_index_sql(
    dialect: &dyn Dialect,
    table: &str,
    index: &Index,
    if_not_exists: bool,
) -> String {
    format!(
        "CREATE {}INDEX {}{} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        dialect.quote(&index.name),
        dialect.quote(table),
        quoted_list(dialect, index.columns.iter().map(String::as_str)),
    )
}

/// `DROP INDEX "n"`.
#[must_use]
pub fn drop_index_sql(dialect: &dyn Dialect, name: &str) -> String {
    format!("DROP INDEX {}", dialect.quote(name))
}
