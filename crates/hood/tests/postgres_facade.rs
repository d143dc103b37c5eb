//! Tests of the `Hood` facade against PostgreSQL.
//!
//! They run only when `DATABASE_URL` points at a PostgreSQL database and
//! return early otherwise.

use std::sync::Arc;

use hood::{Hood, Id, NaiveDateTime, PostgresDialect, Table, Value};
use sqlx::postgres::PgPoolOptions;

async fn connect() -> Option<Hood> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Failed to connect to DATABASE_URL");
    Some(Hood::new(pool, Arc::new(PostgresDialect::new())))
}

#[derive(Debug, Default, Clone, PartialEq, Table)]
#[hood(table = "hood_pg_item")]
struct Item {
    id: Id,
    name: String,
    amount: i32,
    #[hood(created)]
    created: NaiveDateTime,
}

// =============================================================================
// Save and find
// =============================================================================

#[tokio::test]
async fn test_insert_returns_generated_key() {
    let Some(mut hd) = connect().await else {
        return;
    };
    hd.drop_table_if_exists(Item::NAME).await.unwrap();
    hd.create_table(&Item::schema()).await.unwrap();

    let mut first = Item {
        name: "erik".into(),
        amount: 3,
        ..Item::default()
    };
    let mut second = Item {
        name: "anna".into(),
        amount: 5,
        ..Item::default()
    };
    let first_id = hd.save(&mut first).await.unwrap();
    let second_id = hd.save(&mut second).await.unwrap();
    assert_ne!(first_id, Id(0));
    assert_eq!(first.id, first_id);
    assert_eq!(second.id, second_id);
    assert!(second_id.0 > first_id.0);

    let rows: Vec<Item> = hd
        .where_clause("id = ?", &[Value::I64(second_id.0)])
        .find()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "anna");
    assert_eq!(rows[0].amount, 5);

    hd.drop_table(Item::NAME).await.unwrap();
}

#[tokio::test]
async fn test_numeric_reads_as_float() {
    let Some(mut hd) = connect().await else {
        return;
    };
    let row = hd
        .query_row("SELECT CAST(? AS NUMERIC) / 4 AS quarter", &[Value::I64(10)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<f64>("quarter").unwrap(), 2.5);

    let row = hd
        .query_row("SELECT CAST(NULL AS NUMERIC) AS missing", &[])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<Option<f64>>("missing").unwrap(), None);
}
