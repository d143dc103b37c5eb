//! Tests for the `#[derive(Table)]` macro output.

use hood::{
    Constraint, Field, Id, Index, Kind, Model, NaiveDateTime, Table, Timestamp, Value, VarChar,
};

// =============================================================================
// Test: Basic struct with default table name (snake_case)
// =============================================================================

#[derive(Debug, Default, Table)]
struct SampleModel {
    prim: Id,
    first: String,
    last: String,
    amount: i32,
}

#[test]
fn test_default_table_name() {
    assert_eq!(SampleModel::NAME, "sample_model");
}

#[test]
fn test_fields_in_declaration_order() {
    let model = SampleModel::default().model();
    let names: Vec<_> = model.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["prim", "first", "last", "amount"]);
}

#[test]
fn test_id_field_is_primary_key() {
    let model = SampleModel::schema();
    let pk = model.primary_key().unwrap();
    assert_eq!(pk.name, "prim");
    assert!(pk.auto_increment);
    assert_eq!(pk.value.kind(), Kind::Id);
}

#[test]
fn test_model_carries_current_values() {
    let sample = SampleModel {
        prim: Id(3),
        first: "Erik".into(),
        last: "Aigner".into(),
        amount: 5,
    };
    let model = sample.model();
    assert_eq!(model.field_named("first").unwrap().value, Value::Text("Erik".into()));
    assert_eq!(model.field_named("amount").unwrap().value, Value::I32(5));
    assert_eq!(model.primary_key().unwrap().value, Value::Id(3));
}

#[test]
fn test_derivation_is_idempotent() {
    let sample = SampleModel::default();
    assert_eq!(sample.model(), sample.model());
}

// =============================================================================
// Test: Table and field attributes
// =============================================================================

#[allow(dead_code)]
#[derive(Debug, Default, Table)]
#[hood(
    table = "people",
    index(name = "name_idx", columns("last", "first")),
    unique_index(name = "nick_idx", columns("nick"))
)]
struct Person {
    #[hood(pk, column = "person_id")]
    key: i64,
    #[hood(not_null, default = "'anonymous'", len(min = 3, max = 6))]
    first: String,
    #[hood(size = 64)]
    last: VarChar,
    #[hood(range(min = -1, max = 150), presence)]
    age: Option<u8>,
    nick: Option<String>,
    #[hood(skip)]
    cache: Vec<String>,
}

#[test]
fn test_table_attribute_renames() {
    assert_eq!(Person::NAME, "people");
    assert_eq!(Person::schema().table, "people");
}

#[test]
fn test_explicit_primary_key() {
    let model = Person::schema();
    let pk = model.primary_key().unwrap();
    assert_eq!(pk.name, "person_id");
    assert!(!pk.auto_increment);
}

#[test]
fn test_field_attributes() {
    let model = Person::schema();
    assert_eq!(
        model.field_named("first").unwrap(),
        &Field::new("first", "")
            .not_null()
            .default_value("'anonymous'")
            .constraint(Constraint::Len {
                min: Some(3),
                max: Some(6)
            })
    );
    assert_eq!(model.field_named("last").unwrap().size, 64);
    assert_eq!(
        model.field_named("age").unwrap().constraints,
        vec![
            Constraint::Range {
                min: Some(-1),
                max: Some(150)
            },
            Constraint::Presence
        ]
    );
}

#[test]
fn test_optional_field_is_typed_null() {
    let model = Person::schema();
    assert_eq!(model.field_named("age").unwrap().value, Value::Null(Kind::U8));
    assert_eq!(model.field_named("nick").unwrap().value, Value::Null(Kind::Text));
}

#[test]
fn test_skipped_field_is_not_a_column() {
    let person = Person {
        cache: vec!["x".into()],
        ..Person::default()
    };
    assert!(person.model().field_named("cache").is_none());
    assert_eq!(person.model().fields.len(), 5);
}

#[test]
fn test_indexes() {
    assert_eq!(
        Person::schema().indexes,
        vec![
            Index::new("name_idx", ["last", "first"]),
            Index::unique("nick_idx", ["nick"]),
        ]
    );
}

// =============================================================================
// Test: Scanning by column name
// =============================================================================

#[test]
fn test_assign_by_column_name() {
    let mut person = Person::default();
    assert!(person.assign("person_id", &Value::I64(7)).unwrap());
    assert!(person.assign("first", &Value::Text("Erik".into())).unwrap());
    assert!(person.assign("age", &Value::I64(30)).unwrap());
    assert!(person.assign("nick", &Value::Null(Kind::Text)).unwrap());
    assert!(!person.assign("unknown", &Value::I64(1)).unwrap());
    assert!(!person.assign("key", &Value::I64(1)).unwrap());
    assert_eq!(person.key, 7);
    assert_eq!(person.first, "Erik");
    assert_eq!(person.age, Some(30));
    assert_eq!(person.nick, None);
}

#[test]
fn test_assign_out_of_range() {
    let mut person = Person::default();
    assert!(person.assign("age", &Value::I64(300)).is_err());
}

#[test]
fn test_set_primary_key() {
    let mut sample = SampleModel::default();
    sample.set_primary_key(42).unwrap();
    assert_eq!(sample.prim, Id(42));
}

// =============================================================================
// Test: Timestamps and flattening
// =============================================================================

#[derive(Debug, Default, Table)]
#[hood(unique_index(name = "audit_created", columns("created_at")))]
struct Audit {
    #[hood(created)]
    created_at: NaiveDateTime,
    #[hood(updated)]
    updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Default, Table)]
#[hood(table = "posts")]
struct Post {
    id: Id,
    title: String,
    #[hood(flatten)]
    audit: Audit,
}

fn noon() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-05-01 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

#[test]
fn test_flatten_splices_columns_and_indexes() {
    let model = Post::schema();
    let names: Vec<_> = model.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "title", "created_at", "updated_at"]);
    assert_eq!(model.indexes, vec![Index::unique("audit_created", ["created_at"])]);
    assert_eq!(
        model.field_named("created_at").unwrap().timestamp,
        Some(Timestamp::Created)
    );
}

#[test]
fn test_flatten_assign() {
    let mut post = Post::default();
    assert!(post
        .assign("created_at", &Value::Text("2024-05-01 12:00:00".into()))
        .unwrap());
    assert_eq!(post.audit.created_at, noon());
}

#[test]
fn test_touch_on_insert_and_update() {
    let mut post = Post::default();
    post.touch(noon(), true);
    assert_eq!(post.audit.created_at, noon());
    assert_eq!(post.audit.updated_at, Some(noon()));

    let later = noon() + chrono::Duration::hours(1);
    post.touch(later, false);
    assert_eq!(post.audit.created_at, noon());
    assert_eq!(post.audit.updated_at, Some(later));
}

#[test]
fn test_flattened_primary_key() {
    #[derive(Debug, Default, Table)]
    struct Keyed {
        id: Id,
    }

    #[derive(Debug, Default, Table)]
    struct Outer {
        #[hood(flatten)]
        keyed: Keyed,
        name: String,
    }

    let mut outer = Outer::default();
    outer.set_primary_key(9).unwrap();
    assert_eq!(outer.keyed.id, Id(9));
    assert_eq!(Outer::schema().primary_key().unwrap().name, "id");
}

#[test]
#[should_panic(expected = "more than one primary key")]
fn test_flattened_second_primary_key_panics() {
    #[derive(Debug, Default, Table)]
    struct Keyed {
        id: Id,
    }

    #[derive(Debug, Default, Table)]
    struct Outer {
        id: Id,
        #[hood(flatten)]
        keyed: Keyed,
    }

    let _ = Outer::schema();
}

#[test]
fn test_model_without_derive_matches() {
    let expected = Model::new("sample_model")
        .field(Field::new("prim", Id(0)))
        .field(Field::new("first", ""))
        .field(Field::new("last", ""))
        .field(Field::new("amount", 0_i32));
    assert_eq!(SampleModel::schema(), expected);
}
