//! The structural description of a table.
//!
//! A [`Model`] is derived from a struct on every call (usually through
//! `#[derive(Table)]`) and handed to the statement generators. It is never
//! cached: deriving twice yields two equal but independent models.

use crate::validation::Constraint;
use crate::value::{Kind, Value};

/// Marks a time field that is set automatically on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Set when the row is inserted.
    Created,
    /// Set on every insert and update.
    Updated,
}

/// One column of a model together with its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name in snake case.
    pub name: String,
    /// Current value, also used to infer the column type.
    pub value: Value,
    pub primary_key: bool,
    pub not_null: bool,
    /// Raw SQL literal used as the column default.
    pub default: Option<String>,
    /// Declared size, 0 selects the dialect default.
    pub size: usize,
    pub auto_increment: bool,
    pub timestamp: Option<Timestamp>,
    pub constraints: Vec<Constraint>,
}

impl Field {
    /// Creates a field. A value of kind [`Kind::Id`] makes it an
    /// auto-incrementing primary key.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let is_id = value.kind() == Kind::Id;
        Self {
            name: name.into(),
            value,
            primary_key: is_id,
            not_null: false,
            default: None,
            size: 0,
            auto_increment: is_id,
            timestamp: None,
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn pk(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Returns true if the field holds the zero value of its kind.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

/// A named, possibly unique, index over an ordered column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Index {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn unique<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }
}

/// A table: name, ordered fields and ordered indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub table: String,
    pub fields: Vec<Field>,
    pub indexes: Vec<Index>,
}

impl Model {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.push_field(field);
        self
    }

    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Appends a field.
    ///
    /// # Panics
    ///
    /// Panics if the field is a primary key and the model already has one.
    pub fn push_field(&mut self, field: Field) {
        if field.primary_key {
            if let Some(existing) = self.primary_key() {
                panic!(
                    "table {} declares more than one primary key ({} and {})",
                    self.table, existing.name, field.name
                );
            }
        }
        self.fields.push(field);
    }

    pub fn push_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// Splices the fields and indexes of another model into this one, in
    /// order. Used for flattened structs.
    pub fn extend(&mut self, other: Self) {
        for field in other.fields {
            self.push_field(field);
        }
        self.indexes.extend(other.indexes);
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }

    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that are written by INSERT and UPDATE.
    pub fn data_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.primary_key)
    }
}
