//! Tracking of the schema built up by DDL operations.
//!
//! A [`Schema`] mirrors every create, alter and drop issued through a `Hood`
//! handle, including dry runs that never touch a database, and can render
//! itself back as Rust struct declarations.

use std::fmt::Write as _;

use crate::model::{Field, Index, Model, Timestamp};
use crate::value::Kind;

/// The tables known to a handle, in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    models: Vec<Model>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.table == name)
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models.iter_mut().find(|m| m.table == name)
    }

    /// Records a new table, replacing any table of the same name.
    pub fn create_table(&mut self, model: Model) {
        match self.table_mut(&model.table) {
            Some(existing) => *existing = model,
            None => self.models.push(model),
        }
    }

    pub fn drop_table(&mut self, name: &str) {
        self.models.retain(|m| m.table != name);
    }

    pub fn rename_table(&mut self, from: &str, to: &str) {
        if let Some(model) = self.table_mut(from) {
            model.table = to.to_string();
        }
    }

    pub fn add_columns(&mut self, table: &str, fields: &[Field]) {
        if let Some(model) = self.table_mut(table) {
            model.fields.extend_from_slice(fields);
        }
    }

    pub fn rename_column(&mut self, table: &str, from: &str, to: &str) {
        if let Some(model) = self.table_mut(table) {
            for field in model.fields.iter_mut().filter(|f| f.name == from) {
                field.name = to.to_string();
            }
        }
    }

    /// Replaces the definition of every existing column that appears in
    /// `fields`.
    pub fn change_columns(&mut self, table: &str, fields: &[Field]) {
        if let Some(model) = self.table_mut(table) {
            for field in &mut model.fields {
                if let Some(changed) = fields.iter().find(|f| f.name == field.name) {
                    *field = changed.clone();
                }
            }
        }
    }

    pub fn remove_columns(&mut self, table: &str, columns: &[&str]) {
        if let Some(model) = self.table_mut(table) {
            model.fields.retain(|f| !columns.contains(&f.name.as_str()));
        }
    }

    pub fn add_index(&mut self, table: &str, index: Index) {
        if let Some(model) = self.table_mut(table) {
            model.indexes.push(index);
        }
    }

    pub fn drop_index(&mut self, table: &str, name: &str) {
        if let Some(model) = self.table_mut(table) {
            model.indexes.retain(|i| i.name != name);
        }
    }

    /// Renders every table as a `#[derive(Table)]` struct declaration.
    #[must_use]
    pub fn declaration(&self) -> String {
        self.models
            .iter()
            .map(model_declaration)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn to_upper_camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

fn quoted_columns(index: &Index) -> String {
    index
        .columns
        .iter()
        .map(|c| format!("{c:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn field_attributes(field: &Field) -> Vec<String> {
    let is_id = field.value.kind() == Kind::Id;
    let mut attrs = Vec::new();
    if field.primary_key && !is_id {
        attrs.push("pk".to_string());
    }
    if field.not_null {
        attrs.push("not_null".to_string());
    }
    if let Some(default) = &field.default {
        attrs.push(format!("default = {default:?}"));
    }
    if field.size > 0 {
        attrs.push(format!("size = {}", field.size));
    }
    if field.auto_increment && !is_id {
        attrs.push("auto_increment".to_string());
    }
    match field.timestamp {
        Some(Timestamp::Created) => attrs.push("created".to_string()),
        Some(Timestamp::Updated) => attrs.push("updated".to_string()),
        None => {}
    }
    attrs.extend(field.constraints.iter().map(ToString::to_string));
    attrs
}

fn model_declaration(model: &Model) -> String {
    let mut out = String::from("#[derive(Debug, Default, Table)]\n");
    let mut table_attrs = vec![format!("table = {:?}", model.table)];
    for index in &model.indexes {
        let kind = if index.unique { "unique_index" } else { "index" };
        table_attrs.push(format!(
            "{kind}(name = {:?}, columns({}))",
            index.name,
            quoted_columns(index)
        ));
    }
    let _ = writeln!(out, "#[hood({})]", table_attrs.join(", "));
    let _ = writeln!(out, "pub struct {} {{", to_upper_camel(&model.table));
    for field in &model.fields {
        let attrs = field_attributes(field);
        if !attrs.is_empty() {
            let _ = writeln!(out, "    #[hood({})]", attrs.join(", "));
        }
        let rust_type = field.value.kind().rust_type();
        if field.value.is_null() {
            let _ = writeln!(out, "    pub {}: Option<{rust_type}>,", field.name);
        } else {
            let _ = writeln!(out, "    pub {}: {rust_type},", field.name);
        }
    }
    out.push('}');
    out
}
