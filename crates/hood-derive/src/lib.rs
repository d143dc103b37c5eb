//! Derive macro for hood table models.
//!
//! `#[derive(Table)]` turns a struct with named fields into a table: it
//! describes the columns as a `hood::Model`, scans rows back into the struct
//! by column name, and writes generated keys and timestamps.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, LitInt, LitStr, Token,
    Type,
};

/// Derives `hood::Table` for a struct.
///
/// # Struct Attributes
///
/// - `#[hood(table = "name")]` - table name (defaults to the snake_case
///   struct name)
/// - `#[hood(index(name = "idx", columns("a", "b")))]` - adds an index
/// - `#[hood(unique_index(name = "idx", columns("a")))]` - adds a unique index
/// - `#[hood(hooks)]` - the struct implements `hood::Hooks` itself; otherwise
///   an empty implementation is generated
///
/// # Field Attributes
///
/// - `#[hood(pk)]` - primary key (implied by the `Id` type)
/// - `#[hood(not_null)]`, `#[hood(auto_increment)]`
/// - `#[hood(default = "literal")]` - raw SQL default
/// - `#[hood(size = 64)]` - column size for `VarChar`
/// - `#[hood(column = "name")]` - column name (defaults to the field name)
/// - `#[hood(created)]`, `#[hood(updated)]` - timestamps set on save
/// - `#[hood(len(min = 1, max = 8))]`, `#[hood(range(min = 0, max = 9))]`,
///   `#[hood(presence)]` - validation constraints
/// - `#[hood(flatten)]` - splices in the columns of a nested `Table` struct
/// - `#[hood(skip)]` - not a column
#[proc_macro_derive(Table, attributes(hood))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_table_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_table_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let table_attrs = parse_table_attrs(&input.attrs)?;
    let table_name = table_attrs
        .name
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Table derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Table derive only supports structs",
            ));
        }
    };

    let mut columns: Vec<ColumnInfo> = Vec::new();
    let mut flattened: Vec<Ident> = Vec::new();
    let mut model_steps: Vec<TokenStream2> = Vec::new();
    let mut primary_key: Option<Ident> = None;

    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            continue;
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            model_steps.push(quote! {
                model.extend(::hood::Table::model(&self.#field_name));
            });
            flattened.push(field_name);
            continue;
        }

        let is_pk = attrs.pk || is_id_type(&field.ty);
        if is_pk {
            if let Some(existing) = &primary_key {
                return Err(syn::Error::new_spanned(
                    field,
                    format!("table {table_name} already has primary key `{existing}`"),
                ));
            }
            primary_key = Some(field_name.clone());
        }

        let column_name = attrs
            .column
            .clone()
            .unwrap_or_else(|| field_name.to_string().trim_start_matches("r#").to_string());
        let field_expr = column_builder(&column_name, &field_name, &attrs);
        model_steps.push(quote! {
            model.push_field(#field_expr);
        });
        columns.push(ColumnInfo {
            field_name,
            column_name,
            timestamp: attrs.timestamp,
        });
    }

    for index in &table_attrs.indexes {
        let name = &index.name;
        let index_columns = &index.columns;
        let constructor = if index.unique {
            quote!(unique)
        } else {
            quote!(new)
        };
        model_steps.push(quote! {
            model.push_index(::hood::Index::#constructor(#name, [#(#index_columns),*]));
        });
    }

    let assign_arms = columns.iter().map(|c| {
        let field_name = &c.field_name;
        let column_name = &c.column_name;
        quote! {
            #column_name => {
                self.#field_name = ::hood::FromValue::from_value(value)?;
                return ::core::result::Result::Ok(true);
            }
        }
    });

    let set_primary_key = if let Some(pk) = &primary_key {
        quote! {
            self.#pk = ::hood::FromValue::from_value(&::hood::Value::I64(id))?;
        }
    } else {
        quote! {
            #(::hood::Table::set_primary_key(&mut self.#flattened, id)?;)*
        }
    };

    let created = columns
        .iter()
        .filter(|c| c.timestamp == Some(TimestampAttr::Created))
        .map(|c| &c.field_name);
    let updated = columns
        .iter()
        .filter(|c| c.timestamp == Some(TimestampAttr::Updated))
        .map(|c| &c.field_name);

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let hooks_impl = if table_attrs.hooks {
        quote! {}
    } else {
        quote! {
            impl #impl_generics ::hood::Hooks for #struct_name #ty_generics #where_clause {}
        }
    };

    let expanded = quote! {
        #hooks_impl

        impl #impl_generics ::hood::Table for #struct_name #ty_generics #where_clause {
            const NAME: &'static str = #table_name;

            fn model(&self) -> ::hood::Model {
                let mut model = ::hood::Model::new(#table_name);
                #(#model_steps)*
                model
            }

            fn assign(
                &mut self,
                column: &str,
                value: &::hood::Value,
            ) -> ::core::result::Result<bool, ::hood::ValueError> {
                match column {
                    #(#assign_arms)*
                    _ => {}
                }
                #(
                    if ::hood::Table::assign(&mut self.#flattened, column, value)? {
                        return ::core::result::Result::Ok(true);
                    }
                )*
                ::core::result::Result::Ok(false)
            }

            fn set_primary_key(
                &mut self,
                id: i64,
            ) -> ::core::result::Result<(), ::hood::ValueError> {
                let _ = id;
                #set_primary_key
                ::core::result::Result::Ok(())
            }

            fn touch(&mut self, now: ::hood::NaiveDateTime, inserting: bool) {
                let _ = now;
                if inserting {
                    #(self.#created = ::core::convert::From::from(now);)*
                }
                #(self.#updated = ::core::convert::From::from(now);)*
                #(::hood::Table::touch(&mut self.#flattened, now, inserting);)*
            }
        }
    };

    Ok(expanded)
}

/// Builds the `hood::Field` expression for one column.
fn column_builder(column_name: &str, field_name: &Ident, attrs: &ColumnAttrs) -> TokenStream2 {
    let mut expr = quote! {
        ::hood::Field::new(#column_name, ::hood::ToValue::to_value(&self.#field_name))
    };
    if attrs.pk {
        expr = quote!(#expr.pk());
    }
    if attrs.not_null {
        expr = quote!(#expr.not_null());
    }
    if let Some(default) = &attrs.default {
        expr = quote!(#expr.default_value(#default));
    }
    if let Some(size) = attrs.size {
        expr = quote!(#expr.size(#size));
    }
    if attrs.auto_increment {
        expr = quote!(#expr.auto_increment());
    }
    match attrs.timestamp {
        Some(TimestampAttr::Created) => {
            expr = quote!(#expr.timestamp(::hood::Timestamp::Created));
        }
        Some(TimestampAttr::Updated) => {
            expr = quote!(#expr.timestamp(::hood::Timestamp::Updated));
        }
        None => {}
    }
    for constraint in &attrs.constraints {
        expr = quote!(#expr.constraint(#constraint));
    }
    expr
}

fn is_id_type(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Id" && segment.arguments.is_empty()),
        _ => false,
    }
}

struct ColumnInfo {
    field_name: Ident,
    column_name: String,
    timestamp: Option<TimestampAttr>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TimestampAttr {
    Created,
    Updated,
}

struct IndexAttr {
    name: String,
    columns: Vec<String>,
    unique: bool,
}

#[derive(Default)]
struct TableAttrs {
    name: Option<String>,
    indexes: Vec<IndexAttr>,
    hooks: bool,
}

#[derive(Default)]
struct ColumnAttrs {
    column: Option<String>,
    pk: bool,
    not_null: bool,
    default: Option<String>,
    size: Option<usize>,
    auto_increment: bool,
    timestamp: Option<TimestampAttr>,
    constraints: Vec<TokenStream2>,
    flatten: bool,
    skip: bool,
}

fn string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

fn parse_table_attrs(attrs: &[Attribute]) -> syn::Result<TableAttrs> {
    let mut result = TableAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("hood")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                result.name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("hooks") {
                result.hooks = true;
            } else if meta.path.is_ident("index") {
                result.indexes.push(parse_index(&meta, false)?);
            } else if meta.path.is_ident("unique_index") {
                result.indexes.push(parse_index(&meta, true)?);
            } else {
                return Err(meta.error("unsupported hood table attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

fn parse_index(meta: &ParseNestedMeta<'_>, unique: bool) -> syn::Result<IndexAttr> {
    let mut name = None;
    let mut columns = Vec::new();
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            name = Some(string_value(&inner)?);
        } else if inner.path.is_ident("columns") {
            let content;
            syn::parenthesized!(content in inner.input);
            let list: Punctuated<LitStr, Token![,]> =
                content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
            columns = list.iter().map(LitStr::value).collect();
        } else {
            return Err(inner.error("expected `name` or `columns`"));
        }
        Ok(())
    })?;
    let Some(name) = name else {
        return Err(meta.error("index requires a `name`"));
    };
    if columns.is_empty() {
        return Err(meta.error("index requires at least one column"));
    }
    Ok(IndexAttr {
        name,
        columns,
        unique,
    })
}

/// Parses `(min = a, max = b)`; at least one bound is required.
fn parse_bounds(meta: &ParseNestedMeta<'_>) -> syn::Result<(TokenStream2, TokenStream2)> {
    let mut min = None;
    let mut max = None;
    meta.parse_nested_meta(|inner| {
        let bound: Expr = inner.value()?.parse()?;
        if inner.path.is_ident("min") {
            min = Some(bound);
        } else if inner.path.is_ident("max") {
            max = Some(bound);
        } else {
            return Err(inner.error("expected `min` or `max`"));
        }
        Ok(())
    })?;
    if min.is_none() && max.is_none() {
        return Err(meta.error("constraint requires `min` or `max`"));
    }
    let option = |bound: Option<Expr>| match bound {
        Some(expr) => quote!(::core::option::Option::Some(#expr)),
        None => quote!(::core::option::Option::None),
    };
    Ok((option(min), option(max)))
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("hood")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("pk") {
                result.pk = true;
            } else if meta.path.is_ident("not_null") {
                result.not_null = true;
            } else if meta.path.is_ident("auto_increment") {
                result.auto_increment = true;
            } else if meta.path.is_ident("default") {
                result.default = Some(string_value(&meta)?);
            } else if meta.path.is_ident("column") {
                result.column = Some(string_value(&meta)?);
            } else if meta.path.is_ident("size") {
                let lit: LitInt = meta.value()?.parse()?;
                result.size = Some(lit.base10_parse()?);
            } else if meta.path.is_ident("created") {
                result.timestamp = Some(TimestampAttr::Created);
            } else if meta.path.is_ident("updated") {
                result.timestamp = Some(TimestampAttr::Updated);
            } else if meta.path.is_ident("presence") {
                result
                    .constraints
                    .push(quote!(::hood::Constraint::Presence));
            } else if meta.path.is_ident("len") {
                let (min, max) = parse_bounds(&meta)?;
                result
                    .constraints
                    .push(quote!(::hood::Constraint::Len { min: #min, max: #max }));
            } else if meta.path.is_ident("range") {
                let (min, max) = parse_bounds(&meta)?;
                result
                    .constraints
                    .push(quote!(::hood::Constraint::Range { min: #min, max: #max }));
            } else if meta.path.is_ident("flatten") {
                result.flatten = true;
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else {
                return Err(meta.error("unsupported hood field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

/// `SampleModel` becomes `sample_model`, `HTTPServer` becomes `http_server`.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower =
                i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
