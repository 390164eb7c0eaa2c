//! Attribute parsing for the Model derive macro.
//!
//! Struct level: `#[orm(table = "...")]` (required).
//! Field level: `#[orm(id)]`, `#[orm(column = "...")]`, `#[orm(skip)]`,
//! `#[orm(flatten)]`, comma-separated in any combination that makes sense.

use syn::{DeriveInput, Result};

/// Parsed field-level `#[orm(...)]` attributes.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub is_id: bool,
    pub skip: bool,
    pub flatten: bool,
    pub column: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "flatten" {
                attr.flatten = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new_spanned(value, "column name cannot be empty"));
                }
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!("unknown orm attribute `{ident}`; expected id, column, skip or flatten"),
                ));
            }

            if input.is_empty() {
                break;
            }
            let _: syn::Token![,] = input.parse()?;
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` attribute on a field.
pub(super) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        merged.is_id |= parsed.is_id;
        merged.skip |= parsed.skip;
        merged.flatten |= parsed.flatten;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
    }

    if merged.skip && (merged.is_id || merged.flatten || merged.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "#[orm(skip)] cannot be combined with other orm attributes",
        ));
    }
    if merged.flatten && (merged.is_id || merged.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "#[orm(flatten)] cannot be combined with id or column",
        ));
    }
    Ok(merged)
}

/// Extract table name from struct-level `#[orm(table = "...")]` attribute.
pub(super) fn get_table_name(input: &DeriveInput) -> Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            if let Ok(nested) = attr.parse_args::<syn::MetaNameValue>() {
                if nested.path.is_ident("table") {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(lit),
                        ..
                    }) = &nested.value
                    {
                        if lit.value().is_empty() {
                            return Err(syn::Error::new_spanned(lit, "table name cannot be empty"));
                        }
                        return Ok(lit.value());
                    }
                }
            }
        }
    }
    Err(syn::Error::new_spanned(
        input,
        "Model requires #[orm(table = \"table_name\")] attribute",
    ))
}
