//! Model derive macro implementation
//!
//! Generates `impl pgfluent::Model`: a `OnceLock`-cached `TableDesc`, the
//! per-column `FieldValue`s, primary-key assignment, and positional row
//! decoding. Every list is emitted in field declaration order, which is the
//! order the compiler projects and the scanner reads.

mod attrs;

use attrs::{field_attr, get_table_name};
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

enum FieldKind {
    Column { column: String, is_id: bool },
    Flatten,
    Skip,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic structs",
        ));
    }

    let table_name = get_table_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Model can only be derived for structs",
            ));
        }
    };

    let mut describe_steps = Vec::new();
    let mut value_steps = Vec::new();
    let mut read_steps = Vec::new();
    let mut id_field: Option<(&syn::Ident, &syn::Type)> = None;

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = ident.unraw().to_string();
        let ty = &field.ty;
        let attr = field_attr(field)?;

        let kind = if attr.skip {
            FieldKind::Skip
        } else if attr.flatten {
            FieldKind::Flatten
        } else {
            FieldKind::Column {
                column: attr
                    .column
                    .unwrap_or_else(|| field_name.to_snake_case()),
                is_id: attr.is_id,
            }
        };

        match kind {
            FieldKind::Skip => {
                describe_steps.push(quote! { .ignore(#field_name) });
            }
            FieldKind::Flatten => {
                describe_steps.push(quote! {
                    .flatten(<#ty as ::pgfluent::Model>::describe())
                });
                value_steps.push(quote! {
                    values.extend(::pgfluent::Model::values(&self.#ident));
                });
                read_steps.push(quote! {
                    ::pgfluent::Model::read_row(&mut self.#ident, row, index)?;
                });
            }
            FieldKind::Column { column, is_id } => {
                if is_id {
                    if id_field.is_some() {
                        return Err(syn::Error::new_spanned(
                            field,
                            "Model supports a single #[orm(id)] field",
                        ));
                    }
                    id_field = Some((ident, ty));
                }
                describe_steps.push(quote! { .column(#field_name, #column, #is_id) });
                value_steps.push(quote! {
                    values.push(::pgfluent::field_value(&self.#ident));
                });
                read_steps.push(quote! {
                    self.#ident = ::pgfluent::next_column(row, index)?;
                });
            }
        }
    }

    let (key_type, set_key) = match id_field {
        Some((ident, ty)) => (
            quote! { #ty },
            quote! {
                self.#ident = key;
                ::std::result::Result::Ok(())
            },
        ),
        None => {
            let message = format!("{table_name} has no #[orm(id)] field");
            (
                quote! { () },
                quote! {
                    let _ = key;
                    ::std::result::Result::Err(::pgfluent::OrmError::schema(#message))
                },
            )
        }
    };

    Ok(quote! {
        impl ::pgfluent::Model for #name {
            type Key = #key_type;

            fn describe() -> &'static ::pgfluent::TableDesc {
                static DESC: ::std::sync::OnceLock<::pgfluent::TableDesc> =
                    ::std::sync::OnceLock::new();
                DESC.get_or_init(|| {
                    ::pgfluent::TableDesc::builder(#table_name)
                        #(#describe_steps)*
                        .build()
                })
            }

            fn values(&self) -> ::std::vec::Vec<::pgfluent::FieldValue> {
                let mut values = ::std::vec::Vec::new();
                #(#value_steps)*
                values
            }

            fn set_key(&mut self, key: Self::Key) -> ::pgfluent::OrmResult<()> {
                #set_key
            }

            fn read_row<R: ::pgfluent::DbRow>(
                &mut self,
                row: &R,
                index: &mut usize,
            ) -> ::pgfluent::OrmResult<()> {
                #(#read_steps)*
                ::std::result::Result::Ok(())
            }
        }
    })
}
