//! Derive macros for pgfluent
//!
//! Provides `#[derive(Model)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod model;

/// Derive `pgfluent::Model` for a struct.
///
/// # Example
///
/// ```ignore
/// use pgfluent::Model;
///
/// #[derive(Debug, Default, Clone, Model)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     counter: i64,
///     username: String,
///     #[orm(column = "lang")]
///     language: String,
///     #[orm(skip)]
///     profile: Option<Profile>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Specify table name (required)
/// - `#[orm(id)]` - Mark the primary-key field (at most one)
/// - `#[orm(column = "name")]` - Map field to a different column name;
///   otherwise the snake_case field name is used
/// - `#[orm(skip)]` - Never read, write, or select this field
/// - `#[orm(flatten)]` - Splice the columns of an embedded `Model`
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
