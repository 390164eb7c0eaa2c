//! Record introspection.
//!
//! A [`Model`] exposes a [`TableDesc`]: the table name, the persisted columns
//! in field declaration order, and the primary key. The descriptor is built
//! once per type (derived code caches it in a `OnceLock`) and every compile
//! and scan step reads columns in that same order.
//!
//! ```ignore
//! use pgfluent::Model;
//!
//! #[derive(Debug, Default, Clone, Model)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     counter: i64,
//!     username: String,
//!     #[orm(column = "lang")]
//!     language: String,
//!     #[orm(skip)]
//!     profile: Profile,
//! }
//! ```

use crate::args::Param;
use crate::error::OrmResult;
use crate::ident::escape_ident;
use crate::row::DbRow;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// One persisted column of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDesc {
    /// Rust field name; flattened columns keep the embedded struct's field name.
    pub field: &'static str,
    /// Column name in the table.
    pub column: &'static str,
    /// Whether this column is the model's primary key.
    pub primary_key: bool,
}

/// Static description of a model's table.
#[derive(Debug, Clone)]
pub struct TableDesc {
    table: &'static str,
    columns: Vec<ColumnDesc>,
    ignored: Vec<&'static str>,
}

impl TableDesc {
    /// Start describing `table`.
    pub fn builder(table: &'static str) -> TableDescBuilder {
        TableDescBuilder {
            desc: TableDesc {
                table,
                columns: Vec::new(),
                ignored: Vec::new(),
            },
        }
    }

    /// Unescaped table name.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Quoted table name, e.g. `"users"`.
    pub fn escaped_table(&self) -> String {
        escape_ident(self.table)
    }

    /// Persisted columns in declaration order.
    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    /// Fields that are never read, written, or selected.
    pub fn ignored(&self) -> &[&'static str] {
        &self.ignored
    }

    /// Index of the primary-key column within [`TableDesc::columns`].
    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    /// The primary-key column, if one is declared.
    pub fn primary_key(&self) -> Option<&ColumnDesc> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// `"table"."column"` for one column of this table.
    pub fn qualified(&self, column: &ColumnDesc) -> String {
        format!("{}.{}", self.escaped_table(), escape_ident(column.column))
    }

    /// Comma-separated, qualified list of every persisted column.
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| self.qualified(c))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Builder used by derived [`Model::describe`] impls.
#[derive(Debug)]
pub struct TableDescBuilder {
    desc: TableDesc,
}

impl TableDescBuilder {
    /// Append a persisted column.
    pub fn column(mut self, field: &'static str, column: &'static str, primary_key: bool) -> Self {
        self.desc.columns.push(ColumnDesc {
            field,
            column,
            primary_key,
        });
        self
    }

    /// Record a field that is excluded from storage.
    pub fn ignore(mut self, field: &'static str) -> Self {
        self.desc.ignored.push(field);
        self
    }

    /// Splice the columns of an embedded model.
    ///
    /// The embedded model's primary key does not carry over: only the outer
    /// model's own `#[orm(id)]` field is a key.
    pub fn flatten(mut self, nested: &TableDesc) -> Self {
        self.desc
            .columns
            .extend(nested.columns.iter().map(|c| ColumnDesc {
                primary_key: false,
                ..*c
            }));
        self
    }

    pub fn build(self) -> TableDesc {
        self.desc
    }
}

/// The value of one persisted column, paired with its blank flag.
#[derive(Debug, Clone)]
pub struct FieldValue {
    /// `true` when the value is the zero value of its type.
    pub blank: bool,
    /// The value to bind.
    pub value: Param,
}

/// Capture a field for binding.
pub fn field_value<T>(value: &T) -> FieldValue
where
    T: ToSql + Blank + Clone + Sync + Send + 'static,
{
    FieldValue {
        blank: value.is_blank(),
        value: Arc::new(value.clone()),
    }
}

/// A record type mapped to a table.
///
/// Usually derived with `#[derive(Model)]`.
pub trait Model: Send + Sync + 'static {
    /// Type of the primary-key field; `()` when the model has none.
    type Key: Send;

    /// The cached table descriptor.
    fn describe() -> &'static TableDesc;

    /// One [`FieldValue`] per persisted column, in descriptor order.
    fn values(&self) -> Vec<FieldValue>;

    /// Assign the primary-key field.
    ///
    /// Returns [`OrmError::Schema`](crate::OrmError::Schema) for models
    /// without a primary key.
    fn set_key(&mut self, key: Self::Key) -> OrmResult<()>;

    /// Decode persisted columns positionally, starting at `*index`.
    ///
    /// Ignored fields are left untouched.
    fn read_row<R: DbRow>(&mut self, row: &R, index: &mut usize) -> OrmResult<()>;
}

/// Zero-value detection.
///
/// Blank fields are left out of INSERT/UPDATE (so server defaults apply) and
/// out of by-example predicates.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

macro_rules! impl_blank_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Blank for $ty {
                fn is_blank(&self) -> bool {
                    *self == <$ty>::default()
                }
            }
        )*
    };
}

impl_blank_default!(
    i8,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    bool,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>,
);

#[cfg(feature = "rust_decimal")]
impl Blank for rust_decimal::Decimal {
    fn is_blank(&self) -> bool {
        self.is_zero()
    }
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for &str {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.is_none()
    }
}

impl Blank for uuid::Uuid {
    fn is_blank(&self) -> bool {
        self.is_nil()
    }
}

impl Blank for serde_json::Value {
    fn is_blank(&self) -> bool {
        match self {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl Blank for std::net::IpAddr {
    fn is_blank(&self) -> bool {
        self.is_unspecified()
    }
}

impl<T> Blank for tokio_postgres::types::Json<T>
where
    T: Blank,
{
    fn is_blank(&self) -> bool {
        self.0.is_blank()
    }
}
