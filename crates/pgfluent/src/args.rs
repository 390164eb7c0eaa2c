//! Bound values and `?` marker handling.
//!
//! Fragments accumulated by the session use `?` as a dialect-neutral marker.
//! Arguments are bound positionally; an argument that is a sequence
//! ([`Arg::List`]) is spliced in place, so `"id IN (?)"` bound to `[1, 2, 3]`
//! becomes `"id IN (?,?,?)"` with three parameters.
//!
//! ```ignore
//! use pgfluent::args;
//!
//! db.model::<User>()
//!     .where_sql("lang = ? AND counter IN (?)", args!["en", vec![1_i64, 2, 3]])
//!     .pluck("username", &mut names)
//!     .await?;
//! ```

use crate::error::{OrmError, OrmResult};
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A type-erased bound parameter.
pub type Param = Arc<dyn ToSql + Sync + Send>;

/// One positional argument for a `?` marker.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Bound to exactly one marker.
    Value(Param),
    /// Expanded into one marker per element, preserving order.
    List(Vec<Param>),
}

impl Arg {
    /// Bind `value` as a single parameter.
    ///
    /// Use this for values that would otherwise be expanded, e.g. to bind a
    /// `Vec<String>` to a Postgres `text[]` column as one array value.
    pub fn value<T>(value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        Arg::Value(Arc::new(value))
    }

    /// Bind every element of `items` to its own marker.
    pub fn list<T, I>(items: I) -> Self
    where
        T: ToSql + Sync + Send + 'static,
        I: IntoIterator<Item = T>,
    {
        Arg::List(
            items
                .into_iter()
                .map(|v| Arc::new(v) as Param)
                .collect(),
        )
    }
}

/// Conversion into a positional [`Arg`].
///
/// Scalars become [`Arg::Value`]; `Vec<T>`, slices and arrays become
/// [`Arg::List`] and are expanded.
pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

macro_rules! impl_into_arg_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArg for $ty {
                fn into_arg(self) -> Arg {
                    Arg::value(self)
                }
            }
        )*
    };
}

impl_into_arg_value!(
    i8,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    bool,
    String,
    uuid::Uuid,
    serde_json::Value,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>,
    std::net::IpAddr,
);

#[cfg(feature = "rust_decimal")]
impl_into_arg_value!(rust_decimal::Decimal);

impl IntoArg for &str {
    fn into_arg(self) -> Arg {
        Arg::value(self.to_string())
    }
}

impl IntoArg for &String {
    fn into_arg(self) -> Arg {
        Arg::value(self.clone())
    }
}

impl<T> IntoArg for Option<T>
where
    T: ToSql + Sync + Send + 'static,
{
    fn into_arg(self) -> Arg {
        Arg::value(self)
    }
}

impl<T> IntoArg for Vec<T>
where
    T: ToSql + Sync + Send + 'static,
{
    fn into_arg(self) -> Arg {
        Arg::list(self)
    }
}

impl<T> IntoArg for &[T]
where
    T: ToSql + Clone + Sync + Send + 'static,
{
    fn into_arg(self) -> Arg {
        Arg::list(self.iter().cloned())
    }
}

impl<T, const N: usize> IntoArg for [T; N]
where
    T: ToSql + Sync + Send + 'static,
{
    fn into_arg(self) -> Arg {
        Arg::list(self)
    }
}

/// Build a `Vec<Arg>` from heterogeneous values.
///
/// ```ignore
/// let a = pgfluent::args![1_i64, "en", vec![1_i64, 2, 3]];
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::IntoArg::into_arg($value)),+]
    };
}

/// Rewrite every `?` marker outside quoted literals/identifiers.
///
/// `emit` receives the zero-based marker index and the output buffer.
pub(crate) fn rewrite_markers(text: &str, mut emit: impl FnMut(usize, &mut String)) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut quote: Option<char> = None;
    let mut index = 0;

    for c in text.chars() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    emit(index, &mut out);
                    index += 1;
                }
                _ => out.push(c),
            },
        }
    }
    out
}

/// Count `?` markers outside quoted literals/identifiers.
pub(crate) fn count_markers(text: &str) -> usize {
    let mut n = 0;
    rewrite_markers(text, |_, _| n += 1);
    n
}

/// Expand sequence arguments in a textual fragment.
///
/// Returns the fragment with list markers multiplied and the flat parameter
/// list, positionally aligned with the markers of the returned text.
pub fn expand_markers(text: &str, args: Vec<Arg>) -> OrmResult<(String, Vec<Param>)> {
    let markers = count_markers(text);
    if markers != args.len() {
        return Err(OrmError::usage(format!(
            "`{text}` has {markers} marker(s) but {} argument(s) were given",
            args.len()
        )));
    }

    let mut params = Vec::with_capacity(args.len());
    let mut lengths = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Arg::Value(v) => {
                lengths.push(None);
                params.push(v);
            }
            Arg::List(items) => {
                lengths.push(Some(items.len()));
                params.extend(items);
            }
        }
    }

    if lengths.iter().all(Option::is_none) {
        return Ok((text.to_string(), params));
    }

    let expanded = rewrite_markers(text, |i, out| match lengths[i] {
        None => out.push('?'),
        // `IN (NULL)` is valid SQL and matches nothing.
        Some(0) => out.push_str("NULL"),
        Some(n) => {
            for k in 0..n {
                if k > 0 {
                    out.push(',');
                }
                out.push('?');
            }
        }
    });
    Ok((expanded, params))
}
