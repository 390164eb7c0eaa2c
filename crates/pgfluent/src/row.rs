//! Positional row access

use crate::error::{OrmError, OrmResult};
use tokio_postgres::types::FromSql;

/// A result row with positional, typed column access.
///
/// Implemented for `tokio_postgres::Row` and, with the `testing` feature,
/// for the in-memory `memory::MemoryRow`.
pub trait DbRow: Send {
    /// Number of columns in the row.
    fn len(&self) -> usize;

    /// Whether the row has no columns.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the column at `idx`, if the row carries names.
    fn column_name(&self, idx: usize) -> Option<&str>;

    /// Decode the column at `idx`.
    fn get_at<T>(&self, idx: usize) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;
}

/// Decode the column at `*index` and advance the index.
///
/// Used by derived [`Model::read_row`](crate::Model::read_row) impls so
/// columns are consumed strictly in descriptor order.
pub fn next_column<T, R>(row: &R, index: &mut usize) -> OrmResult<T>
where
    T: for<'a> FromSql<'a>,
    R: DbRow,
{
    if *index >= row.len() {
        return Err(OrmError::decode(
            index.to_string(),
            format!("row has only {} column(s)", row.len()),
        ));
    }
    let value = row.get_at(*index)?;
    *index += 1;
    Ok(value)
}

impl DbRow for tokio_postgres::Row {
    fn len(&self) -> usize {
        tokio_postgres::Row::len(self)
    }

    fn column_name(&self, idx: usize) -> Option<&str> {
        self.columns().get(idx).map(|c| c.name())
    }

    fn get_at<T>(&self, idx: usize) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(idx).map_err(|e| {
            let column = self
                .column_name(idx)
                .map(str::to_string)
                .unwrap_or_else(|| idx.to_string());
            OrmError::decode(column, e.to_string())
        })
    }
}
