//! Driver abstraction.
//!
//! A [`Driver`] executes compiled statements and opens row cursors. It is
//! implemented for plain `tokio_postgres` clients and transactions, for
//! pooled `deadpool-postgres` clients, and (with the `testing` feature) for
//! the scripted in-memory `memory::MemoryDriver`.

use crate::error::{OrmError, OrmResult};
use crate::row::DbRow;
use futures_core::Stream;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A forward-only cursor over a result set.
///
/// Dropping the cursor releases the result set.
pub trait RowCursor: Send {
    type Row: DbRow;

    /// The next row, or `None` once the result set is exhausted.
    fn next_row(&mut self) -> impl Future<Output = OrmResult<Option<Self::Row>>> + Send;
}

/// Something that can run SQL.
///
/// Both methods take Postgres-numbered (`$n`) SQL.
pub trait Driver: Send + Sync {
    type Cursor: RowCursor;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Execute a query and return a cursor over its rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = OrmResult<Self::Cursor>> + Send;
}

/// Cursor over a `tokio_postgres` row stream.
#[must_use]
pub struct PgCursor {
    inner: Pin<Box<tokio_postgres::RowStream>>,
}

impl PgCursor {
    pub fn new(stream: tokio_postgres::RowStream) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Rows affected, once the stream has been fully consumed.
    pub fn rows_affected(&self) -> Option<u64> {
        self.inner.rows_affected()
    }
}

impl std::fmt::Debug for PgCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCursor").finish_non_exhaustive()
    }
}

impl RowCursor for PgCursor {
    type Row = Row;

    async fn next_row(&mut self) -> OrmResult<Option<Row>> {
        match poll_fn(|cx| self.inner.as_mut().poll_next(cx)).await {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(OrmError::from_db_error(e)),
            None => Ok(None),
        }
    }
}

impl Driver for tokio_postgres::Client {
    type Cursor = PgCursor;

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        let stmt = tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(OrmError::from_db_error)?;
        tokio_postgres::Client::execute(self, &stmt, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<PgCursor> {
        let stmt = tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(OrmError::from_db_error)?;
        let stream = tokio_postgres::Client::query_raw(self, &stmt, params.iter().copied())
            .await
            .map_err(OrmError::from_db_error)?;
        Ok(PgCursor::new(stream))
    }
}

impl Driver for tokio_postgres::Transaction<'_> {
    type Cursor = PgCursor;

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        let stmt = tokio_postgres::Transaction::prepare(self, sql)
            .await
            .map_err(OrmError::from_db_error)?;
        tokio_postgres::Transaction::execute(self, &stmt, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<PgCursor> {
        let stmt = tokio_postgres::Transaction::prepare(self, sql)
            .await
            .map_err(OrmError::from_db_error)?;
        let stream = tokio_postgres::Transaction::query_raw(self, &stmt, params.iter().copied())
            .await
            .map_err(OrmError::from_db_error)?;
        Ok(PgCursor::new(stream))
    }
}

// ===== deadpool-postgres support =====
//
// Pooled connections outlive a single session, so their statements go through
// the per-connection statement cache.

#[cfg(feature = "pool")]
impl Driver for deadpool_postgres::ClientWrapper {
    type Cursor = PgCursor;

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        let stmt = self
            .prepare_cached(sql)
            .await
            .map_err(OrmError::from_db_error)?;
        tokio_postgres::Client::execute(self, &stmt, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<PgCursor> {
        let stmt = self
            .prepare_cached(sql)
            .await
            .map_err(OrmError::from_db_error)?;
        let stream = tokio_postgres::Client::query_raw(self, &stmt, params.iter().copied())
            .await
            .map_err(OrmError::from_db_error)?;
        Ok(PgCursor::new(stream))
    }
}

#[cfg(feature = "pool")]
impl Driver for deadpool_postgres::Client {
    type Cursor = PgCursor;

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        Driver::execute(&**self, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<PgCursor> {
        Driver::query(&**self, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl Driver for deadpool_postgres::Transaction<'_> {
    type Cursor = PgCursor;

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        let stmt = self
            .prepare_cached(sql)
            .await
            .map_err(OrmError::from_db_error)?;
        tokio_postgres::Transaction::execute(self, &stmt, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<PgCursor> {
        let stmt = self
            .prepare_cached(sql)
            .await
            .map_err(OrmError::from_db_error)?;
        let stream = tokio_postgres::Transaction::query_raw(self, &stmt, params.iter().copied())
            .await
            .map_err(OrmError::from_db_error)?;
        Ok(PgCursor::new(stream))
    }
}

// ===== Reference implementations =====

impl<C: Driver> Driver for &C {
    type Cursor = C::Cursor;

    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }

    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = OrmResult<C::Cursor>> + Send {
        (**self).query(sql, params)
    }
}
