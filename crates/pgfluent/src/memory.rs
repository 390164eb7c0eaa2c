//! In-memory driver for tests. Requires the `testing` feature.
//!
//! [`MemoryDriver`] records every statement it is asked to run and replays
//! queued results in order. Row values are stored in the Postgres binary
//! format, so decoding goes through the same `FromSql` impls a live
//! connection would use.
//!
//! ```ignore
//! use pgfluent::memory::{MemoryDriver, MemoryRow};
//! use pgfluent::{Db, Scalars};
//!
//! let driver = MemoryDriver::new();
//! driver.push_rows(vec![MemoryRow::new().col("username", "igor")]);
//!
//! let mut db = Db::new(&driver);
//! let mut names: Vec<String> = Vec::new();
//! db.table("users").pluck("username", &mut names).await?;
//! assert_eq!(driver.last_sql().as_deref(), Some("SELECT username FROM users"));
//! ```

use crate::driver::{Driver, RowCursor};
use crate::error::{OrmError, OrmResult};
use crate::row::DbRow;
use bytes::BytesMut;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

/// One statement the driver was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub sql: String,
    /// `Debug` rendering of each bound parameter.
    pub params: Vec<String>,
}

#[derive(Debug)]
enum Reply {
    Rows(Vec<MemoryRow>),
    Affected(u64),
    Fail(String),
}

/// Scripted driver.
///
/// Each `execute`/`query` pops the next queued reply. With nothing queued,
/// queries return no rows and executes affect zero rows.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    log: Mutex<Vec<Executed>>,
    replies: Mutex<VecDeque<Reply>>,
    open: Arc<AtomicUsize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result set.
    pub fn push_rows(&self, rows: Vec<MemoryRow>) -> &Self {
        lock(&self.replies).push_back(Reply::Rows(rows));
        self
    }

    /// Queue an affected-row count.
    pub fn push_affected(&self, n: u64) -> &Self {
        lock(&self.replies).push_back(Reply::Affected(n));
        self
    }

    /// Queue a failure.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        lock(&self.replies).push_back(Reply::Fail(message.into()));
        self
    }

    /// Every statement run so far, oldest first.
    pub fn executed(&self) -> Vec<Executed> {
        lock(&self.log).clone()
    }

    /// SQL of the most recent statement.
    pub fn last_sql(&self) -> Option<String> {
        lock(&self.log).last().map(|e| e.sql.clone())
    }

    /// Forget recorded statements.
    pub fn reset_log(&self) {
        lock(&self.log).clear();
    }

    /// Cursors handed out and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Option<Reply> {
        lock(&self.log).push(Executed {
            sql: sql.to_string(),
            params: params.iter().map(|p| format!("{p:?}")).collect(),
        });
        lock(&self.replies).pop_front()
    }
}

impl Driver for MemoryDriver {
    type Cursor = MemoryCursor;

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        match self.record(sql, params) {
            None => Ok(0),
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            Some(Reply::Fail(message)) => Err(OrmError::Other(message)),
        }
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<MemoryCursor> {
        let rows = match self.record(sql, params) {
            None | Some(Reply::Affected(_)) => Vec::new(),
            Some(Reply::Rows(rows)) => rows,
            Some(Reply::Fail(message)) => return Err(OrmError::Other(message)),
        };
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryCursor {
            rows: rows.into(),
            open: Arc::clone(&self.open),
        })
    }
}

/// Cursor over queued rows.
#[derive(Debug)]
pub struct MemoryCursor {
    rows: VecDeque<MemoryRow>,
    open: Arc<AtomicUsize>,
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RowCursor for MemoryCursor {
    type Row = MemoryRow;

    async fn next_row(&mut self) -> OrmResult<Option<MemoryRow>> {
        Ok(self.rows.pop_front())
    }
}

#[derive(Debug, Clone)]
enum Encoded {
    Null,
    Bytes(BytesMut),
    Failed(String),
}

#[derive(Debug, Clone)]
struct MemoryColumn {
    name: String,
    ty: Type,
    value: Encoded,
}

/// A row of binary-encoded values.
#[derive(Debug, Clone, Default)]
pub struct MemoryRow {
    columns: Vec<MemoryColumn>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column whose Postgres type is inferred from `T`.
    pub fn col<T>(self, name: &str, value: T) -> Self
    where
        T: ToSql + MemoryType,
    {
        self.typed(name, T::pg_type(), value)
    }

    /// Append a column with an explicit Postgres type.
    pub fn typed<T>(mut self, name: &str, ty: Type, value: T) -> Self
    where
        T: ToSql,
    {
        let mut buf = BytesMut::new();
        let encoded = match value.to_sql_checked(&ty, &mut buf) {
            Ok(IsNull::Yes) => Encoded::Null,
            Ok(IsNull::No) => Encoded::Bytes(buf),
            Err(e) => Encoded::Failed(e.to_string()),
        };
        self.columns.push(MemoryColumn {
            name: name.to_string(),
            ty,
            value: encoded,
        });
        self
    }
}

impl DbRow for MemoryRow {
    fn len(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(|c| c.name.as_str())
    }

    fn get_at<T>(&self, idx: usize) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        let column = self.columns.get(idx).ok_or_else(|| {
            OrmError::decode(idx.to_string(), format!("row has only {} column(s)", self.len()))
        })?;
        if !T::accepts(&column.ty) {
            return Err(OrmError::decode(
                &column.name,
                format!(
                    "cannot convert {} to {}",
                    column.ty,
                    std::any::type_name::<T>()
                ),
            ));
        }
        let raw = match &column.value {
            Encoded::Null => None,
            Encoded::Bytes(b) => Some(&b[..]),
            Encoded::Failed(message) => return Err(OrmError::decode(&column.name, message)),
        };
        T::from_sql_nullable(&column.ty, raw)
            .map_err(|e| OrmError::decode(&column.name, e.to_string()))
    }
}

/// Postgres type used by [`MemoryRow::col`].
pub trait MemoryType {
    fn pg_type() -> Type;
}

macro_rules! impl_memory_type {
    ($($ty:ty => $pg:expr),* $(,)?) => {
        $(
            impl MemoryType for $ty {
                fn pg_type() -> Type {
                    $pg
                }
            }
        )*
    };
}

impl_memory_type!(
    bool => Type::BOOL,
    i16 => Type::INT2,
    i32 => Type::INT4,
    i64 => Type::INT8,
    f32 => Type::FLOAT4,
    f64 => Type::FLOAT8,
    String => Type::TEXT,
    &str => Type::TEXT,
    Vec<u8> => Type::BYTEA,
    uuid::Uuid => Type::UUID,
    serde_json::Value => Type::JSONB,
    chrono::NaiveDate => Type::DATE,
    chrono::NaiveDateTime => Type::TIMESTAMP,
    chrono::DateTime<chrono::Utc> => Type::TIMESTAMPTZ,
);

impl<T: MemoryType> MemoryType for Option<T> {
    fn pg_type() -> Type {
        T::pg_type()
    }
}
