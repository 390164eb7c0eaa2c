//! The fluent session handle.
//!
//! # Example
//!
//! ```ignore
//! use pgfluent::{Records, args};
//!
//! let mut db = pgfluent::connect(&std::env::var("DATABASE_URL")?).await?;
//!
//! let mut users: Vec<User> = Vec::new();
//! db.model::<User>()
//!     .where_sql("lang = ?", args!["en"])
//!     .order("counter desc")
//!     .limit(10)
//!     .scan(Records(&mut users))
//!     .await?;
//! ```
//!
//! Chained calls only record state. Errors they hit (e.g. a marker count that
//! does not match the arguments) are held and returned by the terminal call.

use crate::args::{Arg, expand_markers};
use crate::compile::{
    Statement, compile_delete, compile_insert, compile_select, compile_update, number_markers,
};
use crate::config::SessionConfig;
use crate::driver::{Driver, RowCursor};
use crate::error::OrmResult;
use crate::model::Model;
use crate::scan::{Destination, Record, Scalar, Scalars, materialize};
use crate::state::QueryState;
use tokio_postgres::types::FromSql;

/// A session: one driver target plus the query state of the chain being built.
pub struct Db<C: Driver> {
    conn: C,
    state: QueryState<C::Cursor>,
    config: SessionConfig,
}

impl<C: Driver> std::fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: Driver> Db<C> {
    /// Wrap a driver with default settings.
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, SessionConfig::default())
    }

    pub fn with_config(conn: C, config: SessionConfig) -> Self {
        Self {
            conn,
            state: QueryState::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    /// The underlying driver.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    /// State accumulated since the last terminal call.
    pub fn state(&self) -> &QueryState<C::Cursor> {
        &self.state
    }

    // ===== chain =====

    /// Add `M`'s table to the FROM list.
    pub fn model<M: Model>(&mut self) -> &mut Self {
        self.state.set_model(M::describe());
        self
    }

    /// Append a raw FROM/JOIN fragment. `?` markers are bound to `args`.
    pub fn joins(&mut self, expr: &str, args: Vec<Arg>) -> &mut Self {
        self.state.join(expr, args);
        self
    }

    /// Append a raw table expression, e.g. `"users u"`.
    pub fn table(&mut self, expr: &str) -> &mut Self {
        self.state.join(expr, Vec::new());
        self
    }

    /// Replace the projection.
    pub fn select(&mut self, fields: &str, args: Vec<Arg>) -> &mut Self {
        self.state.select(fields, args);
        self
    }

    /// AND a textual predicate. Sequence arguments expand in place.
    pub fn where_sql(&mut self, predicate: &str, args: Vec<Arg>) -> &mut Self {
        self.state.where_text(predicate, args);
        self
    }

    /// AND a by-example predicate built from `record`.
    ///
    /// A non-blank primary key is matched alone; otherwise every non-blank
    /// column is matched.
    pub fn where_record<M: Model>(&mut self, record: &M) -> &mut Self {
        self.state.where_example(M::describe(), &record.values());
        self
    }

    /// Set `ORDER BY`; the leading identifier of each item is quoted.
    pub fn order(&mut self, expr: &str) -> &mut Self {
        self.state.order(expr);
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.state.limit(n);
        self
    }

    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.state.offset(n);
        self
    }

    /// `ON CONFLICT <clause>` for the next [`Db::create`].
    pub fn on_conflict(&mut self, clause: &str) -> &mut Self {
        self.state.on_conflict(clause);
        self
    }

    // ===== terminal =====

    /// Compile the pending SELECT (or use the cursor opened by [`Db::raw`])
    /// and materialize into `dest`.
    pub async fn scan<D: Destination>(&mut self, mut dest: D) -> OrmResult<()> {
        let mut state = self.state.take();
        state.take_error()?;
        let shape = dest.shape();
        shape.validate()?;

        let cursor = match state.raw_rows.take() {
            Some(cursor) => cursor,
            None => {
                let stmt = compile_select(&state, &shape)?;
                self.open("select", &stmt).await?
            }
        };
        materialize(cursor, &mut dest).await?;
        Ok(())
    }

    /// Append the values of one column of every matching row.
    pub async fn pluck<T>(&mut self, column: &str, dest: &mut Vec<T>) -> OrmResult<()>
    where
        T: for<'r> FromSql<'r> + Send,
    {
        self.state.select(column, Vec::new());
        self.scan(Scalars(dest)).await
    }

    /// `count(*)` of the pending query.
    pub async fn count(&mut self, dest: &mut i64) -> OrmResult<()> {
        self.state.select("count(*)", Vec::new());
        self.scan(Scalar(dest)).await
    }

    /// Load the record whose primary key is `key` into `dest`.
    ///
    /// The lookup is always by key, even a blank one such as `0`; the other
    /// fields of `dest` never narrow it. Returns
    /// [`OrmError::NotFound`](crate::OrmError::NotFound) and leaves `dest`
    /// untouched when no row matches.
    pub async fn first<M>(&mut self, dest: &mut M, key: M::Key) -> OrmResult<()>
    where
        M: Model + Clone,
    {
        let mut keyed = dest.clone();
        let located = keyed
            .set_key(key)
            .and_then(|()| self.state.where_primary_key(M::describe(), &keyed.values()));
        if let Err(err) = located {
            self.state.clear();
            return Err(err);
        }
        if self.state.limit.is_none() {
            self.state.limit(1);
        }
        self.scan(Record(dest)).await
    }

    /// Insert `record` and read back every column.
    ///
    /// Blank fields and the primary key are omitted so server defaults and
    /// generated keys apply. With an `ON CONFLICT .. DO NOTHING` clause that
    /// skips the row, `record` is left as it was.
    pub async fn create<M>(&mut self, record: &mut M) -> OrmResult<()>
    where
        M: Model + Clone,
    {
        let mut state = self.state.take();
        state.take_error()?;

        let stmt = compile_insert(&state, M::describe(), &record.values())?;
        let mut cursor = self.open("insert", &stmt).await?;
        if let Some(row) = cursor.next_row().await? {
            Record(record).accept(&row)?;
        }
        Ok(())
    }

    /// Update the non-blank, non-key fields of `record`.
    ///
    /// Without a `where_*` predicate the record itself selects the row (by
    /// primary key when set). Returns the number of rows updated; the first
    /// updated row is read back into `record`.
    pub async fn updates<M>(&mut self, record: &mut M) -> OrmResult<u64>
    where
        M: Model + Clone,
    {
        let mut state = self.state.take();
        state.take_error()?;

        let desc = M::describe();
        let values = record.values();
        if state.where_fields.is_empty() {
            state.where_example(desc, &values);
        }
        let stmt = compile_update(&state, desc, &values)?;

        let mut cursor = self.open("update", &stmt).await?;
        let mut n = 0;
        while let Some(row) = cursor.next_row().await? {
            if n == 0 {
                Record(&mut *record).accept(&row)?;
            }
            n += 1;
        }
        Ok(n)
    }

    /// Delete rows matching the pending predicate, or `record` by example.
    ///
    /// A delete with no predicate at all is refused before anything is sent.
    pub async fn delete<M: Model>(&mut self, record: &M) -> OrmResult<u64> {
        let mut state = self.state.take();
        state.take_error()?;

        let desc = M::describe();
        if state.where_fields.is_empty() {
            state.where_example(desc, &record.values());
        }
        let stmt = compile_delete(&state, desc)?;
        self.run("delete", &stmt).await
    }

    /// Execute raw SQL with `?` markers. Independent of the pending chain,
    /// except that an unread [`Db::raw`] result set is dropped first.
    pub async fn exec(&mut self, sql: &str, args: Vec<Arg>) -> OrmResult<u64> {
        self.state.raw_rows = None;
        let stmt = raw_statement(sql, args)?;
        self.run("exec", &stmt).await
    }

    /// Run a raw query now; the next [`Db::scan`] reads its rows instead of
    /// compiling the pending state.
    ///
    /// The result set stays open on the connection until that scan. A later
    /// [`Db::exec`] or another `raw` call discards it unread.
    ///
    /// ```ignore
    /// db.raw("SELECT counter FROM users WHERE lang = ?", args!["en"])
    ///     .await?
    ///     .scan(Scalars(&mut counters))
    ///     .await?;
    /// ```
    pub async fn raw(&mut self, sql: &str, args: Vec<Arg>) -> OrmResult<&mut Self> {
        self.state.raw_rows = None;
        let opened = match raw_statement(sql, args) {
            Ok(stmt) => self.open("raw", &stmt).await,
            Err(err) => Err(err),
        };
        match opened {
            Ok(cursor) => {
                self.state.raw_rows = Some(cursor);
                Ok(self)
            }
            Err(err) => {
                self.state.clear();
                Err(err)
            }
        }
    }

    // ===== driver calls =====

    pub(crate) async fn open(&self, kind: &'static str, stmt: &Statement) -> OrmResult<C::Cursor> {
        self.config
            .log_statement(kind, &stmt.sql, stmt.params.len());
        self.conn
            .query(&stmt.sql, &stmt.params_ref())
            .await
            .inspect_err(|e| {
                tracing::warn!(target: "pgfluent.sql", kind, error = %e, "statement failed");
            })
    }

    pub(crate) async fn run(&self, kind: &'static str, stmt: &Statement) -> OrmResult<u64> {
        self.config
            .log_statement(kind, &stmt.sql, stmt.params.len());
        self.conn
            .execute(&stmt.sql, &stmt.params_ref())
            .await
            .inspect_err(|e| {
                tracing::warn!(target: "pgfluent.sql", kind, error = %e, "statement failed");
            })
    }
}

fn raw_statement(sql: &str, args: Vec<Arg>) -> OrmResult<Statement> {
    let (text, params) = expand_markers(sql, args)?;
    Ok(Statement {
        sql: number_markers(&text),
        params,
    })
}

#[cfg(test)]
mod tests;
