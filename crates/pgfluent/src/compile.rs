//! Statement compilation.
//!
//! Turns a [`QueryState`] into Postgres SQL. Fragments are assembled with
//! `?` markers and numbered once, left to right, as the final step, so
//! `$1..$n` always match the order of [`Statement::params`].

use crate::args::{Param, rewrite_markers};
use crate::error::{OrmError, OrmResult};
use crate::ident::{Ident, escape_ident};
use crate::model::{FieldValue, TableDesc};
use crate::scan::Shape;
use crate::state::QueryState;
use std::fmt::Write as _;
use tokio_postgres::types::ToSql;

/// A compiled statement: numbered SQL plus its ordered parameters.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    fn numbered(sql: String, params: Vec<Param>) -> Self {
        Self {
            sql: number_markers(&sql),
            params,
        }
    }

    /// Borrowed parameters in the form drivers expect.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

/// Replace every `?` marker (outside quotes) with `$1`, `$2`, ...
pub fn number_markers(sql: &str) -> String {
    rewrite_markers(sql, |i, out| {
        let _ = write!(out, "${}", i + 1);
    })
}

/// Column list for a record-shaped destination.
///
/// Qualified with the model's table when that table is part of the FROM
/// clause, so joined tables sharing column names stay unambiguous.
fn projection<C>(state: &QueryState<C>, desc: &TableDesc) -> String {
    if state.has_model(desc) {
        desc.select_list()
    } else {
        desc.columns()
            .iter()
            .map(|c| escape_ident(c.column))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// `SELECT <projection> [FROM ..] [WHERE ..] [ORDER BY ..] [LIMIT n] [OFFSET n]`.
///
/// The projection is the explicit select list when one was set, otherwise the
/// record columns of `shape`, otherwise `*`.
pub fn compile_select<C>(state: &QueryState<C>, shape: &Shape) -> OrmResult<Statement> {
    let fields = match (&state.select_fields, shape.record()) {
        (Some(fields), _) => fields.clone(),
        (None, Some(desc)) => projection(state, desc),
        (None, None) => "*".to_string(),
    };

    let mut sql = format!("SELECT {fields}");
    if let Some(from) = state.from_clause() {
        sql.push_str(" FROM ");
        sql.push_str(&from);
    }
    if let Some(predicate) = state.where_clause() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate);
    }
    if let Some(order) = &state.order {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    if let Some(limit) = state.limit {
        let _ = write!(sql, " LIMIT {limit}");
    }
    if let Some(offset) = state.offset {
        let _ = write!(sql, " OFFSET {offset}");
    }

    let mut params = Vec::with_capacity(
        state.select_values.len() + state.join_values.len() + state.where_values.len(),
    );
    params.extend(state.select_values.iter().cloned());
    params.extend(state.join_values.iter().cloned());
    params.extend(state.where_values.iter().cloned());

    Ok(Statement::numbered(sql, params))
}

fn target_table<C>(state: &QueryState<C>, desc: &TableDesc) -> String {
    state
        .primary_table()
        .map(str::to_string)
        .unwrap_or_else(|| desc.escaped_table())
}

fn returning(desc: &TableDesc) -> String {
    desc.columns()
        .iter()
        .map(|c| escape_ident(c.column))
        .collect::<Vec<_>>()
        .join(",")
}

/// Non-blank, non-key columns of a record.
fn writable<'v>(
    desc: &TableDesc,
    values: &'v [FieldValue],
) -> impl Iterator<Item = (&'static str, &'v FieldValue)> {
    desc.columns()
        .iter()
        .zip(values)
        .filter(|(c, v)| !c.primary_key && !v.blank)
        .map(|(c, v)| (c.column, v))
}

/// `INSERT INTO t (cols) VALUES (..) [ON CONFLICT ..] RETURNING <all columns>`.
///
/// Blank fields and the primary key are left out so server defaults and
/// generated keys apply; `RETURNING` reads them back.
pub fn compile_insert<C>(
    state: &QueryState<C>,
    desc: &TableDesc,
    values: &[FieldValue],
) -> OrmResult<Statement> {
    let table = target_table(state, desc);

    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (column, value) in writable(desc, values) {
        columns.push(escape_ident(column));
        params.push(value.value.clone());
    }
    if columns.is_empty() {
        return Err(OrmError::usage(format!(
            "nothing to insert into {table}: every field is blank"
        )));
    }

    let markers = vec!["?"; columns.len()].join(",");
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({markers})",
        columns.join(",")
    );
    if let Some(clause) = &state.on_conflict {
        sql.push_str(" ON CONFLICT ");
        sql.push_str(clause);
    }
    sql.push_str(" RETURNING ");
    sql.push_str(&returning(desc));

    Ok(Statement::numbered(sql, params))
}

/// `UPDATE t SET c = ?, .. WHERE .. RETURNING <all columns>`.
pub fn compile_update<C>(
    state: &QueryState<C>,
    desc: &TableDesc,
    values: &[FieldValue],
) -> OrmResult<Statement> {
    let table = target_table(state, desc);
    let predicate = state
        .where_clause()
        .ok_or_else(|| OrmError::usage(format!("UPDATE {table} requires a WHERE clause")))?;

    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (column, value) in writable(desc, values) {
        assignments.push(format!("{} = ?", escape_ident(column)));
        params.push(value.value.clone());
    }
    if assignments.is_empty() {
        return Err(OrmError::usage(format!(
            "nothing to update in {table}: every non-key field is blank"
        )));
    }
    params.extend(state.where_values.iter().cloned());

    let sql = format!(
        "UPDATE {table} SET {} WHERE {predicate} RETURNING {}",
        assignments.join(", "),
        returning(desc)
    );
    Ok(Statement::numbered(sql, params))
}

/// `DELETE FROM t WHERE ..`. A missing predicate is always an error.
pub fn compile_delete<C>(state: &QueryState<C>, desc: &TableDesc) -> OrmResult<Statement> {
    let table = target_table(state, desc);
    let predicate = state.where_clause().ok_or_else(|| {
        OrmError::usage(format!(
            "DELETE FROM {table} requires a WHERE clause or a non-blank record"
        ))
    })?;

    let sql = format!("DELETE FROM {table} WHERE {predicate}");
    Ok(Statement::numbered(sql, state.where_values.clone()))
}

/// `LISTEN "channel"`.
pub fn compile_listen(channel: &str) -> OrmResult<Statement> {
    Ok(Statement {
        sql: format!("LISTEN {}", channel_ident(channel)?),
        params: Vec::new(),
    })
}

/// `UNLISTEN "channel"`; `"*"` unsubscribes from every channel.
pub fn compile_unlisten(channel: &str) -> OrmResult<Statement> {
    let target = if channel == "*" {
        "*".to_string()
    } else {
        channel_ident(channel)?
    };
    Ok(Statement {
        sql: format!("UNLISTEN {target}"),
        params: Vec::new(),
    })
}

/// Notify `channel`, joining `payloads` with `,`.
///
/// With a payload the channel and payload are bound through `pg_notify`;
/// without one a plain `NOTIFY "channel"` is sent.
pub fn compile_notify(channel: &str, payloads: &[&str]) -> OrmResult<Statement> {
    let quoted = channel_ident(channel)?;
    let payload = payloads.join(",");
    if payload.is_empty() {
        return Ok(Statement {
            sql: format!("NOTIFY {quoted}"),
            params: Vec::new(),
        });
    }
    Ok(Statement {
        sql: "SELECT pg_notify($1, $2)".to_string(),
        params: vec![
            std::sync::Arc::new(channel.to_string()) as Param,
            std::sync::Arc::new(payload) as Param,
        ],
    })
}

/// Channels are a single identifier: dots are part of the name.
fn channel_ident(channel: &str) -> OrmResult<String> {
    Ok(Ident::quoted(channel)?.to_sql())
}
