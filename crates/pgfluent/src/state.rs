//! Per-session query state.
//!
//! Chained builder calls append to a [`QueryState`]; every terminal call takes
//! the whole state out of the session (leaving an empty one behind) before it
//! compiles or executes anything, so the next chain always starts clean, even
//! when the terminal call fails or its future is dropped.

use crate::args::{Arg, Param, count_markers, expand_markers};
use crate::error::OrmError;
use crate::ident::escape_order;
use crate::model::{FieldValue, TableDesc};

/// One ANDed predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Predicate {
    pub(crate) sql: String,
    /// Caller-written text: parenthesized when combined with other predicates.
    pub(crate) textual: bool,
}

/// Accumulated builder state, owned by exactly one session.
///
/// `C` is the driver's cursor type, held when [`Db::raw`](crate::Db::raw)
/// has already opened a result set.
pub struct QueryState<C = ()> {
    pub(crate) tables: Vec<String>,
    pub(crate) models: Vec<&'static TableDesc>,
    pub(crate) joins: Vec<String>,
    pub(crate) join_values: Vec<Param>,
    pub(crate) select_fields: Option<String>,
    pub(crate) select_values: Vec<Param>,
    pub(crate) where_fields: Vec<Predicate>,
    pub(crate) where_values: Vec<Param>,
    pub(crate) order: Option<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) on_conflict: Option<String>,
    pub(crate) raw_rows: Option<C>,
    pub(crate) error: Option<OrmError>,
}

impl<C> Default for QueryState<C> {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            models: Vec::new(),
            joins: Vec::new(),
            join_values: Vec::new(),
            select_fields: None,
            select_values: Vec::new(),
            where_fields: Vec::new(),
            where_values: Vec::new(),
            order: None,
            limit: None,
            offset: None,
            on_conflict: None,
            raw_rows: None,
            error: None,
        }
    }
}

impl<C> std::fmt::Debug for QueryState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryState")
            .field("tables", &self.tables)
            .field("joins", &self.joins)
            .field("select_fields", &self.select_fields)
            .field("where_fields", &self.where_fields)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("on_conflict", &self.on_conflict)
            .field("raw_rows", &self.raw_rows.is_some())
            .field("error", &self.error)
            .finish()
    }
}

impl<C> QueryState<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when nothing has been accumulated since the last terminal call.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.models.is_empty()
            && self.joins.is_empty()
            && self.join_values.is_empty()
            && self.select_fields.is_none()
            && self.select_values.is_empty()
            && self.where_fields.is_empty()
            && self.where_values.is_empty()
            && self.order.is_none()
            && self.limit.is_none()
            && self.offset.is_none()
            && self.on_conflict.is_none()
            && self.raw_rows.is_none()
            && self.error.is_none()
    }

    /// Reset every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Move the accumulated state out, leaving an empty one.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Remember the first builder error; it is reported by the terminal call.
    pub(crate) fn fail(&mut self, err: OrmError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// The pending builder error, if any.
    pub(crate) fn take_error(&mut self) -> Result<(), OrmError> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn has_model(&self, desc: &TableDesc) -> bool {
        self.models.iter().any(|m| m.table() == desc.table())
    }

    /// The table a single-table statement (INSERT/UPDATE/DELETE) targets.
    pub(crate) fn primary_table(&self) -> Option<&str> {
        self.tables.first().map(String::as_str)
    }

    pub(crate) fn set_model(&mut self, desc: &'static TableDesc) {
        self.tables.push(desc.escaped_table());
        self.models.push(desc);
    }

    pub(crate) fn join(&mut self, expr: &str, args: Vec<Arg>) {
        match expand_markers(expr, args) {
            Ok((sql, params)) => {
                self.joins.push(sql);
                self.join_values.extend(params);
            }
            Err(err) => self.fail(err),
        }
    }

    pub(crate) fn select(&mut self, fields: &str, args: Vec<Arg>) {
        match expand_markers(fields, args) {
            Ok((sql, params)) => {
                self.select_fields = Some(sql);
                self.select_values = params;
            }
            Err(err) => self.fail(err),
        }
    }

    pub(crate) fn where_text(&mut self, predicate: &str, args: Vec<Arg>) {
        match expand_markers(predicate, args) {
            Ok((sql, params)) => {
                self.where_fields.push(Predicate { sql, textual: true });
                self.where_values.extend(params);
            }
            Err(err) => self.fail(err),
        }
    }

    /// By-example predicate.
    ///
    /// A non-blank primary key yields exactly `table.pk = ?`; otherwise every
    /// non-blank column becomes an equality, in column order.
    ///
    /// With no table context yet, the record's table becomes the FROM target.
    pub(crate) fn where_example(&mut self, desc: &'static TableDesc, values: &[FieldValue]) {
        if self.tables.is_empty() && self.joins.is_empty() {
            self.set_model(desc);
        }

        let columns = desc.columns();
        if let Some(pk) = desc.primary_key_index() {
            if let Some(value) = values.get(pk).filter(|v| !v.blank) {
                self.push_equality(desc, pk, value);
                return;
            }
        }

        for (i, value) in values.iter().enumerate().take(columns.len()) {
            if !value.blank {
                self.push_equality(desc, i, value);
            }
        }
    }

    /// `table.pk = ?` bound to the key column of `values`, blank or not.
    pub(crate) fn where_primary_key(
        &mut self,
        desc: &'static TableDesc,
        values: &[FieldValue],
    ) -> Result<(), OrmError> {
        let Some(pk) = desc.primary_key_index() else {
            return Err(OrmError::schema(format!(
                "{} has no primary key",
                desc.table()
            )));
        };
        let Some(value) = values.get(pk) else {
            return Err(OrmError::schema(format!(
                "{} has no value for its primary key",
                desc.table()
            )));
        };
        if self.tables.is_empty() && self.joins.is_empty() {
            self.set_model(desc);
        }
        self.push_equality(desc, pk, value);
        Ok(())
    }

    fn push_equality(&mut self, desc: &TableDesc, index: usize, value: &FieldValue) {
        let column = &desc.columns()[index];
        self.where_fields.push(Predicate {
            sql: format!("{} = ?", desc.qualified(column)),
            textual: false,
        });
        self.where_values.push(value.value.clone());
    }

    pub(crate) fn order(&mut self, expr: &str) {
        if expr.trim().is_empty() {
            return;
        }
        self.order = Some(escape_order(expr));
    }

    pub(crate) fn limit(&mut self, n: u64) {
        self.limit = Some(n);
    }

    pub(crate) fn offset(&mut self, n: u64) {
        self.offset = Some(n);
    }

    /// Stored verbatim; it takes no arguments, so `?` markers are refused.
    pub(crate) fn on_conflict(&mut self, clause: &str) {
        if count_markers(clause) > 0 {
            self.fail(OrmError::usage(format!(
                "ON CONFLICT clause `{clause}` cannot take `?` arguments"
            )));
            return;
        }
        self.on_conflict = Some(clause.trim().to_string());
    }

    /// `FROM` body: comma-separated model tables followed by raw joins.
    pub(crate) fn from_clause(&self) -> Option<String> {
        let mut out = self.tables.join(", ");
        for join in &self.joins {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(join);
        }
        (!out.is_empty()).then_some(out)
    }

    /// `WHERE` body, predicates ANDed in append order.
    pub(crate) fn where_clause(&self) -> Option<String> {
        match self.where_fields.as_slice() {
            [] => None,
            [only] => Some(only.sql.clone()),
            many => Some(
                many.iter()
                    .map(|p| {
                        if p.textual {
                            format!("({})", p.sql)
                        } else {
                            p.sql.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }
}
