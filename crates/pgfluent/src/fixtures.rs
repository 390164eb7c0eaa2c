//! Hand-written models shared by unit tests.

use crate::error::{OrmError, OrmResult};
use crate::model::{FieldValue, Model, TableDesc, field_value};
use crate::row::{DbRow, next_column};
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct User {
    pub counter: i64,
    pub username: String,
    pub lang: String,
    pub email: Option<String>,
    pub cached_rank: i32,
}

impl Model for User {
    type Key = i64;

    fn describe() -> &'static TableDesc {
        static DESC: OnceLock<TableDesc> = OnceLock::new();
        DESC.get_or_init(|| {
            TableDesc::builder("users")
                .column("counter", "counter", true)
                .column("username", "username", false)
                .column("lang", "lang", false)
                .column("email", "email", false)
                .ignore("cached_rank")
                .build()
        })
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            field_value(&self.counter),
            field_value(&self.username),
            field_value(&self.lang),
            field_value(&self.email),
        ]
    }

    fn set_key(&mut self, key: i64) -> OrmResult<()> {
        self.counter = key;
        Ok(())
    }

    fn read_row<R: DbRow>(&mut self, row: &R, index: &mut usize) -> OrmResult<()> {
        self.counter = next_column(row, index)?;
        self.username = next_column(row, index)?;
        self.lang = next_column(row, index)?;
        self.email = next_column(row, index)?;
        Ok(())
    }
}

/// A model without a primary key.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Event {
    pub channel: String,
    pub payload: String,
}

impl Model for Event {
    type Key = ();

    fn describe() -> &'static TableDesc {
        static DESC: OnceLock<TableDesc> = OnceLock::new();
        DESC.get_or_init(|| {
            TableDesc::builder("events")
                .column("channel", "channel", false)
                .column("payload", "payload", false)
                .build()
        })
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![field_value(&self.channel), field_value(&self.payload)]
    }

    fn set_key(&mut self, _key: ()) -> OrmResult<()> {
        Err(OrmError::schema("events has no primary key"))
    }

    fn read_row<R: DbRow>(&mut self, row: &R, index: &mut usize) -> OrmResult<()> {
        self.channel = next_column(row, index)?;
        self.payload = next_column(row, index)?;
        Ok(())
    }
}

pub(crate) fn user_row(counter: i64, username: &str, lang: &str) -> crate::memory::MemoryRow {
    crate::memory::MemoryRow::new()
        .col("counter", counter)
        .col("username", username)
        .col("lang", lang)
        .col("email", None::<String>)
}
