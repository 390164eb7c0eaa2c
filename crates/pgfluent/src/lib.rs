//! # pgfluent
//!
//! A fluent, session-scoped query builder for Postgres that maps typed
//! records to rows and back.
//!
//! ## Features
//!
//! - **Records as tables**: `#[derive(Model)]` builds a cached column
//!   descriptor (table, columns in field order, primary key)
//! - **Fluent chains**: `model`, `joins`, `select`, `where_sql`,
//!   `where_record`, `order`, `limit`, `offset` accumulate state; the
//!   terminal call compiles, runs and resets it
//! - **`?` markers**: every fragment uses `?`; sequences expand in place and
//!   the whole statement is numbered `$1..$n` once
//! - **Shape-driven scans**: scalars, tuples, records, and appended sequences
//! - **Safe defaults**: DELETE and UPDATE require a predicate; blank records
//!   are never inserted
//! - **Transaction sessions**: `begin` / `commit` / `rollback`
//!
//! ## Example
//!
//! ```ignore
//! use pgfluent::{Model, Records, args};
//!
//! #[derive(Debug, Default, Clone, Model)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     counter: i64,
//!     username: String,
//!     lang: String,
//! }
//!
//! let mut db = pgfluent::connect(&database_url).await?;
//!
//! let mut user = User { username: "igor".into(), lang: "en".into(), ..Default::default() };
//! db.create(&mut user).await?;
//!
//! let mut found = User::default();
//! db.first(&mut found, user.counter).await?;
//!
//! let mut users = Vec::new();
//! db.model::<User>()
//!     .where_sql("counter IN (?)", args![vec![1_i64, 2, 3]])
//!     .order("counter desc")
//!     .scan(Records(&mut users))
//!     .await?;
//! ```
//!
//! ## Caveat
//!
//! `?` is always a parameter marker outside quoted text, so the jsonb `?`
//! operators cannot be written directly; use `jsonb_exists(col, ?)` and
//! friends instead.

pub mod args;
pub mod compile;
pub mod config;
pub mod driver;
pub mod error;
pub mod ident;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod model;
pub mod notify;
pub mod prelude;
pub mod row;
pub mod scan;
pub mod session;
pub mod state;
pub mod transaction;

#[cfg(test)]
mod fixtures;

pub use args::{Arg, IntoArg, Param};
pub use compile::Statement;
pub use config::{SessionConfig, connect};
pub use driver::{Driver, PgCursor, RowCursor};
pub use error::{OrmError, OrmResult};
pub use ident::{Ident, IdentPart};
pub use model::{Blank, ColumnDesc, FieldValue, Model, TableDesc, TableDescBuilder, field_value};
pub use row::{DbRow, next_column};
pub use scan::{BoxedRecords, Destination, Element, Record, Records, Scalar, Scalars, Shape};
pub use session::Db;
pub use state::QueryState;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use pgfluent_derive::Model;

// Re-export the driver crate so derived code and callers share one version.
pub use tokio_postgres;
