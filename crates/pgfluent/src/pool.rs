//! Pooled sessions.
//!
//! A pool hands out `deadpool_postgres::Client`s, which are themselves
//! [`Driver`](crate::Driver)s (statements are prepared through the
//! per-connection cache). [`session`] checks one out and wraps it in a
//! [`Db`]; the connection goes back to the pool when the session drops.
//!
//! ```ignore
//! let pool = pgfluent::create_pool(&database_url)?;
//!
//! let mut db = pgfluent::pool::session(&pool).await?;
//! let mut users: Vec<User> = Vec::new();
//! db.model::<User>().scan(Records(&mut users)).await?;
//! ```

use crate::error::{OrmError, OrmResult};
use crate::session::Db;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

const DEFAULT_MAX_SIZE: usize = 16;

/// Pool of up to 16 plain (`NoTls`) connections.
pub fn create_pool(database_url: &str) -> OrmResult<Pool> {
    create_pool_with_config(database_url, DEFAULT_MAX_SIZE)
}

/// Pool of up to `max_size` plain connections.
///
/// Connections are opened lazily on first checkout and recycled with a
/// cheap liveness check (`RecyclingMethod::Fast`).
pub fn create_pool_with_config(database_url: &str, max_size: usize) -> OrmResult<Pool> {
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;

    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}

/// Check a client out of `pool` and wrap it in a session.
pub async fn session(pool: &Pool) -> OrmResult<Db<deadpool_postgres::Client>> {
    let client = pool.get().await?;
    Ok(Db::new(client))
}
