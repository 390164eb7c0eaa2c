//! Transaction-scoped sessions.
//!
//! [`Db::begin`] borrows the parent session's connection and returns a new
//! session bound to the transaction. `commit` and `rollback` consume that
//! session, so it cannot be used after either. Dropping it without committing
//! rolls the transaction back.
//!
//! ```ignore
//! let mut db = pgfluent::connect(&url).await?;
//!
//! let mut tx = db.begin().await?;
//! tx.create(&mut user).await?;
//! tx.commit().await?;
//! ```
//!
//! The [`transaction!`](crate::transaction!) macro commits on `Ok` and rolls
//! back on `Err`.

use crate::error::{OrmError, OrmResult};
use crate::session::Db;

/// Runs the given block inside a transaction session.
///
/// - Begins a transaction via `$db.begin().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `pgfluent::OrmResult<T>`.
///
/// ```ignore
/// pgfluent::transaction!(db, tx, {
///     tx.create(&mut user).await?;
///     tx.exec("UPDATE stats SET users = users + 1", pgfluent::args![]).await?;
///     Ok(())
/// })?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($db:expr, $tx:ident, $body:block) => {{
        #[allow(unused_mut)]
        let mut $tx = ($db).begin().await?;

        let __pgfluent_tx_body_result = async { $body }.await;
        match __pgfluent_tx_body_result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

fn log_failure(action: &'static str, err: &OrmError) {
    tracing::warn!(target: "pgfluent.tx", action, error = %err, "transaction step failed");
}

impl Db<tokio_postgres::Client> {
    /// Start a transaction.
    pub async fn begin(&mut self) -> OrmResult<Db<tokio_postgres::Transaction<'_>>> {
        let config = self.config().clone();
        let tx = self
            .connection_mut()
            .transaction()
            .await
            .map_err(OrmError::from_db_error)
            .inspect_err(|e| log_failure("begin", e))?;
        tracing::debug!(target: "pgfluent.tx", "begin");
        Ok(Db::with_config(tx, config))
    }
}

impl<'a> Db<tokio_postgres::Transaction<'a>> {
    /// Start a nested transaction backed by a savepoint.
    pub async fn begin(&mut self) -> OrmResult<Db<tokio_postgres::Transaction<'_>>> {
        let config = self.config().clone();
        let tx = self
            .connection_mut()
            .transaction()
            .await
            .map_err(OrmError::from_db_error)
            .inspect_err(|e| log_failure("savepoint", e))?;
        tracing::debug!(target: "pgfluent.tx", "savepoint");
        Ok(Db::with_config(tx, config))
    }

    pub async fn commit(self) -> OrmResult<()> {
        self.into_inner()
            .commit()
            .await
            .map_err(OrmError::from_db_error)
            .inspect_err(|e| log_failure("commit", e))?;
        tracing::debug!(target: "pgfluent.tx", "commit");
        Ok(())
    }

    pub async fn rollback(self) -> OrmResult<()> {
        self.into_inner()
            .rollback()
            .await
            .map_err(OrmError::from_db_error)
            .inspect_err(|e| log_failure("rollback", e))?;
        tracing::debug!(target: "pgfluent.tx", "rollback");
        Ok(())
    }
}

#[cfg(feature = "pool")]
impl Db<deadpool_postgres::Client> {
    /// Start a transaction on the pooled connection.
    pub async fn begin(&mut self) -> OrmResult<Db<deadpool_postgres::Transaction<'_>>> {
        let config = self.config().clone();
        let tx = self
            .connection_mut()
            .transaction()
            .await
            .map_err(OrmError::from_db_error)
            .inspect_err(|e| log_failure("begin", e))?;
        tracing::debug!(target: "pgfluent.tx", "begin");
        Ok(Db::with_config(tx, config))
    }
}

#[cfg(feature = "pool")]
impl<'a> Db<deadpool_postgres::Transaction<'a>> {
    pub async fn commit(self) -> OrmResult<()> {
        self.into_inner()
            .commit()
            .await
            .map_err(OrmError::from_db_error)
            .inspect_err(|e| log_failure("commit", e))?;
        tracing::debug!(target: "pgfluent.tx", "commit");
        Ok(())
    }

    pub async fn rollback(self) -> OrmResult<()> {
        self.into_inner()
            .rollback()
            .await
            .map_err(OrmError::from_db_error)
            .inspect_err(|e| log_failure("rollback", e))?;
        tracing::debug!(target: "pgfluent.tx", "rollback");
        Ok(())
    }
}
