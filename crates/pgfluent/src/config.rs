//! Session configuration and connection bootstrap.

use crate::error::{OrmError, OrmResult};
use crate::session::Db;
use tokio_postgres::NoTls;
use tracing::Level;

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Emit one `tracing` event per statement on target `pgfluent.sql`.
    pub log_statements: bool,
    /// Event level for statement logging.
    pub level: Level,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_statements: true,
            level: Level::DEBUG,
            max_logged_sql: Some(200),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn statement logging on or off.
    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_logged_sql(mut self, len: usize) -> Self {
        self.max_logged_sql = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql = None;
        self
    }

    fn truncate<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_logged_sql {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end]).into()
            }
            _ => sql.into(),
        }
    }

    /// Log a statement right before it is handed to the driver.
    pub(crate) fn log_statement(&self, kind: &'static str, sql: &str, param_count: usize) {
        if !self.log_statements {
            return;
        }

        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN => tracing::warn!($($field)*),
                    Level::INFO => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate(sql);
        emit_at_level!(
            self.level,
            target: "pgfluent.sql",
            kind,
            param_count,
            sql = %sql,
        );
    }
}

/// Connect to `database_url` without TLS and return a session.
///
/// The connection task is spawned on the current tokio runtime; it logs and
/// exits when the connection closes.
///
/// ```ignore
/// let mut db = pgfluent::connect("postgres://postgres@localhost/igor").await?;
/// ```
pub async fn connect(database_url: &str) -> OrmResult<Db<tokio_postgres::Client>> {
    let config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;

    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| OrmError::Connection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(target: "pgfluent", error = %e, "connection closed with error");
        }
    });

    Ok(Db::new(client))
}
