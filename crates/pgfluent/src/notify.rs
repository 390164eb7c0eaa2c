//! LISTEN/UNLISTEN/NOTIFY on the session's connection.
//!
//! Only the sending side lives here; notifications are delivered on the
//! connection's message stream, which the caller owns.

use crate::compile::{compile_listen, compile_notify, compile_unlisten};
use crate::driver::Driver;
use crate::error::OrmResult;
use crate::session::Db;

impl<C: Driver> Db<C> {
    /// `LISTEN "channel"`.
    pub async fn listen(&mut self, channel: &str) -> OrmResult<()> {
        let stmt = compile_listen(channel)?;
        self.run("listen", &stmt).await?;
        Ok(())
    }

    /// `UNLISTEN "channel"`; pass `"*"` to stop listening on every channel.
    pub async fn unlisten(&mut self, channel: &str) -> OrmResult<()> {
        let stmt = compile_unlisten(channel)?;
        self.run("unlisten", &stmt).await?;
        Ok(())
    }

    /// Send a notification. Payloads are joined with `,`.
    pub async fn notify(&mut self, channel: &str, payloads: &[&str]) -> OrmResult<()> {
        let stmt = compile_notify(channel, payloads)?;
        self.run("notify", &stmt).await?;
        Ok(())
    }
}
