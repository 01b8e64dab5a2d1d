//! Connection lifecycle.
//!
//! [`Database`] owns the process-wide state of the storage layer: the driver
//! (with its monitor attachment) and the pool of the most recently built
//! client. `connect` and `disconnect` take `&mut self`, so calls on one
//! `Database` are serialized by construction; share it across tasks behind a
//! `tokio::sync::Mutex` if several tasks need to reconnect.

use crate::config::DbConfig;
use crate::db::client::Client;
use crate::db::driver::{Driver, DriverOptions};
use crate::db::pool::DbPool;
use crate::error::DbResult;
use crate::monitor::{BestEffort, DbLogger, Monitor, Theme, TracingLogger};
use std::sync::Arc;
use tracing::{error, info};

const CONNECT_EXCEPTION: &str = "database connect exception - ";
const DISCONNECT_EXCEPTION: &str = "database disconnect exception - ";

/// Theme selected for monitor output on every connect.
pub const CONNECT_THEME: Theme = Theme::Matrix;

#[derive(Debug, Default)]
pub struct Database {
    driver: Driver,
    /// Pool of the client returned by the last successful `connect`.
    current: Option<DbPool>,
}

impl Database {
    pub fn new(options: DriverOptions) -> Self {
        Self::with_driver(Driver::new(options))
    }

    pub fn with_driver(driver: Driver) -> Self {
        Self {
            driver,
            current: None,
        }
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn monitor(&self) -> &Monitor {
        self.driver.monitor()
    }

    /// True while a pool created by `connect` is still owned by this database.
    pub fn has_pool(&self) -> bool {
        self.current.is_some()
    }

    /// Connect to the database described by `config` and bring its schema up
    /// to date.
    ///
    /// `config.user` is filled from `$USER` when absent. Monitor output for
    /// the events in `config.log_events` is redirected to
    /// `logger.log(event, text)`. The pool of the previous client is ended
    /// before the new one is built; connections still leased from it do not
    /// hold up the call.
    ///
    /// Fails when the client cannot be built or a migration fails; no client
    /// is returned in that case and the new pool is closed.
    pub async fn connect(
        &mut self,
        config: &mut DbConfig,
        logger: Arc<dyn DbLogger>,
    ) -> DbResult<Client> {
        let monitor = self.driver.monitor();

        BestEffort::from_result(monitor.detach()).report(logger.as_ref(), CONNECT_EXCEPTION);
        BestEffort::from_result(monitor.attach(self.driver.options(), config.log_events.clone()))
            .report(logger.as_ref(), CONNECT_EXCEPTION);
        monitor.set_theme(CONNECT_THEME);

        let sink = Arc::clone(&logger);
        monitor.set_log(move |info| {
            sink.log(info.event.as_str(), &info.text);
            info.display = false;
        });

        config.fill_default_user();

        self.end_pool();

        let client = self.driver.client(config)?;
        self.current = Some(client.pool().clone());

        info!(db = %config.display_target(), "Applying database migrations");
        if let Err(err) = client.migrations.apply_all().await {
            error!(
                db = %config.display_target(),
                error = %err,
                "Database migrations failed"
            );
            self.close().await;
            return Err(err);
        }

        info!(db = %config.display_target(), "Database ready");
        Ok(client)
    }

    /// Detach the monitor and drop the output redirect installed by
    /// `connect`. Failure (typically: nothing attached) is logged through
    /// `logger`, or `tracing` when no logger is given, and otherwise ignored.
    /// The pool stays open until the next `connect` or [`close`](Self::close).
    pub fn disconnect(&mut self, logger: Option<&dyn DbLogger>) {
        let logger: &dyn DbLogger = logger.unwrap_or(&TracingLogger);
        let monitor = self.driver.monitor();
        BestEffort::from_result(monitor.detach()).report(logger, DISCONNECT_EXCEPTION);
        monitor.clear_log();
    }

    /// Close the pool of the current client, if any, and wait until every
    /// connection it handed out has been returned.
    pub async fn close(&mut self) {
        if let Some(pool) = self.current.take() {
            info!(db_type = %pool.db_type(), "Closing connection pool");
            pool.close().await;
        }
    }

    /// End the current pool without waiting for connections still leased
    /// from it; they are closed as they come back.
    fn end_pool(&mut self) {
        if let Some(pool) = self.current.take() {
            info!(db_type = %pool.db_type(), "Ending connection pool");
            drop(pool.close_detached());
        }
    }
}
