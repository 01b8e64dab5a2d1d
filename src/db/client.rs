//! Client core and the extended client returned by `connect`.

use crate::config::DbConfig;
use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::monitor::{Monitor, MonitorEvent};
use crate::repos::Repositories;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

/// The part of a client every repository is bound to: the pool, the monitor
/// and the effective configuration the pool was built from.
#[derive(Debug, Clone)]
pub struct DbHandle {
    pool: DbPool,
    monitor: Monitor,
    config: Arc<DbConfig>,
}

impl DbHandle {
    pub(crate) fn new(pool: DbPool, monitor: Monitor, config: DbConfig) -> Self {
        Self {
            pool,
            monitor,
            config: Arc::new(config),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Report a non-query event (task, transact, ...) to the monitor.
    pub fn notify(&self, event: MonitorEvent, text: impl Into<String>) {
        self.monitor.notify(event, text);
    }

    /// Run `query`, reporting `sql` as a query event and any failure as an
    /// error event. A pool acquire timeout is reported with the configured
    /// acquire timeout.
    pub async fn monitored<T, F>(&self, sql: &str, query: F) -> DbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        self.monitor.notify(MonitorEvent::Query, sql);
        match query.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.monitor
                    .notify(MonitorEvent::Error, format!("{}\n    query: {}", err, sql));
                Err(match err {
                    sqlx::Error::PoolTimedOut => DbError::timeout(
                        "connection pool acquire",
                        self.config.pool.acquire_timeout().as_secs(),
                    ),
                    other => other.into(),
                })
            }
        }
    }
}

/// A live database client: one pool plus one repository per registry entry.
///
/// Derefs to [`Repositories`], so repositories are reached by name:
/// `client.accounts.count().await`.
#[derive(Debug, Clone)]
pub struct Client {
    handle: DbHandle,
    repos: Repositories,
}

impl Client {
    pub(crate) fn new(handle: DbHandle, repos: Repositories) -> Self {
        Self { handle, repos }
    }

    pub fn handle(&self) -> &DbHandle {
        &self.handle
    }

    pub fn pool(&self) -> &DbPool {
        self.handle.pool()
    }

    pub fn monitor(&self) -> &Monitor {
        self.handle.monitor()
    }

    /// The configuration the client was built from, after default filling.
    pub fn config(&self) -> &DbConfig {
        self.handle.config()
    }

    pub fn is_closed(&self) -> bool {
        self.handle.pool().is_closed()
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }
}

impl Deref for Client {
    type Target = Repositories;

    fn deref(&self) -> &Self::Target {
        &self.repos
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DbConfig;
    use crate::db::{DbPool, Driver};
    use crate::error::DbError;

    #[tokio::test]
    async fn test_acquire_timeout_reports_configured_duration() {
        let mut config = DbConfig::sqlite(":memory:");
        config.pool.max_connections = Some(1);
        config.pool.acquire_timeout_secs = Some(1);
        let client = Driver::default().client(&config).unwrap();

        let DbPool::SQLite(p) = client.pool() else {
            panic!("expected SQLite pool");
        };
        let held = p.acquire().await.unwrap();

        let err = client.accounts.count().await.unwrap_err();
        assert!(
            matches!(err, DbError::Timeout { elapsed_secs: 1, .. }),
            "unexpected error: {err:?}"
        );
        assert!(err.to_string().contains("1s"));

        drop(held);
        client.pool().close().await;
    }
}
