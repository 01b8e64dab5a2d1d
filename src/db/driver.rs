//! Driver handle: static initialization options, the shared monitor and the
//! embedded migration set. Every client is materialized through
//! [`Driver::client`], which also runs the repository extension hook.

use crate::config::DbConfig;
use crate::db::client::{Client, DbHandle};
use crate::db::pool::create_pool;
use crate::error::DbResult;
use crate::monitor::Monitor;
use crate::repos::Repositories;
use sqlx::migrate::Migrator;
use tracing::debug;

/// Migrations shipped with the crate.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub const DEFAULT_APPLICATION_NAME: &str = "chain-db";
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 100;

/// Static driver initialization options, fixed for the lifetime of a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Reported to PostgreSQL as `application_name` and tagged on monitor output.
    pub application_name: String,
    /// Prepared statements cached per connection.
    pub statement_cache_capacity: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub struct Driver {
    options: DriverOptions,
    monitor: Monitor,
}

impl Driver {
    pub fn new(options: DriverOptions) -> Self {
        Self {
            options,
            monitor: Monitor::new(),
        }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Migration set used when the configuration names no directory.
    pub fn migrator(&self) -> &'static Migrator {
        &MIGRATOR
    }

    /// Build a client for `config`: a lazy pool plus every registered repository.
    ///
    /// Performs no I/O. A failing repository constructor aborts the build and
    /// the pool is dropped before any connection is opened.
    pub fn client(&self, config: &DbConfig) -> DbResult<Client> {
        let pool = create_pool(config, &self.options, &self.monitor)?;
        let handle = DbHandle::new(pool, self.monitor.clone(), config.clone());
        let repos = Repositories::extend(&handle, self)?;
        debug!(
            db = %config.display_target(),
            repositories = repos.len(),
            "Client created"
        );
        Ok(Client::new(handle, repos))
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(DriverOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repos::REGISTRY;

    #[test]
    fn test_embedded_migrations_present() {
        assert!(MIGRATOR.iter().count() >= 3);
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);
    }

    #[tokio::test]
    async fn test_client_has_every_repository() {
        let driver = Driver::default();
        let client = driver.client(&DbConfig::sqlite(":memory:")).unwrap();
        for name in REGISTRY {
            assert!(client.get(name).is_some(), "missing repository {name}");
        }
        client.pool().close().await;
    }

    #[tokio::test]
    async fn test_repository_failure_aborts_client() {
        let mut config = DbConfig::sqlite(":memory:");
        config.migrations_dir = Some("/definitely/not/a/dir".into());
        let result = Driver::default().client(&config);
        assert!(matches!(
            result,
            Err(DbError::Repository { ref repository, .. }) if repository == "migrations"
        ));
    }
}
