//! Connection pool construction.
//!
//! Pools are created lazily: building a client performs no I/O, the first
//! physical connection is opened by the first query (normally the migration
//! run). Both backends share the same pool hooks, which report connection
//! events to the monitor.

use crate::config::DbConfig;
use crate::db::driver::DriverOptions;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use crate::monitor::{Monitor, MonitorEvent};
use sqlx::pool::PoolOptions;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{PgPool, SqlitePool};
use std::str::FromStr;
use tokio::task::JoinHandle;
use tracing::debug;

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl DbPool {
    /// Close the connection pool. Waits for checked-out connections to return.
    pub async fn close(&self) {
        match self {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
        }
    }

    /// Start closing the pool on a background task and return immediately.
    ///
    /// The pool is marked closed before this returns: new acquires fail at
    /// once, and connections still checked out are closed as they come back.
    pub fn close_detached(&self) -> JoinHandle<()> {
        debug!(db_type = %self.db_type(), "Closing connection pool in background");
        // `close()` marks the pool closed when called, before its future is
        // polled; the spawned call only drains the connections.
        match self {
            DbPool::Postgres(p) => {
                drop(p.close());
                let p = p.clone();
                tokio::spawn(async move { p.close().await })
            }
            DbPool::SQLite(p) => {
                drop(p.close());
                let p = p.clone();
                tokio::spawn(async move { p.close().await })
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            DbPool::Postgres(pool) => pool.is_closed(),
            DbPool::SQLite(pool) => pool.is_closed(),
        }
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbPool::Postgres(_) => DatabaseType::PostgreSQL,
            DbPool::SQLite(_) => DatabaseType::SQLite,
        }
    }
}

/// Create a lazily-connecting pool for `config`.
pub(crate) fn create_pool(
    config: &DbConfig,
    options: &DriverOptions,
    monitor: &Monitor,
) -> DbResult<DbPool> {
    config
        .pool
        .validate(config.db_type == DatabaseType::SQLite)
        .map_err(DbError::invalid_input)?;

    debug!(
        db = %config.display_target(),
        max_connections = config
            .pool
            .max_connections_or_default(config.db_type == DatabaseType::SQLite),
        "Creating connection pool"
    );

    match config.db_type {
        DatabaseType::PostgreSQL => {
            let connect_options = postgres_options(config, options)?;
            let pool = pool_options(config, monitor).connect_lazy_with(connect_options);
            Ok(DbPool::Postgres(pool))
        }
        DatabaseType::SQLite => {
            let connect_options = sqlite_options(config, options)?;
            let pool = pool_options(config, monitor).connect_lazy_with(connect_options);
            Ok(DbPool::SQLite(pool))
        }
    }
}

fn postgres_options(config: &DbConfig, options: &DriverOptions) -> DbResult<PgConnectOptions> {
    let mut connect = PgConnectOptions::new()
        .host(&config.host)
        .database(&config.database)
        .application_name(&options.application_name)
        .statement_cache_capacity(options.statement_cache_capacity);

    if let Some(port) = config.port {
        connect = connect.port(port);
    }
    if let Some(user) = &config.user {
        connect = connect.username(user);
    }
    if let Some(password) = &config.password {
        connect = connect.password(password);
    }
    if let Some(mode) = &config.ssl_mode {
        let mode = PgSslMode::from_str(mode).map_err(|e| {
            DbError::invalid_input(format!("Invalid sslmode '{}': {}", mode, e))
        })?;
        connect = connect.ssl_mode(mode);
    }

    Ok(connect)
}

fn sqlite_options(config: &DbConfig, options: &DriverOptions) -> DbResult<SqliteConnectOptions> {
    let connect = if config.database == ":memory:" {
        SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            DbError::connection(
                format!("Invalid SQLite configuration: {}", e),
                "Use a file path or :memory:",
            )
        })?
    } else {
        SqliteConnectOptions::new()
            .filename(&config.database)
            .create_if_missing(true)
    };

    Ok(connect.statement_cache_capacity(options.statement_cache_capacity))
}

/// Pool limits plus the monitor hooks shared by both backends.
fn pool_options<DB: sqlx::Database>(config: &DbConfig, monitor: &Monitor) -> PoolOptions<DB> {
    let pool = &config.pool;
    let is_sqlite = config.db_type == DatabaseType::SQLite;

    let connect_monitor = monitor.clone();
    let connect_text = format!("connect({})", config.display_target());
    let release_monitor = monitor.clone();
    let release_text = format!("disconnect({})", config.display_target());

    PoolOptions::<DB>::new()
        .min_connections(pool.min_connections_or_default())
        .max_connections(pool.max_connections_or_default(is_sqlite))
        .acquire_timeout(pool.acquire_timeout())
        .idle_timeout(Some(pool.idle_timeout()))
        .test_before_acquire(pool.test_before_acquire_or_default())
        .after_connect(move |_conn, _meta| {
            connect_monitor.notify(MonitorEvent::Connect, connect_text.clone());
            Box::pin(async { Ok(()) })
        })
        .after_release(move |_conn, _meta| {
            release_monitor.notify(MonitorEvent::Disconnect, release_text.clone());
            Box::pin(async { Ok(true) })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::EventSet;

    #[test]
    fn test_postgres_options_reject_bad_sslmode() {
        let mut config = DbConfig::postgres("localhost", "lisk_test");
        config.ssl_mode = Some("sometimes".to_string());
        let result = postgres_options(&config, &DriverOptions::default());
        assert!(matches!(result, Err(DbError::InvalidInput { .. })));
    }

    #[test]
    fn test_postgres_options_accept_known_sslmode() {
        let mut config = DbConfig::postgres("localhost", "lisk_test");
        config.ssl_mode = Some("require".to_string());
        assert!(postgres_options(&config, &DriverOptions::default()).is_ok());
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        let config = DbConfig::postgres("db.invalid", "lisk_test");
        let pool = create_pool(&config, &DriverOptions::default(), &Monitor::new()).unwrap();
        assert_eq!(pool.db_type(), DatabaseType::PostgreSQL);
        assert!(!pool.is_closed());
        pool.close().await;
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn test_create_pool_rejects_invalid_pool_options() {
        let mut config = DbConfig::sqlite(":memory:");
        config.pool.max_connections = Some(0);
        let result = create_pool(&config, &DriverOptions::default(), &Monitor::new());
        assert!(matches!(result, Err(DbError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_close_detached_marks_closed_immediately() {
        let pool = create_pool(
            &DbConfig::sqlite(":memory:"),
            &DriverOptions::default(),
            &Monitor::new(),
        )
        .unwrap();
        let DbPool::SQLite(p) = &pool else {
            panic!("expected SQLite pool");
        };
        let held = p.acquire().await.unwrap();

        let closing = pool.close_detached();
        assert!(pool.is_closed());
        assert!(matches!(p.acquire().await, Err(sqlx::Error::PoolClosed)));

        drop(held);
        closing.await.unwrap();
    }

    #[test]
    fn test_create_pool_rejects_min_above_sqlite_default_max() {
        let mut config = DbConfig::sqlite(":memory:");
        config.pool.min_connections = Some(5);
        let result = create_pool(&config, &DriverOptions::default(), &Monitor::new());
        assert!(matches!(result, Err(DbError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_connect_event_reported_to_monitor() {
        let monitor = Monitor::new();
        monitor
            .attach(&DriverOptions::default(), EventSet::all())
            .unwrap();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        monitor.set_log(move |info| {
            sink.lock().unwrap().push(info.event);
            info.display = false;
        });

        let config = DbConfig::sqlite(":memory:");
        let pool = create_pool(&config, &DriverOptions::default(), &monitor).unwrap();
        if let DbPool::SQLite(p) = &pool {
            let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(p).await.unwrap();
            assert_eq!(one, 1);
        }
        pool.close().await;

        assert!(seen.lock().unwrap().contains(&MonitorEvent::Connect));
    }
}
