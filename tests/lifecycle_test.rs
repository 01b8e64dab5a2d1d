use chain_db::config::DbConfig;
use chain_db::db::{Database, DbPool};
use chain_db::error::DbError;
use chain_db::models::Block;
use chain_db::monitor::{DbLogger, EventSet, MonitorEvent, Theme};
use chain_db::repos::{
    AccountsRepository, BlocksRepository, MigrationsRepository, PeersRepository, REGISTRY,
    Repository,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingLogger {
    lines: Mutex<Vec<(String, String)>>,
}

impl RecordingLogger {
    fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().unwrap().clone()
    }

    fn count(&self, message: &str) -> usize {
        self.lines().iter().filter(|(m, _)| m == message).count()
    }
}

impl DbLogger for RecordingLogger {
    fn log(&self, message: &str, detail: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((message.to_string(), detail.to_string()));
    }
}

fn sqlite_config(dir: &TempDir, name: &str) -> DbConfig {
    DbConfig::sqlite(dir.path().join(name).to_string_lossy())
}

#[tokio::test]
async fn test_connect_fills_default_user() {
    let dir = TempDir::new().unwrap();
    let mut config = sqlite_config(&dir, "node.db");
    config.user = None;

    let mut database = Database::default();
    let client = database
        .connect(&mut config, Arc::new(RecordingLogger::default()))
        .await
        .unwrap();

    let expected = std::env::var("USER").ok().filter(|u| !u.is_empty());
    assert_eq!(config.user, expected);
    assert_eq!(client.config().user, expected);

    database.close().await;
}

#[tokio::test]
async fn test_connect_keeps_explicit_user() {
    let dir = TempDir::new().unwrap();
    let mut config = sqlite_config(&dir, "node.db");
    config.user = Some("lisk".to_string());

    let mut database = Database::default();
    database
        .connect(&mut config, Arc::new(RecordingLogger::default()))
        .await
        .unwrap();
    assert_eq!(config.user.as_deref(), Some("lisk"));

    database.close().await;
}

#[tokio::test]
async fn test_disconnect_without_monitor_logs_one_line() {
    let logger = RecordingLogger::default();
    let mut database = Database::default();

    database.disconnect(Some(&logger));

    let lines = logger.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].0.starts_with("database disconnect exception"));
    assert!(!database.monitor().is_attached());
}

#[tokio::test]
async fn test_first_connect_reports_failed_detach_once() {
    let dir = TempDir::new().unwrap();
    let logger = Arc::new(RecordingLogger::default());
    let mut database = Database::default();

    database
        .connect(&mut sqlite_config(&dir, "node.db"), logger.clone())
        .await
        .unwrap();

    assert_eq!(logger.count("database connect exception - "), 1);
    assert!(database.monitor().is_attached());
    assert_eq!(database.monitor().theme(), Theme::Matrix);

    // Reconnecting detaches cleanly, so nothing new is reported.
    database
        .connect(&mut sqlite_config(&dir, "node.db"), logger.clone())
        .await
        .unwrap();
    assert_eq!(logger.count("database connect exception - "), 1);

    database.disconnect(Some(logger.as_ref()));
    assert!(!database.monitor().is_attached());
    database.close().await;
}

#[tokio::test]
async fn test_reconnect_closes_previous_pool() {
    let dir = TempDir::new().unwrap();
    let logger = Arc::new(RecordingLogger::default());
    let mut database = Database::default();

    let first = database
        .connect(&mut sqlite_config(&dir, "first.db"), logger.clone())
        .await
        .unwrap();
    assert!(!first.is_closed());

    let second = database
        .connect(&mut sqlite_config(&dir, "second.db"), logger.clone())
        .await
        .unwrap();
    assert!(first.is_closed());
    assert!(!second.is_closed());
    assert!(database.has_pool());

    database.close().await;
    assert!(second.is_closed());
    assert!(!database.has_pool());
}

#[tokio::test]
async fn test_client_carries_every_repository() {
    let dir = TempDir::new().unwrap();
    let mut database = Database::default();
    let client = database
        .connect(
            &mut sqlite_config(&dir, "node.db"),
            Arc::new(RecordingLogger::default()),
        )
        .await
        .unwrap();

    assert_eq!(client.len(), REGISTRY.len());
    for name in REGISTRY {
        let repo = client.get(name).unwrap();
        assert_eq!(repo.name(), *name);
        let any = repo.as_any();
        let matches = match *name {
            "accounts" => any.is::<AccountsRepository>(),
            "blocks" => any.is::<BlocksRepository>(),
            "peers" => any.is::<PeersRepository>(),
            "migrations" => any.is::<MigrationsRepository>(),
            other => panic!("unexpected repository {other}"),
        };
        assert!(matches, "repository {name} has the wrong type");
    }

    database.close().await;
}

#[tokio::test]
async fn test_failed_migration_returns_no_client() {
    let dir = TempDir::new().unwrap();
    let sql_dir = dir.path().join("sql");
    std::fs::create_dir(&sql_dir).unwrap();
    std::fs::write(sql_dir.join("1_bad.sql"), "CREATE TABLE (;").unwrap();

    let mut config = sqlite_config(&dir, "node.db");
    config.migrations_dir = Some(sql_dir);

    let mut database = Database::default();
    let result = database
        .connect(&mut config, Arc::new(RecordingLogger::default()))
        .await;

    assert!(matches!(result, Err(DbError::Migration(_))));
    assert!(!database.has_pool());
}

#[tokio::test]
async fn test_missing_migrations_dir_fails_before_connecting() {
    let dir = TempDir::new().unwrap();
    let mut config = sqlite_config(&dir, "node.db");
    config.migrations_dir = Some(dir.path().join("absent"));

    let mut database = Database::default();
    let result = database
        .connect(&mut config, Arc::new(RecordingLogger::default()))
        .await;

    assert!(matches!(result, Err(DbError::Repository { .. })));
    assert!(!database.has_pool());
    assert!(!dir.path().join("node.db").exists());
}

#[tokio::test]
async fn test_monitor_output_is_redirected() {
    let dir = TempDir::new().unwrap();
    let mut config = sqlite_config(&dir, "node.db");
    config.log_events = EventSet::parse_list("task,error").unwrap();

    let logger = Arc::new(RecordingLogger::default());
    let mut database = Database::default();
    let client = database.connect(&mut config, logger.clone()).await.unwrap();

    // The migration run itself is a task event.
    assert!(
        logger
            .lines()
            .contains(&("task".to_string(), "migrations:applyAll".to_string()))
    );

    let info = client.monitor().notify(MonitorEvent::Task, "x").unwrap();
    assert!(!info.display);
    let matching: Vec<_> = logger
        .lines()
        .into_iter()
        .filter(|line| line == &("task".to_string(), "x".to_string()))
        .collect();
    assert_eq!(matching.len(), 1);

    // Unobserved events never reach the logger.
    assert!(client.monitor().notify(MonitorEvent::Query, "SELECT 1").is_none());
    assert_eq!(logger.count("query"), 0);

    database.disconnect(Some(logger.as_ref()));
    database.close().await;
}

#[tokio::test]
async fn test_reconnect_with_leased_connection_does_not_wait() {
    let dir = TempDir::new().unwrap();
    let logger = Arc::new(RecordingLogger::default());
    let mut database = Database::default();

    let first = database
        .connect(&mut sqlite_config(&dir, "first.db"), logger.clone())
        .await
        .unwrap();
    let DbPool::SQLite(pool) = first.pool() else {
        panic!("expected SQLite pool");
    };
    let leased = pool.acquire().await.unwrap();

    let second = tokio::time::timeout(
        Duration::from_secs(5),
        database.connect(&mut sqlite_config(&dir, "second.db"), logger.clone()),
    )
    .await
    .expect("connect must not wait for connections leased from the previous pool")
    .unwrap();

    assert!(first.is_closed());
    assert!(!second.is_closed());
    // The old pool refuses new work while the lease is still out.
    assert!(first.accounts.count().await.is_err());

    drop(leased);
    database.close().await;
}

#[tokio::test]
async fn test_disconnect_releases_logger() {
    let dir = TempDir::new().unwrap();
    let logger = Arc::new(RecordingLogger::default());
    let mut database = Database::default();
    database
        .connect(&mut sqlite_config(&dir, "node.db"), logger.clone())
        .await
        .unwrap();
    assert_eq!(Arc::strong_count(&logger), 2);

    database.disconnect(Some(logger.as_ref()));
    assert_eq!(Arc::strong_count(&logger), 1);
    database.close().await;
}

#[tokio::test]
async fn test_transaction_events_redirected() {
    let dir = TempDir::new().unwrap();
    let mut config = sqlite_config(&dir, "node.db");
    config.log_events = EventSet::parse_list("transact").unwrap();

    let logger = Arc::new(RecordingLogger::default());
    let mut database = Database::default();
    let client = database.connect(&mut config, logger.clone()).await.unwrap();

    let block = Block {
        id: "1".to_string(),
        height: 1,
        previous_block: None,
        timestamp: 0,
        generator_public_key: "aa".to_string(),
        number_of_transactions: 0,
        total_amount: 0,
    };
    client.blocks.save_all(&[block]).await.unwrap();

    let transact: Vec<String> = logger
        .lines()
        .into_iter()
        .filter(|(event, _)| event == "transact")
        .map(|(_, text)| text)
        .collect();
    assert_eq!(
        transact,
        vec![
            "begin blocks:saveAll(1)".to_string(),
            "commit blocks:saveAll".to_string()
        ]
    );

    database.close().await;
}
