//! Chain DB - Main entry point.
//!
//! Connects to the node database, applies pending migrations and reports the
//! resulting schema state and table sizes.

use chain_db::config::Config;
use chain_db::db::Database;
use chain_db::monitor::TracingLogger;
use chain_db::{Client, DbError, DbResult};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Serialize)]
struct Status {
    database: String,
    last_migration: i64,
    applied_migrations: usize,
    pending_migrations: usize,
    accounts: i64,
    blocks: i64,
    height: i64,
    peers: i64,
}

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

async fn collect_status(client: &Client) -> DbResult<Status> {
    let migrations = client.migrations.status().await?;
    Ok(Status {
        database: client.config().display_target(),
        last_migration: migrations.last_id,
        applied_migrations: migrations.applied,
        pending_migrations: migrations.pending,
        accounts: client.accounts.count().await?,
        blocks: client.blocks.count().await?,
        height: client.blocks.height().await?,
        peers: client.peers.count().await?,
    })
}

/// Log a failed step and print the recovery hint, if any, for the operator.
fn report_failure(step: &str, err: &DbError) {
    error!(error = %err, retryable = err.is_retryable(), "{} failed", step);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("hint: {}", suggestion);
    }
}

fn print_status(status: &Status, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
    } else {
        println!("database:   {}", status.database);
        println!(
            "migrations: {} applied, {} pending (last {})",
            status.applied_migrations, status.pending_migrations, status.last_migration
        );
        println!("accounts:   {}", status.accounts);
        println!("blocks:     {} (height {})", status.blocks, status.height);
        println!("peers:      {}", status.peers);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    let mut db_config = config.db_config()?;

    info!(
        db = %db_config.display_target(),
        "Starting chain-db v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut database = Database::default();
    let client = database
        .connect(&mut db_config, Arc::new(TracingLogger))
        .await
        .inspect_err(|e| report_failure("Connect", e))?;

    let result = collect_status(&client).await;

    database.disconnect(None);
    database.close().await;

    let status = result.inspect_err(|e| report_failure("Status query", e))?;
    print_status(&status, config.status_json)?;

    info!("Shutdown complete");
    Ok(())
}
