//! Schema migrations repository.
//!
//! Migrations come either from the set compiled into the driver or, when the
//! configuration names a `migrations_dir`, from `<version>_<description>.sql`
//! files in that directory, loaded on first use. Applied versions are tracked
//! by sqlx in the `_sqlx_migrations` table.

use super::Repository;
use crate::db::{DbHandle, Driver};
use crate::error::{DbError, DbResult};
use crate::impl_db_dispatch;
use crate::models::{DatabaseType, MigrationStatus};
use crate::monitor::MonitorEvent;
use serde::Serialize;
use sqlx::migrate::Migrator;
use std::any::Any;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const PG_HAS_TABLE: &str = "SELECT to_regclass('_sqlx_migrations') IS NOT NULL";

const SQLITE_HAS_TABLE: &str = "SELECT EXISTS (SELECT 1 FROM sqlite_master \
    WHERE type = 'table' AND name = '_sqlx_migrations')";

const APPLIED: &str = "SELECT version FROM _sqlx_migrations WHERE success ORDER BY version";

/// A migration known to the source but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMigration {
    pub version: i64,
    pub description: String,
}

#[derive(Debug, Clone)]
enum MigrationSource {
    Embedded(&'static Migrator),
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct MigrationsRepository {
    db: DbHandle,
    source: MigrationSource,
    loaded: Arc<OnceCell<Migrator>>,
}

impl MigrationsRepository {
    pub const NAME: &'static str = "migrations";

    /// Fails when the configured migrations directory does not exist.
    pub fn new(db: &DbHandle, driver: &Driver) -> DbResult<Self> {
        let source = match &db.config().migrations_dir {
            Some(dir) if !dir.is_dir() => {
                return Err(DbError::repository(
                    Self::NAME,
                    format!("migrations directory '{}' not found", dir.display()),
                ));
            }
            Some(dir) => MigrationSource::Directory(dir.clone()),
            None => MigrationSource::Embedded(driver.migrator()),
        };
        Ok(Self {
            db: db.clone(),
            source,
            loaded: Arc::new(OnceCell::new()),
        })
    }

    /// The migration set this repository applies.
    pub async fn migrator(&self) -> DbResult<&Migrator> {
        match &self.source {
            MigrationSource::Embedded(migrator) => Ok(*migrator),
            MigrationSource::Directory(dir) => {
                let migrator = self
                    .loaded
                    .get_or_try_init(|| async {
                        debug!(dir = %dir.display(), "Loading migrations");
                        Migrator::new(dir.clone()).await
                    })
                    .await?;
                Ok(migrator)
            }
        }
    }

    /// Whether the bookkeeping table exists yet.
    pub async fn has_migrations(&self) -> DbResult<bool> {
        let sql = match self.db.pool().db_type() {
            DatabaseType::PostgreSQL => PG_HAS_TABLE,
            DatabaseType::SQLite => SQLITE_HAS_TABLE,
        };
        self.db
            .monitored(sql, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_scalar::<_, bool>(sql).fetch_one(p).await,
                    SQLite(p) => sqlx::query_scalar::<_, bool>(sql).fetch_one(p).await,
                })
            })
            .await
    }

    /// Versions applied successfully, ascending.
    pub async fn applied(&self) -> DbResult<Vec<i64>> {
        if !self.has_migrations().await? {
            return Ok(Vec::new());
        }
        self.db
            .monitored(APPLIED, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_scalar::<_, i64>(APPLIED).fetch_all(p).await,
                    SQLite(p) => sqlx::query_scalar::<_, i64>(APPLIED).fetch_all(p).await,
                })
            })
            .await
    }

    /// Highest applied version, 0 before the first migration.
    pub async fn last_id(&self) -> DbResult<i64> {
        Ok(self.applied().await?.last().copied().unwrap_or(0))
    }

    pub async fn pending(&self) -> DbResult<Vec<PendingMigration>> {
        let applied: BTreeSet<i64> = self.applied().await?.into_iter().collect();
        let migrator = self.migrator().await?;
        Ok(migrator
            .iter()
            .filter(|m| !m.migration_type.is_down_migration())
            .filter(|m| !applied.contains(&m.version))
            .map(|m| PendingMigration {
                version: m.version,
                description: m.description.to_string(),
            })
            .collect())
    }

    /// Apply every pending migration in version order.
    ///
    /// Stops at the first failing migration; versions before it stay applied.
    pub async fn apply_all(&self) -> DbResult<()> {
        self.db.notify(MonitorEvent::Task, "migrations:applyAll");
        let migrator = self.migrator().await?;

        let result = impl_db_dispatch!(self.db.pool(), {
            Postgres(p) => migrator.run(p).await,
            SQLite(p) => migrator.run(p).await,
        });

        match result {
            Ok(()) => {
                info!(
                    db = %self.db.config().display_target(),
                    migrations = migrator.iter().count(),
                    "Migrations up to date"
                );
                Ok(())
            }
            Err(err) => {
                self.db
                    .notify(MonitorEvent::Error, format!("migrations:applyAll - {}", err));
                Err(DbError::Migration(err))
            }
        }
    }

    pub async fn status(&self) -> DbResult<MigrationStatus> {
        let applied = self.applied().await?;
        let pending = self.pending().await?;
        Ok(MigrationStatus {
            last_id: applied.last().copied().unwrap_or(0),
            applied: applied.len(),
            pending: pending.len(),
        })
    }
}

impl Repository for MigrationsRepository {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
