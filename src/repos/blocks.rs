//! Blocks repository.

use super::Repository;
use crate::db::{DbHandle, Driver};
use crate::error::DbResult;
use crate::impl_db_dispatch;
use crate::models::Block;
use crate::monitor::MonitorEvent;
use std::any::Any;

const COLUMNS: &str = "id, height, previous_block, timestamp, generator_public_key, \
    number_of_transactions, total_amount";

const COUNT: &str = "SELECT COUNT(*) FROM blocks";

const SAVE: &str = "INSERT INTO blocks (id, height, previous_block, timestamp, \
    generator_public_key, number_of_transactions, total_amount) \
    VALUES ($1, $2, $3, $4, $5, $6, $7)";

const HEIGHT: &str = "SELECT COALESCE(MAX(height), 0) FROM blocks";

const DELETE_AFTER: &str = "DELETE FROM blocks WHERE height > $1";

#[derive(Debug, Clone)]
pub struct BlocksRepository {
    db: DbHandle,
    get_sql: String,
    last_sql: String,
}

impl BlocksRepository {
    pub const NAME: &'static str = "blocks";

    pub fn new(db: &DbHandle, _driver: &Driver) -> DbResult<Self> {
        Ok(Self {
            db: db.clone(),
            get_sql: format!("SELECT {COLUMNS} FROM blocks WHERE id = $1"),
            last_sql: format!("SELECT {COLUMNS} FROM blocks ORDER BY height DESC LIMIT 1"),
        })
    }

    pub async fn count(&self) -> DbResult<i64> {
        self.db
            .monitored(COUNT, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_scalar::<_, i64>(COUNT).fetch_one(p).await,
                    SQLite(p) => sqlx::query_scalar::<_, i64>(COUNT).fetch_one(p).await,
                })
            })
            .await
    }

    /// Store a new block. Fails if the id or the height is already taken.
    pub async fn save(&self, block: &Block) -> DbResult<()> {
        self.db
            .monitored(SAVE, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query(SAVE)
                        .bind(&block.id)
                        .bind(block.height)
                        .bind(block.previous_block.as_deref())
                        .bind(block.timestamp)
                        .bind(&block.generator_public_key)
                        .bind(block.number_of_transactions)
                        .bind(block.total_amount)
                        .execute(p)
                        .await
                        .map(|_| ()),
                    SQLite(p) => sqlx::query(SAVE)
                        .bind(&block.id)
                        .bind(block.height)
                        .bind(block.previous_block.as_deref())
                        .bind(block.timestamp)
                        .bind(&block.generator_public_key)
                        .bind(block.number_of_transactions)
                        .bind(block.total_amount)
                        .execute(p)
                        .await
                        .map(|_| ()),
                })
            })
            .await
    }

    /// Store a batch of blocks in one transaction: either every block is
    /// saved or none is.
    pub async fn save_all(&self, blocks: &[Block]) -> DbResult<()> {
        self.db
            .notify(MonitorEvent::Transact, format!("begin blocks:saveAll({})", blocks.len()));
        let result = self
            .db
            .monitored(SAVE, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => {
                        let mut tx = p.begin().await?;
                        for block in blocks {
                            sqlx::query(SAVE)
                                .bind(&block.id)
                                .bind(block.height)
                                .bind(block.previous_block.as_deref())
                                .bind(block.timestamp)
                                .bind(&block.generator_public_key)
                                .bind(block.number_of_transactions)
                                .bind(block.total_amount)
                                .execute(&mut *tx)
                                .await?;
                        }
                        tx.commit().await
                    },
                    SQLite(p) => {
                        let mut tx = p.begin().await?;
                        for block in blocks {
                            sqlx::query(SAVE)
                                .bind(&block.id)
                                .bind(block.height)
                                .bind(block.previous_block.as_deref())
                                .bind(block.timestamp)
                                .bind(&block.generator_public_key)
                                .bind(block.number_of_transactions)
                                .bind(block.total_amount)
                                .execute(&mut *tx)
                                .await?;
                        }
                        tx.commit().await
                    },
                })
            })
            .await;

        // An uncommitted transaction is rolled back when dropped.
        let outcome = if result.is_ok() { "commit" } else { "rollback" };
        self.db
            .notify(MonitorEvent::Transact, format!("{outcome} blocks:saveAll"));
        result
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Block>> {
        let sql = self.get_sql.as_str();
        self.db
            .monitored(sql, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_as::<_, Block>(sql).bind(id).fetch_optional(p).await,
                    SQLite(p) => sqlx::query_as::<_, Block>(sql).bind(id).fetch_optional(p).await,
                })
            })
            .await
    }

    /// Height of the chain tip, 0 for an empty chain.
    pub async fn height(&self) -> DbResult<i64> {
        self.db
            .monitored(HEIGHT, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_scalar::<_, i64>(HEIGHT).fetch_one(p).await,
                    SQLite(p) => sqlx::query_scalar::<_, i64>(HEIGHT).fetch_one(p).await,
                })
            })
            .await
    }

    /// The block at the chain tip.
    pub async fn last(&self) -> DbResult<Option<Block>> {
        let sql = self.last_sql.as_str();
        self.db
            .monitored(sql, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_as::<_, Block>(sql).fetch_optional(p).await,
                    SQLite(p) => sqlx::query_as::<_, Block>(sql).fetch_optional(p).await,
                })
            })
            .await
    }

    /// Remove every block above `height`. Returns the number of blocks removed.
    pub async fn delete_after(&self, height: i64) -> DbResult<u64> {
        self.db
            .monitored(DELETE_AFTER, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query(DELETE_AFTER)
                        .bind(height)
                        .execute(p)
                        .await
                        .map(|r| r.rows_affected()),
                    SQLite(p) => sqlx::query(DELETE_AFTER)
                        .bind(height)
                        .execute(p)
                        .await
                        .map(|r| r.rows_affected()),
                })
            })
            .await
    }
}

impl Repository for BlocksRepository {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
