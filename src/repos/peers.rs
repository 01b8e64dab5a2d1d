//! Peers repository.

use super::Repository;
use crate::db::{DbHandle, Driver};
use crate::error::DbResult;
use crate::impl_db_dispatch;
use crate::models::Peer;
use std::any::Any;

const COUNT: &str = "SELECT COUNT(*) FROM peers";

const UPSERT: &str = "INSERT INTO peers (ip, ws_port, state, os, version) \
    VALUES ($1, $2, $3, $4, $5) \
    ON CONFLICT (ip, ws_port) DO UPDATE SET \
    state = EXCLUDED.state, os = EXCLUDED.os, version = EXCLUDED.version";

const LIST: &str = "SELECT ip, ws_port, state, os, version FROM peers ORDER BY ip, ws_port";

const CLEAR: &str = "DELETE FROM peers";

#[derive(Debug, Clone)]
pub struct PeersRepository {
    db: DbHandle,
}

impl PeersRepository {
    pub const NAME: &'static str = "peers";

    pub fn new(db: &DbHandle, _driver: &Driver) -> DbResult<Self> {
        Ok(Self { db: db.clone() })
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

    /// Peers are keyed by `(ip, ws_port)`; a known peer gets its state refreshed.
    pub async fn upsert(&self, peer: &Peer) -> DbResult<()> {
        self.db
            .monitored(UPSERT, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query(UPSERT)
                        .bind(&peer.ip)
                        .bind(peer.ws_port)
                        .bind(peer.state)
                        .bind(peer.os.as_deref())
                        .bind(peer.version.as_deref())
                        .execute(p)
                        .await
                        .map(|_| ()),
                    SQLite(p) => sqlx::query(UPSERT)
                        .bind(&peer.ip)
                        .bind(peer.ws_port)
                        .bind(peer.state)
                        .bind(peer.os.as_deref())
                        .bind(peer.version.as_deref())
                        .execute(p)
                        .await
                        .map(|_| ()),
                })
            })
            .await
    }

    pub async fn list(&self) -> DbResult<Vec<Peer>> {
        self.db
            .monitored(LIST, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_as::<_, Peer>(LIST).fetch_all(p).await,
                    SQLite(p) => sqlx::query_as::<_, Peer>(LIST).fetch_all(p).await,
                })
            })
            .await
    }

    /// Forget every peer. Returns the number removed.
    pub async fn clear(&self) -> DbResult<u64> {
        self.db
            .monitored(CLEAR, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query(CLEAR)
                        .execute(p)
                        .await
                        .map(|r| r.rows_affected()),
                    SQLite(p) => sqlx::query(CLEAR)
                        .execute(p)
                        .await
                        .map(|r| r.rows_affected()),
                })
            })
            .await
    }
}

impl Repository for PeersRepository {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
