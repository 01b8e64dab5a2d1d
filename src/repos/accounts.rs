//! Accounts repository.

use super::Repository;
use crate::db::{DbHandle, Driver};
use crate::error::DbResult;
use crate::impl_db_dispatch;
use crate::models::Account;
use std::any::Any;

const COUNT: &str = "SELECT COUNT(*) FROM accounts";

const UPSERT: &str = "INSERT INTO accounts (address, public_key, username, balance) \
    VALUES ($1, $2, $3, $4) \
    ON CONFLICT (address) DO UPDATE SET \
    public_key = EXCLUDED.public_key, username = EXCLUDED.username, balance = EXCLUDED.balance";

const GET: &str =
    "SELECT address, public_key, username, balance FROM accounts WHERE address = $1";

const LIST: &str = "SELECT address, public_key, username, balance FROM accounts \
    ORDER BY balance DESC, address LIMIT $1";

const DELETE: &str = "DELETE FROM accounts WHERE address = $1";

#[derive(Debug, Clone)]
pub struct AccountsRepository {
    db: DbHandle,
}

impl AccountsRepository {
    pub const NAME: &'static str = "accounts";

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

    /// Insert the account, or overwrite the stored one with the same address.
    pub async fn upsert(&self, account: &Account) -> DbResult<()> {
        self.db
            .monitored(UPSERT, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query(UPSERT)
                        .bind(&account.address)
                        .bind(account.public_key.as_deref())
                        .bind(account.username.as_deref())
                        .bind(account.balance)
                        .execute(p)
                        .await
                        .map(|_| ()),
                    SQLite(p) => sqlx::query(UPSERT)
                        .bind(&account.address)
                        .bind(account.public_key.as_deref())
                        .bind(account.username.as_deref())
                        .bind(account.balance)
                        .execute(p)
                        .await
                        .map(|_| ()),
                })
            })
            .await
    }

    pub async fn get(&self, address: &str) -> DbResult<Option<Account>> {
        self.db
            .monitored(GET, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_as::<_, Account>(GET)
                        .bind(address)
                        .fetch_optional(p)
                        .await,
                    SQLite(p) => sqlx::query_as::<_, Account>(GET)
                        .bind(address)
                        .fetch_optional(p)
                        .await,
                })
            })
            .await
    }

    /// Richest accounts first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Account>> {
        self.db
            .monitored(LIST, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query_as::<_, Account>(LIST)
                        .bind(limit)
                        .fetch_all(p)
                        .await,
                    SQLite(p) => sqlx::query_as::<_, Account>(LIST)
                        .bind(limit)
                        .fetch_all(p)
                        .await,
                })
            })
            .await
    }

    /// Returns true if an account was removed.
    pub async fn delete(&self, address: &str) -> DbResult<bool> {
        let affected = self
            .db
            .monitored(DELETE, async {
                impl_db_dispatch!(self.db.pool(), {
                    Postgres(p) => sqlx::query(DELETE)
                        .bind(address)
                        .execute(p)
                        .await
                        .map(|r| r.rows_affected()),
                    SQLite(p) => sqlx::query(DELETE)
                        .bind(address)
                        .execute(p)
                        .await
                        .map(|r| r.rows_affected()),
                })
            })
            .await?;
        Ok(affected > 0)
    }
}

impl Repository for AccountsRepository {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
