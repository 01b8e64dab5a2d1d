//! Repository registry and client extension.
//!
//! Every client carries one repository per domain area, all bound to the same
//! [`DbHandle`]. The set is fixed at compile time: [`REGISTRY`] lists the
//! names, [`Repositories`] holds one typed field per name, and
//! [`Repositories::extend`] builds them whenever the driver materializes a
//! client.

pub mod accounts;
pub mod blocks;
pub mod migrations;
pub mod peers;

pub use accounts::AccountsRepository;
pub use blocks::BlocksRepository;
pub use migrations::{MigrationsRepository, PendingMigration};
pub use peers::PeersRepository;

use crate::db::{DbHandle, Driver};
use crate::error::DbResult;
use std::any::Any;

/// Names of all repositories attached to a client, in construction order.
pub const REGISTRY: &[&str] = &[
    AccountsRepository::NAME,
    BlocksRepository::NAME,
    PeersRepository::NAME,
    MigrationsRepository::NAME,
];

/// A named bundle of queries bound to a live client.
pub trait Repository: Send + Sync + std::fmt::Debug {
    /// Registry name the repository is attached under.
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub struct Repositories {
    pub accounts: AccountsRepository,
    pub blocks: BlocksRepository,
    pub peers: PeersRepository,
    pub migrations: MigrationsRepository,
}

impl Repositories {
    /// Construct every registered repository against `db`.
    ///
    /// The first constructor error aborts the whole set.
    pub fn extend(db: &DbHandle, driver: &Driver) -> DbResult<Self> {
        Ok(Self {
            accounts: AccountsRepository::new(db, driver)?,
            blocks: BlocksRepository::new(db, driver)?,
            peers: PeersRepository::new(db, driver)?,
            migrations: MigrationsRepository::new(db, driver)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Repository> {
        [
            &self.accounts as &dyn Repository,
            &self.blocks,
            &self.peers,
            &self.migrations,
        ]
        .into_iter()
    }

    /// Look up a repository by its registry name.
    pub fn get(&self, name: &str) -> Option<&dyn Repository> {
        self.iter().find(|repo| repo.name() == name)
    }

    pub fn len(&self) -> usize {
        REGISTRY.len()
    }

    pub fn is_empty(&self) -> bool {
        REGISTRY.is_empty()
    }
}

/// Enumerate the registry.
pub fn registry() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().copied()
}
