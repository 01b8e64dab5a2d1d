//! Data models for chain-db.
//!
//! This module re-exports all model types used throughout the crate.

pub mod chain;
pub mod connection;

// Re-export commonly used types
pub use chain::{Account, Block, Peer};
pub use connection::{DatabaseType, MigrationStatus};
