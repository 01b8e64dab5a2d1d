//! Database layer.
//!
//! This module provides:
//! - Connection pool construction with monitor hooks
//! - The driver handle that materializes clients
//! - The client core shared by all repositories
//! - The connection lifecycle (`connect` / `disconnect`)
//! - Database dispatch macros for reducing code duplication

pub mod client;
pub mod driver;
pub mod lifecycle;
#[macro_use]
pub mod macros;
pub mod pool;

pub use client::{Client, DbHandle};
pub use driver::{Driver, DriverOptions, MIGRATOR};
pub use lifecycle::Database;
pub use pool::DbPool;
