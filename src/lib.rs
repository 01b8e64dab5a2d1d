//! Chain DB Library
//!
//! Storage bootstrap for a blockchain node: connects to PostgreSQL or SQLite,
//! wires the query monitor, attaches the domain repositories to every client
//! and brings the schema up to date with embedded migrations.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod monitor;
pub mod repos;

pub use config::{Config, DbConfig};
pub use db::{Client, Database};
pub use error::{DbError, DbResult};
pub use monitor::{DbLogger, Monitor};
