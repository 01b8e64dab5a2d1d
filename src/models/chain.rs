//! Rows stored by the node's repositories.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub address: String,
    pub public_key: Option<String>,
    pub username: Option<String>,
    /// In the smallest currency unit.
    pub balance: i64,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: None,
            username: None,
            balance: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Block {
    pub id: String,
    pub height: i64,
    pub previous_block: Option<String>,
    pub timestamp: i64,
    pub generator_public_key: String,
    pub number_of_transactions: i32,
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Peer {
    pub ip: String,
    pub ws_port: i32,
    /// 0 = banned, 1 = disconnected, 2 = connected
    pub state: i32,
    pub os: Option<String>,
    pub version: Option<String>,
}
