//! Monitor event names and event sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Query-lifecycle events raised by the driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorEvent {
    /// A physical connection was opened by the pool.
    Connect,
    /// A connection was released back to the pool.
    Disconnect,
    Query,
    Task,
    /// Transaction begin, commit or rollback.
    Transact,
    Error,
}

impl MonitorEvent {
    pub const ALL: [MonitorEvent; 6] = [
        Self::Connect,
        Self::Disconnect,
        Self::Query,
        Self::Task,
        Self::Transact,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Query => "query",
            Self::Task => "task",
            Self::Transact => "transact",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == name)
            .ok_or_else(|| {
                format!(
                    "Unknown monitor event '{}'. Expected one of: connect, disconnect, query, task, transact, error",
                    s.trim()
                )
            })
    }
}

/// Set of events a monitor attachment observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSet(BTreeSet<MonitorEvent>);

impl EventSet {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn all() -> Self {
        MonitorEvent::ALL.into_iter().collect()
    }

    pub fn contains(&self, event: MonitorEvent) -> bool {
        self.0.contains(&event)
    }

    pub fn insert(&mut self, event: MonitorEvent) -> bool {
        self.0.insert(event)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MonitorEvent> + '_ {
        self.0.iter().copied()
    }

    /// Parse a comma-separated list such as `"error,query"`.
    pub fn parse_list(s: &str) -> Result<Self, String> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(MonitorEvent::from_str)
            .collect()
    }
}

/// Only errors are observed unless configured otherwise.
impl Default for EventSet {
    fn default() -> Self {
        [MonitorEvent::Error].into_iter().collect()
    }
}

impl FromIterator<MonitorEvent> for EventSet {
    fn from_iter<I: IntoIterator<Item = MonitorEvent>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for EventSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(|e| e.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// A single event as seen by the monitor's output stage.
///
/// Output redirects may clear `display` to suppress the monitor's own rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub event: MonitorEvent,
    pub text: String,
    pub display: bool,
}
