//! Result values and notifications produced by the protocol engine
//!
//! Results are plain owned values; once handed to a consumer the engine
//! keeps no reference to them.

use serde::Serialize;

use crate::common::ContextError;

/// A dictionary hosted by the server (`SHOW DB`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Database {
    pub name: String,
    pub full_name: String,
}

/// A matching strategy offered by the server (`SHOW STRAT`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Strategy {
    pub name: String,
    pub description: String,
}

/// A word matched by `MATCH`, with the database it was found in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub word: String,
    pub database: String,
}

/// One definition out of a `DEFINE` batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    /// Number of definitions announced for the whole batch
    pub total: u32,
    pub word: String,
    pub database_name: String,
    pub database_full_name: String,
    /// Definition text, one `\n`-terminated line per body line
    pub body: String,
}

/// A definition whose body is still streaming
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingDefinition {
    pub total: u32,
    pub word: String,
    pub database_name: String,
    pub database_full_name: String,
}

impl PendingDefinition {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Seal the definition with its body
    pub fn finish(self, body: String) -> Definition {
        Definition {
            total: self.total,
            word: self.word,
            database_name: self.database_name,
            database_full_name: self.database_full_name,
            body,
        }
    }
}

/// Everything a context reports to its consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Notification {
    /// The server accepted the connection
    Connected,
    /// The connection was closed
    Disconnected,
    /// A lookup started producing results
    LookupStart,
    /// A lookup finished
    LookupEnd,
    Error(ContextError),
    DatabaseFound(Database),
    StrategyFound(Strategy),
    MatchFound(Match),
    DefinitionFound(Definition),
}

impl Notification {
    pub fn error(err: &crate::common::Error) -> Self {
        Notification::Error(ContextError::from(err))
    }
}
