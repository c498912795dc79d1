//! Error types for the DICT client
//!
//! Every failure the client can surface has a variant here. Errors that
//! travel through the notification channel are flattened into a
//! [`ContextError`], which carries the [`ErrorKind`] and the rendered
//! message.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the DICT client
#[derive(Error, Debug)]
pub enum Error {
    // === Connection Errors ===
    #[error("No hostname defined for the dictionary server")]
    NoHostname,

    #[error("Lookup failed for host '{host}': {reason}")]
    Lookup { host: String, reason: String },

    #[error("{message} ({server})")]
    Socket { server: String, message: String },

    #[error("Connection timeout for the dictionary server at '{0}'")]
    ConnectionTimeout(String),

    #[error("No connection to the dictionary server at '{0}'")]
    NoConnection(String),

    #[error("Unable to connect to the dictionary server at '{server}'. The server replied with code {code} (server down)")]
    ServerDown { server: String, code: u16 },

    // === Protocol Errors ===
    #[error("Unable to parse the dictionary server reply: '{0}'")]
    Parse(String),

    #[error("Invalid UTF-8 in reply from the dictionary server: {0}")]
    Decode(String),

    // === Command Errors ===
    #[error("No definitions found for '{0}'")]
    NoMatch(String),

    #[error("Invalid database '{0}'")]
    InvalidDatabase(String),

    #[error("Invalid strategy '{0}'")]
    InvalidStrategy(String),

    #[error("Bad command '{0}'")]
    InvalidCommand(String),

    #[error("Bad parameters for command '{0}'")]
    InvalidParameters(String),

    #[error("No databases found on dictionary server at '{0}'")]
    NoDatabases(String),

    #[error("No strategies found on dictionary server at '{0}'")]
    NoStrategies(String),

    #[error("Access denied for command '{command}' (code {code})")]
    AccessDenied { command: String, code: u16 },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a socket error for `server`
    pub fn socket(server: &str, message: impl Into<String>) -> Self {
        Self::Socket {
            server: server.to_string(),
            message: message.into(),
        }
    }

    /// Create a lookup error for `host`
    pub fn lookup(host: &str, reason: impl Into<String>) -> Self {
        Self::Lookup {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    /// The notification-level classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoHostname | Error::Lookup { .. } => ErrorKind::LookupFailure,
            Error::Socket { .. } | Error::Io(_) => ErrorKind::SocketFailure,
            Error::ConnectionTimeout(_) => ErrorKind::ConnectionTimeout,
            Error::NoConnection(_) => ErrorKind::NoConnection,
            Error::ServerDown { .. } => ErrorKind::ServerDown,
            Error::Parse(_) | Error::Decode(_) => ErrorKind::ProtocolParseError,
            Error::NoMatch(_) => ErrorKind::NoMatch,
            Error::InvalidDatabase(_) => ErrorKind::InvalidDatabase,
            Error::InvalidStrategy(_) => ErrorKind::InvalidStrategy,
            Error::InvalidCommand(_) => ErrorKind::InvalidCommand,
            Error::InvalidParameters(_) => ErrorKind::InvalidParameters,
            Error::NoDatabases(_) => ErrorKind::NoDatabasesPresent,
            Error::NoStrategies(_) => ErrorKind::NoStrategiesPresent,
            Error::AccessDenied { .. } => ErrorKind::AccessDenied,
            Error::Config(_)
            | Error::ConfigParse(_)
            | Error::FileRead { .. }
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error invalidates the connection it happened on
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LookupFailure
                | ErrorKind::SocketFailure
                | ErrorKind::ConnectionTimeout
                | ErrorKind::ServerDown
                | ErrorKind::ProtocolParseError
        )
    }
}

/// Error classification reported to notification consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LookupFailure,
    SocketFailure,
    ConnectionTimeout,
    NoConnection,
    ServerDown,
    ProtocolParseError,
    NoMatch,
    InvalidDatabase,
    InvalidStrategy,
    InvalidCommand,
    InvalidParameters,
    NoDatabasesPresent,
    NoStrategiesPresent,
    AccessDenied,
    Internal,
}

/// Serializable error carried by [`crate::protocol::Notification::Error`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ContextError {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_errors_are_not_fatal() {
        assert!(!Error::NoMatch("hello".into()).is_fatal());
        assert!(!Error::InvalidDatabase("foo".into()).is_fatal());
        assert!(!Error::NoConnection("dict.org:2628".into()).is_fatal());
    }

    #[test]
    fn test_connection_errors_are_fatal() {
        assert!(Error::ConnectionTimeout("dict.org:2628".into()).is_fatal());
        assert!(Error::Parse("garbage".into()).is_fatal());
        assert!(Error::Decode("invalid utf-8".into()).is_fatal());
        assert!(Error::ServerDown {
            server: "dict.org:2628".into(),
            code: 420
        }
        .is_fatal());
    }

    #[test]
    fn test_context_error_keeps_message() {
        let err = Error::NoMatch("hello".into());
        let ctx = ContextError::from(&err);
        assert_eq!(ctx.kind, ErrorKind::NoMatch);
        assert_eq!(ctx.message, "No definitions found for 'hello'");
    }
}
