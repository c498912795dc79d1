//! dict-client - a DICT protocol (RFC 2229) client library
//!
//! This library implements the client side of the DICT protocol: a
//! queued, line-oriented session engine that reports results and
//! lifecycle changes through a notification channel.

pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod protocol;

// Re-export commonly used types for tests
pub use client::ClientContext;
pub use common::{Error, ErrorKind, Result};
pub use protocol::{Database, Definition, Match, Notification, Strategy};
