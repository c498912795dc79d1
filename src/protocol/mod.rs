//! DICT (RFC 2229) protocol implementation
//!
//! This module holds everything that can be decided from the bytes on the
//! wire alone: status codes, line framing and quoting, commands, and the
//! reply state machine. It performs no I/O of its own beyond the line
//! helpers in [`codec`].

pub mod codec;
pub mod command;
pub mod engine;
pub mod status;
pub mod types;

pub use command::{Command, CommandKind, CommandQueue, CommandState};
pub use engine::{Action, Engine};
pub use status::StatusCode;
pub use types::*;
