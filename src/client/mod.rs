//! Networked DICT client
//!
//! [`ClientContext`] owns the connection to a server; [`transport`] holds
//! the host resolver and the TCP line transport it is built on.

pub mod context;
pub mod transport;

pub use context::ClientContext;
pub use transport::{HostLookup, Resolver, SystemLookup, Transport};
