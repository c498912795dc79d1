//! Common utilities shared between the library and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{ContextError, Error, ErrorKind, Result};

/// Format a `host:port` pair the way it appears in error messages
pub fn server_label(hostname: &str, port: u16) -> String {
    if hostname.contains(':') {
        format!("[{}]:{}", hostname, port)
    } else {
        format!("{}:{}", hostname, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_label() {
        assert_eq!(server_label("dict.org", 2628), "dict.org:2628");
        assert_eq!(server_label("::1", 2628), "[::1]:2628");
    }
}
