//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Default dictionary server
pub const DEFAULT_HOSTNAME: &str = "dict.org";

/// IANA-assigned DICT port
pub const DEFAULT_PORT: u16 = 2628;

/// "All databases" marker understood by DICT servers
pub const DEFAULT_DATABASE: &str = "!";

/// "Server default strategy" marker understood by DICT servers
pub const DEFAULT_STRATEGY: &str = ".";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Dictionary server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Default lookup parameters
    #[serde(default)]
    pub defaults: Defaults,

    /// Debugging switches
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Dictionary server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname of the dictionary server
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Port of the dictionary server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name advertised to the server through the CLIENT command
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Accept IPv6 addresses when resolving the hostname
    #[serde(default)]
    pub prefer_ipv6: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            client_name: default_client_name(),
            prefer_ipv6: false,
        }
    }
}

fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// The client banner sent by default
pub fn default_client_name() -> String {
    format!("dict-client ({})", env!("CARGO_PKG_VERSION"))
}

/// Timeout settings in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    /// Time allowed between connecting and receiving the first line
    #[serde(default = "default_connect")]
    pub connect_secs: u64,

    /// How long a hostname resolution stays valid
    #[serde(default = "default_lookup_cache")]
    pub lookup_cache_secs: u64,
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn lookup_cache(&self) -> Duration {
        Duration::from_secs(self.lookup_cache_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_connect(),
            lookup_cache_secs: default_lookup_cache(),
        }
    }
}

fn default_connect() -> u64 {
    30
}
fn default_lookup_cache() -> u64 {
    300
}

/// Default lookup parameters
#[derive(Debug, Clone, Deserialize)]
pub struct Defaults {
    /// Database used when a lookup does not name one
    #[serde(default = "default_database")]
    pub database: String,

    /// Strategy used when a match does not name one
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            database: default_database(),
            strategy: default_strategy(),
        }
    }
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

/// Debugging switches
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DebugConfig {
    /// Log every line exchanged with the server at info level
    #[serde(default)]
    pub wire: bool,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.hostname.trim().is_empty() {
            return Err(super::Error::Config(
                "server.hostname must not be empty".to_string(),
            ));
        }
        if self.timeouts.connect_secs == 0 {
            return Err(super::Error::Config(
                "timeouts.connect_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.hostname, "dict.org");
        assert_eq!(config.server.port, 2628);
        assert!(config.server.client_name.starts_with("dict-client ("));
        assert_eq!(config.timeouts.connect(), Duration::from_secs(30));
        assert_eq!(config.timeouts.lookup_cache(), Duration::from_secs(300));
        assert_eq!(config.defaults.database, "!");
        assert_eq!(config.defaults.strategy, ".");
        assert!(!config.debug.wire);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [server]
            hostname = "dict.example.org"

            [debug]
            wire = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.hostname, "dict.example.org");
        assert_eq!(config.server.port, 2628);
        assert_eq!(config.timeouts.connect_secs, 30);
        assert!(config.debug.wire);
    }

    #[test]
    fn test_rejects_empty_hostname() {
        let err = Config::parse("[server]\nhostname = \"\"\n").unwrap_err();
        assert!(matches!(err, crate::common::Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = Config::parse("[server\nport = 1").unwrap_err();
        assert!(matches!(err, crate::common::Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 2629\n\n[defaults]\nstrategy = \"prefix\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 2629);
        assert_eq!(config.defaults.strategy, "prefix");
        assert_eq!(config.defaults.database, "!");
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/dict-client.toml")).unwrap_err();
        assert!(matches!(err, crate::common::Error::FileRead { .. }));
    }
}
