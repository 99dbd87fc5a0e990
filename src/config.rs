//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{AgePolicy, EvictionPolicy, FifoPolicy, LruPolicy};

// == Policy Kind ==
/// Which built-in eviction policy the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyKind {
    /// Least recently used
    #[default]
    Lru,
    /// Insertion order
    Fifo,
    /// Accesses since last use
    Age,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            "fifo" => Ok(PolicyKind::Fifo),
            "age" => Ok(PolicyKind::Age),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

/// Runtime-selected eviction policy over string keys and values.
pub type DynPolicy = Box<dyn EvictionPolicy<String, String> + Send + Sync>;

impl PolicyKind {
    /// Builds the policy with the given capacity.
    pub fn build(self, max_entries: usize) -> DynPolicy {
        match self {
            PolicyKind::Lru => Box::new(LruPolicy::<String>::new(max_entries)),
            PolicyKind::Fifo => Box::new(FifoPolicy::<String>::new(max_entries)),
            PolicyKind::Age => Box::new(AgePolicy::<String>::new(max_entries)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Directory backing the file source
    pub data_dir: PathBuf,
    /// HTTP server port
    pub server_port: u16,
    /// Background write-back interval in seconds
    pub flush_interval: u64,
    /// Eviction policy
    pub eviction_policy: PolicyKind,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DATA_DIR` - Directory holding the values (default: ./data)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `FLUSH_INTERVAL` - Write-back frequency in seconds (default: 5)
    /// - `EVICTION_POLICY` - `lru`, `fifo` or `age` (default: lru)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            flush_interval: parse_var("FLUSH_INTERVAL").unwrap_or(defaults.flush_interval),
            eviction_policy: parse_var("EVICTION_POLICY").unwrap_or(defaults.eviction_policy),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            data_dir: PathBuf::from("./data"),
            server_port: 3000,
            flush_interval: 5,
            eviction_policy: PolicyKind::Lru,
        }
    }
}
