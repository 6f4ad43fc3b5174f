//! Configuration for tlogkv
//!
//! Centralized configuration with sensible defaults. Process configuration is
//! environment driven (see [`Config::from_env`]); the server binary layers its
//! command-line flags on top.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{KvError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_LOGGER: &str = "TLOG_TYPE";
pub const ENV_LOG_FILE: &str = "TLOG_FILENAME";
pub const ENV_FRONTEND: &str = "FRONTEND_TYPE";
pub const ENV_LISTEN_ADDR: &str = "KV_LISTEN_ADDR";
pub const ENV_SYNC_EVERY: &str = "TLOG_SYNC_EVERY";
pub const ENV_QUEUE_CAPACITY: &str = "TLOG_QUEUE_CAPACITY";
pub const ENV_MAX_KEYS: &str = "KV_MAX_KEYS";

/// Main configuration for a tlogkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Transaction Log Configuration
    // -------------------------------------------------------------------------
    /// Which transaction log format to use
    pub logger_kind: LoggerKind,

    /// Path of the transaction log file (created if absent)
    pub log_path: PathBuf,

    /// Sync strategy: how often to fsync the log
    pub sync_strategy: SyncStrategy,

    /// Capacity of the writer queue; producers block when it is full
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Optional upper bound on the number of distinct keys
    pub max_keys: Option<usize>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Which frontend serves requests
    pub frontend_kind: FrontendKind,

    /// Listen address (host:port)
    pub listen_addr: String,

    /// Max concurrent client connections (TCP frontend)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, TCP frontend)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, TCP frontend)
    pub write_timeout_ms: u64,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after N appends, and whenever the writer queue runs dry
    EveryNEntries { count: usize },
}

impl SyncStrategy {
    /// Build a strategy from an entry count (`1` means every write)
    pub fn every(count: usize) -> Self {
        if count <= 1 {
            SyncStrategy::EveryWrite
        } else {
            SyncStrategy::EveryNEntries { count }
        }
    }
}

/// Transaction log formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerKind {
    /// Tab separated text lines with escaped fields
    File,

    /// CRC-checked binary frames
    Binary,
}

/// Request frontends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendKind {
    /// JSON over HTTP
    Rest,

    /// Length-prefixed binary protocol over TCP
    Tcp,
}

impl FromStr for LoggerKind {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(LoggerKind::File),
            "binary" => Ok(LoggerKind::Binary),
            "" => Err(KvError::Config("transaction logger type not defined".to_string())),
            other => Err(KvError::Config(format!("no such transaction logger: {}", other))),
        }
    }
}

impl fmt::Display for LoggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerKind::File => f.write_str("file"),
            LoggerKind::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for FrontendKind {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rest" => Ok(FrontendKind::Rest),
            "tcp" => Ok(FrontendKind::Tcp),
            "" => Err(KvError::Config("frontend type not specified".to_string())),
            other => Err(KvError::Config(format!("no such frontend: {}", other))),
        }
    }
}

impl fmt::Display for FrontendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontendKind::Rest => f.write_str("rest"),
            FrontendKind::Tcp => f.write_str("tcp"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logger_kind: LoggerKind::File,
            log_path: PathBuf::from("./transaction.log"),
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
            queue_capacity: 64,
            max_keys: None,
            frontend_kind: FrontendKind::Rest,
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// The logger kind, log file and frontend kind are required; everything
    /// else falls back to [`Config::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        config.logger_kind = lookup(ENV_LOGGER).unwrap_or_default().parse()?;
        config.frontend_kind = lookup(ENV_FRONTEND).unwrap_or_default().parse()?;

        config.log_path = match lookup(ENV_LOG_FILE) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => {
                return Err(KvError::Config(format!(
                    "{} must name the transaction log file",
                    ENV_LOG_FILE
                )))
            }
        };

        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            config.listen_addr = addr;
        }
        if let Some(raw) = lookup(ENV_SYNC_EVERY) {
            config.sync_strategy = SyncStrategy::every(parse_positive(ENV_SYNC_EVERY, &raw)?);
        }
        if let Some(raw) = lookup(ENV_QUEUE_CAPACITY) {
            config.queue_capacity = parse_positive(ENV_QUEUE_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_KEYS) {
            config.max_keys = Some(parse_positive(ENV_MAX_KEYS, &raw)?);
        }

        Ok(config)
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(KvError::Config(format!(
            "{} must be a positive integer, got {:?}",
            name, raw
        ))),
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the transaction log format
    pub fn logger_kind(mut self, kind: LoggerKind) -> Self {
        self.config.logger_kind = kind;
        self
    }

    /// Set the transaction log path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the writer queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Limit the number of distinct keys in the store
    pub fn max_keys(mut self, limit: usize) -> Self {
        self.config.max_keys = Some(limit);
        self
    }

    /// Set the frontend kind
    pub fn frontend_kind(mut self, kind: FrontendKind) -> Self {
        self.config.frontend_kind = kind;
        self
    }

    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
