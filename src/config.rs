//! Configuration for kvprobe
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{ProbeError, Result};

/// Default target host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default target port
pub const DEFAULT_PORT: u16 = 20029;

/// Main configuration for a harness run
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Target server host
    pub host: String,

    /// Target server port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Load Configuration
    // -------------------------------------------------------------------------
    /// Number of sessions to run in total
    pub sessions: usize,

    /// Max sessions running at the same time (worker threads)
    pub concurrency: usize,

    // -------------------------------------------------------------------------
    // Timeout Configuration
    // -------------------------------------------------------------------------
    /// Connection establishment timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Per-read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Per-write timeout (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol / Reporting Configuration
    // -------------------------------------------------------------------------
    /// Largest bulk payload the decoder accepts (in bytes)
    pub max_reply_size: usize,

    /// Max (session id, reason) entries kept in the report
    pub keep_failures: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sessions: 100,
            concurrency: 64,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_reply_size: 16 * 1024 * 1024, // 16 MB
            keep_failures: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` of the target server
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Check the config for values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ProbeError::Config("host must not be empty".to_string()));
        }
        if self.sessions == 0 {
            return Err(ProbeError::Config("sessions must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ProbeError::Config("concurrency must be at least 1".to_string()));
        }
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(ProbeError::Config("timeouts must be greater than zero".to_string()));
        }
        if self.max_reply_size == 0 {
            return Err(ProbeError::Config("max_reply_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the target host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the target port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the total number of sessions
    pub fn sessions(mut self, count: usize) -> Self {
        self.config.sessions = count;
        self
    }

    /// Set the maximum number of sessions in flight
    pub fn concurrency(mut self, count: usize) -> Self {
        self.config.concurrency = count;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
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

    /// Set connect, read and write timeouts at once (in milliseconds)
    pub fn io_timeout_ms(self, ms: u64) -> Self {
        self.connect_timeout_ms(ms).read_timeout_ms(ms).write_timeout_ms(ms)
    }

    /// Set the largest accepted bulk payload (in bytes)
    pub fn max_reply_size(mut self, size: usize) -> Self {
        self.config.max_reply_size = size;
        self
    }

    /// Set how many failure entries the report keeps
    pub fn keep_failures(mut self, count: usize) -> Self {
        self.config.keep_failures = count;
        self
    }

    /// Validate and return the config.
    ///
    /// `concurrency` is clamped to `sessions`.
    pub fn build(self) -> Result<Config> {
        let mut config = self.config;
        config.validate()?;
        config.concurrency = config.concurrency.min(config.sessions);
        Ok(config)
    }
}
