//! Error types for kvprobe
//!
//! Provides a unified error type for all harness operations, plus the
//! failure taxonomy used when tallying session outcomes.

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using ProbeError
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Unified error type for kvprobe operations
#[derive(Debug, Error)]
pub enum ProbeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(io::Error),

    #[error("Timed out: {0}")]
    Timeout(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker error: {0}")]
    Worker(String),
}

impl ProbeError {
    /// Wrap an I/O error raised on an established connection.
    ///
    /// Read/write timeouts surface as `WouldBlock` on Unix and `TimedOut`
    /// on Windows; both become `Timeout`.
    pub fn from_transport(err: io::Error, during: &str) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                ProbeError::Timeout(format!("{during}: {err}"))
            }
            _ => ProbeError::Transport(err),
        }
    }

    /// Classify this error for the aggregate report
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::Connect { .. } => FailureKind::Connection,
            ProbeError::Io(_) | ProbeError::Transport(_) | ProbeError::Timeout(_) => {
                FailureKind::Transport
            }
            ProbeError::Protocol(_) => FailureKind::Protocol,
            // Raised by the controller before or around sessions, never inside one.
            ProbeError::Config(_) | ProbeError::Worker(_) => FailureKind::Connection,
        }
    }
}

/// Why a session failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The endpoint refused or never accepted the connection
    Connection,

    /// A read/write failed or timed out on an established connection
    Transport,

    /// The server's bytes did not follow the reply grammar
    Protocol,

    /// A well-formed reply did not satisfy the workflow's expectation
    Application,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Connection => "connection",
            FailureKind::Transport => "transport",
            FailureKind::Protocol => "protocol",
            FailureKind::Application => "application",
        };
        f.write_str(name)
    }
}
