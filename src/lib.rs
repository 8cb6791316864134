//! # kvprobe
//!
//! A conformance and load test harness for key-value servers that speak
//! a RESP-style protocol:
//! - Binary-safe command encoding and incremental reply decoding
//! - Per-connection sessions with gated, ordered command sequences
//! - Bounded worker pool driving thousands of concurrent sessions
//! - Aggregate report split by failure category
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Concurrency Controller                      │
//! │          (worker pool, shared AggregateReport)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ spawns N
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Session Runner                            │
//! │        (one connection, one Workflow, gated steps)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Encoder   │          │   Decoder   │
//!   │  (Command)  │          │ (Response)  │
//!   └──────┬──────┘          └──────▲──────┘
//!          │                        │
//!          ▼                        │
//!   ┌───────────────────────────────┴─────┐
//!   │        TCP connection to server      │
//!   └─────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod workflow;
pub mod session;
pub mod report;
pub mod controller;
pub mod scenarios;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FailureKind, ProbeError, Result};
pub use config::Config;
pub use controller::Controller;
pub use report::AggregateReport;
pub use session::{Session, SessionOutcome};
pub use workflow::{Predicate, Workflow};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvprobe
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
