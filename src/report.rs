//! Aggregate Report
//!
//! Cross-session tally of attempted/succeeded/failed outcomes.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::FailureKind;
use crate::session::{SessionFailure, SessionOutcome};

/// Tally of a harness run
///
/// Callers share it behind a mutex; `record` is the only mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,

    /// Commands written across all sessions
    pub commands_sent: u64,

    /// Failure count per category
    pub by_kind: BTreeMap<FailureKind, u64>,

    /// First failures seen, up to the configured cap
    pub failures: Vec<SessionFailure>,

    /// Failures counted but not kept in `failures`
    pub failures_dropped: u64,

    /// Wall-clock duration of the whole run (milliseconds)
    pub elapsed_ms: u64,

    #[serde(skip)]
    keep_failures: usize,
}

impl AggregateReport {
    /// Create an empty report keeping up to `keep_failures` failure entries
    pub fn new(keep_failures: usize) -> Self {
        Self {
            keep_failures,
            ..Self::default()
        }
    }

    /// Fold one finished session into the tally
    pub fn record(&mut self, outcome: &SessionOutcome) {
        self.attempted += 1;
        self.commands_sent += outcome.commands_sent() as u64;

        match &outcome.failure {
            None => self.succeeded += 1,
            Some(failure) => {
                self.failed += 1;
                *self.by_kind.entry(failure.kind).or_insert(0) += 1;
                if self.failures.len() < self.keep_failures {
                    self.failures.push(failure.clone());
                } else {
                    self.failures_dropped += 1;
                }
            }
        }
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis() as u64;
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Failures of one kind
    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// The single kind shared by every failure, if there is one.
    ///
    /// `Some(Connection)` points at an unreachable server rather than a
    /// framing bug.
    pub fn dominant_failure(&self) -> Option<FailureKind> {
        match self.by_kind.len() {
            1 => self.by_kind.keys().next().copied(),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} sessions attempted, {} succeeded, {} failed ({} commands, {} ms)",
            self.attempted, self.succeeded, self.failed, self.commands_sent, self.elapsed_ms
        )?;

        for (kind, count) in &self.by_kind {
            writeln!(f, "  {:<12} {}", kind, count)?;
        }
        if let Some(kind) = self.dominant_failure() {
            writeln!(f, "  all failures were {} failures", kind)?;
        }

        for failure in &self.failures {
            writeln!(
                f,
                "  session {}: [{}] {}",
                failure.session_id, failure.kind, failure.reason
            )?;
        }
        if self.failures_dropped > 0 {
            writeln!(f, "  ... {} more failures not shown", self.failures_dropped)?;
        }
        Ok(())
    }
}
