//! Session Runner
//!
//! Drives one workflow over one exclusively owned connection.
//!
//! ## State Machine
//! ```text
//! Idle ──► Sending ──► AwaitingResponse ──► (gate?) ──► Sending | Idle ──► ... ──► Closed
//! ```
//!
//! Command *k+1* is never written before the reply to command *k* has
//! been decoded. Connection, transport and protocol errors end only this
//! session; the connection is dropped (and closed) on every exit path.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Config;
use crate::error::{FailureKind, Result};
use crate::network::Connection;
use crate::protocol::Response;
use crate::workflow::{OnUnexpected, Workflow};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    AwaitingResponse,
    Closed,
}

/// What happened to one workflow step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Sent and answered
    Replied { response: Response, matched: bool },

    /// Gate did not open; nothing was sent
    Skipped,
}

/// One entry in a session transcript
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Index of the workflow step this belongs to
    pub step: usize,

    /// Rendered command, for diagnostics
    pub command: String,

    pub outcome: StepOutcome,
}

impl Exchange {
    pub fn response(&self) -> Option<&Response> {
        match &self.outcome {
            StepOutcome::Replied { response, .. } => Some(response),
            StepOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == StepOutcome::Skipped
    }
}

/// A failed session, as recorded in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFailure {
    pub session_id: usize,
    pub kind: FailureKind,
    pub reason: String,
}

/// Everything one session produced
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: usize,

    /// `exchanges[n]` belongs to workflow step `n`
    pub exchanges: Vec<Exchange>,

    /// `None` if the session succeeded
    pub failure: Option<SessionFailure>,

    pub elapsed: Duration,
}

impl SessionOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of commands actually written to the wire
    pub fn commands_sent(&self) -> usize {
        self.exchanges.iter().filter(|e| !e.is_skipped()).count()
    }
}

/// One connection driving one workflow
pub struct Session<'a> {
    id: usize,
    config: &'a Config,
    state: SessionState,
    exchanges: Vec<Exchange>,
}

impl<'a> Session<'a> {
    pub fn new(id: usize, config: &'a Config) -> Self {
        Self {
            id,
            config,
            state: SessionState::Idle,
            exchanges: Vec::new(),
        }
    }

    /// Connect, run the workflow and close. Never panics on I/O failure.
    pub fn run(id: usize, config: &Config, workflow: &Workflow) -> SessionOutcome {
        Session::new(id, config).execute(workflow)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run `workflow` on a fresh connection and return the outcome
    pub fn execute(mut self, workflow: &Workflow) -> SessionOutcome {
        let started = Instant::now();
        self.exchanges.reserve(workflow.len());

        let result = Connection::connect(self.config).and_then(|mut conn| {
            tracing::trace!("Session {} connected to {}", self.id, conn.peer_addr());
            self.drive(&mut conn, workflow)
            // conn dropped here, closing the socket
        });
        let last_state = self.state;
        self.state = SessionState::Closed;

        let failure = match result {
            Ok(None) => None,
            Ok(Some(reason)) => Some(self.failure(FailureKind::Application, reason)),
            Err(e) => Some(self.failure(e.kind(), e.to_string())),
        };

        if let Some(f) = &failure {
            tracing::warn!(
                "Session {} failed while {:?} ({}): {}",
                self.id,
                last_state,
                f.kind,
                f.reason
            );
        }

        SessionOutcome {
            session_id: self.id,
            exchanges: self.exchanges,
            failure,
            elapsed: started.elapsed(),
        }
    }

    /// Walk the steps in order.
    ///
    /// Returns the first unexpected-reply description, if any.
    fn drive(&mut self, conn: &mut Connection, workflow: &Workflow) -> Result<Option<String>> {
        let mut prior: Option<Response> = None;
        let mut unexpected: Option<String> = None;

        for (index, step) in workflow.steps().iter().enumerate() {
            if !step.is_open(prior.as_ref()) {
                tracing::debug!("Session {} step {} skipped: {}", self.id, index, step.command);
                self.exchanges.push(Exchange {
                    step: index,
                    command: step.command.to_string(),
                    outcome: StepOutcome::Skipped,
                });
                continue;
            }

            self.state = SessionState::Sending;
            conn.send(&step.command)?;

            self.state = SessionState::AwaitingResponse;
            let response = conn.receive()?;
            self.state = SessionState::Idle;

            let matched = step.expect.matches(&response);
            tracing::debug!(
                "Session {} step {}: {} -> {} ({})",
                self.id,
                index,
                step.command,
                response,
                if matched { "ok" } else { "unexpected" }
            );

            if !matched && unexpected.is_none() {
                unexpected = Some(format!(
                    "step {} `{}`: expected {:?}, got {}",
                    index, step.command, step.expect, response
                ));
            }

            self.exchanges.push(Exchange {
                step: index,
                command: step.command.to_string(),
                outcome: StepOutcome::Replied {
                    response: response.clone(),
                    matched,
                },
            });

            if !matched && step.on_unexpected == OnUnexpected::Abort {
                break;
            }
            prior = Some(response);
        }

        Ok(unexpected)
    }

    fn failure(&self, kind: FailureKind, reason: String) -> SessionFailure {
        SessionFailure {
            session_id: self.id,
            kind,
            reason,
        }
    }
}
