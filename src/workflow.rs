//! Workflow definitions
//!
//! A workflow is the ordered list of steps one session drives over its
//! connection. Each step may be gated on the previous reply and carries
//! the reply it expects.

use bytes::Bytes;

use crate::protocol::{Command, Response};

// =============================================================================
// Predicates
// =============================================================================

/// A test over one decoded reply
///
/// Matches on the reply's variant, never on its raw text prefix, so
/// `+OK` and `+OKAY` are told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Any well-formed reply
    Any,

    /// A success status (any `+` reply except `+NULL`)
    Ok,

    /// A status with exactly this text
    Status(String),

    /// A bulk payload with exactly these bytes
    Payload(Bytes),

    /// A bulk payload of any content, including empty
    Present,

    /// `$-1` or `+NULL`
    Absent,

    /// An error reply
    Error,

    /// Anything but an error reply
    NotError,

    /// An integer reply with this value
    Integer(i64),

    /// At least one of the inner predicates
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    pub fn status(text: impl Into<String>) -> Self {
        Predicate::Status(text.into())
    }

    pub fn payload(data: impl Into<Bytes>) -> Self {
        Predicate::Payload(data.into())
    }

    pub fn matches(&self, response: &Response) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Ok => response.is_ok(),
            Predicate::Status(text) => {
                matches!(response, Response::SimpleStatus(s) if s == text)
            }
            Predicate::Payload(expected) => response.payload() == Some(&expected[..]),
            Predicate::Present => response.payload().is_some(),
            Predicate::Absent => response.is_absent(),
            Predicate::Error => response.is_error(),
            Predicate::NotError => !response.is_error(),
            Predicate::Integer(n) => matches!(response, Response::IntegerReply(v) if v == n),
            Predicate::AnyOf(options) => options.iter().any(|p| p.matches(response)),
        }
    }
}

// =============================================================================
// Steps
// =============================================================================

/// What a session does when a reply misses its expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnUnexpected {
    /// Stop the sequence; later steps are not sent
    #[default]
    Abort,

    /// Record the miss and keep going
    Continue,
}

/// One command in a workflow
#[derive(Debug, Clone)]
pub struct Step {
    pub command: Command,

    /// Checked against the reply of the last step that ran; the step is
    /// skipped if it fails or nothing has run yet
    pub gate: Option<Predicate>,

    pub expect: Predicate,

    pub on_unexpected: OnUnexpected,
}

impl Step {
    pub fn new(command: Command, expect: Predicate) -> Self {
        Self {
            command,
            gate: None,
            expect,
            on_unexpected: OnUnexpected::Abort,
        }
    }

    /// Whether this step should run given the last reply seen
    pub fn is_open(&self, prior: Option<&Response>) -> bool {
        match (&self.gate, prior) {
            (None, _) => true,
            (Some(gate), Some(response)) => gate.matches(response),
            (Some(_), None) => false,
        }
    }
}

// =============================================================================
// Workflow
// =============================================================================

/// An ordered command sequence for one session
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    steps: Vec<Step>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unconditional step
    pub fn then(mut self, command: Command, expect: Predicate) -> Self {
        self.steps.push(Step::new(command, expect));
        self
    }

    /// Append a step that only runs if the previous reply matches `gate`
    pub fn then_if(mut self, gate: Predicate, command: Command, expect: Predicate) -> Self {
        let mut step = Step::new(command, expect);
        step.gate = Some(gate);
        self.steps.push(step);
        self
    }

    /// Let the most recently added step continue past an unexpected reply
    pub fn continue_on_unexpected(mut self) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.on_unexpected = OnUnexpected::Continue;
        }
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
