//! Built-in workflows
//!
//! The command sequences the harness ships with. Keys are derived from a
//! prefix and the session index so concurrent sessions never share one.

use std::fmt;
use std::str::FromStr;

use crate::protocol::{Command, ValueType};
use crate::workflow::{Predicate, Workflow};

/// Per-session unique key, e.g. `client7Key`
pub fn session_key(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}Key")
}

/// A stored PUT answers exactly `+OK`
fn put_accepted() -> Predicate {
    Predicate::status("OK")
}

/// `PING`, expecting `+PONG`
pub fn ping() -> Workflow {
    Workflow::new().then(Command::ping(), Predicate::status("PONG"))
}

/// PUT, then GET if the PUT succeeded, then DELETE if the GET found it
pub fn round_trip(key: &str, value: &str) -> Workflow {
    Workflow::new()
        .then(
            Command::put(ValueType::String, key.to_string(), value.to_string()),
            put_accepted(),
        )
        .then_if(
            put_accepted(),
            Command::get(key.to_string()),
            Predicate::payload(value.to_string()),
        )
        .then_if(Predicate::Present, Command::delete(key.to_string()), Predicate::Ok)
}

/// PUT, then GET only if the PUT succeeded
pub fn put_then_get(key: &str, value: &str) -> Workflow {
    Workflow::new()
        .then(
            Command::put(ValueType::String, key.to_string(), value.to_string()),
            put_accepted(),
        )
        .then_if(
            put_accepted(),
            Command::get(key.to_string()),
            Predicate::payload(value.to_string()),
        )
}

/// Two PUTs, two GETs, two DELETEs on one connection
pub fn multi_request(prefix: &str) -> Workflow {
    let keys = [format!("{prefix}Key1"), format!("{prefix}Key2")];
    let values = [format!("{prefix}Value1"), format!("{prefix}Value2")];

    let mut workflow = Workflow::new();
    for (key, value) in keys.iter().zip(&values) {
        workflow = workflow.then(
            Command::put(ValueType::String, key.clone(), value.clone()),
            put_accepted(),
        );
    }
    for (key, value) in keys.iter().zip(&values) {
        workflow = workflow.then(Command::get(key.clone()), Predicate::payload(value.clone()));
    }
    for key in &keys {
        workflow = workflow.then(Command::delete(key.clone()), Predicate::Ok);
    }
    workflow
}

/// GET a key that was never written; absent or an error both pass
pub fn missing_key(key: &str) -> Workflow {
    Workflow::new().then(
        Command::get(key.to_string()),
        Predicate::AnyOf(vec![Predicate::Absent, Predicate::Error]),
    )
}

/// PUT, DELETE, DELETE again. The second DELETE may succeed or report
/// "not found"; either is a well-formed answer.
pub fn delete_twice(key: &str) -> Workflow {
    Workflow::new()
        .then(
            Command::put(ValueType::String, key.to_string(), "doomed"),
            put_accepted(),
        )
        .then(Command::delete(key.to_string()), Predicate::Ok)
        .then(
            Command::delete(key.to_string()),
            Predicate::AnyOf(vec![Predicate::Ok, Predicate::Absent, Predicate::Error]),
        )
}

/// Named scenario, selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Ping,
    RoundTrip,
    PutThenGet,
    MultiRequest,
    MissingKey,
    DeleteTwice,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::Ping,
        Scenario::RoundTrip,
        Scenario::PutThenGet,
        Scenario::MultiRequest,
        Scenario::MissingKey,
        Scenario::DeleteTwice,
    ];

    /// Build the workflow for session `index`
    pub fn workflow(&self, prefix: &str, index: usize) -> Workflow {
        let key = session_key(prefix, index);
        match self {
            Scenario::Ping => ping(),
            Scenario::RoundTrip => round_trip(&key, &format!("{prefix}{index}Value")),
            Scenario::PutThenGet => put_then_get(&key, &format!("{prefix}{index}Value")),
            Scenario::MultiRequest => multi_request(&format!("{prefix}{index}")),
            Scenario::MissingKey => missing_key(&format!("{key}-missing")),
            Scenario::DeleteTwice => delete_twice(&key),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Ping => "ping",
            Scenario::RoundTrip => "round-trip",
            Scenario::PutThenGet => "put-then-get",
            Scenario::MultiRequest => "multi-request",
            Scenario::MissingKey => "missing-key",
            Scenario::DeleteTwice => "delete-twice",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Scenario::ALL.iter().map(|s| s.name()).collect();
                format!("unknown scenario `{}` (expected one of: {})", s, names.join(", "))
            })
    }
}
