//! Command definitions
//!
//! A command is an ordered list of binary-safe byte strings. The first
//! element is the verb; the server alone decides what the rest mean.

use std::fmt;

use bytes::Bytes;

/// Value type tags understood by the target server's `PUT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Int,
    Bool,
    List,
}

impl ValueType {
    /// Tag sent on the wire as the first `PUT` argument
    pub fn tag(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Bool => "bool",
            ValueType::List => "list",
        }
    }
}

impl std::str::FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ValueType::String),
            "int" => Ok(ValueType::Int),
            "bool" => Ok(ValueType::Bool),
            "list" => Ok(ValueType::List),
            other => Err(format!("unknown value type: {other}")),
        }
    }
}

/// A protocol command: verb followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Never empty; `parts[0]` is the verb
    parts: Vec<Bytes>,
}

impl Command {
    /// Build a command from a verb with no arguments
    pub fn verb(verb: impl Into<Bytes>) -> Self {
        Self {
            parts: vec![verb.into()],
        }
    }

    /// Build a command from a verb and arbitrary arguments
    pub fn new<I, A>(verb: impl Into<Bytes>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        let mut parts = vec![verb.into()];
        parts.extend(args.into_iter().map(Into::into));
        Self { parts }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.parts.push(arg.into());
        self
    }

    /// `PING`
    pub fn ping() -> Self {
        Self::verb("PING")
    }

    /// `PUT <type> <key> <value>`
    pub fn put(ty: ValueType, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::verb("PUT").arg(ty.tag()).arg(key).arg(value)
    }

    /// `GET <key>`
    pub fn get(key: impl Into<Bytes>) -> Self {
        Self::verb("GET").arg(key)
    }

    /// `DELETE <key>`
    pub fn delete(key: impl Into<Bytes>) -> Self {
        Self::verb("DELETE").arg(key)
    }

    /// The verb, e.g. `b"GET"`
    pub fn name(&self) -> &[u8] {
        &self.parts[0]
    }

    /// Everything after the verb
    pub fn args(&self) -> &[Bytes] {
        &self.parts[1..]
    }

    /// Verb plus arguments
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Element count including the verb
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Always false; a command carries at least its verb
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", String::from_utf8_lossy(part))?;
        }
        Ok(())
    }
}
