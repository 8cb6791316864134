//! Response definitions
//!
//! One decoded reply unit from the server.

use std::fmt;

use bytes::Bytes;

/// Simple status the target server uses for a missing key
pub const NULL_STATUS: &str = "NULL";

/// A decoded server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `+<text>\r\n`
    SimpleStatus(String),

    /// `-<text>\r\n`
    Error(String),

    /// `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` for absent
    BulkPayload(Option<Bytes>),

    /// `:<n>\r\n`
    IntegerReply(i64),
}

impl Response {
    /// A success status (`+OK`, `+PONG`, ...), but not the `+NULL` sentinel
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::SimpleStatus(s) if s != NULL_STATUS)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// "Not found": `$-1` or the server's `+NULL`
    pub fn is_absent(&self) -> bool {
        match self {
            Response::BulkPayload(None) => true,
            Response::SimpleStatus(s) => s == NULL_STATUS,
            _ => false,
        }
    }

    /// Bulk payload bytes, if any (an empty payload is `Some(b"")`)
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Response::BulkPayload(Some(data)) => Some(&data[..]),
            _ => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::SimpleStatus(text) => write!(f, "+{text}"),
            Response::Error(text) => write!(f, "-{text}"),
            Response::BulkPayload(Some(data)) => {
                write!(f, "\"{}\"", String::from_utf8_lossy(data))
            }
            Response::BulkPayload(None) => f.write_str("(nil)"),
            Response::IntegerReply(n) => write!(f, "(integer) {n}"),
        }
    }
}
