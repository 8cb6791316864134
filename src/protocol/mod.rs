//! Protocol Module
//!
//! Defines the RESP wire protocol spoken by the target server.
//!
//! ## Request Format
//! ```text
//! *<N>\r\n ( $<len>\r\n<bytes>\r\n ){N}
//! ```
//!
//! ## Verbs exercised by the harness
//! - `PING`                        -> `+PONG`
//! - `PUT <type> <key> <value>`    -> `+OK`
//! - `GET <key>`                   -> bulk payload, `$-1` or `+NULL`
//! - `DELETE <key>`                -> `+OK` or an error
//!
//! ## Reply Types
//! - `+` SimpleStatus
//! - `-` Error
//! - `$` BulkPayload (length `-1` = absent)
//! - `:` IntegerReply

mod command;
mod response;
mod codec;

pub use command::{Command, ValueType};
pub use response::{Response, NULL_STATUS};
pub use codec::{
    decode_command, decode_response, decode_response_with_limit, encode_command,
    encode_response, read_response, read_response_until, write_command, MAX_LINE_LEN,
    MAX_PAYLOAD_SIZE, READ_CHUNK_SIZE,
};
