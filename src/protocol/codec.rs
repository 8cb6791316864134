//! Protocol codec
//!
//! Encoding and decoding functions for the RESP wire format.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! *<N>\r\n
//! $<len(arg_1)>\r\n<arg_1>\r\n
//! ...
//! $<len(arg_N)>\r\n<arg_N>\r\n
//! ```
//!
//! ### Reply Formats
//! ```text
//! +<status>\r\n            SimpleStatus
//! -<message>\r\n           Error
//! $<len>\r\n<bytes>\r\n    BulkPayload (len = -1 means absent)
//! :<integer>\r\n           IntegerReply
//! ```
//!
//! Lengths are byte counts, so arguments and payloads are binary-safe.
//! Decoders are incremental: `Ok(None)` means "need more bytes".

use std::io::{self, Read, Write};
use std::time::Instant;

use bytes::{Buf, Bytes, BytesMut};

use super::{Command, Response};
use crate::error::{ProbeError, Result};

const CRLF: &[u8; 2] = b"\r\n";

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Longest header/status line accepted before a CRLF must appear
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Bytes requested from the socket per read
pub const READ_CHUNK_SIZE: usize = 4 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: array header + one bulk string per element
pub fn encode_command(command: &Command) -> Vec<u8> {
    let parts = command.parts();
    let body: usize = parts.iter().map(|p| p.len() + 16).sum();
    let mut message = Vec::with_capacity(16 + body);

    message.push(b'*');
    message.extend_from_slice(parts.len().to_string().as_bytes());
    message.extend_from_slice(CRLF);

    for part in parts {
        put_bulk(&mut message, part);
    }

    message
}

/// Decode a command from the front of `bytes`
///
/// Returns the command and number of bytes consumed, or `None` if the
/// buffer does not yet hold a whole command.
pub fn decode_command(bytes: &[u8]) -> Result<Option<(Command, usize)>> {
    let Some(&first) = bytes.first() else {
        return Ok(None);
    };
    if first != b'*' {
        return Err(unexpected_byte("command", first));
    }

    let Some((line, mut pos)) = read_line(bytes, 1)? else {
        return Ok(None);
    };
    let count = parse_decimal(line)?;
    if count < 1 {
        return Err(ProbeError::Protocol(format!(
            "Command must have at least one element, got {}",
            count
        )));
    }

    // Every element needs at least `$0\r\n\r\n`, so the declared count
    // cannot size the vector beyond what the buffer could hold
    let mut parts = Vec::with_capacity((count as usize).min(bytes.len() / 6));
    for _ in 0..count {
        match bytes.get(pos) {
            None => return Ok(None),
            Some(b'$') => {}
            Some(&other) => return Err(unexpected_byte("command element", other)),
        }
        match decode_bulk(bytes, pos + 1, MAX_PAYLOAD_SIZE)? {
            None => return Ok(None),
            Some((Some(data), next)) => {
                parts.push(data);
                pos = next;
            }
            Some((None, _)) => {
                return Err(ProbeError::Protocol(
                    "Command element cannot be an absent bulk string".to_string(),
                ))
            }
        }
    }

    let mut parts = parts.into_iter();
    let verb = parts.next().unwrap_or_default();
    Ok(Some((Command::new(verb, parts), pos)))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut message = Vec::new();
    match response {
        Response::SimpleStatus(text) => put_line(&mut message, b'+', text.as_bytes()),
        Response::Error(text) => put_line(&mut message, b'-', text.as_bytes()),
        Response::IntegerReply(n) => put_line(&mut message, b':', n.to_string().as_bytes()),
        Response::BulkPayload(Some(data)) => put_bulk(&mut message, data),
        Response::BulkPayload(None) => put_line(&mut message, b'$', b"-1"),
    }
    message
}

/// Decode one reply from the front of `bytes` with the default size limit
pub fn decode_response(bytes: &[u8]) -> Result<Option<(Response, usize)>> {
    decode_response_with_limit(bytes, MAX_PAYLOAD_SIZE)
}

/// Decode one reply from the front of `bytes`
///
/// Dispatches on the first byte. Returns the response and the number of
/// bytes it occupied, or `None` if the reply is still incomplete.
pub fn decode_response_with_limit(
    bytes: &[u8],
    max_payload: usize,
) -> Result<Option<(Response, usize)>> {
    let Some(&first) = bytes.first() else {
        return Ok(None);
    };

    match first {
        b'+' => Ok(read_line(bytes, 1)?.map(|(line, next)| {
            (Response::SimpleStatus(String::from_utf8_lossy(line).into_owned()), next)
        })),
        b'-' => Ok(read_line(bytes, 1)?
            .map(|(line, next)| (Response::Error(String::from_utf8_lossy(line).into_owned()), next))),
        b':' => match read_line(bytes, 1)? {
            Some((line, next)) => Ok(Some((Response::IntegerReply(parse_decimal(line)?), next))),
            None => Ok(None),
        },
        b'$' => Ok(decode_bulk(bytes, 1, max_payload)?
            .map(|(data, next)| (Response::BulkPayload(data), next))),
        other => Err(unexpected_byte("reply", other)),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a command to a stream
///
/// `write_all` keeps writing until every byte is sent, so partial writes
/// are retried transparently.
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    tracing::trace!(bytes = ?String::from_utf8_lossy(&bytes), "write command");
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| ProbeError::from_transport(e, "write"))
}

/// Read one complete response from a stream
///
/// Bytes left over after the reply stay in `buffer` for the next call.
/// Blocks until a whole reply is buffered, the peer closes, or the
/// reader's timeout fires.
pub fn read_response<R: Read>(
    reader: &mut R,
    buffer: &mut BytesMut,
    max_payload: usize,
) -> Result<Response> {
    read_response_until(reader, buffer, max_payload, None)
}

/// Read one complete response, giving up once `deadline` has passed
///
/// The reader's own timeout bounds each `read` call; the deadline bounds
/// the whole reply, so a peer that sends a byte just before every read
/// timeout still cannot hold the reply open indefinitely.
pub fn read_response_until<R: Read>(
    reader: &mut R,
    buffer: &mut BytesMut,
    max_payload: usize,
    deadline: Option<Instant>,
) -> Result<Response> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        if let Some((response, consumed)) = decode_response_with_limit(&buffer[..], max_payload)? {
            buffer.advance(consumed);
            return Ok(response);
        }

        if deadline.map_or(false, |d| Instant::now() >= d) {
            return Err(ProbeError::Timeout(format!(
                "read: reply incomplete at deadline with {} bytes buffered",
                buffer.len()
            )));
        }

        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProbeError::from_transport(e, "read")),
        };

        if n == 0 {
            if buffer.is_empty() {
                return Err(ProbeError::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
            return Err(ProbeError::Protocol(format!(
                "Truncated reply: stream ended with {} unparsed bytes",
                buffer.len()
            )));
        }

        buffer.extend_from_slice(&chunk[..n]);
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn unexpected_byte(what: &str, byte: u8) -> ProbeError {
    ProbeError::Protocol(format!(
        "Unknown {} type byte: 0x{:02x} ({:?})",
        what, byte, byte as char
    ))
}

fn put_line(out: &mut Vec<u8>, prefix: u8, body: &[u8]) {
    out.push(prefix);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}

fn put_bulk(out: &mut Vec<u8>, data: &[u8]) {
    put_line(out, b'$', data.len().to_string().as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(CRLF);
}

/// Find the line starting at `start`; returns it (without CRLF) and the
/// index just past the CRLF.
fn read_line(bytes: &[u8], start: usize) -> Result<Option<(&[u8], usize)>> {
    let rest = &bytes[start..];
    match rest.windows(2).position(|w| w == CRLF) {
        Some(end) => Ok(Some((&rest[..end], start + end + 2))),
        None if rest.len() > MAX_LINE_LEN => Err(ProbeError::Protocol(format!(
            "Line exceeds {} bytes without a terminator",
            MAX_LINE_LEN
        ))),
        None => Ok(None),
    }
}

fn parse_decimal(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            ProbeError::Protocol(format!(
                "Invalid integer: {:?}",
                String::from_utf8_lossy(line)
            ))
        })
}

/// Decode the body of a bulk string whose `$` sits at `start - 1`
fn decode_bulk(
    bytes: &[u8],
    start: usize,
    max_payload: usize,
) -> Result<Option<(Option<Bytes>, usize)>> {
    let Some((line, data_start)) = read_line(bytes, start)? else {
        return Ok(None);
    };

    let len = parse_decimal(line)?;
    if len == -1 {
        return Ok(Some((None, data_start)));
    }
    if len < 0 {
        return Err(ProbeError::Protocol(format!("Invalid bulk length: {}", len)));
    }

    let len = len as usize;
    if len > max_payload {
        return Err(ProbeError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, max_payload
        )));
    }

    let data_end = data_start + len;
    if bytes.len() < data_end + 2 {
        return Ok(None);
    }
    if &bytes[data_end..data_end + 2] != CRLF {
        return Err(ProbeError::Protocol(format!(
            "Bulk payload of {} bytes is not followed by CRLF",
            len
        )));
    }

    let data = Bytes::copy_from_slice(&bytes[data_start..data_end]);
    Ok(Some((Some(data), data_end + 2)))
}
