//! Client Connection
//!
//! One TCP connection to the target server, owned by exactly one session.

use std::io::BufWriter;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::config::Config;
use crate::error::{ProbeError, Result};
use crate::protocol::{read_response_until, write_command, Command, Response, READ_CHUNK_SIZE};

/// A connection to the server under test
///
/// The socket is closed when the connection is dropped, so every exit
/// path of a session releases it.
pub struct Connection {
    /// TCP stream reader
    reader: TcpStream,

    /// TCP stream writer (buffered so a command goes out in one write)
    writer: BufWriter<TcpStream>,

    /// Bytes read but not yet decoded
    buffer: BytesMut,

    /// Largest bulk payload accepted
    max_payload: usize,

    /// Upper bound on the time spent receiving one whole reply
    reply_timeout: Duration,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Connect to the configured endpoint
    ///
    /// Tries every resolved address in turn, each bounded by the connect
    /// timeout. Does not retry.
    pub fn connect(config: &Config) -> Result<Self> {
        let addr = config.addr();
        let connect_err = |source| ProbeError::Connect {
            addr: addr.clone(),
            source,
        };

        let candidates: Vec<SocketAddr> = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(&connect_err)?
            .collect();

        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "host resolved to no addresses",
        );
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, config.connect_timeout()) {
                Ok(stream) => return Self::from_stream(stream, config),
                Err(e) => {
                    tracing::trace!("Connect to {} failed: {}", candidate, e);
                    last_err = e;
                }
            }
        }

        Err(connect_err(last_err))
    }

    /// Wrap an already-connected stream
    ///
    /// Sets up buffered I/O and configures timeouts
    pub fn from_stream(stream: TcpStream, config: &Config) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.read_timeout()))?;
        stream.set_write_timeout(Some(config.write_timeout()))?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: read_stream,
            writer: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            max_payload: config.max_reply_size,
            reply_timeout: config.read_timeout(),
            peer_addr,
        })
    }

    /// Encode and fully write one command
    pub fn send(&mut self, command: &Command) -> Result<()> {
        write_command(&mut self.writer, command)
    }

    /// Block until one whole reply has been decoded
    ///
    /// Fails with a timeout if the reply is still incomplete once the read
    /// timeout has elapsed, even while bytes keep arriving.
    pub fn receive(&mut self) -> Result<Response> {
        let deadline = Instant::now() + self.reply_timeout;
        read_response_until(&mut self.reader, &mut self.buffer, self.max_payload, Some(deadline))
    }

    /// Send a command and wait for its reply
    pub fn round_trip(&mut self, command: &Command) -> Result<Response> {
        self.send(command)?;
        self.receive()
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
