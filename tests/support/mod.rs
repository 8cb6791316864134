//! In-process fake server for integration tests
//!
//! Speaks the target server's grammar over real TCP on `127.0.0.1:0`:
//! - `PING` -> `+PONG`
//! - `PUT <type> <key> <value>` -> `+OK` (type must be string/int/bool/list)
//! - `GET <key>` -> bulk payload, or `+NULL` when missing
//! - `DELETE <key>` -> `+OK`
//!
//! A `Behavior` makes it misbehave in controlled ways.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use kvprobe::config::ConfigBuilder;
use kvprobe::protocol::{decode_command, encode_response, Command, Response};
use kvprobe::Config;
use parking_lot::Mutex;

type Store = Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>;

/// How the fake server answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Like the real server
    Normal,

    /// Missing GET -> `$-1`, missing DELETE -> `-ERR no such key`
    Strict,

    /// Every reply is `?garbage\r\n`
    Garbage,

    /// Correct replies, written one byte at a time
    Trickle,

    /// Reads commands, never answers
    Stall,

    /// Answers this many commands, then closes the connection
    CloseAfter(usize),

    /// Sends half of every reply, then closes the connection
    Truncate,

    /// Accepts connections but never reads from them, so client writes
    /// back up once the socket buffers fill
    NoRead,
}

pub struct FakeServer {
    addr: SocketAddr,
    store: Store,
    accepted: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeServer {
    pub fn start() -> Self {
        Self::with_behavior(Behavior::Normal)
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let store: Store = Arc::new(Mutex::new(HashMap::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let store = Arc::clone(&store);
            let accepted = Arc::clone(&accepted);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    let Ok(stream) = stream else { continue };
                    accepted.fetch_add(1, Ordering::AcqRel);
                    if behavior == Behavior::NoRead {
                        let shutdown = Arc::clone(&shutdown);
                        thread::spawn(move || hold(stream, &shutdown));
                        continue;
                    }
                    let store = Arc::clone(&store);
                    thread::spawn(move || serve(stream, store, behavior));
                }
            })
        };

        Self {
            addr,
            store,
            accepted,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Builder aimed at this server with short timeouts
    pub fn config(&self) -> ConfigBuilder {
        Config::builder()
            .host("127.0.0.1")
            .port(self.port())
            .io_timeout_ms(2000)
    }

    /// Connections accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::Acquire)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.store.lock().contains_key(key)
    }

    pub fn stored_keys(&self) -> usize {
        self.store.lock().len()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        // Wake the accept loop
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A port nothing is listening on
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Keep the socket open, unread, until the server shuts down
fn hold(stream: TcpStream, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(20));
    }
    drop(stream);
}

fn serve(mut stream: TcpStream, store: Store, behavior: Behavior) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let mut answered = 0;

    loop {
        match decode_command(&buffer) {
            Ok(Some((command, used))) => {
                buffer.drain(..used);
                if let Behavior::CloseAfter(limit) = behavior {
                    if answered >= limit {
                        return;
                    }
                }

                let reply = encode_response(&execute(&command, &store, behavior));
                answered += 1;
                let written = match behavior {
                    Behavior::Stall => Ok(()),
                    Behavior::Garbage => stream.write_all(b"?garbage\r\n"),
                    Behavior::Trickle => trickle(&mut stream, &reply),
                    Behavior::Truncate => {
                        let _ = stream.write_all(&reply[..reply.len() / 2]);
                        return;
                    }
                    _ => stream.write_all(&reply),
                };
                if written.is_err() {
                    return;
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                let _ = stream.write_all(&encode_response(&Response::Error(e.to_string())));
                return;
            }
        }

        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }
}

fn trickle(stream: &mut TcpStream, reply: &[u8]) -> std::io::Result<()> {
    for byte in reply {
        stream.write_all(std::slice::from_ref(byte))?;
        stream.flush()?;
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

fn execute(command: &Command, store: &Store, behavior: Behavior) -> Response {
    let verb = String::from_utf8_lossy(command.name()).to_ascii_uppercase();
    let args = command.args();
    let strict = behavior == Behavior::Strict;

    match (verb.as_str(), args.len()) {
        ("PING", _) => Response::SimpleStatus("PONG".to_string()),
        ("PUT", 3) => match &args[0][..] {
            b"string" | b"int" | b"bool" | b"list" => {
                store.lock().insert(args[1].to_vec(), args[2].to_vec());
                Response::SimpleStatus("OK".to_string())
            }
            _ => Response::Error("Unknown type. Supported types: string, int, bool, list".to_string()),
        },
        ("PUT", _) => Response::Error("PUT requires type, key, and value".to_string()),
        ("GET", 1) => match store.lock().get(&args[0][..]) {
            Some(value) => Response::BulkPayload(Some(Bytes::copy_from_slice(value))),
            None if strict => Response::BulkPayload(None),
            None => Response::SimpleStatus("NULL".to_string()),
        },
        ("DELETE", 1) => {
            let removed = store.lock().remove(&args[0][..]).is_some();
            if removed || !strict {
                Response::SimpleStatus("OK".to_string())
            } else {
                Response::Error("ERR no such key".to_string())
            }
        }
        _ => Response::Error(format!("Unknown command: {}", verb)),
    }
}
