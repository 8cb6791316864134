//! Network Module
//!
//! Client-side TCP handling.
//!
//! ## Model
//! - One blocking `TcpStream` per session, never shared
//! - Connect, read and write are each bounded by a timeout
//! - The socket closes when the `Connection` is dropped

mod connection;

pub use connection::Connection;
