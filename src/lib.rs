//! # remdb-protocol
//!
//! Wire protocol implementation for remdb, the remote database protocol.
//!
//! This crate provides:
//! - The wire codec: fixed 4-byte-unit, big-endian, padded binary encoding
//! - The message catalog: one request/reply schema per remote operation
//!   (environment, database, cursor, transaction families)
//! - Stream encode/decode entry points for the transport layer
//! - A line-delimited JSON debug mode for inspecting traffic
//!
//! The transport itself (connections, framing, dispatch) and the database
//! engine live in separate crates; this crate only guarantees that both ends
//! of a connection read and write every message bit-identically, regardless
//! of native word size or byte order.

pub mod codec;
pub mod error;
pub mod message;
pub mod wire;

pub use codec::{Decoder, Encoder};
pub use error::WireError;
pub use message::{DbType, Procedure, Reply, Request, GID_SIZE};
pub use wire::{WireField, WireMessage, WireReader, WireWriter, WIRE_UNIT};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default port for a remdb server.
pub const DEFAULT_PORT: u16 = 7402;

/// Maximum size of a single variable-length field (16 MiB).
pub const MAX_FIELD_SIZE: u32 = 16 * 1024 * 1024;
