//! Message catalog for remdb remote operations.
//!
//! Every remote procedure has a request and/or reply message with a fixed,
//! ordered field schema. A message is declared once with [`wire_message!`] and
//! the generic codec engine in [`crate::wire`] derives its encode/decode from
//! the field list; the [`catalog!`] invocation at the bottom of this file ties
//! each pair to its [`Procedure`] id and builds the closed [`Request`] and
//! [`Reply`] enums the dispatch layer works with.
//!
//! Invariants:
//! - Field order is part of a type's identity: encode writes fields in
//!   declared order, decode reads in the identical order. Reordering is a
//!   protocol-breaking change.
//! - Encode never omits a field, whatever its value (zero and empty included).
//! - Decode fills every field before returning; a failed decode discards the
//!   partial record entirely.
//! - Handles are opaque server-assigned integers; the codec transports them
//!   faithfully without interpreting them.

use crate::error::WireError;
use crate::wire::{WireField, WireMessage, WireReader, WireWriter};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Size of a global transaction identifier on the wire.
pub const GID_SIZE: usize = 32;

/// Database access method, the value space of `db_type` fields.
///
/// The codec transports `db_type` as a raw integer and does not enforce this
/// range; callers that want it checked apply `DbType::try_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum DbType {
    Btree = 1,
    Hash = 2,
    Queue = 3,
    Recno = 4,
    Unknown = 5,
}

impl TryFrom<i32> for DbType {
    type Error = WireError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DbType::Btree),
            2 => Ok(DbType::Hash),
            3 => Ok(DbType::Queue),
            4 => Ok(DbType::Recno),
            5 => Ok(DbType::Unknown),
            _ => Err(WireError::MalformedField {
                field: "db_type",
                reason: format!("unknown database type: {}", value),
            }),
        }
    }
}

/// The value space of `byte_order` fields in open replies: the stored
/// database's native integer order, reported by the server.
pub mod byte_order {
    /// Host order of the server (no conversion recorded).
    pub const NATIVE: i32 = 0;
    /// Little-endian storage.
    pub const LITTLE_ENDIAN: i32 = 1234;
    /// Big-endian storage.
    pub const BIG_ENDIAN: i32 = 4321;
}

/// Declares one message: a struct with public fields plus its
/// [`WireMessage`] impl, encode and decode both walking the fields in
/// declared order.
macro_rules! wire_message {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl WireMessage for $name {
            fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
                $( WireField::put(&self.$field, w)?; )*
                Ok(())
            }

            fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
                Ok(Self {
                    $( $field: WireField::get(r, stringify!($field))?, )*
                })
            }
        }
    };
}

// ============================================================================
// Environment operations
// ============================================================================

wire_message! {
    /// Asks the server to allocate a new environment session.
    EnvCreateRequest {
        /// Session timeout hint in seconds (0 = server default).
        timeout: i32,
    }
}

wire_message! {
    EnvCreateReply {
        status: i32,
        environment_handle: i32,
    }
}

wire_message! {
    /// Opens the environment rooted at `home` on the server side.
    EnvOpenRequest {
        environment_handle: i32,
        home: String,
        flags: i32,
        mode: i32,
    }
}

wire_message! {
    EnvOpenReply {
        status: i32,
        environment_handle: i32,
    }
}

wire_message! {
    /// Sent by the client to release a previously opened environment session.
    EnvCloseRequest {
        environment_handle: i32,
        flags: i32,
    }
}

wire_message! {
    EnvCloseReply {
        status: i32,
    }
}

wire_message! {
    EnvRemoveRequest {
        environment_handle: i32,
        home: String,
        flags: i32,
    }
}

wire_message! {
    EnvRemoveReply {
        status: i32,
    }
}

// ============================================================================
// Transaction operations
// ============================================================================

wire_message! {
    TxnBeginRequest {
        environment_handle: i32,
        /// Handle of the parent transaction, or 0 for a top-level one.
        parent_handle: i32,
        flags: i32,
    }
}

wire_message! {
    TxnBeginReply {
        status: i32,
        transaction_handle: i32,
    }
}

wire_message! {
    TxnCommitRequest {
        transaction_handle: i32,
        flags: i32,
    }
}

wire_message! {
    TxnCommitReply {
        status: i32,
    }
}

wire_message! {
    TxnAbortRequest {
        transaction_handle: i32,
    }
}

wire_message! {
    TxnAbortReply {
        status: i32,
    }
}

wire_message! {
    /// First phase of a distributed commit; `gid` is the fixed-width global
    /// transaction identifier assigned by the coordinator.
    TxnPrepareRequest {
        transaction_handle: i32,
        gid: [u8; GID_SIZE],
    }
}

wire_message! {
    TxnPrepareReply {
        status: i32,
    }
}

// ============================================================================
// Database operations
// ============================================================================

wire_message! {
    DbCreateRequest {
        environment_handle: i32,
        flags: i32,
    }
}

wire_message! {
    DbCreateReply {
        status: i32,
        database_handle: i32,
    }
}

wire_message! {
    DbOpenRequest {
        database_handle: i32,
        transaction_handle: i32,
        name: String,
        subdb: String,
        db_type: i32,
        flags: i32,
        mode: i32,
    }
}

wire_message! {
    /// Returned by the server after an open attempt. `status` is 0 on
    /// success, an engine-specific error code otherwise; the remaining three
    /// fields are only meaningful on success. Decode always reads all four
    /// fields regardless of `status`, preserving fixed-width framing.
    DbOpenReply {
        status: i32,
        database_handle: i32,
        db_type: i32,
        byte_order: i32,
    }
}

wire_message! {
    DbCloseRequest {
        database_handle: i32,
        flags: i32,
    }
}

wire_message! {
    DbCloseReply {
        status: i32,
    }
}

wire_message! {
    DbGetRequest {
        database_handle: i32,
        transaction_handle: i32,
        key: Bytes,
        flags: i32,
    }
}

wire_message! {
    /// The key is echoed back because some access methods rewrite it
    /// (partial or recno lookups).
    DbGetReply {
        status: i32,
        key: Bytes,
        value: Bytes,
    }
}

wire_message! {
    DbPutRequest {
        database_handle: i32,
        transaction_handle: i32,
        key: Bytes,
        value: Bytes,
        flags: i32,
    }
}

wire_message! {
    DbPutReply {
        status: i32,
        key: Bytes,
    }
}

wire_message! {
    DbDelRequest {
        database_handle: i32,
        transaction_handle: i32,
        key: Bytes,
        flags: i32,
    }
}

wire_message! {
    DbDelReply {
        status: i32,
    }
}

wire_message! {
    DbStatRequest {
        database_handle: i32,
        flags: i32,
    }
}

wire_message! {
    /// Statistics as a flat integer array; the layout of the array is
    /// engine-defined and versioned with the engine, not with the protocol.
    DbStatReply {
        status: i32,
        stats: Vec<i32>,
    }
}

// ============================================================================
// Cursor operations
// ============================================================================

wire_message! {
    CursorOpenRequest {
        database_handle: i32,
        transaction_handle: i32,
        flags: i32,
    }
}

wire_message! {
    CursorOpenReply {
        status: i32,
        cursor_handle: i32,
    }
}

wire_message! {
    /// `key` and `value` carry the positioning inputs; `flags` selects the
    /// movement (first/next/set/...), interpreted by the engine.
    CursorGetRequest {
        cursor_handle: i32,
        key: Bytes,
        value: Bytes,
        flags: i32,
    }
}

wire_message! {
    CursorGetReply {
        status: i32,
        key: Bytes,
        value: Bytes,
    }
}

wire_message! {
    CursorPutRequest {
        cursor_handle: i32,
        key: Bytes,
        value: Bytes,
        flags: i32,
    }
}

wire_message! {
    CursorPutReply {
        status: i32,
        key: Bytes,
    }
}

wire_message! {
    CursorDelRequest {
        cursor_handle: i32,
        flags: i32,
    }
}

wire_message! {
    CursorDelReply {
        status: i32,
    }
}

wire_message! {
    CursorCountRequest {
        cursor_handle: i32,
        flags: i32,
    }
}

wire_message! {
    /// Number of duplicate entries at the current cursor position.
    CursorCountReply {
        status: i32,
        count: i32,
    }
}

wire_message! {
    CursorCloseRequest {
        cursor_handle: i32,
    }
}

wire_message! {
    CursorCloseReply {
        status: i32,
    }
}

wire_message! {
    CursorDupRequest {
        cursor_handle: i32,
        flags: i32,
    }
}

wire_message! {
    CursorDupReply {
        status: i32,
        cursor_handle: i32,
    }
}

/// Ties every request/reply pair to its procedure id and builds the closed
/// [`Procedure`], [`Request`] and [`Reply`] enums plus their dispatch.
macro_rules! catalog {
    ( $( $(#[$meta:meta])* $proc:ident = $id:literal => $req:ident / $rep:ident ),* $(,)? ) => {
        /// Remote procedures in the catalog.
        ///
        /// The numeric ids are part of the protocol contract and must remain
        /// stable across versions; the dispatch layer keys encode/decode by
        /// them.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u32)]
        pub enum Procedure {
            $( $(#[$meta])* $proc = $id, )*
        }

        impl Procedure {
            /// Stable numeric identifier for the dispatch layer.
            pub fn id(self) -> u32 {
                self as u32
            }

            /// All procedures in the catalog, in id order.
            pub const ALL: &'static [Procedure] = &[ $( Procedure::$proc, )* ];
        }

        impl TryFrom<u32> for Procedure {
            type Error = WireError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                match value {
                    $( $id => Ok(Procedure::$proc), )*
                    other => Err(WireError::UnknownProcedure(other)),
                }
            }
        }

        /// A client request, tagged by operation.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum Request {
            $( $proc($req), )*
        }

        impl Request {
            pub fn procedure(&self) -> Procedure {
                match self {
                    $( Request::$proc(_) => Procedure::$proc, )*
                }
            }

            /// Writes every field of the request, in declared order.
            pub fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
                match self {
                    $( Request::$proc(m) => m.encode(w), )*
                }
            }

            /// Decodes the request body for `procedure` from the stream.
            pub fn decode(
                procedure: Procedure,
                r: &mut WireReader<'_>,
            ) -> Result<Self, WireError> {
                match procedure {
                    $( Procedure::$proc => Ok(Request::$proc(<$req>::decode(r)?)), )*
                }
            }
        }

        /// A server reply, tagged by operation.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum Reply {
            $( $proc($rep), )*
        }

        impl Reply {
            pub fn procedure(&self) -> Procedure {
                match self {
                    $( Reply::$proc(_) => Procedure::$proc, )*
                }
            }

            /// Writes every field of the reply, in declared order.
            pub fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
                match self {
                    $( Reply::$proc(m) => m.encode(w), )*
                }
            }

            /// Decodes the reply body for `procedure` from the stream.
            pub fn decode(
                procedure: Procedure,
                r: &mut WireReader<'_>,
            ) -> Result<Self, WireError> {
                match procedure {
                    $( Procedure::$proc => Ok(Reply::$proc(<$rep>::decode(r)?)), )*
                }
            }
        }
    };
}

catalog! {
    // Environment session lifecycle
    EnvCreate = 1 => EnvCreateRequest / EnvCreateReply,
    EnvOpen = 2 => EnvOpenRequest / EnvOpenReply,
    EnvClose = 3 => EnvCloseRequest / EnvCloseReply,
    EnvRemove = 4 => EnvRemoveRequest / EnvRemoveReply,

    // Transactions
    TxnBegin = 10 => TxnBeginRequest / TxnBeginReply,
    TxnCommit = 11 => TxnCommitRequest / TxnCommitReply,
    TxnAbort = 12 => TxnAbortRequest / TxnAbortReply,
    TxnPrepare = 13 => TxnPrepareRequest / TxnPrepareReply,

    // Databases
    DbCreate = 20 => DbCreateRequest / DbCreateReply,
    DbOpen = 21 => DbOpenRequest / DbOpenReply,
    DbClose = 22 => DbCloseRequest / DbCloseReply,
    DbGet = 23 => DbGetRequest / DbGetReply,
    DbPut = 24 => DbPutRequest / DbPutReply,
    DbDel = 25 => DbDelRequest / DbDelReply,
    DbStat = 26 => DbStatRequest / DbStatReply,

    // Cursors
    CursorOpen = 30 => CursorOpenRequest / CursorOpenReply,
    CursorGet = 31 => CursorGetRequest / CursorGetReply,
    CursorPut = 32 => CursorPutRequest / CursorPutReply,
    CursorDel = 33 => CursorDelRequest / CursorDelReply,
    CursorCount = 34 => CursorCountRequest / CursorCountReply,
    CursorClose = 35 => CursorCloseRequest / CursorCloseReply,
    CursorDup = 36 => CursorDupRequest / CursorDupReply,
}

impl Request {
    /// Encodes into a fresh buffer.
    pub fn to_bytes(&self) -> Result<BytesMut, WireError> {
        let mut w = WireWriter::new();
        self.encode(&mut w)?;
        Ok(w.finish())
    }

    /// Decodes the request body for `procedure` from the start of `buf`.
    pub fn from_bytes(procedure: Procedure, buf: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(buf);
        Self::decode(procedure, &mut r)
    }
}

impl Reply {
    /// Encodes into a fresh buffer.
    pub fn to_bytes(&self) -> Result<BytesMut, WireError> {
        let mut w = WireWriter::new();
        self.encode(&mut w)?;
        Ok(w.finish())
    }

    /// Decodes the reply body for `procedure` from the start of `buf`.
    pub fn from_bytes(procedure: Procedure, buf: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(buf);
        Self::decode(procedure, &mut r)
    }
}
