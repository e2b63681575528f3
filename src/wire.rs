//! Wire codec primitives.
//!
//! Every value on the wire occupies whole 4-byte units, big-endian:
//!
//! ```text
//! integer:         +----------+
//!                  | 4 bytes  |  big-endian two's-complement
//!                  +----------+
//! fixed opaque:    +----------------+-------+
//!                  | data           | pad   |  zero-padded to 4-byte unit
//!                  +----------------+-------+
//! variable bytes:  +----------+----------------+-------+
//!                  | length   | data           | pad   |
//!                  | 4 bytes  | length bytes   |       |
//!                  +----------+----------------+-------+
//! string:          same as variable bytes, UTF-8, no NUL terminator
//! ```
//!
//! The fixed-unit big-endian layout is the single property the rest of the
//! protocol depends on: client and server interpret every field identically
//! regardless of native word size or byte order.

use crate::error::WireError;
use crate::MAX_FIELD_SIZE;
use bytes::{BufMut, Bytes, BytesMut};

/// Wire unit size in bytes. All fields are padded to a multiple of this.
pub const WIRE_UNIT: usize = 4;

/// Number of padding bytes needed to reach the next wire unit boundary.
fn pad_len(len: usize) -> usize {
    (WIRE_UNIT - len % WIRE_UNIT) % WIRE_UNIT
}

/// Append-only encode cursor over an in-memory buffer.
///
/// Fixed-width puts cannot fail; variable-length puts enforce the per-field
/// size limit. Stream I/O happens only in the [`crate::codec`] helpers, which
/// propagate I/O errors fail-fast.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends a signed 32-bit integer as 4 big-endian bytes.
    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    /// Appends an unsigned 32-bit integer (length prefixes, counts).
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Appends a fixed-length byte block, zero-padded to the next unit.
    ///
    /// The receiver must know the length; no prefix is written.
    pub fn put_opaque(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
        self.buf.put_bytes(0, pad_len(data.len()));
    }

    /// Appends variable-length data: u32 length prefix, bytes, zero padding.
    pub fn put_bytes(&mut self, data: &[u8]) -> Result<(), WireError> {
        if data.len() > MAX_FIELD_SIZE as usize {
            return Err(WireError::FieldTooLarge {
                size: data.len(),
                max: MAX_FIELD_SIZE as usize,
            });
        }
        self.put_u32(data.len() as u32);
        self.put_opaque(data);
        Ok(())
    }

    /// Appends a UTF-8 string with the variable-length layout.
    pub fn put_string(&mut self, value: &str) -> Result<(), WireError> {
        self.put_bytes(value.as_bytes())
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer and returns the encoded bytes.
    pub fn finish(self) -> BytesMut {
        self.buf
    }
}

/// Decode cursor over a byte slice.
///
/// Every read checks remaining length first and fails with
/// [`WireError::Truncated`] if the stream ends early; a failed decode leaves
/// no usable partial value behind.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Truncated {
                needed: n - self.remaining(),
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads the next 4 bytes as a big-endian signed 32-bit integer.
    pub fn get_i32(&mut self) -> Result<i32, WireError> {
        let b = self.take(WIRE_UNIT)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads the next 4 bytes as a big-endian unsigned 32-bit integer.
    pub fn get_u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(WIRE_UNIT)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a fixed-length byte block and its padding.
    ///
    /// `field` names the field in error reports.
    pub fn get_opaque(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], WireError> {
        let data = self.take(len)?;
        let pad = self.take(pad_len(len))?;
        if pad.iter().any(|&b| b != 0) {
            return Err(WireError::MalformedField {
                field,
                reason: "nonzero padding bytes".to_string(),
            });
        }
        Ok(data)
    }

    /// Reads variable-length data: u32 length prefix, bytes, padding.
    pub fn get_bytes(&mut self, field: &'static str) -> Result<Bytes, WireError> {
        let len = self.get_u32()?;
        if len > MAX_FIELD_SIZE {
            return Err(WireError::MalformedField {
                field,
                reason: format!("length prefix {} exceeds max {}", len, MAX_FIELD_SIZE),
            });
        }
        let data = self.get_opaque(len as usize, field)?;
        Ok(Bytes::copy_from_slice(data))
    }

    /// Reads a UTF-8 string with the variable-length layout.
    pub fn get_string(&mut self, field: &'static str) -> Result<String, WireError> {
        let data = self.get_bytes(field)?;
        String::from_utf8(data.to_vec()).map_err(|_| WireError::MalformedField {
            field,
            reason: "invalid UTF-8".to_string(),
        })
    }
}

/// A value that encodes as one wire field.
///
/// This is the per-type half of the codec engine: message schemas declare
/// field lists, and each field type knows its own wire layout.
pub trait WireField: Sized {
    fn put(&self, w: &mut WireWriter) -> Result<(), WireError>;
    fn get(r: &mut WireReader<'_>, field: &'static str) -> Result<Self, WireError>;
}

impl WireField for i32 {
    fn put(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_i32(*self);
        Ok(())
    }

    fn get(r: &mut WireReader<'_>, _field: &'static str) -> Result<Self, WireError> {
        r.get_i32()
    }
}

impl WireField for u32 {
    fn put(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_u32(*self);
        Ok(())
    }

    fn get(r: &mut WireReader<'_>, _field: &'static str) -> Result<Self, WireError> {
        r.get_u32()
    }
}

impl WireField for Bytes {
    fn put(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_bytes(self)
    }

    fn get(r: &mut WireReader<'_>, field: &'static str) -> Result<Self, WireError> {
        r.get_bytes(field)
    }
}

impl WireField for String {
    fn put(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_string(self)
    }

    fn get(r: &mut WireReader<'_>, field: &'static str) -> Result<Self, WireError> {
        r.get_string(field)
    }
}

/// Fixed-length opaque blocks (e.g. global transaction identifiers).
impl<const N: usize> WireField for [u8; N] {
    fn put(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_opaque(self);
        Ok(())
    }

    fn get(r: &mut WireReader<'_>, field: &'static str) -> Result<Self, WireError> {
        let data = r.get_opaque(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(data);
        Ok(out)
    }
}

/// Integer arrays (statistics replies): u32 count prefix, then the integers.
impl WireField for Vec<i32> {
    fn put(&self, w: &mut WireWriter) -> Result<(), WireError> {
        if self.len() > (MAX_FIELD_SIZE as usize) / WIRE_UNIT {
            return Err(WireError::FieldTooLarge {
                size: self.len() * WIRE_UNIT,
                max: MAX_FIELD_SIZE as usize,
            });
        }
        w.put_u32(self.len() as u32);
        for v in self {
            w.put_i32(*v);
        }
        Ok(())
    }

    fn get(r: &mut WireReader<'_>, field: &'static str) -> Result<Self, WireError> {
        let count = r.get_u32()?;
        if count > MAX_FIELD_SIZE / WIRE_UNIT as u32 {
            return Err(WireError::MalformedField {
                field,
                reason: format!("count prefix {} exceeds max", count),
            });
        }
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            out.push(r.get_i32()?);
        }
        Ok(out)
    }
}

/// A complete message: a fixed, ordered sequence of wire fields.
///
/// Encode writes every field in declared order regardless of value; decode
/// reads in the identical order. Field order is part of the type's identity.
pub trait WireMessage: Sized {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError>;
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError>;

    /// Encodes into a fresh buffer.
    fn to_bytes(&self) -> Result<BytesMut, WireError> {
        let mut w = WireWriter::new();
        self.encode(&mut w)?;
        Ok(w.finish())
    }

    /// Decodes from the start of `buf`. Trailing bytes are left unread.
    fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(buf);
        Self::decode(&mut r)
    }
}
