//! Encoder and decoder entry points for the transport layer.
//!
//! Messages are not self-delimiting on the wire; the dispatch layer tells the
//! decoder which procedure's body to expect. The buffering [`Decoder`] accepts
//! bytes as they arrive and returns `Ok(None)` until a complete message is
//! buffered; the blocking helpers adapt any `std::io` stream, propagating its
//! I/O errors fail-fast and mapping end-of-stream mid-message to
//! [`WireError::Truncated`].

use crate::error::WireError;
use crate::message::{Procedure, Reply, Request};
use crate::wire::WireReader;
use crate::wire::WIRE_UNIT;
use bytes::{Buf, BytesMut};
use std::io::{self, Read, Write};
use tracing::trace;

/// Encodes requests and replies into wire bytes.
pub struct Encoder;

impl Encoder {
    /// Encodes a request body.
    pub fn encode_request(request: &Request) -> Result<BytesMut, WireError> {
        request.to_bytes()
    }

    /// Encodes a reply body.
    pub fn encode_reply(reply: &Reply) -> Result<BytesMut, WireError> {
        reply.to_bytes()
    }
}

/// Incremental decoder over a growing byte buffer.
///
/// One decoder serves one connection direction; each message is decoded by
/// exactly one call, start to finish, so no locking is needed at this layer.
pub struct Decoder {
    buffer: BytesMut,
    /// Lower bound on bytes still missing after the last incomplete attempt.
    pending: Option<usize>,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            pending: None,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next request body for `procedure`.
    ///
    /// Returns `Ok(None)` if more data is needed; consumes buffered bytes
    /// only on success.
    pub fn decode_request(&mut self, procedure: Procedure) -> Result<Option<Request>, WireError> {
        let (result, consumed) = {
            let mut r = WireReader::new(&self.buffer[..]);
            let result = Request::decode(procedure, &mut r);
            (result, r.consumed())
        };
        self.complete(procedure, result, consumed)
    }

    /// Attempts to decode the next reply body for `procedure`.
    pub fn decode_reply(&mut self, procedure: Procedure) -> Result<Option<Reply>, WireError> {
        let (result, consumed) = {
            let mut r = WireReader::new(&self.buffer[..]);
            let result = Reply::decode(procedure, &mut r);
            (result, r.consumed())
        };
        self.complete(procedure, result, consumed)
    }

    fn complete<T>(
        &mut self,
        procedure: Procedure,
        result: Result<T, WireError>,
        consumed: usize,
    ) -> Result<Option<T>, WireError> {
        match result {
            Ok(msg) => {
                self.buffer.advance(consumed);
                self.pending = None;
                trace!(?procedure, bytes = consumed, "decoded message");
                Ok(Some(msg))
            }
            Err(WireError::Truncated { needed, .. }) => {
                self.pending = Some(needed);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Call at end of stream: leftover buffered bytes mean the peer closed
    /// the connection mid-message.
    pub fn finish(&self) -> Result<(), WireError> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(WireError::Truncated {
                needed: self.pending.unwrap_or(1),
                available: self.buffer.len(),
            })
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending = None;
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a request body to a blocking stream.
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<(), WireError> {
    let buf = Encoder::encode_request(request)?;
    writer.write_all(&buf)?;
    trace!(procedure = ?request.procedure(), bytes = buf.len(), "wrote request");
    Ok(())
}

/// Writes a reply body to a blocking stream.
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<(), WireError> {
    let buf = Encoder::encode_reply(reply)?;
    writer.write_all(&buf)?;
    trace!(procedure = ?reply.procedure(), bytes = buf.len(), "wrote reply");
    Ok(())
}

/// Reads exactly the bytes a pending decode still needs.
///
/// Never consumes past the current message, so a stream carrying
/// back-to-back messages stays aligned across calls.
fn fill_exact<R: Read>(reader: &mut R, decoder: &mut Decoder) -> Result<(), WireError> {
    let needed = decoder.pending.unwrap_or(WIRE_UNIT);
    let mut chunk = vec![0u8; needed];
    match reader.read_exact(&mut chunk) {
        Ok(()) => {
            decoder.extend(&chunk);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(WireError::Truncated {
            needed,
            available: decoder.buffered(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Reads one request body for `procedure` from a blocking stream.
///
/// Reads no further than the end of the message; end of stream before the
/// message completes fails with [`WireError::Truncated`], and I/O errors are
/// propagated unretried.
pub fn read_request<R: Read>(reader: &mut R, procedure: Procedure) -> Result<Request, WireError> {
    let mut decoder = Decoder::new();
    loop {
        if let Some(request) = decoder.decode_request(procedure)? {
            return Ok(request);
        }
        fill_exact(reader, &mut decoder)?;
    }
}

/// Reads one reply body for `procedure` from a blocking stream.
pub fn read_reply<R: Read>(reader: &mut R, procedure: Procedure) -> Result<Reply, WireError> {
    let mut decoder = Decoder::new();
    loop {
        if let Some(reply) = decoder.decode_reply(procedure)? {
            return Ok(reply);
        }
        fill_exact(reader, &mut decoder)?;
    }
}

/// Line-delimited JSON codec for debug mode: one request or reply per line,
/// human-readable, no binary wire format.
pub mod jsonl {
    use super::*;

    /// Encodes a request as a JSON line.
    pub fn encode_request(request: &Request) -> Result<Vec<u8>, WireError> {
        to_line(request)
    }

    /// Encodes a reply as a JSON line.
    pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>, WireError> {
        to_line(reply)
    }

    fn to_line<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Line-delimited JSON decoder for catalog messages.
    ///
    /// The procedure tag travels inside the JSON itself, so unlike the binary
    /// decoder this one needs no procedure hint from the dispatch layer.
    pub struct LineDecoder {
        buffer: Vec<u8>,
    }

    impl LineDecoder {
        pub fn new() -> Self {
            Self {
                buffer: Vec::with_capacity(4096),
            }
        }

        pub fn extend(&mut self, data: &[u8]) {
            self.buffer.extend_from_slice(data);
        }

        /// Attempts to decode the next line as a request.
        pub fn decode_request(&mut self) -> Result<Option<Request>, WireError> {
            match self.next_line()? {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        }

        /// Attempts to decode the next line as a reply.
        pub fn decode_reply(&mut self) -> Result<Option<Reply>, WireError> {
            match self.next_line()? {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        }

        fn next_line(&mut self) -> Result<Option<String>, WireError> {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                return Ok(None);
            };
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            String::from_utf8(line[..line.len() - 1].to_vec())
                .map(Some)
                .map_err(|_| WireError::MalformedField {
                    field: "jsonl",
                    reason: "invalid UTF-8".to_string(),
                })
        }
    }

    impl Default for LineDecoder {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DbOpenReply, DbPutRequest, EnvCloseRequest, EnvOpenRequest};
    use bytes::Bytes;
    use std::io::Cursor;

    fn sample_request() -> Request {
        Request::EnvClose(EnvCloseRequest {
            environment_handle: 7,
            flags: 0,
        })
    }

    #[test]
    fn test_encoder_decoder_roundtrip() {
        let request = sample_request();
        let encoded = Encoder::encode_request(&request).unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded);

        let decoded = decoder
            .decode_request(Procedure::EnvClose)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_partial_message_decoding() {
        let request = Request::DbPut(DbPutRequest {
            database_handle: 3,
            transaction_handle: 0,
            key: Bytes::from_static(b"k1"),
            value: Bytes::from_static(b"v1"),
            flags: 0,
        });
        let encoded = Encoder::encode_request(&request).unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded[..6]);
        assert!(decoder.decode_request(Procedure::DbPut).unwrap().is_none());

        decoder.extend(&encoded[6..]);
        let decoded = decoder.decode_request(Procedure::DbPut).unwrap().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_back_to_back_messages() {
        let first = sample_request();
        let second = Request::EnvClose(EnvCloseRequest {
            environment_handle: 8,
            flags: 1,
        });

        let mut decoder = Decoder::new();
        decoder.extend(&Encoder::encode_request(&first).unwrap());
        decoder.extend(&Encoder::encode_request(&second).unwrap());

        assert_eq!(
            decoder.decode_request(Procedure::EnvClose).unwrap().unwrap(),
            first
        );
        assert_eq!(
            decoder.decode_request(Procedure::EnvClose).unwrap().unwrap(),
            second
        );
        decoder.finish().unwrap();
    }

    #[test]
    fn test_finish_rejects_leftover() {
        let mut decoder = Decoder::new();
        decoder.extend(&[0, 0, 0]);
        assert!(decoder.decode_request(Procedure::TxnAbort).unwrap().is_none());
        assert!(matches!(
            decoder.finish().unwrap_err(),
            WireError::Truncated { .. }
        ));
    }

    #[test]
    fn test_malformed_field_is_fatal() {
        // EnvOpen home field with invalid UTF-8 payload.
        let mut buf = Vec::new();
        buf.extend_from_slice(&3i32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&[0xFF, 0xFE, 0, 0]);
        buf.extend_from_slice(&0i32.to_be_bytes());
        buf.extend_from_slice(&0i32.to_be_bytes());

        let mut decoder = Decoder::new();
        decoder.extend(&buf);
        let err = decoder.decode_request(Procedure::EnvOpen).unwrap_err();
        assert!(matches!(err, WireError::MalformedField { field: "home", .. }));
    }

    #[test]
    fn test_io_roundtrip() {
        let reply = Reply::DbOpen(DbOpenReply {
            status: 0,
            database_handle: 42,
            db_type: 1,
            byte_order: 0,
        });

        let mut stream = Vec::new();
        write_reply(&mut stream, &reply).unwrap();

        let mut cursor = Cursor::new(stream);
        let decoded = read_reply(&mut cursor, Procedure::DbOpen).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn test_io_read_truncated_stream() {
        let reply = Reply::DbOpen(DbOpenReply {
            status: 0,
            database_handle: 42,
            db_type: 1,
            byte_order: 0,
        });
        let mut stream = Vec::new();
        write_reply(&mut stream, &reply).unwrap();
        stream.truncate(10);

        let mut cursor = Cursor::new(stream);
        let err = read_reply(&mut cursor, Procedure::DbOpen).unwrap_err();
        assert!(matches!(err, WireError::Truncated { .. }));
    }

    #[test]
    fn test_io_back_to_back_requests() {
        let first = sample_request();
        let second = Request::EnvClose(EnvCloseRequest {
            environment_handle: 8,
            flags: 1,
        });

        let mut stream = Vec::new();
        write_request(&mut stream, &first).unwrap();
        write_request(&mut stream, &second).unwrap();

        let mut cursor = Cursor::new(stream);
        assert_eq!(read_request(&mut cursor, Procedure::EnvClose).unwrap(), first);
        assert_eq!(
            read_request(&mut cursor, Procedure::EnvClose).unwrap(),
            second
        );
    }

    #[test]
    fn test_io_read_stops_at_message_boundary() {
        let request = sample_request();
        let mut stream = Vec::new();
        write_request(&mut stream, &request).unwrap();
        let body_len = stream.len() as u64;
        stream.extend_from_slice(b"next message bytes");

        let mut cursor = Cursor::new(stream);
        read_request(&mut cursor, Procedure::EnvClose).unwrap();
        assert_eq!(cursor.position(), body_len);
    }

    #[test]
    fn test_io_back_to_back_variable_length_replies() {
        let first = Reply::DbGet(crate::message::DbGetReply {
            status: 0,
            key: Bytes::from_static(b"order:1001"),
            value: Bytes::from_static(b"pending"),
        });
        let second = Reply::DbGet(crate::message::DbGetReply {
            status: 0,
            key: Bytes::from_static(b"order:1002"),
            value: Bytes::new(),
        });

        let mut stream = Vec::new();
        write_reply(&mut stream, &first).unwrap();
        write_reply(&mut stream, &second).unwrap();

        let mut cursor = Cursor::new(stream);
        assert_eq!(read_reply(&mut cursor, Procedure::DbGet).unwrap(), first);
        assert_eq!(read_reply(&mut cursor, Procedure::DbGet).unwrap(), second);
    }

    #[test]
    fn test_io_read_empty_stream() {
        let mut cursor = Cursor::new(Vec::new());
        let err = read_request(&mut cursor, Procedure::EnvClose).unwrap_err();
        assert!(matches!(err, WireError::Truncated { .. }));
    }

    #[test]
    fn test_io_write_request() {
        let request = Request::EnvOpen(EnvOpenRequest {
            environment_handle: 1,
            home: "/db".to_string(),
            flags: 0,
            mode: 0o660,
        });
        let mut stream = Vec::new();
        write_request(&mut stream, &request).unwrap();

        let mut cursor = Cursor::new(stream);
        let decoded = read_request(&mut cursor, Procedure::EnvOpen).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decoder_clear() {
        let mut decoder = Decoder::new();
        decoder.extend(b"partial");
        assert_eq!(decoder.buffered(), 7);
        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_jsonl_request_roundtrip() {
        let request = sample_request();
        let encoded = jsonl::encode_request(&request).unwrap();

        let mut decoder = jsonl::LineDecoder::new();
        decoder.extend(&encoded);

        let decoded = decoder.decode_request().unwrap().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_jsonl_reply_roundtrip() {
        let reply = Reply::DbOpen(DbOpenReply {
            status: 0,
            database_handle: 42,
            db_type: 1,
            byte_order: 0,
        });
        let encoded = jsonl::encode_reply(&reply).unwrap();

        let mut decoder = jsonl::LineDecoder::new();
        decoder.extend(&encoded);

        let decoded = decoder.decode_reply().unwrap().unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn test_jsonl_partial_line() {
        let request = sample_request();
        let encoded = jsonl::encode_request(&request).unwrap();

        let mut decoder = jsonl::LineDecoder::new();
        decoder.extend(&encoded[..encoded.len() - 1]);
        assert!(decoder.decode_request().unwrap().is_none());

        decoder.extend(b"\n");
        let decoded = decoder.decode_request().unwrap().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_jsonl_multiple_lines() {
        let first = sample_request();
        let second = Request::EnvClose(EnvCloseRequest {
            environment_handle: 9,
            flags: 2,
        });

        let mut data = jsonl::encode_request(&first).unwrap();
        data.extend(jsonl::encode_request(&second).unwrap());

        let mut decoder = jsonl::LineDecoder::new();
        decoder.extend(&data);

        assert_eq!(decoder.decode_request().unwrap().unwrap(), first);
        assert_eq!(decoder.decode_request().unwrap().unwrap(), second);
    }
}
