//! Wire protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream ended before a field was fully read. Always fatal to the
    /// current message; the partially decoded record is discarded.
    #[error("truncated stream: needed {needed} more bytes ({available} available)")]
    Truncated { needed: usize, available: usize },

    /// A decoded field violates the wire format (bad UTF-8, absurd length
    /// prefix, nonzero padding). Reported upward, never corrected.
    #[error("malformed field `{field}`: {reason}")]
    MalformedField { field: &'static str, reason: String },

    /// A variable-length field exceeds the per-field size limit.
    #[error("field too large: {size} bytes (max {max})")]
    FieldTooLarge { size: usize, max: usize },

    /// A procedure identifier not present in the catalog.
    #[error("unknown procedure id: {0}")]
    UnknownProcedure(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Debug (jsonl) mode serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WireError {
    /// Returns whether this error is potentially retryable by the caller.
    ///
    /// The codec itself never retries; retry policy belongs to the RPC
    /// transport layer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WireError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        let io = WireError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert!(io.is_retryable());

        let trunc = WireError::Truncated {
            needed: 4,
            available: 0,
        };
        assert!(!trunc.is_retryable());

        let malformed = WireError::MalformedField {
            field: "name",
            reason: "invalid UTF-8".to_string(),
        };
        assert!(!malformed.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = WireError::Truncated {
            needed: 4,
            available: 1,
        };
        assert!(err.to_string().contains("truncated"));

        let err = WireError::UnknownProcedure(999);
        assert!(err.to_string().contains("999"));

        let err = WireError::FieldTooLarge {
            size: 100,
            max: 50,
        };
        assert!(err.to_string().contains("100"));
    }
}
