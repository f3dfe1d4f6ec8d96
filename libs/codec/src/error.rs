//! Protocol-level errors for wire decoding and encoding
//!
//! Every variant carries enough context (offsets, sizes, field names) to tell a
//! truncated read apart from a corrupted or hostile stream when it shows up in
//! the logs.

use thiserror::Error;

/// Wire codec errors with diagnostic context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Buffer shorter than the minimum frame size for its type
    #[error("Message too small: need {need} bytes, got {got} (context: {context})")]
    MessageTooSmall {
        need: usize,
        got: usize,
        context: String,
    },

    /// A field (usually a length-prefixed one) reads past the end of the buffer
    #[error("Truncated field '{field}' at offset {offset}: need {need} bytes, {available} available")]
    Truncated {
        field: &'static str,
        offset: usize,
        need: usize,
        available: usize,
    },

    /// First byte is not a known message type
    #[error("Unknown message type {0}: valid types are 1-9")]
    UnknownMessageType(u8),

    /// Priority byte outside 1-4
    #[error("Invalid priority {0}: valid priorities are 1-4")]
    InvalidPriority(u8),

    /// Side flag other than 0 (sell) or 1 (buy)
    #[error("Invalid side flag {0}: expected 0 (sell) or 1 (buy)")]
    InvalidSide(u8),

    /// Symbol or error text is not UTF-8
    #[error("Invalid UTF-8 in field '{field}'")]
    InvalidUtf8 { field: &'static str },

    /// Variable-length field does not fit its one-byte length prefix
    #[error("Field '{field}' too long: {len} bytes exceeds maximum {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Per-connection reassembly buffer grew past its limit
    #[error("Frame buffer overflow: {buffered} bytes buffered exceeds limit {limit}")]
    BufferOverflow { buffered: usize, limit: usize },
}

impl ProtocolError {
    pub fn message_too_small(need: usize, got: usize, context: impl Into<String>) -> Self {
        Self::MessageTooSmall {
            need,
            got,
            context: context.into(),
        }
    }

    pub fn truncated(field: &'static str, offset: usize, need: usize, buffer_len: usize) -> Self {
        Self::Truncated {
            field,
            offset,
            need,
            available: buffer_len.saturating_sub(offset),
        }
    }

    pub fn field_too_long(field: &'static str, len: usize, max: usize) -> Self {
        Self::FieldTooLong { field, len, max }
    }

    /// Whether the stream can no longer be trusted after this error.
    ///
    /// Every decode-side error desynchronizes framing; only encoding-side
    /// field-length errors leave the connection usable.
    pub fn desynchronizes_stream(&self) -> bool {
        !matches!(self, ProtocolError::FieldTooLong { .. })
    }
}

/// Result alias for codec operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_too_small_formatting() {
        let error = ProtocolError::message_too_small(48, 20, "OrderNew frame");
        let display = error.to_string();
        assert!(display.contains("need 48 bytes"));
        assert!(display.contains("got 20"));
        assert!(display.contains("context: OrderNew frame"));
    }

    #[test]
    fn test_truncated_reports_available_bytes() {
        let error = ProtocolError::truncated("symbol", 35, 10, 40);
        assert_eq!(
            error,
            ProtocolError::Truncated {
                field: "symbol",
                offset: 35,
                need: 10,
                available: 5
            }
        );
        assert!(error.to_string().contains("'symbol' at offset 35"));

        // Offset beyond the buffer never underflows
        let error = ProtocolError::truncated("price", 60, 8, 40);
        assert!(matches!(error, ProtocolError::Truncated { available: 0, .. }));
    }

    #[test]
    fn test_desynchronization_classification() {
        assert!(ProtocolError::UnknownMessageType(42).desynchronizes_stream());
        assert!(ProtocolError::InvalidSide(3).desynchronizes_stream());
        assert!(!ProtocolError::field_too_long("symbol", 300, 255).desynchronizes_stream());
    }
}
