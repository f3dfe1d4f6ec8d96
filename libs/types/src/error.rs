//! Message model errors

use crate::message::header::MessageType;
use thiserror::Error;

/// Errors raised while assembling a [`crate::Message`] from parts
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MessageError {
    /// Header type and payload variant disagree
    #[error("Payload mismatch: message type {msg_type:?} cannot carry a {payload} payload")]
    PayloadMismatch {
        msg_type: MessageType,
        payload: &'static str,
    },
}

impl MessageError {
    pub fn payload_mismatch(msg_type: MessageType, payload: &'static str) -> Self {
        Self::PayloadMismatch { msg_type, payload }
    }
}

/// Result alias for message model operations
pub type Result<T> = std::result::Result<T, MessageError>;
