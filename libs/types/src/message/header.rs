//! Message Header
//!
//! Fixed fields carried by every message regardless of kind.
//!
//! ```text
//! offset  field            size
//! 0       type             1
//! 1       priority         1
//! 2       sequence_number  8
//! 10      timestamp        8   (µs since epoch)
//! 18      client_id        8
//! 26..    type-specific body
//! ```

use crate::{clock::now_micros, sequence::next_sequence};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Message kind discriminant (first wire byte)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum MessageType {
    OrderNew = 1,
    OrderCancel = 2,
    OrderReplace = 3,
    OrderFill = 4,
    MarketData = 5,
    Heartbeat = 6,
    Login = 7,
    Logout = 8,
    Error = 9,
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::OrderNew,
        MessageType::OrderCancel,
        MessageType::OrderReplace,
        MessageType::OrderFill,
        MessageType::MarketData,
        MessageType::Heartbeat,
        MessageType::Login,
        MessageType::Logout,
        MessageType::Error,
    ];

    /// True for the four kinds that carry an order body
    pub fn is_order(self) -> bool {
        matches!(
            self,
            MessageType::OrderNew
                | MessageType::OrderCancel
                | MessageType::OrderReplace
                | MessageType::OrderFill
        )
    }

    /// True for login/logout, which carry no body
    pub fn is_session(self) -> bool {
        matches!(self, MessageType::Login | MessageType::Logout)
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::OrderNew => "OrderNew",
            MessageType::OrderCancel => "OrderCancel",
            MessageType::OrderReplace => "OrderReplace",
            MessageType::OrderFill => "OrderFill",
            MessageType::MarketData => "MarketData",
            MessageType::Heartbeat => "Heartbeat",
            MessageType::Login => "Login",
            MessageType::Logout => "Logout",
            MessageType::Error => "Error",
        }
    }
}

/// Informational priority; the core does not reorder by it
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, IntoPrimitive, TryFromPrimitive,
)]
pub enum Priority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Critical = 4,
}

/// Header fields common to every message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub msg_type: MessageType,
    pub priority: Priority,
    pub sequence_number: u64,
    /// Microseconds since the Unix epoch
    pub timestamp_us: u64,
    pub client_id: u64,
}

impl Header {
    /// Encoded header size in bytes
    pub const SIZE: usize = 26;

    /// Fresh header with a new sequence number and the current time
    pub fn new(msg_type: MessageType, priority: Priority) -> Self {
        Self {
            msg_type,
            priority,
            sequence_number: next_sequence(),
            timestamp_us: now_micros(),
            client_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_message_type_byte_conversion_is_exact(byte in any::<u8>()) {
            match MessageType::try_from(byte) {
                Ok(kind) => prop_assert_eq!(u8::from(kind), byte),
                Err(_) => prop_assert!(byte == 0 || byte > 9),
            }
        }
    }

    #[test]
    fn test_message_type_wire_values() {
        assert_eq!(u8::from(MessageType::OrderNew), 1);
        assert_eq!(u8::from(MessageType::MarketData), 5);
        assert_eq!(u8::from(MessageType::Error), 9);
        assert_eq!(MessageType::try_from(6u8).unwrap(), MessageType::Heartbeat);
        assert!(MessageType::try_from(0u8).is_err());
        assert!(MessageType::try_from(10u8).is_err());
    }

    #[test]
    fn test_message_type_classification() {
        let orders: Vec<_> = MessageType::ALL.iter().filter(|t| t.is_order()).collect();
        assert_eq!(orders.len(), 4);
        assert!(MessageType::Login.is_session());
        assert!(!MessageType::Heartbeat.is_session());
    }

    #[test]
    fn test_priority_wire_values() {
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!(u8::from(Priority::Critical), 4);
        assert!(Priority::try_from(0u8).is_err());
        assert!(Priority::High > Priority::Low);
    }

    #[test]
    fn test_new_header_assigns_sequence_and_time() {
        let a = Header::new(MessageType::Heartbeat, Priority::Low);
        let b = Header::new(MessageType::Heartbeat, Priority::Low);
        assert!(b.sequence_number > a.sequence_number);
        assert!(a.timestamp_us > 0);
        assert_eq!(a.client_id, 0);
    }
}
