//! # Wire Constants
//!
//! Sizes and offsets of the little-endian wire format. Every frame is a
//! 26-byte header followed by a body whose layout is selected by the first
//! byte (message type).
//!
//! ```text
//! Header:       type(1) priority(1) sequence(8) timestamp_us(8) client_id(8)
//! Order:        order_id(8) symbol_len(1) symbol(n) price_bits(8) quantity(4) side(1)
//! Market data:  symbol_len(1) symbol(n) bid_bits(8) ask_bits(8) bid_size(4) ask_size(4)
//! Error:        code(4) text_len(1) text(n)
//! Heartbeat, login, logout: empty body
//! ```

use types::MessageType;

/// Encoded header size
pub const HEADER_SIZE: usize = 26;

pub const OFFSET_TYPE: usize = 0;
pub const OFFSET_PRIORITY: usize = 1;
pub const OFFSET_SEQUENCE: usize = 2;
pub const OFFSET_TIMESTAMP: usize = 10;
pub const OFFSET_CLIENT_ID: usize = 18;

/// Order body without the symbol bytes
pub const ORDER_FIXED_BODY: usize = 8 + 1 + 8 + 4 + 1;
/// Market-data body without the symbol bytes
pub const MARKET_DATA_FIXED_BODY: usize = 1 + 8 + 8 + 4 + 4;
/// Error body without the text bytes
pub const ERROR_FIXED_BODY: usize = 4 + 1;

/// Longest symbol or error text (one-byte length prefix)
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Largest possible frame on the wire
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MARKET_DATA_FIXED_BODY + MAX_FIELD_LEN;

/// Smallest valid frame for `msg_type`, i.e. with zero-length variable fields
pub const fn min_frame_size(msg_type: MessageType) -> usize {
    HEADER_SIZE
        + match msg_type {
            MessageType::OrderNew
            | MessageType::OrderCancel
            | MessageType::OrderReplace
            | MessageType::OrderFill => ORDER_FIXED_BODY,
            MessageType::MarketData => MARKET_DATA_FIXED_BODY,
            MessageType::Error => ERROR_FIXED_BODY,
            MessageType::Heartbeat | MessageType::Login | MessageType::Logout => 0,
        }
}

/// Absolute offset of the one-byte length prefix for kinds that have one
pub const fn length_prefix_offset(msg_type: MessageType) -> Option<usize> {
    match msg_type {
        MessageType::OrderNew
        | MessageType::OrderCancel
        | MessageType::OrderReplace
        | MessageType::OrderFill => Some(HEADER_SIZE + 8),
        MessageType::MarketData => Some(HEADER_SIZE),
        MessageType::Error => Some(HEADER_SIZE + 4),
        MessageType::Heartbeat | MessageType::Login | MessageType::Logout => None,
    }
}
