//! Canonical message value
//!
//! A [`Message`] is a [`Header`] plus exactly one [`Payload`] variant matching
//! the header's [`MessageType`]. Producers build messages through the typed
//! constructors, which assign a fresh sequence number and timestamp. The codec
//! rebuilds messages through [`Message::from_parts`] and the header-correction
//! setters.

pub mod body;
pub mod header;

use crate::error::{MessageError, Result};
use body::{ErrorReport, MarketData, Order};
use header::{Header, MessageType, Priority};

/// Type-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Order-new, order-cancel, order-replace, order-fill
    Order(Order),
    MarketData(MarketData),
    Heartbeat,
    /// Login and logout frames carry no body
    Session,
    Error(ErrorReport),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Order(_) => "order",
            Payload::MarketData(_) => "market-data",
            Payload::Heartbeat => "heartbeat",
            Payload::Session => "session",
            Payload::Error(_) => "error",
        }
    }

    /// Whether a message of `msg_type` may carry this payload
    pub fn fits(&self, msg_type: MessageType) -> bool {
        match self {
            Payload::Order(_) => msg_type.is_order(),
            Payload::MarketData(_) => msg_type == MessageType::MarketData,
            Payload::Heartbeat => msg_type == MessageType::Heartbeat,
            Payload::Session => msg_type.is_session(),
            Payload::Error(_) => msg_type == MessageType::Error,
        }
    }
}

/// Unit of work flowing through the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    header: Header,
    payload: Payload,
}

impl Message {
    fn build(msg_type: MessageType, payload: Payload) -> Self {
        Self {
            header: Header::new(msg_type, Priority::default()),
            payload,
        }
    }

    pub fn order_new(order: Order) -> Self {
        Self::build(MessageType::OrderNew, Payload::Order(order))
    }

    pub fn order_cancel(order: Order) -> Self {
        Self::build(MessageType::OrderCancel, Payload::Order(order))
    }

    pub fn order_replace(order: Order) -> Self {
        Self::build(MessageType::OrderReplace, Payload::Order(order))
    }

    pub fn order_fill(order: Order) -> Self {
        Self::build(MessageType::OrderFill, Payload::Order(order))
    }

    pub fn market_data(quote: MarketData) -> Self {
        Self::build(MessageType::MarketData, Payload::MarketData(quote))
    }

    pub fn heartbeat() -> Self {
        Self::build(MessageType::Heartbeat, Payload::Heartbeat)
    }

    pub fn login() -> Self {
        Self::build(MessageType::Login, Payload::Session)
    }

    pub fn logout() -> Self {
        Self::build(MessageType::Logout, Payload::Session)
    }

    pub fn error(code: u32, text: impl Into<String>) -> Self {
        Self::build(MessageType::Error, Payload::Error(ErrorReport::new(code, text)))
    }

    /// Reassemble a message from a decoded header and payload.
    ///
    /// Does not draw a new sequence number; the header is taken as-is.
    pub fn from_parts(header: Header, payload: Payload) -> Result<Self> {
        if !payload.fits(header.msg_type) {
            return Err(MessageError::payload_mismatch(header.msg_type, payload.kind()));
        }
        Ok(Self { header, payload })
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.header.priority = priority;
        self
    }

    pub fn with_client_id(mut self, client_id: u64) -> Self {
        self.header.client_id = client_id;
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn message_type(&self) -> MessageType {
        self.header.msg_type
    }

    pub fn priority(&self) -> Priority {
        self.header.priority
    }

    pub fn sequence_number(&self) -> u64 {
        self.header.sequence_number
    }

    /// Microseconds since the Unix epoch
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp_us
    }

    pub fn client_id(&self) -> u64 {
        self.header.client_id
    }

    pub fn as_order(&self) -> Option<&Order> {
        match &self.payload {
            Payload::Order(order) => Some(order),
            _ => None,
        }
    }

    pub fn as_market_data(&self) -> Option<&MarketData> {
        match &self.payload {
            Payload::MarketData(quote) => Some(quote),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorReport> {
        match &self.payload {
            Payload::Error(report) => Some(report),
            _ => None,
        }
    }

    // Header corrections, used when rebuilding a message from wire bytes

    pub fn set_sequence_number(&mut self, sequence_number: u64) {
        self.header.sequence_number = sequence_number;
    }

    pub fn set_client_id(&mut self, client_id: u64) {
        self.header.client_id = client_id;
    }

    pub fn set_timestamp(&mut self, timestamp_us: u64) {
        self.header.timestamp_us = timestamp_us;
    }

    /// Header sanity check: sequence number and timestamp must be assigned
    pub fn validate_header(&self) -> std::result::Result<(), &'static str> {
        if self.header.sequence_number == 0 {
            return Err("Invalid sequence number");
        }
        if self.header.timestamp_us == 0 {
            return Err("Invalid timestamp");
        }
        Ok(())
    }
}
