//! # Gateway Message Types
//!
//! Data model shared by every layer of the gateway: the codec turns bytes into
//! these values, the interceptor chain inspects them and the dispatch router
//! hands them to consumer services.
//!
//! ## Design
//!
//! - **Closed set of kinds**: [`MessageType`] is a `#[repr(u8)]` enumeration and
//!   every message carries exactly one [`Payload`] variant that agrees with it.
//! - **Immutable after construction**: once a [`Message`] is shared (wrapped in
//!   `Arc`) nothing mutates it. The only setters are the header corrections used
//!   while a message is rebuilt from wire bytes.
//! - **Process-wide sequencing**: every constructed message draws a unique,
//!   strictly increasing sequence number from [`next_sequence`].
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Message, MessageType, Order, Side};
//!
//! let order = Order::new(12345, "AAPL", 150.50, 100, Side::Buy);
//! let message = Message::order_new(order);
//!
//! assert_eq!(message.message_type(), MessageType::OrderNew);
//! assert!(message.sequence_number() > 0);
//! ```

pub mod clock;
pub mod error;
pub mod message;
pub mod sequence;

pub use clock::now_micros;
pub use error::{MessageError, Result};
pub use message::{
    body::{ErrorReport, MarketData, Order, Side},
    header::{Header, MessageType, Priority},
    Message, Payload,
};
pub use sequence::next_sequence;
