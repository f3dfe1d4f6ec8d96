//! # Gateway Wire Codec
//!
//! ## Purpose
//!
//! Converts between [`types::Message`] values and the gateway's fixed
//! little-endian wire format, and reassembles frames out of a TCP byte stream.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → network/
//!     ↑           ↓          ↓
//! Message      encode     epoll reads
//! Header       decode     per-connection
//! Payload      framing    FrameAssembler
//! ```
//!
//! ## What This Crate Contains
//! - [`encode`] / [`encode_into`]: exact-size encoding, no reallocation
//! - [`decode`] / [`decode_frame`]: bounds-checked decoding that never panics
//! - [`frame_len`]: frame boundary detection from the header and length prefix
//! - [`FrameAssembler`]: buffering of partial frames across reads
//! - [`ProtocolError`]: decode/encode failures with offsets and sizes
//!
//! ## What This Crate Does NOT Contain
//! - Semantic validation (zero prices, crossed quotes): that is the
//!   interceptor chain's job; the codec only checks structure
//! - Socket handling
//!
//! ## Examples
//!
//! ```rust
//! use codec::{decode, encode};
//! use types::{Message, Order, Side};
//!
//! let message = Message::order_new(Order::new(1, "AAPL", 150.50, 100, Side::Buy));
//! let bytes = encode(&message)?;
//! assert_eq!(decode(&bytes)?, message);
//! # Ok::<(), codec::ProtocolError>(())
//! ```

pub mod assembler;
pub mod constants;
pub mod encoder;
pub mod error;
pub mod parser;

pub use assembler::FrameAssembler;
pub use constants::{min_frame_size, HEADER_SIZE, MAX_FIELD_LEN, MAX_FRAME_SIZE};
pub use encoder::{encode, encode_into, encoded_len};
pub use error::{ProtocolError, Result};
pub use parser::{decode, decode_frame, frame_len, peek_type};
