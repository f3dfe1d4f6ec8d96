//! Message encoding
//!
//! Output buffers are sized exactly from [`encoded_len`] before any byte is
//! written, so encoding never reallocates.

use crate::constants::{
    ERROR_FIXED_BODY, HEADER_SIZE, MARKET_DATA_FIXED_BODY, MAX_FIELD_LEN, ORDER_FIXED_BODY,
};
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, BytesMut};
use types::{Message, Payload};

/// Exact number of bytes [`encode`] produces for `message`
pub fn encoded_len(message: &Message) -> usize {
    HEADER_SIZE
        + match message.payload() {
            Payload::Order(order) => ORDER_FIXED_BODY + order.symbol.len(),
            Payload::MarketData(quote) => MARKET_DATA_FIXED_BODY + quote.symbol.len(),
            Payload::Error(report) => ERROR_FIXED_BODY + report.text.len(),
            Payload::Heartbeat | Payload::Session => 0,
        }
}

/// Encode one message into a freshly allocated frame
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(message));
    write_frame(message, &mut out)?;
    Ok(out)
}

/// Append one encoded frame to `out`
pub fn encode_into(message: &Message, out: &mut BytesMut) -> Result<()> {
    out.reserve(encoded_len(message));
    write_frame(message, out)
}

fn write_frame<B: BufMut>(message: &Message, out: &mut B) -> Result<()> {
    // Length checks first so a failed encode leaves `out` untouched
    check_lengths(message.payload())?;

    let header = message.header();
    out.put_u8(header.msg_type.into());
    out.put_u8(header.priority.into());
    out.put_u64_le(header.sequence_number);
    out.put_u64_le(header.timestamp_us);
    out.put_u64_le(header.client_id);

    match message.payload() {
        Payload::Order(order) => {
            out.put_u64_le(order.order_id);
            put_short_str(out, &order.symbol);
            out.put_u64_le(order.price.to_bits());
            out.put_u32_le(order.quantity);
            out.put_u8(order.side.into());
        }
        Payload::MarketData(quote) => {
            put_short_str(out, &quote.symbol);
            out.put_u64_le(quote.bid.to_bits());
            out.put_u64_le(quote.ask.to_bits());
            out.put_u32_le(quote.bid_size);
            out.put_u32_le(quote.ask_size);
        }
        Payload::Error(report) => {
            out.put_u32_le(report.code);
            put_short_str(out, &report.text);
        }
        Payload::Heartbeat | Payload::Session => {}
    }
    Ok(())
}

fn check_lengths(payload: &Payload) -> Result<()> {
    let (field, len) = match payload {
        Payload::Order(order) => ("symbol", order.symbol.len()),
        Payload::MarketData(quote) => ("symbol", quote.symbol.len()),
        Payload::Error(report) => ("error_text", report.text.len()),
        Payload::Heartbeat | Payload::Session => return Ok(()),
    };
    if len > MAX_FIELD_LEN {
        return Err(ProtocolError::field_too_long(field, len, MAX_FIELD_LEN));
    }
    Ok(())
}

// Caller has already checked the length fits in one byte
fn put_short_str<B: BufMut>(out: &mut B, value: &str) {
    out.put_u8(value.len() as u8);
    out.put_slice(value.as_bytes());
}
