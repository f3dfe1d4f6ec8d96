//! Message decoding
//!
//! Decoding is a pure function of the bytes: the first byte selects the body
//! layout, every read is bounds-checked, and malformed input yields a
//! [`ProtocolError`] instead of a panic.

use crate::constants::{
    length_prefix_offset, min_frame_size, HEADER_SIZE, OFFSET_CLIENT_ID, OFFSET_PRIORITY,
    OFFSET_SEQUENCE, OFFSET_TIMESTAMP, OFFSET_TYPE,
};
use crate::error::{ProtocolError, Result};
use byteorder::{ByteOrder, LittleEndian};
use types::{ErrorReport, Header, MarketData, Message, MessageType, Order, Payload, Priority, Side};

/// Message type named by the first byte of `data`
pub fn peek_type(data: &[u8]) -> Result<MessageType> {
    let raw = *data
        .get(OFFSET_TYPE)
        .ok_or_else(|| ProtocolError::message_too_small(1, 0, "message type byte"))?;
    MessageType::try_from(raw).map_err(|_| ProtocolError::UnknownMessageType(raw))
}

/// Total length of the frame at the start of `data`.
///
/// `Ok(None)` means more bytes are needed before the length is known or the
/// frame is complete; an unknown type byte is an error immediately.
pub fn frame_len(data: &[u8]) -> Result<Option<usize>> {
    if data.is_empty() {
        return Ok(None);
    }
    let msg_type = peek_type(data)?;
    let min = min_frame_size(msg_type);
    let total = match length_prefix_offset(msg_type) {
        Some(offset) => match data.get(offset) {
            Some(&len) => min + len as usize,
            None => return Ok(None),
        },
        None => min,
    };
    Ok((data.len() >= total).then_some(total))
}

/// Decode the single frame at the start of `data`.
///
/// Trailing bytes after the frame are ignored; use [`decode_frame`] to learn
/// how many bytes were consumed.
pub fn decode(data: &[u8]) -> Result<Message> {
    decode_frame(data).map(|(message, _)| message)
}

/// Decode the frame at the start of `data`, returning it with its length
pub fn decode_frame(data: &[u8]) -> Result<(Message, usize)> {
    let msg_type = peek_type(data)?;
    let min = min_frame_size(msg_type);
    if data.len() < min {
        return Err(ProtocolError::message_too_small(min, data.len(), msg_type.name()));
    }

    let header = parse_header(data, msg_type)?;
    let mut reader = Reader::new(data, HEADER_SIZE);

    let payload = match msg_type {
        MessageType::OrderNew
        | MessageType::OrderCancel
        | MessageType::OrderReplace
        | MessageType::OrderFill => {
            let order_id = reader.u64("order_id")?;
            let symbol = reader.short_str("symbol")?;
            let price = f64::from_bits(reader.u64("price")?);
            let quantity = reader.u32("quantity")?;
            let raw_side = reader.u8("side")?;
            let side = Side::try_from(raw_side).map_err(|_| ProtocolError::InvalidSide(raw_side))?;
            Payload::Order(Order {
                order_id,
                symbol,
                price,
                quantity,
                side,
            })
        }
        MessageType::MarketData => {
            let symbol = reader.short_str("symbol")?;
            let bid = f64::from_bits(reader.u64("bid")?);
            let ask = f64::from_bits(reader.u64("ask")?);
            let bid_size = reader.u32("bid_size")?;
            let ask_size = reader.u32("ask_size")?;
            Payload::MarketData(MarketData {
                symbol,
                bid,
                ask,
                bid_size,
                ask_size,
            })
        }
        MessageType::Error => {
            let code = reader.u32("error_code")?;
            let text = reader.short_str("error_text")?;
            Payload::Error(ErrorReport { code, text })
        }
        MessageType::Heartbeat => Payload::Heartbeat,
        MessageType::Login | MessageType::Logout => Payload::Session,
    };

    // Payload variant is chosen from msg_type above, so this cannot mismatch
    let message = Message::from_parts(header, payload)
        .map_err(|_| ProtocolError::UnknownMessageType(msg_type.into()))?;
    Ok((message, reader.position()))
}

fn parse_header(data: &[u8], msg_type: MessageType) -> Result<Header> {
    // Caller guarantees data.len() >= HEADER_SIZE
    let raw_priority = data[OFFSET_PRIORITY];
    let priority =
        Priority::try_from(raw_priority).map_err(|_| ProtocolError::InvalidPriority(raw_priority))?;
    Ok(Header {
        msg_type,
        priority,
        sequence_number: LittleEndian::read_u64(&data[OFFSET_SEQUENCE..OFFSET_TIMESTAMP]),
        timestamp_us: LittleEndian::read_u64(&data[OFFSET_TIMESTAMP..OFFSET_CLIENT_ID]),
        client_id: LittleEndian::read_u64(&data[OFFSET_CLIENT_ID..HEADER_SIZE]),
    })
}

/// Bounds-checked little-endian cursor
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| ProtocolError::truncated(field, self.pos, len, self.data.len()))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    fn u32(&mut self, field: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, field)?))
    }

    fn u64(&mut self, field: &'static str) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8, field)?))
    }

    fn short_str(&mut self, field: &'static str) -> Result<String> {
        let len = self.u8(field)? as usize;
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8 { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    fn sample_order() -> Message {
        Message::order_new(Order::new(12345, "AAPL", 150.50, 100, Side::Buy)).with_client_id(9)
    }

    #[test]
    fn test_decode_order_roundtrip() {
        let original = sample_order();
        let bytes = encode(&original).unwrap();
        let (decoded, consumed) = decode_frame(&bytes).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_decode_does_not_draw_new_sequence() {
        let original = Message::heartbeat();
        let bytes = encode(&original).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.sequence_number(), original.sequence_number());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut bytes = encode(&Message::heartbeat()).unwrap();
        bytes[0] = 0;
        assert_eq!(decode(&bytes).unwrap_err(), ProtocolError::UnknownMessageType(0));
        bytes[0] = 200;
        assert_eq!(frame_len(&bytes).unwrap_err(), ProtocolError::UnknownMessageType(200));
    }

    #[test]
    fn test_invalid_priority_and_side_rejected() {
        let mut bytes = encode(&sample_order()).unwrap();
        bytes[1] = 9;
        assert_eq!(decode(&bytes).unwrap_err(), ProtocolError::InvalidPriority(9));

        let mut bytes = encode(&sample_order()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 2;
        assert_eq!(decode(&bytes).unwrap_err(), ProtocolError::InvalidSide(2));
    }

    #[test]
    fn test_declared_length_past_end() {
        let mut bytes = encode(&sample_order()).unwrap();
        // Claim a 200-byte symbol in a frame that only has room for 4
        bytes[34] = 200;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { field: "symbol", .. }));
    }

    #[test]
    fn test_invalid_utf8_symbol() {
        let mut bytes = encode(&sample_order()).unwrap();
        bytes[35] = 0xFF;
        assert_eq!(
            decode(&bytes).unwrap_err(),
            ProtocolError::InvalidUtf8 { field: "symbol" }
        );
    }

    #[test]
    fn test_frame_len_progression() {
        let bytes = encode(&sample_order()).unwrap();
        assert_eq!(frame_len(&[]).unwrap(), None);
        // Length prefix not yet visible
        assert_eq!(frame_len(&bytes[..30]).unwrap(), None);
        // Length known, body incomplete
        assert_eq!(frame_len(&bytes[..40]).unwrap(), None);
        assert_eq!(frame_len(&bytes).unwrap(), Some(bytes.len()));

        let mut two = bytes.clone();
        two.extend_from_slice(&bytes);
        assert_eq!(frame_len(&two).unwrap(), Some(bytes.len()));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            decode(&[]).unwrap_err(),
            ProtocolError::MessageTooSmall { need: 1, got: 0, .. }
        ));
    }
}
