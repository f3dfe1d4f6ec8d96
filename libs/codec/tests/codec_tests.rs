//! # Codec Integration Tests
//!
//! Property tests over the public codec API:
//! - round-trip law for every message kind, including boundary field lengths
//! - every truncation of a valid frame fails cleanly
//! - stream reassembly is independent of how reads are split

use codec::{decode, decode_frame, encode, min_frame_size, FrameAssembler, ProtocolError};
use proptest::prelude::*;
use types::{MarketData, Message, MessageType, Order, Priority, Side};

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

fn price() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("NaN never compares equal", |v| !v.is_nan())
}

fn symbol() -> impl Strategy<Value = String> {
    "[A-Z0-9./]{0,255}"
}

fn order() -> impl Strategy<Value = Order> {
    (any::<u64>(), symbol(), price(), any::<u32>(), any::<bool>()).prop_map(
        |(order_id, symbol, price, quantity, buy)| {
            Order::new(order_id, symbol, price, quantity, if buy { Side::Buy } else { Side::Sell })
        },
    )
}

fn message() -> impl Strategy<Value = Message> {
    let body = prop_oneof![
        order().prop_map(Message::order_new),
        order().prop_map(Message::order_cancel),
        order().prop_map(Message::order_replace),
        order().prop_map(Message::order_fill),
        (symbol(), price(), price(), any::<u32>(), any::<u32>()).prop_map(
            |(symbol, bid, ask, bid_size, ask_size)| {
                Message::market_data(MarketData::new(symbol, bid, ask, bid_size, ask_size))
            }
        ),
        Just(Message::heartbeat()),
        Just(Message::login()),
        Just(Message::logout()),
        (any::<u32>(), "[ -~]{0,255}").prop_map(|(code, text)| Message::error(code, text)),
    ];
    (body, priority(), any::<u64>(), any::<u64>(), any::<u64>()).prop_map(
        |(message, priority, sequence, timestamp, client_id)| {
            let mut message = message.with_priority(priority);
            message.set_sequence_number(sequence);
            message.set_timestamp(timestamp);
            message.set_client_id(client_id);
            message
        },
    )
}

proptest! {
    #[test]
    fn prop_roundtrip_reproduces_every_field(message in message()) {
        let bytes = encode(&message).unwrap();
        let (decoded, consumed) = decode_frame(&bytes).unwrap();
        prop_assert_eq!(consumed, bytes.len());
        prop_assert_eq!(decoded, message);
    }

    #[test]
    fn prop_every_truncation_fails(message in message()) {
        let bytes = encode(&message).unwrap();
        for cut in 0..bytes.len() {
            prop_assert!(decode(&bytes[..cut]).is_err(), "decode succeeded at cut {}", cut);
        }
    }

    #[test]
    fn prop_reassembly_independent_of_read_splits(
        messages in prop::collection::vec(message(), 1..8),
        chunk in 1usize..64,
    ) {
        let stream: Vec<u8> = messages.iter().flat_map(|m| encode(m).unwrap()).collect();
        let mut assembler = FrameAssembler::new(64, 1 << 16);
        let mut decoded = Vec::new();
        for piece in stream.chunks(chunk) {
            assembler.extend(piece).unwrap();
            while let Some(message) = assembler.next_message().unwrap() {
                decoded.push(message);
            }
        }
        prop_assert_eq!(decoded, messages);
        prop_assert_eq!(assembler.buffered(), 0);
    }
}

#[test]
fn test_boundary_field_lengths() {
    let empty_symbol = Message::order_new(Order::new(1, "", 1.0, 1, Side::Buy));
    let max_symbol = Message::market_data(MarketData::new("S".repeat(255), 1.0, 2.0, 3, 4));
    let empty_text = Message::error(0, "");

    for message in [empty_symbol, max_symbol, empty_text] {
        let bytes = encode(&message).unwrap();
        assert_eq!(decode(&bytes).unwrap(), message);
    }
}

#[test]
fn test_short_buffer_reports_minimum_size() {
    let bytes = encode(&Message::market_data(MarketData::new("AAPL", 1.0, 2.0, 3, 4))).unwrap();
    let err = decode(&bytes[..40]).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::message_too_small(min_frame_size(MessageType::MarketData), 40, "MarketData")
    );
}

#[test]
fn test_aapl_order_decodes_to_expected_fields() {
    let bytes = encode(&Message::order_new(Order::new(12345, "AAPL", 150.50, 100, Side::Buy)))
        .unwrap();
    let decoded = decode(&bytes).unwrap();
    let order = decoded.as_order().unwrap();
    assert_eq!(decoded.message_type(), MessageType::OrderNew);
    assert_eq!(order.symbol, "AAPL");
    assert_eq!(order.price, 150.50);
    assert_eq!(order.quantity, 100);
    assert!(order.side.is_buy());
}
