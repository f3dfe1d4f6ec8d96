//! Stream frame reassembly
//!
//! TCP delivers bytes, not frames: one read may hold several frames, or end in
//! the middle of one. [`FrameAssembler`] keeps the unconsumed tail of a
//! connection's stream and only hands complete frames to the decoder.
//!
//! ```text
//! read #1: [frame A][frame B][fra
//! read #2:                      me C][frame D]
//!           → A, B            → C, D
//! ```

use crate::error::{ProtocolError, Result};
use crate::parser::{decode, frame_len};
use bytes::{Bytes, BytesMut};
use types::Message;

/// Per-connection reassembly buffer
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: BytesMut,
    max_buffered: usize,
}

impl FrameAssembler {
    pub fn new(initial_capacity: usize, max_buffered: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(initial_capacity.min(max_buffered)),
            max_buffered,
        }
    }

    /// Append freshly read bytes.
    ///
    /// The limit bounds the unconsumed tail carried over from earlier reads,
    /// not the read itself: a full read landing on a partial frame is fine.
    pub fn extend(&mut self, data: &[u8]) -> Result<()> {
        let carried = self.buffer.len();
        if carried > self.max_buffered {
            return Err(ProtocolError::BufferOverflow {
                buffered: carried,
                limit: self.max_buffered,
            });
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Split off the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        match frame_len(&self.buffer)? {
            Some(len) => Ok(Some(self.buffer.split_to(len).freeze())),
            None => Ok(None),
        }
    }

    /// Decode the next complete frame, if one is buffered
    pub fn next_message(&mut self) -> Result<Option<Message>> {
        match self.next_frame()? {
            Some(frame) => decode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Bytes held back waiting for the rest of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use types::{MarketData, Order, Side};

    fn stream_of(messages: &[Message]) -> Vec<u8> {
        messages.iter().flat_map(|m| encode(m).unwrap()).collect()
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let messages = vec![
            Message::order_new(Order::new(1, "AAPL", 150.5, 100, Side::Buy)),
            Message::heartbeat(),
            Message::market_data(MarketData::new("AAPL", 150.45, 150.55, 10, 20)),
        ];
        let mut assembler = FrameAssembler::new(1024, 65536);
        assembler.extend(&stream_of(&messages)).unwrap();

        for expected in &messages {
            assert_eq!(assembler.next_message().unwrap().as_ref(), Some(expected));
        }
        assert_eq!(assembler.next_message().unwrap(), None);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn test_frame_split_across_reads_byte_by_byte() {
        let message = Message::error(17, "rejected by venue");
        let bytes = encode(&message).unwrap();
        let mut assembler = FrameAssembler::new(16, 65536);

        for (i, byte) in bytes.iter().enumerate() {
            assembler.extend(std::slice::from_ref(byte)).unwrap();
            let next = assembler.next_message().unwrap();
            if i + 1 < bytes.len() {
                assert!(next.is_none(), "frame surfaced early at byte {}", i);
            } else {
                assert_eq!(next, Some(message.clone()));
            }
        }
    }

    #[test]
    fn test_overflow_rejected_when_tail_is_never_drained() {
        let mut assembler = FrameAssembler::new(8, 32);
        assembler.extend(&[6u8; 20]).unwrap();
        assembler.extend(&[6u8; 20]).unwrap();
        let err = assembler.extend(&[6u8; 1]).unwrap_err();
        assert_eq!(err, ProtocolError::BufferOverflow { buffered: 40, limit: 32 });
        assert_eq!(assembler.buffered(), 40);
    }

    #[test]
    fn test_full_read_on_partial_frame_is_accepted() {
        let messages: Vec<Message> = (0..40)
            .map(|i| Message::order_new(Order::new(i, "AAPL", 150.5, 100, Side::Buy)))
            .collect();
        let stream = stream_of(&messages);
        let limit = 512;
        let mut assembler = FrameAssembler::new(limit, limit);

        let mut decoded = 0;
        for chunk in stream.chunks(limit) {
            assembler.extend(chunk).unwrap();
            while assembler.next_message().unwrap().is_some() {
                decoded += 1;
            }
        }
        assert_eq!(decoded, messages.len());
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn test_garbage_type_byte_is_error() {
        let mut assembler = FrameAssembler::new(8, 1024);
        assembler.extend(&[0xEE, 0, 0]).unwrap();
        assert_eq!(
            assembler.next_frame().unwrap_err(),
            ProtocolError::UnknownMessageType(0xEE)
        );
    }
}
