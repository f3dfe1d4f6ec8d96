//! Pipeline entry seam
//!
//! The multiplexer knows nothing about interceptors or services; it hands each
//! decoded message to a [`MessageHandler`] from a worker thread.

use std::time::Instant;
use types::Message;

/// Receives decoded messages from the worker pool.
///
/// Called concurrently from several worker threads, but messages of one
/// connection always arrive on the same thread in arrival order.
pub trait MessageHandler: Send + Sync + 'static {
    /// `received_at` is when the bytes carrying this message were read
    fn on_message(&self, message: Message, received_at: Instant);

    /// Connection closed; no further messages for `client_id` will arrive
    fn on_disconnect(&self, _client_id: u64) {}
}
