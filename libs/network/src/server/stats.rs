//! Multiplexer counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the poller and workers
#[derive(Debug, Default)]
pub struct ServerStats {
    pub(crate) accepted: AtomicU64,
    pub(crate) refused: AtomicU64,
    pub(crate) closed: AtomicU64,
    pub(crate) registration_failures: AtomicU64,
    pub(crate) bytes_received: AtomicU64,
    pub(crate) messages_decoded: AtomicU64,
    pub(crate) decode_failures: AtomicU64,
}

/// Copy of [`ServerStats`] at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerStatsSnapshot {
    pub accepted: u64,
    /// Connections closed at accept time because the limit was reached
    pub refused: u64,
    pub closed: u64,
    pub registration_failures: u64,
    pub bytes_received: u64,
    pub messages_decoded: u64,
    /// Frames dropped as malformed; each one also closes its connection
    pub decode_failures: u64,
}

impl ServerStats {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            registration_failures: self.registration_failures.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}
