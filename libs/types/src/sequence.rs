//! Process-wide message sequencing

use std::sync::atomic::{AtomicU64, Ordering};

// Starts at 1: zero is reserved as the "unassigned" sequence rejected by validation
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Draw the next sequence number.
///
/// Unique and strictly increasing in call order across all threads.
#[inline]
pub fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::SeqCst)
}
