//! Wall-clock helpers for message timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in microseconds since the Unix epoch.
///
/// Never returns zero: a clock set before the epoch yields `1` so that a
/// freshly built message always carries a non-zero timestamp.
#[inline]
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
        .max(1)
}
