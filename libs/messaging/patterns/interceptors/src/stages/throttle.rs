//! Windowed rate limit shared by every connection

use crate::chain::Interceptor;
use crate::context::{keys, InterceptorContext, Verdict};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u64,
}

/// Fixed-ceiling rate limiter over a rolling window (one second by default).
///
/// The window restarts from the first message seen after the previous one
/// expired, not on wall-clock second boundaries. One instance is shared by
/// every connection.
#[derive(Debug)]
pub struct ThrottlingInterceptor {
    max_per_window: u64,
    window_len: Duration,
    window: Mutex<Window>,
    rejected: AtomicU64,
}

impl ThrottlingInterceptor {
    pub fn new(max_per_second: u64) -> Self {
        Self::with_window(max_per_second, Duration::from_secs(1))
    }

    pub fn with_window(max_per_window: u64, window_len: Duration) -> Self {
        Self {
            max_per_window,
            window_len,
            window: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn max_per_window(&self) -> u64 {
        self.max_per_window
    }

    /// Messages rejected since construction
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Admit one message if the current window has room
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut window = self.window.lock();
        if now.duration_since(window.started) >= self.window_len {
            window.started = now;
            window.count = 0;
        }
        if window.count >= self.max_per_window {
            return false;
        }
        window.count += 1;
        true
    }
}

impl Interceptor for ThrottlingInterceptor {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn process(&self, context: &mut InterceptorContext) -> Verdict {
        if self.try_acquire() {
            context.set(keys::THROTTLE_STATUS, "accepted");
            Verdict::Accept
        } else {
            let rejected = self.rejected.fetch_add(1, Ordering::Relaxed) + 1;
            // One line per thousand rejections
            if rejected % 1000 == 1 {
                debug!(rejected, limit = self.max_per_window, "Throttling");
            }
            context.set(keys::THROTTLED, "Rate limit exceeded");
            Verdict::Reject
        }
    }
}
