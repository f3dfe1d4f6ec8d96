//! Default values for gateway settings
//!
//! Used by the serde `default` hooks in [`crate::settings`] so that a partial
//! TOML file, or none at all, still yields a complete configuration.

/// Listener and multiplexer defaults
pub mod server {
    pub const PORT: u16 = 8080;
    pub const BIND_ADDRESS: &str = "0.0.0.0";

    /// Worker pool size
    pub const WORKER_THREADS: usize = 4;

    /// Per-read buffer size (bytes)
    pub const BUFFER_SIZE: usize = 8192;

    /// Per-connection reassembly limit (bytes)
    pub const MAX_BUFFER_SIZE: usize = 65536;

    pub const MAX_CONNECTIONS: usize = 10_000;

    /// Readiness events fetched per wake
    pub const MAX_EVENTS: usize = 1000;

    /// Bounded readiness wait (milliseconds)
    pub const POLL_TIMEOUT_MS: u64 = 1;

    /// SO_SNDBUF / SO_RCVBUF for accepted sockets (bytes)
    pub const SOCKET_BUFFER_BYTES: usize = 65536;
}

/// Interceptor chain defaults
pub mod pipeline {
    /// Throttle ceiling (messages per rolling second)
    pub const THROTTLE_MAX_PER_SECOND: u64 = 1_000_000;

    /// Processing-time target before a message is flagged (microseconds)
    pub const LATENCY_TARGET_US: f64 = 10.0;
}

/// Dispatch router defaults
pub mod dispatch {
    pub const QUEUE_CAPACITY: usize = 65_536;
    pub const BATCH_SIZE: usize = 100;

    /// Condition-variable wait when the queue is empty (microseconds)
    pub const WAIT_TIMEOUT_US: u64 = 10;
}

/// Performance monitor defaults
pub mod monitor {
    pub const SAMPLE_CAPACITY: usize = 100_000;
    pub const STATS_INTERVAL_SECS: u64 = 10;
}
