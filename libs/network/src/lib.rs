//! # Gateway Network Layer
//!
//! ## Purpose
//!
//! Accepts many TCP clients on one listener, multiplexes them through epoll and
//! turns their byte streams into [`types::Message`] values for a
//! [`MessageHandler`]. Also hosts the [`PerformanceMonitor`] used to report
//! per-message latency percentiles and throughput.
//!
//! ## Architecture Role
//!
//! ```text
//! TCP clients → [network: poller → workers] → MessageHandler (interceptors, dispatch)
//!                     ↓
//!               codec::FrameAssembler
//! ```
//!
//! ## Modules
//! - [`server`]: [`SocketServer`], connection registry, worker pool
//! - [`transports`]: listener construction and socket tuning
//! - [`performance`]: latency sample store and percentiles
//! - [`error`]: [`TransportError`]

pub mod error;
pub mod handler;
pub mod performance;
pub mod server;
pub mod transports;

pub use error::{Result, TransportError};
pub use handler::MessageHandler;
pub use performance::{LatencySnapshot, PerformanceMonitor};
pub use server::connection::{Connection, ConnectionRegistry};
pub use server::stats::{ServerStats, ServerStatsSnapshot};
pub use server::workers::{core_for_worker, pin_current_thread, unpin_current_thread};
pub use server::{ServerConfig, SocketServer};
pub use transports::{bind_listener, configure_stream, SocketTuning};
