//! # Dispatch
//!
//! Hands accepted messages to named consumer services.
//!
//! - [`Service`]: the consumer contract (`start`, `stop`, `is_running`,
//!   `process_message`)
//! - [`DispatchRouter`]: service registry plus a bounded FIFO queue drained by
//!   one processor thread in batches; messages for a stopped or missing
//!   service are dropped and counted
//! - [`RoutingTable`]: which services receive each message type
//! - [`ThreadedService`]: a [`Service`] that runs a [`MessageProcessor`] on its
//!   own thread
//!
//! ```rust
//! use dispatch::{DispatchRouter, MessageProcessor, Service, ThreadedService};
//! use std::sync::Arc;
//! use types::Message;
//!
//! struct Count(std::sync::atomic::AtomicU64);
//! impl MessageProcessor for Count {
//!     fn handle(&self, _message: &Message) {
//!         self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!     }
//! }
//!
//! let router = DispatchRouter::default();
//! router.register(Arc::new(ThreadedService::new("Counter", Count(Default::default()))))?;
//! router.start()?;
//! router.route("Counter", Arc::new(Message::heartbeat()))?;
//! router.stop();
//! # Ok::<(), dispatch::DispatchError>(())
//! ```

pub mod error;
pub mod router;
pub mod routing;
pub mod service;
pub mod threaded;

pub use error::{DispatchError, Result};
pub use router::{DispatchRouter, RouterSettings, RouterStats, RouterStatsSnapshot};
pub use routing::{names, RoutingTable};
pub use service::Service;
pub use threaded::{MessageProcessor, ServiceStats, ThreadedService, DEFAULT_SLOW_THRESHOLD};
