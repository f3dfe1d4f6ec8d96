//! # Trading Gateway
//!
//! Wires the workspace together into one process:
//!
//! ```text
//! TCP ─► network::SocketServer ─► GatewayHandler ─► InterceptorChain
//!                                      │
//!                                      └─► DispatchRouter ─► OrderMatching
//!                                                         ├─► MarketData
//!                                                         └─► RiskManagement
//! ```
//!
//! The `gateway` binary runs a [`Gateway`] until Ctrl+C; `load_client` drives
//! it over TCP.

pub mod diagnostics;
pub mod handler;
pub mod runtime;
pub mod services;

pub use handler::{GatewayHandler, IngestStats, IngestStatsSnapshot, VerdictObserver};
pub use runtime::{chain_settings, router_settings, server_config, Gateway, StatsReport};
