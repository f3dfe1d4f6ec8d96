//! # Gateway Configuration
//!
//! Operational controls for the gateway process: listening port, worker pool,
//! buffer sizes, core affinity, connection limit, throttle ceiling, dispatch
//! batching and monitor capacity.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gateway_config::GatewayConfig;
//! use std::path::Path;
//!
//! let config = GatewayConfig::load(Some(Path::new("config/gateway.toml")))?;
//! println!("listening on {}", config.server.socket_addr());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod settings;

pub use settings::{
    DispatchSettings, GatewayConfig, MonitorSettings, PipelineSettings, ServerSettings, ENV_PREFIX,
};
