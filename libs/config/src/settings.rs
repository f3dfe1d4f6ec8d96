//! Gateway Configuration Module
//!
//! Loads [`GatewayConfig`] from up to three layers, later layers winning:
//!
//! 1. built-in defaults ([`crate::defaults`])
//! 2. an optional TOML file
//! 3. `GATEWAY__<SECTION>__<KEY>` environment variables
//!    (e.g. `GATEWAY__SERVER__PORT=9000`)
//!
//! ```toml
//! [server]
//! port = 8080
//! worker_threads = 4
//! affinity = true
//!
//! [pipeline]
//! throttle_max_per_second = 1000000
//!
//! [dispatch]
//! batch_size = 100
//! ```

use crate::defaults;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "GATEWAY";

/// Complete gateway configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerSettings,
    pub pipeline: PipelineSettings,
    pub dispatch: DispatchSettings,
    pub monitor: MonitorSettings,
}

/// Listener, multiplexer and worker pool settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: IpAddr,
    pub port: u16,
    pub worker_threads: usize,
    /// Runtime-adjustable
    pub buffer_size: usize,
    pub max_buffer_size: usize,
    /// Pin workers to cores; runtime-adjustable
    pub affinity: bool,
    pub max_connections: usize,
    pub max_events: usize,
    pub poll_timeout_ms: u64,
    pub socket_buffer_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: defaults::server::PORT,
            worker_threads: defaults::server::WORKER_THREADS,
            buffer_size: defaults::server::BUFFER_SIZE,
            max_buffer_size: defaults::server::MAX_BUFFER_SIZE,
            affinity: true,
            max_connections: defaults::server::MAX_CONNECTIONS,
            max_events: defaults::server::MAX_EVENTS,
            poll_timeout_ms: defaults::server::POLL_TIMEOUT_MS,
            socket_buffer_bytes: defaults::server::SOCKET_BUFFER_BYTES,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Interceptor chain settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub throttle_max_per_second: u64,
    pub latency_target_us: f64,
    pub enable_logging_stage: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            throttle_max_per_second: defaults::pipeline::THROTTLE_MAX_PER_SECOND,
            latency_target_us: defaults::pipeline::LATENCY_TARGET_US,
            enable_logging_stage: true,
        }
    }
}

/// Dispatch router settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub wait_timeout_us: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::dispatch::QUEUE_CAPACITY,
            batch_size: defaults::dispatch::BATCH_SIZE,
            wait_timeout_us: defaults::dispatch::WAIT_TIMEOUT_US,
        }
    }
}

/// Performance monitor settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub sample_capacity: usize,
    pub stats_interval_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            sample_capacity: defaults::monitor::SAMPLE_CAPACITY,
            stats_interval_secs: defaults::monitor::STATS_INTERVAL_SECS,
        }
    }
}

impl GatewayConfig {
    /// Load defaults, then `path` (if given), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = toml::to_string(&Self::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml));

        if let Some(path) = path {
            info!("Loading gateway config: {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(?config, "Gateway configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(self.server.worker_threads > 0, "server.worker_threads must be at least 1");
        ensure!(self.server.max_connections > 0, "server.max_connections must be at least 1");
        ensure!(self.server.max_events > 0, "server.max_events must be at least 1");
        ensure!(self.server.buffer_size > 0, "server.buffer_size must be at least 1");
        ensure!(
            self.server.buffer_size <= self.server.max_buffer_size,
            "server.buffer_size ({}) exceeds server.max_buffer_size ({})",
            self.server.buffer_size,
            self.server.max_buffer_size
        );
        ensure!(self.dispatch.batch_size > 0, "dispatch.batch_size must be at least 1");
        ensure!(self.dispatch.queue_capacity > 0, "dispatch.queue_capacity must be at least 1");
        ensure!(self.monitor.sample_capacity > 0, "monitor.sample_capacity must be at least 1");
        ensure!(
            self.pipeline.latency_target_us > 0.0,
            "pipeline.latency_target_us must be positive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.worker_threads, 4);
        assert_eq!(config.server.buffer_size, 8192);
        assert_eq!(config.server.max_connections, 10_000);
        assert!(config.server.affinity);
        assert_eq!(config.dispatch.batch_size, 100);
        assert_eq!(config.monitor.sample_capacity, 100_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GatewayConfig::from_toml_str(
            r#"
            [server]
            port = 9100
            affinity = false

            [pipeline]
            throttle_max_per_second = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert!(!config.server.affinity);
        assert_eq!(config.server.worker_threads, 4);
        assert_eq!(config.pipeline.throttle_max_per_second, 500);
        assert_eq!(config.dispatch.batch_size, 100);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = GatewayConfig::from_toml_str("[server]\nworker_threads = 0\n").unwrap_err();
        assert!(err.to_string().contains("worker_threads"));

        let err = GatewayConfig::from_toml_str(
            "[server]\nbuffer_size = 100000\nmax_buffer_size = 65536\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        let err = GatewayConfig::from_toml_str("[dispatch]\nbatch_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nport = 7001\nbind_address = \"127.0.0.1\"").unwrap();
        writeln!(file, "[monitor]\nstats_interval_secs = 2").unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.socket_addr(), "127.0.0.1:7001".parse().unwrap());
        assert_eq!(config.monitor.stats_interval_secs, 2);
        assert_eq!(config.monitor.sample_capacity, 100_000);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = GatewayConfig::load(Some(Path::new("/nonexistent/gateway.toml")));
        assert!(result.is_err());
    }
}
