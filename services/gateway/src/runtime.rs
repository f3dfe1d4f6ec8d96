//! Gateway assembly
//!
//! Builds every component from a [`GatewayConfig`] and owns them for the life
//! of the process. Nothing is global: tests build as many gateways as they
//! like, each on its own port.

use crate::handler::{GatewayHandler, IngestStatsSnapshot, VerdictObserver};
use crate::services::{self, MarketDataService, OrderMatchingService, RiskManagementService};
use anyhow::{Context, Result};
use dispatch::{DispatchRouter, RouterSettings, RouterStatsSnapshot, RoutingTable};
use gateway_config::{DispatchSettings, GatewayConfig, PipelineSettings, ServerSettings};
use interceptors::{ChainSettings, InterceptorChain};
use network::{LatencySnapshot, PerformanceMonitor, ServerConfig, ServerStatsSnapshot, SocketServer};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub fn server_config(settings: &ServerSettings) -> ServerConfig {
    ServerConfig {
        bind_addr: settings.socket_addr(),
        worker_threads: settings.worker_threads,
        buffer_size: settings.buffer_size,
        max_buffer_size: settings.max_buffer_size,
        affinity: settings.affinity,
        max_connections: settings.max_connections,
        max_events: settings.max_events,
        poll_timeout: Duration::from_millis(settings.poll_timeout_ms),
        socket_buffer_bytes: settings.socket_buffer_bytes,
    }
}

pub fn router_settings(settings: &DispatchSettings) -> RouterSettings {
    RouterSettings {
        queue_capacity: settings.queue_capacity,
        batch_size: settings.batch_size,
        wait_timeout: Duration::from_micros(settings.wait_timeout_us),
    }
}

pub fn chain_settings(settings: &PipelineSettings) -> ChainSettings {
    ChainSettings {
        throttle_max_per_second: settings.throttle_max_per_second,
        latency_target_us: settings.latency_target_us,
        enable_logging: settings.enable_logging_stage,
    }
}

/// Everything an operator sees in the periodic report
#[derive(Debug, Clone, Copy)]
pub struct StatsReport {
    pub connections: usize,
    pub active_services: usize,
    pub latency: LatencySnapshot,
    pub server: ServerStatsSnapshot,
    pub ingest: IngestStatsSnapshot,
    pub dispatch: RouterStatsSnapshot,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Active connections: {}", self.connections)?;
        writeln!(f, "Messages processed: {}", self.latency.messages_total)?;
        writeln!(
            f,
            "Latency us: avg {:.3} p95 {:.3} p99 {:.3}",
            self.latency.average_us, self.latency.p95_us, self.latency.p99_us
        )?;
        writeln!(f, "Throughput: {:.0} msg/s", self.latency.throughput_per_sec)?;
        writeln!(f, "Active services: {}", self.active_services)?;
        write!(
            f,
            "Drops: decode {} validation {} throttle {} unroutable {} queue_full {} dead_service {} unknown_service {}",
            self.server.decode_failures,
            self.ingest.validation_rejects,
            self.ingest.throttle_rejects,
            self.ingest.unroutable,
            self.ingest.queue_full,
            self.dispatch.dropped_not_running,
            self.dispatch.dropped_unknown,
        )
    }
}

pub struct Gateway {
    monitor: Arc<PerformanceMonitor>,
    router: Arc<DispatchRouter>,
    handler: Arc<GatewayHandler>,
    server: SocketServer,
    order_matching: Arc<OrderMatchingService>,
    market_data: Arc<MarketDataService>,
    risk: Arc<RiskManagementService>,
}

impl Gateway {
    /// Build and bind; nothing runs until [`start`](Self::start)
    pub fn bind(config: &GatewayConfig) -> Result<Self> {
        Self::bind_with_observer(config, None)
    }

    pub fn bind_with_observer(config: &GatewayConfig, observer: Option<VerdictObserver>) -> Result<Self> {
        config.validate()?;

        let monitor = Arc::new(PerformanceMonitor::new(config.monitor.sample_capacity));
        let chain = Arc::new(InterceptorChain::standard(
            Arc::clone(&monitor),
            &chain_settings(&config.pipeline),
        ));

        let router = Arc::new(DispatchRouter::new(router_settings(&config.dispatch)));
        let order_matching = Arc::new(services::order_matching());
        let market_data = Arc::new(services::market_data());
        let risk = Arc::new(services::risk_management(services::DEFAULT_NOTIONAL_LIMIT));
        router.register(order_matching.clone())?;
        router.register(market_data.clone())?;
        router.register(risk.clone())?;

        let mut handler = GatewayHandler::new(chain, Arc::clone(&router), RoutingTable::standard());
        if let Some(observer) = observer {
            handler = handler.with_observer(observer);
        }
        let handler = Arc::new(handler);

        let server = SocketServer::bind(server_config(&config.server), handler.clone())
            .with_context(|| format!("Failed to bind {}", config.server.socket_addr()))?;

        Ok(Self {
            monitor,
            router,
            handler,
            server,
            order_matching,
            market_data,
            risk,
        })
    }

    /// Services and dispatch first, so the first accepted message has somewhere to go
    pub fn start(&self) -> Result<()> {
        self.router.start().context("Failed to start dispatch router")?;
        if let Err(e) = self.server.start() {
            self.router.stop();
            return Err(e).context("Failed to start socket server");
        }
        info!(addr = %self.local_addr()?, "Gateway running");
        Ok(())
    }

    /// Stop ingest before dispatch so nothing is routed into a stopped router
    pub fn stop(&self) {
        self.server.stop();
        self.router.stop();
        info!("Gateway stopped");
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.local_addr()?)
    }

    pub fn report(&self) -> StatsReport {
        StatsReport {
            connections: self.server.connection_count(),
            active_services: self.router.active_service_count(),
            latency: self.monitor.snapshot(),
            server: self.server.stats(),
            ingest: self.handler.stats(),
            dispatch: self.router.stats(),
        }
    }

    pub fn server(&self) -> &SocketServer {
        &self.server
    }

    pub fn router(&self) -> &Arc<DispatchRouter> {
        &self.router
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn handler(&self) -> &Arc<GatewayHandler> {
        &self.handler
    }

    pub fn order_matching(&self) -> &Arc<OrderMatchingService> {
        &self.order_matching
    }

    pub fn market_data(&self) -> &Arc<MarketDataService> {
        &self.market_data
    }

    pub fn risk(&self) -> &Arc<RiskManagementService> {
        &self.risk
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.server.stop();
        self.router.stop();
    }
}
