//! Gateway server entry point

use anyhow::Result;
use clap::Parser;
use gateway::{chain_settings, diagnostics, Gateway};
use gateway_config::GatewayConfig;
use interceptors::InterceptorChain;
use network::{LatencySnapshot, PerformanceMonitor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Worker thread count
    #[arg(short, long)]
    threads: Option<usize>,

    /// Initial receive buffer size in bytes
    #[arg(short, long)]
    buffer_size: Option<usize>,

    /// Pin worker threads to cores
    #[arg(short, long)]
    affinity: Option<bool>,

    /// Maximum concurrent connections
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Run sample messages through the pipeline, then exit
    #[arg(long)]
    self_test: bool,

    /// Benchmark the in-process pipeline for N iterations, then exit
    #[arg(long, value_name = "ITERATIONS")]
    benchmark: Option<usize>,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_config(args: &Args) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(threads) = args.threads {
        config.server.worker_threads = threads;
    }
    if let Some(buffer_size) = args.buffer_size {
        config.server.buffer_size = buffer_size;
    }
    if let Some(affinity) = args.affinity {
        config.server.affinity = affinity;
    }
    if let Some(max_connections) = args.max_connections {
        config.server.max_connections = max_connections;
    }
    config.validate()?;
    Ok(config)
}

fn print_benchmark(iterations: usize, snapshot: &LatencySnapshot) {
    println!("Pipeline benchmark ({iterations} iterations)");
    println!("  avg {:>10.3} us", snapshot.average_us);
    println!("  p50 {:>10.3} us", snapshot.p50_us);
    println!("  p95 {:>10.3} us", snapshot.p95_us);
    println!("  p99 {:>10.3} us", snapshot.p99_us);
    println!("  min {:>10.3} us", snapshot.min_us);
    println!("  max {:>10.3} us", snapshot.max_us);
}

fn run_self_test(config: &GatewayConfig) {
    let chain = InterceptorChain::standard(
        Arc::new(PerformanceMonitor::new(16)),
        &chain_settings(&config.pipeline),
    );
    for result in diagnostics::self_test(&chain) {
        let metadata: Vec<String> = result.metadata.iter().map(|(k, v)| format!("{k}={v}")).collect();
        if result.verdict.is_accept() {
            info!(sample = result.label, metadata = %metadata.join(" "), "Self-test accepted");
        } else {
            warn!(sample = result.label, metadata = %metadata.join(" "), "Self-test rejected");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let config = load_config(&args)?;

    if let Some(iterations) = args.benchmark {
        let snapshot = diagnostics::benchmark(iterations, &chain_settings(&config.pipeline));
        print_benchmark(iterations, &snapshot);
        return Ok(());
    }

    if args.self_test {
        run_self_test(&config);
        return Ok(());
    }

    info!("Starting trading gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        port = config.server.port,
        workers = config.server.worker_threads,
        buffer_size = config.server.buffer_size,
        affinity = config.server.affinity,
        max_connections = config.server.max_connections,
        "Configuration loaded"
    );

    let gateway = Gateway::bind(&config)?;
    gateway.start()?;

    let mut ticker = tokio::time::interval(Duration::from_secs(config.monitor.stats_interval_secs.max(1)));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!("Gateway stats\n{}", gateway.report());
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Signal handler failed, shutting down");
                }
                info!("Shutdown signal received");
                break;
            }
        }
    }

    gateway.stop();
    info!("Final stats\n{}", gateway.report());
    Ok(())
}
