//! TCP load generator for the gateway
//!
//! Modes: `latency` sends a fixed count and reports per-send latency,
//! `throughput` sends as fast as possible for a duration, `stress` opens many
//! connections at a target aggregate rate, `demo` sends one of each message
//! type.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use network::{LatencySnapshot, PerformanceMonitor};
use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use types::{MarketData, Message, Order, Side};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Latency,
    Throughput,
    Stress,
    Demo,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Gateway load client", long_about = None)]
struct Args {
    #[arg(value_enum, default_value = "latency")]
    mode: Mode,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Messages per connection (latency mode)
    #[arg(short = 'n', long, default_value_t = 10_000)]
    count: usize,

    /// Seconds to run (throughput and stress modes)
    #[arg(short, long, default_value_t = 10)]
    duration: u64,

    /// Aggregate messages per second (stress mode)
    #[arg(short, long, default_value_t = 50_000)]
    rate: u64,

    /// Concurrent connections (stress mode)
    #[arg(short, long, default_value_t = 8)]
    connections: usize,

    /// Retry the connection for up to this many seconds
    #[arg(long, default_value_t = 0)]
    wait: u64,
}

fn connect(args: &Args) -> Result<TcpStream> {
    let addr = format!("{}:{}", args.host, args.port);
    let deadline = Instant::now() + Duration::from_secs(args.wait);
    loop {
        match TcpStream::connect(&addr) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) if Instant::now() < deadline => {
                warn!(%addr, error = %e, "Connect failed, retrying");
                thread::sleep(Duration::from_millis(200));
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to connect to {addr}")),
        }
    }
}

fn sample_order(i: usize) -> Message {
    let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
    let price = 150.0 + (i % 100) as f64 * 0.01;
    Message::order_new(Order::new(i as u64 + 1, "AAPL", price, 100, side))
}

fn send(stream: &mut TcpStream, message: &Message) -> Result<()> {
    let frame = codec::encode(message)?;
    stream.write_all(&frame)?;
    Ok(())
}

fn run_latency(args: &Args) -> Result<LatencySnapshot> {
    let mut stream = connect(args)?;
    let monitor = PerformanceMonitor::new(args.count.max(1));
    for i in 0..args.count {
        let message = sample_order(i);
        let started = Instant::now();
        send(&mut stream, &message)?;
        monitor.record_latency(started.elapsed().as_nanos() as f64 / 1_000.0);
        monitor.record_message();
    }
    Ok(monitor.snapshot())
}

fn run_paced(args: &Args, mut stream: TcpStream, per_second: Option<u64>, monitor: &PerformanceMonitor) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let interval = per_second
        .filter(|rate| *rate > 0)
        .map(|rate| Duration::from_secs_f64(1.0 / rate as f64));
    let mut next_send = Instant::now();
    let mut i = 0usize;

    while Instant::now() < deadline {
        if let Some(interval) = interval {
            let now = Instant::now();
            if now < next_send {
                thread::sleep(next_send - now);
            }
            next_send += interval;
        }
        let started = Instant::now();
        send(&mut stream, &sample_order(i))?;
        monitor.record_latency(started.elapsed().as_nanos() as f64 / 1_000.0);
        monitor.record_message();
        i += 1;
    }
    Ok(())
}

fn run_throughput(args: &Args) -> Result<LatencySnapshot> {
    let stream = connect(args)?;
    let monitor = PerformanceMonitor::default();
    run_paced(args, stream, None, &monitor)?;
    Ok(monitor.snapshot())
}

/// Split an aggregate rate across connections, at least one message per
/// second each; zero would mean unpaced
fn per_connection_rate(rate: u64, connections: usize) -> u64 {
    (rate / connections.max(1) as u64).max(1)
}

fn run_stress(args: &Args) -> Result<LatencySnapshot> {
    if args.connections == 0 {
        bail!("stress mode needs at least one connection");
    }
    let monitor = Arc::new(PerformanceMonitor::default());
    let per_connection = per_connection_rate(args.rate, args.connections);

    let streams = (0..args.connections).map(|_| connect(args)).collect::<Result<Vec<_>>>()?;
    let outcomes: Vec<Result<()>> = thread::scope(|scope| {
        let handles: Vec<_> = streams
            .into_iter()
            .map(|stream| {
                let monitor = Arc::clone(&monitor);
                scope.spawn(move || run_paced(args, stream, Some(per_connection), &monitor))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| Err(anyhow::anyhow!("sender thread panicked"))))
            .collect()
    });
    for outcome in outcomes {
        outcome?;
    }
    Ok(monitor.snapshot())
}

fn run_demo(args: &Args) -> Result<()> {
    let mut stream = connect(args)?;
    let messages = [
        Message::login(),
        Message::order_new(Order::new(1, "AAPL", 150.50, 100, Side::Buy)),
        Message::order_replace(Order::new(1, "AAPL", 150.40, 80, Side::Buy)),
        Message::market_data(MarketData::new("AAPL", 150.45, 150.55, 1000, 1000)),
        // Crossed; the gateway rejects it at validation
        Message::market_data(MarketData::new("AAPL", 151.00, 150.00, 100, 100)),
        Message::order_cancel(Order::new(1, "AAPL", 150.40, 80, Side::Buy)),
        Message::heartbeat(),
        Message::logout(),
    ];
    for message in &messages {
        send(&mut stream, message)?;
        info!(msg_type = message.message_type().name(), "Sent");
    }
    Ok(())
}

fn print_report(mode: Mode, elapsed: Duration, snapshot: &LatencySnapshot) {
    let rate = snapshot.messages_total as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!("{mode:?} results");
    println!("  messages   {}", snapshot.messages_total);
    println!("  elapsed    {:.3} s", elapsed.as_secs_f64());
    println!("  rate       {rate:.0} msg/s");
    println!("  send avg   {:.3} us", snapshot.average_us);
    println!("  send p50   {:.3} us", snapshot.p50_us);
    println!("  send p95   {:.3} us", snapshot.p95_us);
    println!("  send p99   {:.3} us", snapshot.p99_us);
    println!("  send max   {:.3} us", snapshot.max_us);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let started = Instant::now();
    let snapshot = match args.mode {
        Mode::Latency => run_latency(&args)?,
        Mode::Throughput => run_throughput(&args)?,
        Mode::Stress => run_stress(&args)?,
        Mode::Demo => return run_demo(&args),
    };
    print_report(args.mode, started.elapsed(), &snapshot);
    Ok(())
}
