//! Connection Multiplexer
//!
//! [`SocketServer`] accepts TCP clients on one listener and multiplexes all of
//! them through a single epoll instance. Work is split in two:
//!
//! ```text
//!             ┌──────────────┐   bytes (fd % N)   ┌──────────┐
//! clients ──► │ poller (1)   │ ─────────────────► │ worker 0 │──► MessageHandler
//!             │ accept, read │ ─────────────────► │ worker 1 │──► MessageHandler
//!             │ close        │ ◄───────────────── │   ...    │
//!             └──────────────┘   close requests   └──────────┘
//! ```
//!
//! The poller never blocks on anything but the bounded epoll wait; workers
//! reassemble frames, decode and call the handler. Buffer size and CPU
//! affinity can be changed while running.
//!
//! ```rust,no_run
//! use network::{MessageHandler, ServerConfig, SocketServer};
//! use std::sync::Arc;
//! use std::time::Instant;
//! use types::Message;
//!
//! struct Print;
//! impl MessageHandler for Print {
//!     fn on_message(&self, message: Message, _received_at: Instant) {
//!         println!("{:?}", message.message_type());
//!     }
//! }
//!
//! let server = SocketServer::bind(ServerConfig::default(), Arc::new(Print))?;
//! server.start()?;
//! # Ok::<(), network::TransportError>(())
//! ```

pub mod connection;
mod poller;
pub mod stats;
pub mod workers;

use crate::handler::MessageHandler;
use crate::transports::bind_listener;
use crate::{Result, TransportError};
use connection::ConnectionRegistry;
use crossbeam_channel::unbounded;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags};
use parking_lot::Mutex;
use poller::{run_poller, LISTENER_TOKEN};
use stats::{ServerStats, ServerStatsSnapshot};
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};
use workers::WorkerPool;

/// Multiplexer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub worker_threads: usize,
    /// Per-read size; adjustable with [`SocketServer::set_buffer_size`]
    pub buffer_size: usize,
    /// Upper bound for `buffer_size` and for the unparsed tail a connection
    /// carries from one read to the next
    pub max_buffer_size: usize,
    pub affinity: bool,
    pub max_connections: usize,
    /// Readiness events fetched per wait
    pub max_events: usize,
    pub poll_timeout: Duration,
    pub socket_buffer_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            worker_threads: 4,
            buffer_size: 8192,
            max_buffer_size: 65536,
            affinity: true,
            max_connections: 10_000,
            max_events: 1000,
            poll_timeout: Duration::from_millis(1),
            socket_buffer_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, message: &str, field: &str| {
            if ok {
                Ok(())
            } else {
                Err(TransportError::configuration(message, Some(field)))
            }
        };
        check(self.worker_threads > 0, "at least one worker thread is required", "worker_threads")?;
        check(self.buffer_size > 0, "buffer size must be positive", "buffer_size")?;
        check(
            self.max_buffer_size >= codec::MAX_FRAME_SIZE,
            "max buffer size must hold the largest frame",
            "max_buffer_size",
        )?;
        check(
            self.buffer_size <= self.max_buffer_size,
            "buffer size exceeds max buffer size",
            "buffer_size",
        )?;
        check(self.max_connections > 0, "max connections must be positive", "max_connections")?;
        check(self.max_events > 0, "max events must be positive", "max_events")?;
        check(!self.poll_timeout.is_zero(), "poll timeout must be positive", "poll_timeout")?;
        Ok(())
    }
}

/// State shared by the poller and the workers
pub(crate) struct Shared {
    pub(crate) config: ServerConfig,
    pub(crate) epoll: Epoll,
    pub(crate) listener: TcpListener,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) handler: Arc<dyn MessageHandler>,
    pub(crate) running: AtomicBool,
    pub(crate) buffer_size: AtomicUsize,
    pub(crate) affinity: AtomicBool,
    pub(crate) stats: ServerStats,
    pub(crate) next_client_id: AtomicU64,
}

struct ServerThreads {
    poller: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

/// Epoll-based TCP server feeding a [`MessageHandler`]
pub struct SocketServer {
    shared: Arc<Shared>,
    threads: Mutex<Option<ServerThreads>>,
}

impl SocketServer {
    /// Bind the listener and create the epoll instance. No threads run until
    /// [`start`](Self::start).
    pub fn bind(config: ServerConfig, handler: Arc<dyn MessageHandler>) -> Result<Self> {
        config.validate()?;

        let listener = bind_listener(config.bind_addr)?;
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)
            .map_err(|e| TransportError::epoll("epoll_create", e))?;
        epoll
            .add(&listener, EpollEvent::new(EpollFlags::EPOLLIN, LISTENER_TOKEN))
            .map_err(|e| TransportError::epoll("register listener", e))?;

        let shared = Shared {
            buffer_size: AtomicUsize::new(config.buffer_size),
            affinity: AtomicBool::new(config.affinity),
            config,
            epoll,
            listener,
            registry: ConnectionRegistry::new(),
            handler,
            running: AtomicBool::new(false),
            stats: ServerStats::default(),
            next_client_id: AtomicU64::new(1),
        };

        Ok(Self {
            shared: Arc::new(shared),
            threads: Mutex::new(None),
        })
    }

    /// Spawn the worker pool and the poller
    pub fn start(&self) -> Result<()> {
        let mut threads = self.threads.lock();
        if threads.is_some() {
            return Err(TransportError::state("server already started"));
        }

        self.shared.running.store(true, Ordering::Release);
        let (close_tx, close_rx) = unbounded();

        let (pool, workers) = match WorkerPool::spawn(&self.shared, &close_tx) {
            Ok(spawned) => spawned,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(e);
            }
        };

        let shared = Arc::clone(&self.shared);
        let poller = thread::Builder::new()
            .name("gateway-poller".to_string())
            .spawn(move || run_poller(shared, pool, close_rx))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                TransportError::thread_spawn("gateway-poller", e)
            })?;

        *threads = Some(ServerThreads { poller, workers });
        info!(
            addr = %self.local_addr()?,
            workers = self.shared.config.worker_threads,
            affinity = self.affinity(),
            "Socket server started"
        );
        Ok(())
    }

    /// Stop accepting, close every connection and join all threads.
    ///
    /// Idempotent; also runs on drop.
    pub fn stop(&self) {
        let Some(threads) = self.threads.lock().take() else {
            return;
        };
        self.shared.running.store(false, Ordering::Release);

        if threads.poller.join().is_err() {
            error!("Poller thread panicked");
        }
        for (id, worker) in threads.workers.into_iter().enumerate() {
            if worker.join().is_err() {
                error!(worker_id = id, "Worker thread panicked");
            }
        }
        info!(stats = ?self.stats(), "Socket server stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.shared
            .listener
            .local_addr()
            .map_err(|e| TransportError::io("local_addr", e))
    }

    /// Change the per-read buffer size. Values are clamped to
    /// `1..=max_buffer_size`; the applied size is returned.
    pub fn set_buffer_size(&self, size: usize) -> usize {
        let applied = size.clamp(1, self.shared.config.max_buffer_size);
        if applied != size {
            warn!(requested = size, applied, "Buffer size clamped");
        }
        self.shared.buffer_size.store(applied, Ordering::Relaxed);
        applied
    }

    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size.load(Ordering::Relaxed)
    }

    /// Pin (or unpin) worker threads; takes effect at each worker's next wake
    pub fn set_affinity(&self, enabled: bool) {
        self.shared.affinity.store(enabled, Ordering::Relaxed);
        info!(enabled, "CPU affinity updated");
    }

    pub fn affinity(&self) -> bool {
        self.shared.affinity.load(Ordering::Relaxed)
    }

    pub fn connection_count(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn client_ids(&self) -> Vec<u64> {
        self.shared.registry.client_ids()
    }

    pub fn stats(&self) -> ServerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        self.stop();
    }
}
