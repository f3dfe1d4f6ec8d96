//! Readiness loop
//!
//! A single thread owns the epoll wait. It accepts new connections, drains
//! readable sockets until they would block, forwards the bytes to the worker
//! pool and closes connections. It never decodes.
//!
//! Clients are registered edge-triggered, so every readable event must be
//! drained completely. The listener is level-triggered and accepted in a loop
//! until the backlog is empty.

use super::workers::{CloseRequest, WorkItem, WorkerPool};
use super::Shared;
use crate::server::connection::Connection;
use crate::server::stats::ServerStats;
use crate::transports::{configure_stream, SocketTuning};
use bytes::Bytes;
use crossbeam_channel::Receiver;
use nix::errno::Errno;
use nix::sys::epoll::{EpollEvent, EpollFlags, EpollTimeout};
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Epoll token of the listening socket; clients use their descriptor
pub(crate) const LISTENER_TOKEN: u64 = u64::MAX;

fn client_flags() -> EpollFlags {
    EpollFlags::EPOLLIN | EpollFlags::EPOLLET | EpollFlags::EPOLLRDHUP
}

pub(crate) fn run_poller(shared: Arc<Shared>, pool: WorkerPool, close_rx: Receiver<CloseRequest>) {
    let mut events = vec![EpollEvent::empty(); shared.config.max_events.max(1)];
    let timeout_ms = u16::try_from(shared.config.poll_timeout.as_millis()).unwrap_or(u16::MAX);
    let timeout = EpollTimeout::from(timeout_ms);
    let mut scratch = Vec::new();

    info!(
        max_events = events.len(),
        timeout_ms, "Poller started"
    );

    while shared.running.load(Ordering::Acquire) {
        while let Ok(request) = close_rx.try_recv() {
            close_connection(&shared, &pool, request.fd, request.client_id, "malformed stream");
        }

        let ready = match shared.epoll.wait(&mut events, timeout) {
            Ok(ready) => ready,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                error!(error = %e, "epoll_wait failed, stopping poller");
                shared.running.store(false, Ordering::Release);
                break;
            }
        };

        // Read size may change at runtime
        let read_size = shared.buffer_size.load(Ordering::Relaxed).max(1);
        if scratch.len() != read_size {
            scratch.resize(read_size, 0);
        }

        for event in &events[..ready] {
            if event.data() == LISTENER_TOKEN {
                accept_pending(&shared);
            } else {
                service_client(&shared, &pool, event.data() as RawFd, event.events(), &mut scratch);
            }
        }
    }

    for connection in shared.registry.drain() {
        let _ = shared.epoll.delete(connection.stream());
        connection.mark_closed();
        ServerStats::bump(&shared.stats.closed);
        pool.submit(
            connection.fd(),
            WorkItem::Closed {
                fd: connection.fd(),
                client_id: connection.client_id(),
            },
        );
    }

    info!("Poller stopped");
    // Dropping the pool disconnects the worker channels
    drop(pool);
}

fn accept_pending(shared: &Shared) {
    loop {
        match shared.listener.accept() {
            Ok((stream, peer)) => register(shared, stream, peer),
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "accept failed");
                break;
            }
        }
    }
}

fn register(shared: &Shared, stream: TcpStream, peer: SocketAddr) {
    let fd = stream.as_raw_fd();

    if shared.registry.len() >= shared.config.max_connections {
        ServerStats::bump(&shared.stats.refused);
        warn!(
            %peer,
            limit = shared.config.max_connections,
            "Connection limit reached, refusing"
        );
        return;
    }

    let tuning = SocketTuning {
        buffer_bytes: shared.config.socket_buffer_bytes,
    };
    if let Err(e) = configure_stream(&stream, tuning) {
        ServerStats::bump(&shared.stats.registration_failures);
        warn!(%peer, fd, error = %e, category = e.category(), "Socket setup failed, dropping connection");
        return;
    }

    if let Err(first) = shared.epoll.add(&stream, EpollEvent::new(client_flags(), fd as u64)) {
        // Stale registration for a reused descriptor; clear it and retry once
        let _ = shared.epoll.delete(&stream);
        if let Err(e) = shared.epoll.add(&stream, EpollEvent::new(client_flags(), fd as u64)) {
            ServerStats::bump(&shared.stats.registration_failures);
            warn!(%peer, fd, first = %first, error = %e, "epoll registration failed, dropping connection");
            return;
        }
    }

    let client_id = shared.next_client_id.fetch_add(1, Ordering::Relaxed);
    shared.registry.insert(Connection::new(stream, client_id, peer));
    ServerStats::bump(&shared.stats.accepted);
    info!(%peer, fd, client_id, active = shared.registry.len(), "Client connected");
}

fn service_client(shared: &Shared, pool: &WorkerPool, fd: RawFd, flags: EpollFlags, scratch: &mut [u8]) {
    let Some(connection) = shared.registry.get(fd) else {
        return;
    };
    let client_id = connection.client_id();
    let mut closed = false;

    if flags.intersects(EpollFlags::EPOLLIN | EpollFlags::EPOLLRDHUP) {
        let mut stream = connection.stream();
        loop {
            match stream.read(scratch) {
                Ok(0) => {
                    closed = true;
                    break;
                }
                Ok(n) => {
                    let received_at = Instant::now();
                    connection.touch();
                    shared.stats.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
                    pool.submit(
                        fd,
                        WorkItem::Data {
                            fd,
                            client_id,
                            bytes: Bytes::copy_from_slice(&scratch[..n]),
                            received_at,
                        },
                    );
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(fd, client_id, error = %e, "Read failed");
                    closed = true;
                    break;
                }
            }
        }
    }

    if closed || flags.intersects(EpollFlags::EPOLLHUP | EpollFlags::EPOLLERR) {
        close_connection(shared, pool, fd, client_id, "peer closed");
    }
}

/// Unregister and close a connection, then tell its worker.
///
/// No-op if `fd` now belongs to a different client.
fn close_connection(shared: &Shared, pool: &WorkerPool, fd: RawFd, client_id: u64, reason: &'static str) {
    let Some(connection) = shared.registry.remove(fd, Some(client_id)) else {
        return;
    };
    if let Err(e) = shared.epoll.delete(connection.stream()) {
        debug!(fd, client_id, error = %e, "epoll delete failed");
    }
    connection.mark_closed();
    ServerStats::bump(&shared.stats.closed);
    pool.submit(fd, WorkItem::Closed { fd, client_id });
    info!(
        fd,
        client_id,
        reason,
        active = shared.registry.len(),
        "Client disconnected"
    );
}
