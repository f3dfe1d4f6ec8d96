//! Accepted connections and their registry
//!
//! A [`Connection`] owns its socket. The registry lock is held only while
//! inserting, removing or looking up an entry; reads happen on a cloned
//! `Arc<Connection>` with the lock released.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use types::now_micros;

/// One accepted client socket
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    client_id: u64,
    peer: SocketAddr,
    alive: AtomicBool,
    last_activity_us: AtomicU64,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, client_id: u64, peer: SocketAddr) -> Self {
        Self {
            stream,
            client_id,
            peer,
            alive: AtomicBool::new(true),
            last_activity_us: AtomicU64::new(now_micros()),
        }
    }

    pub fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Microseconds since the epoch of the last successful read
    pub fn last_activity_us(&self) -> u64 {
        self.last_activity_us.load(Ordering::Relaxed)
    }

    pub(crate) fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub(crate) fn touch(&self) {
        self.last_activity_us.store(now_micros(), Ordering::Relaxed);
    }

    pub(crate) fn mark_closed(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Live connections keyed by file descriptor
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<RawFd, Arc<Connection>>>,
    count: AtomicUsize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, connection: Connection) -> Arc<Connection> {
        let connection = Arc::new(connection);
        let mut connections = self.connections.lock();
        if connections
            .insert(connection.fd(), Arc::clone(&connection))
            .is_none()
        {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        connection
    }

    pub fn get(&self, fd: RawFd) -> Option<Arc<Connection>> {
        self.connections.lock().get(&fd).cloned()
    }

    /// Remove the entry for `fd`.
    ///
    /// With `expected_client_id`, the entry is only removed if it still belongs
    /// to that client; a descriptor number reused by a newer connection is left
    /// alone.
    pub(crate) fn remove(&self, fd: RawFd, expected_client_id: Option<u64>) -> Option<Arc<Connection>> {
        let mut connections = self.connections.lock();
        if let Some(expected) = expected_client_id {
            match connections.get(&fd) {
                Some(existing) if existing.client_id() == expected => {}
                _ => return None,
            }
        }
        let removed = connections.remove(&fd);
        if removed.is_some() {
            self.count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    pub(crate) fn drain(&self) -> Vec<Arc<Connection>> {
        let mut connections = self.connections.lock();
        self.count.store(0, Ordering::Relaxed);
        connections.drain().map(|(_, c)| c).collect()
    }

    /// Active connection count, readable without the lock
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn client_ids(&self) -> Vec<u64> {
        self.connections.lock().values().map(|c| c.client_id()).collect()
    }
}
