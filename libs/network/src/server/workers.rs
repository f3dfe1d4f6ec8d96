//! Worker Pool
//!
//! Fixed set of threads doing the CPU-bound half of ingestion: frame
//! reassembly, decoding and the handler call. The poller routes each
//! connection to worker `fd % workers`, so one connection's bytes are always
//! processed by one thread, in arrival order.
//!
//! With affinity enabled, worker `i` is pinned to logical core
//! `i % available_cores`. The flag is re-checked at every wake, so toggling it
//! at runtime pins or unpins the running workers.

use super::Shared;
use crate::server::stats::ServerStats;
use crate::{Result, TransportError};
use bytes::Bytes;
use codec::FrameAssembler;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Unit of work handed from the poller to a worker
#[derive(Debug)]
pub(crate) enum WorkItem {
    Data {
        fd: RawFd,
        client_id: u64,
        bytes: Bytes,
        received_at: Instant,
    },
    Closed {
        fd: RawFd,
        client_id: u64,
    },
}

/// Worker asks the poller to close a connection (malformed stream)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CloseRequest {
    pub fd: RawFd,
    pub client_id: u64,
}

pub(crate) struct WorkerPool {
    senders: Vec<Sender<WorkItem>>,
}

impl WorkerPool {
    pub(crate) fn spawn(
        shared: &Arc<Shared>,
        close_tx: &Sender<CloseRequest>,
    ) -> Result<(Self, Vec<JoinHandle<()>>)> {
        let count = shared.config.worker_threads.max(1);
        let mut senders = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);

        for worker_id in 0..count {
            let (tx, rx) = unbounded();
            let shared = Arc::clone(shared);
            let close_tx = close_tx.clone();
            let name = format!("gateway-worker-{}", worker_id);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_worker(worker_id, rx, shared, close_tx))
                .map_err(|e| TransportError::thread_spawn(name, e))?;
            senders.push(tx);
            handles.push(handle);
        }

        info!(workers = count, "Worker pool started");
        Ok((Self { senders }, handles))
    }

    /// Route by descriptor so a connection sticks to one worker
    pub(crate) fn submit(&self, fd: RawFd, item: WorkItem) {
        let index = fd.unsigned_abs() as usize % self.senders.len();
        // Only fails once the worker has exited during shutdown
        let _ = self.senders[index].send(item);
    }
}

/// Logical core for a worker id
pub fn core_for_worker(worker_id: usize) -> usize {
    let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    worker_id % cores
}

/// Pin the calling thread to one logical core
pub fn pin_current_thread(core: usize) -> Result<()> {
    let mut set = CpuSet::new();
    set.set(core)
        .map_err(|source| TransportError::Affinity { core, source })?;
    sched_setaffinity(Pid::from_raw(0), &set).map_err(|source| TransportError::Affinity { core, source })
}

/// Allow the calling thread to run on every available core again
pub fn unpin_current_thread() -> Result<()> {
    let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let mut set = CpuSet::new();
    for core in 0..cores.min(CpuSet::count()) {
        set.set(core)
            .map_err(|source| TransportError::Affinity { core, source })?;
    }
    sched_setaffinity(Pid::from_raw(0), &set)
        .map_err(|source| TransportError::Affinity { core: 0, source })
}

/// Reassembly state for one connection owned by this worker
struct StreamState {
    client_id: u64,
    assembler: FrameAssembler,
    /// Set after a decode failure; later bytes are discarded until close
    poisoned: bool,
}

fn run_worker(worker_id: usize, rx: Receiver<WorkItem>, shared: Arc<Shared>, close_tx: Sender<CloseRequest>) {
    let mut pinned = false;
    let mut streams: HashMap<RawFd, StreamState> = HashMap::new();

    loop {
        sync_affinity(worker_id, &shared, &mut pinned);

        match rx.recv_timeout(shared.config.poll_timeout) {
            Ok(WorkItem::Data {
                fd,
                client_id,
                bytes,
                received_at,
            }) => {
                let stream = stream_for(&shared, &mut streams, fd, client_id);
                if stream.poisoned {
                    continue;
                }
                if ingest(&shared, stream, fd, &bytes, received_at) {
                    stream.poisoned = true;
                    stream.assembler.clear();
                    let _ = close_tx.send(CloseRequest { fd, client_id });
                }
            }
            Ok(WorkItem::Closed { fd, client_id }) => {
                if matches!(streams.get(&fd), Some(state) if state.client_id == client_id) {
                    streams.remove(&fd);
                }
                shared.handler.on_disconnect(client_id);
            }
            // Wake periodically to pick up affinity changes
            Err(RecvTimeoutError::Timeout) => {}
            // Poller gone; every queued item has been handled
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Worker exiting");
}

fn stream_for<'a>(
    shared: &Shared,
    streams: &'a mut HashMap<RawFd, StreamState>,
    fd: RawFd,
    client_id: u64,
) -> &'a mut StreamState {
    let fresh = || StreamState {
        client_id,
        assembler: FrameAssembler::new(
            shared.buffer_size.load(Ordering::Relaxed),
            shared.config.max_buffer_size,
        ),
        poisoned: false,
    };
    let state = streams.entry(fd).or_insert_with(fresh);
    if state.client_id != client_id {
        // Descriptor reused by a new connection; stale partial frame is discarded
        *state = fresh();
    }
    state
}

/// Feed bytes to the connection's assembler and hand every complete message
/// to the handler. Returns true when the stream is malformed.
fn ingest(shared: &Shared, stream: &mut StreamState, fd: RawFd, bytes: &[u8], received_at: Instant) -> bool {
    let client_id = stream.client_id;
    let assembler = &mut stream.assembler;

    if let Err(e) = assembler.extend(bytes) {
        let error = TransportError::from(e);
        warn!(fd, client_id, %error, category = error.category(), "Reassembly buffer overflow, closing connection");
        ServerStats::bump(&shared.stats.decode_failures);
        return true;
    }

    loop {
        match assembler.next_message() {
            Ok(Some(mut message)) => {
                message.set_client_id(client_id);
                ServerStats::bump(&shared.stats.messages_decoded);
                trace!(fd, client_id, seq = message.sequence_number(), "Frame decoded");
                shared.handler.on_message(message, received_at);
            }
            Ok(None) => return false,
            Err(e) if e.desynchronizes_stream() => {
                let error = TransportError::from(e);
                warn!(fd, client_id, %error, category = error.category(), "Malformed frame, closing connection");
                ServerStats::bump(&shared.stats.decode_failures);
                return true;
            }
            // Frame boundary intact; skip this frame and keep reading
            Err(e) => {
                warn!(fd, client_id, error = %e, "Frame skipped");
                ServerStats::bump(&shared.stats.decode_failures);
            }
        }
    }
}

fn sync_affinity(worker_id: usize, shared: &Shared, pinned: &mut bool) {
    let wanted = shared.affinity.load(Ordering::Relaxed);
    if wanted == *pinned {
        return;
    }
    let result = if wanted {
        let core = core_for_worker(worker_id);
        pin_current_thread(core).map(|_| debug!(worker_id, core, "Worker pinned"))
    } else {
        unpin_current_thread().map(|_| debug!(worker_id, "Worker unpinned"))
    };
    match result {
        Ok(()) => *pinned = wanted,
        Err(e) => {
            warn!(worker_id, error = %e, "Affinity change failed, continuing unpinned");
            // Stop retrying until the flag changes again
            *pinned = wanted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_for_worker_wraps() {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        assert_eq!(core_for_worker(0), 0);
        assert_eq!(core_for_worker(cores), 0);
        assert_eq!(core_for_worker(cores + 1), 1 % cores);
    }

    #[test]
    fn test_pin_and_unpin_current_thread() {
        // Runs on its own thread so the test harness thread is unaffected
        thread::spawn(|| {
            pin_current_thread(0).unwrap();
            let set = nix::sched::sched_getaffinity(Pid::from_raw(0)).unwrap();
            assert!(set.is_set(0).unwrap());
            unpin_current_thread().unwrap();
        })
        .join()
        .unwrap();
    }
}
