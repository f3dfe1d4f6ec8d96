//! Service shell with its own worker thread
//!
//! [`ThreadedService`] implements [`Service`] for any [`MessageProcessor`]:
//! `process_message` only pushes onto the service's inbox, and a dedicated
//! thread drains the inbox and runs the processor. One thread per service
//! means a processor never sees two messages at once.

use crate::{DispatchError, Result, Service};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use types::Message;

/// Handlers slower than this are logged
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_micros(10);

/// Business logic run on a service's worker thread
pub trait MessageProcessor: Send + Sync + 'static {
    fn handle(&self, message: &Message);
}

#[derive(Debug, Default)]
pub struct ServiceStats {
    processed: AtomicU64,
    slow: AtomicU64,
    dropped_stopped: AtomicU64,
}

impl ServiceStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Handler runs over the slow threshold
    pub fn slow(&self) -> u64 {
        self.slow.load(Ordering::Relaxed)
    }

    /// Messages offered while the service was stopped
    pub fn dropped_stopped(&self) -> u64 {
        self.dropped_stopped.load(Ordering::Relaxed)
    }
}

struct Worker {
    inbox: Sender<Arc<Message>>,
    handle: JoinHandle<()>,
}

pub struct ThreadedService<P: MessageProcessor> {
    name: String,
    processor: Arc<P>,
    running: AtomicBool,
    worker: Mutex<Option<Worker>>,
    stats: Arc<ServiceStats>,
    slow_threshold: Duration,
}

impl<P: MessageProcessor> ThreadedService<P> {
    pub fn new(name: impl Into<String>, processor: P) -> Self {
        Self {
            name: name.into(),
            processor: Arc::new(processor),
            running: AtomicBool::new(false),
            worker: Mutex::new(None),
            stats: Arc::new(ServiceStats::default()),
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn processor(&self) -> &Arc<P> {
        &self.processor
    }

    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }
}

impl<P: MessageProcessor> Service for ThreadedService<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let (tx, rx) = unbounded();
        let thread_name = format!("svc-{}", self.name);
        let context = WorkerContext {
            name: self.name.clone(),
            processor: Arc::clone(&self.processor),
            stats: Arc::clone(&self.stats),
            slow_threshold: self.slow_threshold,
        };
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || context.run(rx))
            .map_err(|e| DispatchError::thread_spawn(thread_name, e))?;

        *worker = Some(Worker { inbox: tx, handle });
        self.running.store(true, Ordering::Release);
        info!(service = %self.name, "Service started");
        Ok(())
    }

    fn stop(&self) {
        let mut worker = self.worker.lock();
        let Some(Worker { inbox, handle }) = worker.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        // Disconnecting the inbox lets the thread drain what is queued and exit
        drop(inbox);
        if handle.join().is_err() {
            warn!(service = %self.name, "Service thread panicked");
        }
        info!(
            service = %self.name,
            processed = self.stats.processed(),
            "Service stopped"
        );
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn process_message(&self, message: Arc<Message>) {
        if !self.is_running() {
            self.stats.dropped_stopped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let worker = self.worker.lock();
        match worker.as_ref() {
            Some(worker) if worker.inbox.send(message).is_ok() => {}
            _ => {
                self.stats.dropped_stopped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl<P: MessageProcessor> Drop for ThreadedService<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WorkerContext<P> {
    name: String,
    processor: Arc<P>,
    stats: Arc<ServiceStats>,
    slow_threshold: Duration,
}

impl<P: MessageProcessor> WorkerContext<P> {
    fn run(self, inbox: Receiver<Arc<Message>>) {
        while let Ok(message) = inbox.recv() {
            let started = Instant::now();
            self.processor.handle(&message);
            let elapsed = started.elapsed();

            self.stats.processed.fetch_add(1, Ordering::Relaxed);
            if elapsed > self.slow_threshold {
                self.stats.slow.fetch_add(1, Ordering::Relaxed);
                warn!(
                    service = %self.name,
                    seq = message.sequence_number(),
                    latency_us = elapsed.as_nanos() as f64 / 1_000.0,
                    "High handler latency"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<u64>>);

    impl MessageProcessor for Collect {
        fn handle(&self, message: &Message) {
            self.0.lock().push(message.sequence_number());
        }
    }

    struct Sleepy;

    impl MessageProcessor for Sleepy {
        fn handle(&self, _message: &Message) {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_lifecycle_and_ordering() {
        let service = ThreadedService::new("collect", Collect::default());
        assert!(!service.is_running());

        service.process_message(Arc::new(Message::heartbeat()));
        assert_eq!(service.stats().dropped_stopped(), 1);

        service.start().unwrap();
        service.start().unwrap();
        assert!(service.is_running());

        let sent: Vec<u64> = (0..50)
            .map(|_| {
                let message = Arc::new(Message::heartbeat());
                let seq = message.sequence_number();
                service.process_message(message);
                seq
            })
            .collect();

        service.stop();
        assert!(!service.is_running());
        assert_eq!(*service.processor().0.lock(), sent);
        assert_eq!(service.stats().processed(), 50);
    }

    #[test]
    fn test_slow_handler_counted() {
        let service = ThreadedService::new("sleepy", Sleepy);
        service.start().unwrap();
        service.process_message(Arc::new(Message::heartbeat()));
        service.stop();
        assert_eq!(service.stats().slow(), 1);
    }

    #[test]
    fn test_restart() {
        let service = ThreadedService::new("collect", Collect::default());
        service.start().unwrap();
        service.stop();
        service.start().unwrap();
        service.process_message(Arc::new(Message::login()));
        service.stop();
        assert_eq!(service.stats().processed(), 1);
    }
}
