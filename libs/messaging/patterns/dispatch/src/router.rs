//! Dispatch Router
//!
//! One bounded FIFO queue of `(service, message)` pairs shared by all
//! producers, drained by a single processor thread in batches.
//!
//! Locks: the service registry and the queue each have their own lock and no
//! code path holds both. Delivery happens with neither held, so registering
//! or unregistering a service never stalls delivery to the others.

use crate::{DispatchError, Result, Service};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use types::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSettings {
    pub queue_capacity: usize,
    /// Messages delivered per wake before yielding
    pub batch_size: usize,
    /// Condition wait when the queue is empty
    pub wait_timeout: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 65_536,
            batch_size: 100,
            wait_timeout: Duration::from_micros(10),
        }
    }
}

#[derive(Debug, Default)]
pub struct RouterStats {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    dropped_not_running: AtomicU64,
    dropped_unknown: AtomicU64,
    dropped_queue_full: AtomicU64,
    discarded_on_stop: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterStatsSnapshot {
    pub enqueued: u64,
    pub delivered: u64,
    /// Target registered but stopped when dequeued
    pub dropped_not_running: u64,
    /// Target not registered when dequeued
    pub dropped_unknown: u64,
    pub dropped_queue_full: u64,
    /// Still queued when the router stopped
    pub discarded_on_stop: u64,
}

impl RouterStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_not_running: self.dropped_not_running.load(Ordering::Relaxed),
            dropped_unknown: self.dropped_unknown.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            discarded_on_stop: self.discarded_on_stop.load(Ordering::Relaxed),
        }
    }
}

struct Envelope {
    service: Arc<str>,
    message: Arc<Message>,
}

struct RouterInner {
    settings: RouterSettings,
    services: Mutex<HashMap<Arc<str>, Arc<dyn Service>>>,
    queue: Mutex<VecDeque<Envelope>>,
    available: Condvar,
    running: AtomicBool,
    stats: RouterStats,
}

pub struct DispatchRouter {
    inner: Arc<RouterInner>,
    processor: Mutex<Option<JoinHandle<()>>>,
}

impl Default for DispatchRouter {
    fn default() -> Self {
        Self::new(RouterSettings::default())
    }
}

impl DispatchRouter {
    pub fn new(settings: RouterSettings) -> Self {
        let settings = RouterSettings {
            queue_capacity: settings.queue_capacity.max(1),
            batch_size: settings.batch_size.max(1),
            ..settings
        };
        Self {
            inner: Arc::new(RouterInner {
                queue: Mutex::new(VecDeque::with_capacity(settings.queue_capacity.min(4096))),
                settings,
                services: Mutex::new(HashMap::new()),
                available: Condvar::new(),
                running: AtomicBool::new(false),
                stats: RouterStats::default(),
            }),
            processor: Mutex::new(None),
        }
    }

    /// Add a service. Started immediately if the router is running.
    pub fn register(&self, service: Arc<dyn Service>) -> Result<()> {
        let name: Arc<str> = Arc::from(service.name());
        if self.inner.services.lock().contains_key(&name) {
            return Err(DispatchError::duplicate(&*name));
        }

        let started_here = self.is_running() && !service.is_running();
        if started_here {
            service.start()?;
        }

        let mut services = self.inner.services.lock();
        if services.contains_key(&name) {
            drop(services);
            if started_here {
                service.stop();
            }
            return Err(DispatchError::duplicate(&*name));
        }
        services.insert(Arc::clone(&name), service);
        drop(services);

        info!(service = %name, "Registered service");
        Ok(())
    }

    /// Remove and stop a service. Messages for it still queued are dropped at
    /// dequeue time.
    pub fn unregister(&self, name: &str) -> Result<Arc<dyn Service>> {
        let removed = self.inner.services.lock().remove(name);
        let service = removed.ok_or_else(|| DispatchError::unknown(name))?;
        if service.is_running() {
            service.stop();
        }
        info!(service = name, "Unregistered service");
        Ok(service)
    }

    /// Enqueue `message` for one service
    pub fn route(&self, service: impl Into<Arc<str>>, message: Arc<Message>) -> Result<()> {
        if !self.is_running() {
            return Err(DispatchError::RouterStopped);
        }
        let service = service.into();
        {
            let mut queue = self.inner.queue.lock();
            if queue.len() >= self.inner.settings.queue_capacity {
                drop(queue);
                RouterStats::bump(&self.inner.stats.dropped_queue_full);
                return Err(DispatchError::queue_full(&*service, self.inner.settings.queue_capacity));
            }
            queue.push_back(Envelope { service, message });
        }
        RouterStats::bump(&self.inner.stats.enqueued);
        self.inner.available.notify_one();
        Ok(())
    }

    /// Enqueue `message` for every registered, running service. Returns how
    /// many copies were queued; services that do not fit are counted as
    /// queue-full drops.
    pub fn broadcast(&self, message: Arc<Message>) -> Result<usize> {
        if !self.is_running() {
            return Err(DispatchError::RouterStopped);
        }
        let targets: Vec<Arc<str>> = self
            .inner
            .services
            .lock()
            .iter()
            .filter(|(_, service)| service.is_running())
            .map(|(name, _)| Arc::clone(name))
            .collect();

        let mut queued = 0;
        {
            let mut queue = self.inner.queue.lock();
            for service in targets {
                if queue.len() >= self.inner.settings.queue_capacity {
                    RouterStats::bump(&self.inner.stats.dropped_queue_full);
                    continue;
                }
                queue.push_back(Envelope {
                    service,
                    message: Arc::clone(&message),
                });
                queued += 1;
            }
        }
        self.inner.stats.enqueued.fetch_add(queued as u64, Ordering::Relaxed);
        if queued > 0 {
            self.inner.available.notify_one();
        }
        Ok(queued)
    }

    /// Start every registered service, then the processor thread.
    ///
    /// All or nothing: on failure the services started by this call are
    /// stopped again and the router stays stopped.
    pub fn start(&self) -> Result<()> {
        let mut processor = self.processor.lock();
        if processor.is_some() {
            return Ok(());
        }

        let mut started: Vec<Arc<dyn Service>> = Vec::new();
        for service in self.services() {
            if service.is_running() {
                continue;
            }
            if let Err(e) = service.start() {
                warn!(service = service.name(), error = %e, rolled_back = started.len(), "Service failed to start");
                Self::roll_back(&started);
                return Err(DispatchError::service_start(service.name(), &e));
            }
            started.push(service);
        }

        self.inner.running.store(true, Ordering::Release);
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("dispatch-processor".to_string())
            .spawn(move || inner.process_loop())
            .map_err(|e| {
                self.inner.running.store(false, Ordering::Release);
                Self::roll_back(&started);
                DispatchError::thread_spawn("dispatch-processor", e)
            })?;
        *processor = Some(handle);

        info!(
            services = self.service_count(),
            batch_size = self.inner.settings.batch_size,
            capacity = self.inner.settings.queue_capacity,
            "Dispatch router started"
        );
        Ok(())
    }

    /// Stop the processor, discard anything still queued, then stop every
    /// service
    pub fn stop(&self) {
        let Some(handle) = self.processor.lock().take() else {
            return;
        };
        self.inner.running.store(false, Ordering::Release);
        self.inner.available.notify_all();
        if handle.join().is_err() {
            warn!("Dispatch processor panicked");
        }

        let discarded = {
            let mut queue = self.inner.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if discarded > 0 {
            self.inner
                .stats
                .discarded_on_stop
                .fetch_add(discarded as u64, Ordering::Relaxed);
            warn!(discarded, "Dispatch queue not empty at shutdown");
        }

        for service in self.services() {
            if service.is_running() {
                service.stop();
            }
        }
        info!(stats = ?self.stats(), "Dispatch router stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn service(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.inner.services.lock().get(name).cloned()
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.services.lock().keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    pub fn service_count(&self) -> usize {
        self.inner.services.lock().len()
    }

    pub fn active_service_count(&self) -> usize {
        self.services().iter().filter(|s| s.is_running()).count()
    }

    pub fn queue_depth(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.inner.settings
    }

    fn services(&self) -> Vec<Arc<dyn Service>> {
        self.inner.services.lock().values().cloned().collect()
    }

    fn roll_back(started: &[Arc<dyn Service>]) {
        for service in started.iter().rev() {
            service.stop();
        }
    }
}

impl Drop for DispatchRouter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl RouterInner {
    fn process_loop(&self) {
        let mut batch: Vec<Envelope> = Vec::with_capacity(self.settings.batch_size);
        let mut targets: Vec<Option<Arc<dyn Service>>> = Vec::with_capacity(self.settings.batch_size);

        while self.running.load(Ordering::Acquire) {
            {
                let mut queue = self.queue.lock();
                if queue.is_empty() {
                    self.available.wait_for(&mut queue, self.settings.wait_timeout);
                }
                let n = queue.len().min(self.settings.batch_size);
                batch.extend(queue.drain(..n));
            }
            if batch.is_empty() {
                continue;
            }

            // One registry lookup pass per batch
            {
                let services = self.services.lock();
                targets.extend(batch.iter().map(|e| services.get(&e.service).cloned()));
            }

            for (envelope, target) in batch.drain(..).zip(targets.drain(..)) {
                match target {
                    Some(service) if service.is_running() => {
                        service.process_message(envelope.message);
                        RouterStats::bump(&self.stats.delivered);
                    }
                    Some(_) => RouterStats::bump(&self.stats.dropped_not_running),
                    None => {
                        debug!(service = %envelope.service, "No such service, dropping message");
                        RouterStats::bump(&self.stats.dropped_unknown);
                    }
                }
            }

            thread::yield_now();
        }
        debug!("Dispatch processor exiting");
    }
}
