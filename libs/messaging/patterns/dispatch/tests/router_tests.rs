use dispatch::{
    DispatchError, DispatchRouter, MessageProcessor, RouterSettings, Service, ThreadedService,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use types::{Message, Order, Side};

/// Service that records every message inline, no thread of its own
#[derive(Default)]
struct InlineService {
    name: String,
    running: AtomicBool,
    seen: Mutex<Vec<u64>>,
}

impl InlineService {
    fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn seen(&self) -> Vec<u64> {
        self.seen.lock().clone()
    }
}

impl Service for InlineService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> dispatch::Result<()> {
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn process_message(&self, message: Arc<Message>) {
        self.seen.lock().push(message.sequence_number());
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn order(id: u64) -> Arc<Message> {
    Arc::new(Message::order_new(Order::new(id, "AAPL", 150.50, 100, Side::Buy)))
}

#[test_log::test]
fn test_route_preserves_fifo_order() {
    let router = DispatchRouter::default();
    let service = InlineService::named("OrderMatching");
    router.register(service.clone()).unwrap();
    router.start().unwrap();
    assert!(service.is_running());

    let sent: Vec<u64> = (1..=1_000)
        .map(|id| {
            let message = order(id);
            let seq = message.sequence_number();
            router.route("OrderMatching", message).unwrap();
            seq
        })
        .collect();

    assert!(wait_until(|| service.seen().len() == sent.len()));
    assert_eq!(service.seen(), sent);
    assert_eq!(router.stats().delivered, 1_000);
}

#[test_log::test]
fn test_stopped_and_unknown_targets_are_dropped() {
    let router = DispatchRouter::default();
    let stopped = InlineService::named("Stopped");
    let live = InlineService::named("Live");
    router.register(stopped.clone()).unwrap();
    router.register(live.clone()).unwrap();
    router.start().unwrap();
    stopped.stop();

    router.route("Stopped", order(1)).unwrap();
    router.route("Nowhere", order(2)).unwrap();
    router.route("Live", order(3)).unwrap();

    assert!(wait_until(|| live.seen().len() == 1));
    assert!(stopped.seen().is_empty());
    let stats = router.stats();
    assert_eq!(stats.dropped_not_running, 1);
    assert_eq!(stats.dropped_unknown, 1);
    assert_eq!(stats.delivered, 1);
}

#[test_log::test]
fn test_broadcast_reaches_running_services_only() {
    let router = DispatchRouter::default();
    let a = InlineService::named("A");
    let b = InlineService::named("B");
    let c = InlineService::named("C");
    for service in [&a, &b, &c] {
        router.register(service.clone()).unwrap();
    }
    router.start().unwrap();
    c.stop();

    assert_eq!(router.broadcast(Arc::new(Message::heartbeat())).unwrap(), 2);
    assert!(wait_until(|| a.seen().len() == 1 && b.seen().len() == 1));
    assert!(c.seen().is_empty());
    assert_eq!(router.active_service_count(), 2);
}

#[test_log::test]
fn test_registry_rules() {
    let router = DispatchRouter::default();
    router.register(InlineService::named("X")).unwrap();
    assert!(matches!(
        router.register(InlineService::named("X")),
        Err(DispatchError::DuplicateService { .. })
    ));
    assert!(matches!(router.unregister("Y"), Err(DispatchError::UnknownService { .. })));

    // Registered while running: started immediately
    router.start().unwrap();
    let late = InlineService::named("Late");
    router.register(late.clone()).unwrap();
    assert!(late.is_running());

    let removed = router.unregister("Late").unwrap();
    assert!(!removed.is_running());
    assert_eq!(router.service_names(), vec!["X".to_string()]);
}

#[test_log::test]
fn test_queue_full_rejects_without_blocking() {
    let router = DispatchRouter::new(RouterSettings {
        queue_capacity: 4,
        batch_size: 100,
        wait_timeout: Duration::from_micros(10),
    });
    let gate = Arc::new(AtomicBool::new(false));

    // A service whose delivery blocks the processor until released
    struct Blocking {
        gate: Arc<AtomicBool>,
        running: AtomicBool,
    }
    impl Service for Blocking {
        fn name(&self) -> &str {
            "Blocking"
        }
        fn start(&self) -> dispatch::Result<()> {
            self.running.store(true, Ordering::Release);
            Ok(())
        }
        fn stop(&self) {
            self.running.store(false, Ordering::Release);
        }
        fn is_running(&self) -> bool {
            self.running.load(Ordering::Acquire)
        }
        fn process_message(&self, _message: Arc<Message>) {
            while !self.gate.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    router
        .register(Arc::new(Blocking {
            gate: gate.clone(),
            running: AtomicBool::new(false),
        }))
        .unwrap();
    router.start().unwrap();

    // First message occupies the processor, the next four fill the queue
    router.route("Blocking", order(1)).unwrap();
    assert!(wait_until(|| router.queue_depth() == 0));
    for id in 2..=5 {
        router.route("Blocking", order(id)).unwrap();
    }
    let err = router.route("Blocking", order(6)).unwrap_err();
    assert!(matches!(err, DispatchError::QueueFull { capacity: 4, .. }));
    assert_eq!(router.stats().dropped_queue_full, 1);

    gate.store(true, Ordering::Release);
    assert!(wait_until(|| router.stats().delivered == 5));
}

#[test_log::test]
fn test_route_requires_running_router() {
    let router = DispatchRouter::default();
    assert!(matches!(
        router.route("X", order(1)),
        Err(DispatchError::RouterStopped)
    ));
    router.start().unwrap();
    router.stop();
    assert!(matches!(
        router.broadcast(order(1)),
        Err(DispatchError::RouterStopped)
    ));
}

#[test_log::test]
fn test_stop_stops_services() {
    let router = DispatchRouter::default();
    let service = Arc::new(ThreadedService::new("Threaded", Noop));
    router.register(service.clone()).unwrap();
    router.start().unwrap();
    assert!(service.is_running());

    router.route("Threaded", order(1)).unwrap();
    assert!(wait_until(|| service.stats().processed() == 1));

    router.stop();
    assert!(!service.is_running());
    assert!(!router.is_running());
}

struct Noop;

impl MessageProcessor for Noop {
    fn handle(&self, _message: &Message) {}
}

/// Service whose start always fails
struct Unstartable;

impl Service for Unstartable {
    fn name(&self) -> &str {
        "Unstartable"
    }
    fn start(&self) -> dispatch::Result<()> {
        Err(DispatchError::unknown("Unstartable"))
    }
    fn stop(&self) {}
    fn is_running(&self) -> bool {
        false
    }
    fn process_message(&self, _message: Arc<Message>) {}
}

#[test_log::test]
fn test_failed_start_stops_services_it_started() {
    let router = DispatchRouter::default();
    let services: Vec<_> = (0..16)
        .map(|i| InlineService::named(&format!("Service{i}")))
        .collect();
    for service in &services {
        router.register(service.clone()).unwrap();
    }
    router.register(Arc::new(Unstartable)).unwrap();

    let err = router.start().unwrap_err();
    assert!(matches!(err, DispatchError::ServiceStart { ref name, .. } if name == "Unstartable"));
    assert!(!router.is_running());
    assert_eq!(router.active_service_count(), 0);
    assert!(services.iter().all(|s| !s.is_running()));
    assert!(matches!(router.route("Service0", order(1)), Err(DispatchError::RouterStopped)));
}
