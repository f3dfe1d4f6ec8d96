//! Ingest glue between the multiplexer and dispatch
//!
//! [`GatewayHandler`] is the [`MessageHandler`] the socket server calls from
//! its workers: run the interceptor chain, then route accepted messages to
//! their target services.

use dispatch::{DispatchError, DispatchRouter, RoutingTable};
use interceptors::{InterceptorChain, InterceptorContext, Verdict};
use network::MessageHandler;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use types::Message;

/// Callback receiving every finished context, accepted or rejected
pub type VerdictObserver = Box<dyn Fn(&InterceptorContext, Verdict) + Send + Sync>;

#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    accepted: AtomicU64,
    validation_rejects: AtomicU64,
    throttle_rejects: AtomicU64,
    other_rejects: AtomicU64,
    unroutable: AtomicU64,
    routed: AtomicU64,
    queue_full: AtomicU64,
    router_stopped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStatsSnapshot {
    pub received: u64,
    pub accepted: u64,
    pub validation_rejects: u64,
    pub throttle_rejects: u64,
    pub other_rejects: u64,
    /// Accepted but no service takes this message type
    pub unroutable: u64,
    /// Enqueued copies; one message may go to several services
    pub routed: u64,
    pub queue_full: u64,
    pub router_stopped: u64,
}

impl IngestStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            validation_rejects: self.validation_rejects.load(Ordering::Relaxed),
            throttle_rejects: self.throttle_rejects.load(Ordering::Relaxed),
            other_rejects: self.other_rejects.load(Ordering::Relaxed),
            unroutable: self.unroutable.load(Ordering::Relaxed),
            routed: self.routed.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
            router_stopped: self.router_stopped.load(Ordering::Relaxed),
        }
    }
}

pub struct GatewayHandler {
    chain: Arc<InterceptorChain>,
    router: Arc<DispatchRouter>,
    routes: RoutingTable,
    stats: IngestStats,
    observer: Option<VerdictObserver>,
}

impl GatewayHandler {
    pub fn new(chain: Arc<InterceptorChain>, router: Arc<DispatchRouter>, routes: RoutingTable) -> Self {
        Self {
            chain,
            router,
            routes,
            stats: IngestStats::default(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: VerdictObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn stats(&self) -> IngestStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn chain(&self) -> &Arc<InterceptorChain> {
        &self.chain
    }

    /// Run one message through the chain and dispatch it.
    ///
    /// `received_at` becomes the pipeline entry time so measured latency
    /// includes decode and worker hand-off.
    pub fn ingest(&self, message: Message, received_at: Instant) -> Verdict {
        IngestStats::bump(&self.stats.received);

        let message = Arc::new(message);
        let mut context = InterceptorContext::entered_at(Arc::clone(&message), received_at);
        let verdict = self.chain.process(&mut context);

        if let Some(observer) = &self.observer {
            observer(&context, verdict);
        }

        if verdict == Verdict::Reject {
            self.record_rejection(&context);
            return verdict;
        }
        IngestStats::bump(&self.stats.accepted);

        let targets = self.routes.targets(message.message_type());
        if targets.is_empty() {
            IngestStats::bump(&self.stats.unroutable);
            trace!(msg_type = message.message_type().name(), "No route, dropping");
            return verdict;
        }

        for target in targets {
            match self.router.route(Arc::clone(target), Arc::clone(&message)) {
                Ok(()) => IngestStats::bump(&self.stats.routed),
                Err(e) if e.is_drop() => {
                    let counter = match e {
                        DispatchError::QueueFull { .. } => &self.stats.queue_full,
                        _ => &self.stats.router_stopped,
                    };
                    IngestStats::bump(counter);
                    trace!(service = %target, error = %e, "Message dropped");
                }
                Err(e) => warn!(service = %target, error = %e, "Dispatch failed"),
            }
        }
        verdict
    }

    fn record_rejection(&self, context: &InterceptorContext) {
        let counter = match context.rejected_by() {
            Some("validation") => &self.stats.validation_rejects,
            Some("throttle") => &self.stats.throttle_rejects,
            _ => &self.stats.other_rejects,
        };
        IngestStats::bump(counter);
        debug!(
            seq = context.message().sequence_number(),
            client_id = context.message().client_id(),
            stage = context.rejected_by().unwrap_or("unknown"),
            reason = context.rejection_reason().unwrap_or(""),
            "Message rejected"
        );
    }
}

impl MessageHandler for GatewayHandler {
    fn on_message(&self, message: Message, received_at: Instant) {
        self.ingest(message, received_at);
    }

    fn on_disconnect(&self, client_id: u64) {
        debug!(client_id, "Client session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch::names;
    use interceptors::{ThrottlingInterceptor, ValidationInterceptor};
    use types::{MarketData, Order, Side};

    fn handler(chain: InterceptorChain) -> GatewayHandler {
        GatewayHandler::new(
            Arc::new(chain),
            Arc::new(DispatchRouter::default()),
            RoutingTable::standard(),
        )
    }

    #[test]
    fn test_rejections_counted_by_stage() {
        let chain = InterceptorChain::builder()
            .stage(ValidationInterceptor::new())
            .stage(ThrottlingInterceptor::new(1))
            .build();
        let handler = handler(chain);

        let crossed = Message::market_data(MarketData::new("AAPL", 151.0, 150.0, 1, 1));
        assert_eq!(handler.ingest(crossed, Instant::now()), Verdict::Reject);

        let ok = || Message::heartbeat();
        assert_eq!(handler.ingest(ok(), Instant::now()), Verdict::Accept);
        assert_eq!(handler.ingest(ok(), Instant::now()), Verdict::Reject);

        let stats = handler.stats();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.validation_rejects, 1);
        assert_eq!(stats.throttle_rejects, 1);
        assert_eq!(stats.accepted, 1);
        // Heartbeats have no consumer
        assert_eq!(stats.unroutable, 1);
    }

    #[test]
    fn test_router_stopped_is_counted() {
        let handler = handler(InterceptorChain::builder().build());
        let order = Message::order_new(Order::new(1, "AAPL", 150.5, 100, Side::Buy));
        handler.ingest(order, Instant::now());

        let stats = handler.stats();
        assert_eq!(handler.routes.targets(types::MessageType::OrderNew)[0].as_ref(), names::ORDER_MATCHING);
        assert_eq!(stats.router_stopped, 2);
        assert_eq!(stats.routed, 0);
    }
}
