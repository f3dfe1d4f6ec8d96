//! Pipeline latency measurement

use crate::chain::Interceptor;
use crate::context::{keys, InterceptorContext, Verdict};
use network::PerformanceMonitor;
use std::sync::Arc;
use tracing::debug;

/// Default processing-time target in microseconds
pub const DEFAULT_LATENCY_TARGET_US: f64 = 10.0;

/// Stamps pipeline exit, records entry-to-exit latency into the shared
/// [`PerformanceMonitor`] and flags messages over the target. Never rejects.
#[derive(Debug)]
pub struct PerformanceInterceptor {
    monitor: Arc<PerformanceMonitor>,
    target_us: f64,
    warning: String,
}

impl PerformanceInterceptor {
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self::with_target(monitor, DEFAULT_LATENCY_TARGET_US)
    }

    pub fn with_target(monitor: Arc<PerformanceMonitor>, target_us: f64) -> Self {
        Self {
            monitor,
            target_us,
            warning: format!("Latency exceeds {}us threshold", target_us),
        }
    }

    pub fn target_us(&self) -> f64 {
        self.target_us
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }
}

impl Interceptor for PerformanceInterceptor {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn process(&self, context: &mut InterceptorContext) -> Verdict {
        context.stamp_exit();
        let latency_us = context.latency_us().unwrap_or_default();

        self.monitor.record_latency(latency_us);
        self.monitor.record_message();
        context.set(keys::LATENCY_US, format!("{:.6}", latency_us));

        if latency_us > self.target_us {
            debug!(
                seq = context.message().sequence_number(),
                latency_us,
                target_us = self.target_us,
                "Slow message"
            );
            context.set(keys::PERFORMANCE_WARNING, self.warning.clone());
        }
        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use types::Message;

    #[test]
    fn test_records_latency_and_flags_slow_messages() {
        let monitor = Arc::new(PerformanceMonitor::new(16));
        let stage = PerformanceInterceptor::new(monitor.clone());

        let entered = Instant::now() - Duration::from_millis(1);
        let mut ctx = InterceptorContext::entered_at(Arc::new(Message::heartbeat()), entered);
        assert_eq!(stage.process(&mut ctx), Verdict::Accept);

        let recorded: f64 = ctx.get(keys::LATENCY_US).unwrap().parse().unwrap();
        assert!(recorded >= 1000.0);
        assert_eq!(
            ctx.get(keys::PERFORMANCE_WARNING),
            Some("Latency exceeds 10us threshold")
        );
        assert_eq!(monitor.sample_count(), 1);
        assert_eq!(monitor.messages_total(), 1);
        assert!(ctx.exit_time().is_some());
    }

    #[test]
    fn test_fast_message_not_flagged() {
        let monitor = Arc::new(PerformanceMonitor::new(16));
        let stage = PerformanceInterceptor::with_target(monitor.clone(), 1_000_000.0);
        let mut ctx = InterceptorContext::new(Arc::new(Message::heartbeat()));

        stage.process(&mut ctx);
        assert!(!ctx.contains(keys::PERFORMANCE_WARNING));
        assert!(monitor.average_latency() >= 0.0);
    }
}
