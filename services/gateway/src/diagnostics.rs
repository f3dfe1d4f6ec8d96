//! Startup self-check and in-process pipeline benchmark

use interceptors::{ChainSettings, InterceptorChain, InterceptorContext, Verdict};
use network::{LatencySnapshot, PerformanceMonitor};
use std::sync::Arc;
use std::time::Instant;
use types::{MarketData, Message, Order, Side};

/// Outcome of one sample message through the chain
#[derive(Debug, Clone)]
pub struct SelfTestResult {
    pub label: &'static str,
    pub verdict: Verdict,
    pub metadata: Vec<(&'static str, String)>,
}

/// Run a valid order, a valid quote and a crossed quote through `chain`
pub fn self_test(chain: &InterceptorChain) -> Vec<SelfTestResult> {
    let samples = [
        ("order", Message::order_new(Order::new(12345, "AAPL", 150.50, 100, Side::Buy))),
        ("quote", Message::market_data(MarketData::new("AAPL", 150.45, 150.55, 1000, 1000))),
        ("crossed quote", Message::market_data(MarketData::new("AAPL", 151.00, 150.00, 100, 100))),
    ];

    samples
        .into_iter()
        .map(|(label, message)| {
            let mut context = InterceptorContext::new(Arc::new(message));
            let verdict = chain.process(&mut context);
            SelfTestResult {
                label,
                verdict,
                metadata: context.metadata().map(|(k, v)| (k, v.to_string())).collect(),
            }
        })
        .collect()
}

/// Time `iterations` construct-encode-decode-chain passes in-process.
///
/// Samples are whole-pass wall time per message, recorded into a private
/// monitor.
pub fn benchmark(iterations: usize, settings: &ChainSettings) -> LatencySnapshot {
    let chain_monitor = Arc::new(PerformanceMonitor::new(iterations.max(1)));
    let chain = InterceptorChain::standard(chain_monitor, &ChainSettings {
        enable_logging: false,
        ..settings.clone()
    });
    let results = PerformanceMonitor::new(iterations.max(1));

    for i in 0..iterations {
        let started = Instant::now();
        let message = Message::order_new(Order::new(i as u64 + 1, "AAPL", 150.50, 100, Side::Buy));
        let decoded = codec::encode(&message)
            .and_then(|bytes| codec::decode(&bytes))
            .map(Arc::new);
        if let Ok(decoded) = decoded {
            let mut context = InterceptorContext::entered_at(decoded, started);
            chain.process(&mut context);
        }
        results.record_latency(started.elapsed().as_nanos() as f64 / 1_000.0);
        results.record_message();
    }
    results.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_test_verdicts() {
        let chain = InterceptorChain::standard(
            Arc::new(PerformanceMonitor::new(16)),
            &ChainSettings::default(),
        );
        let results = self_test(&chain);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].verdict, Verdict::Accept);
        assert_eq!(results[1].verdict, Verdict::Accept);
        assert_eq!(results[2].verdict, Verdict::Reject);
        assert!(results[2]
            .metadata
            .iter()
            .any(|(k, v)| *k == "error" && v == "Bid >= Ask"));
    }

    #[test]
    fn test_benchmark_collects_every_iteration() {
        let snapshot = benchmark(200, &ChainSettings::default());
        assert_eq!(snapshot.samples, 200);
        assert_eq!(snapshot.messages_total, 200);
        assert!(snapshot.average_us > 0.0);
    }
}
