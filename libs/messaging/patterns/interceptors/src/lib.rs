//! # Interceptor Pipeline
//!
//! Ordered chain of stages every inbound message passes through before it is
//! dispatched. Each stage reads the shared message, writes verdicts into the
//! per-pass [`InterceptorContext`] and votes [`Verdict::Accept`] or
//! [`Verdict::Reject`]. The first rejection ends the pass.
//!
//! Default order:
//!
//! | stage | rejects | records |
//! |---|---|---|
//! | [`ValidationInterceptor`] | invalid header / order / quote | `validation=passed` or `error` |
//! | [`LoggingInterceptor`] | never | `log` |
//! | [`PerformanceInterceptor`] | never | `latency_us`, `performance_warning` |
//! | [`ThrottlingInterceptor`] | over the rate ceiling | `throttle_status` or `throttled` |
//!
//! ```rust
//! use interceptors::{keys, ChainSettings, InterceptorChain, InterceptorContext, Verdict};
//! use network::PerformanceMonitor;
//! use std::sync::Arc;
//! use types::{MarketData, Message};
//!
//! let monitor = Arc::new(PerformanceMonitor::new(1024));
//! let chain = InterceptorChain::standard(monitor, &ChainSettings::default());
//!
//! let crossed = Message::market_data(MarketData::new("AAPL", 151.00, 150.00, 100, 100));
//! let mut ctx = InterceptorContext::new(Arc::new(crossed));
//! assert_eq!(chain.process(&mut ctx), Verdict::Reject);
//! assert_eq!(ctx.get(keys::ERROR), Some("Bid >= Ask"));
//! ```

pub mod chain;
pub mod context;
pub mod stages;

pub use chain::{ChainSettings, Interceptor, InterceptorChain, InterceptorChainBuilder};
pub use context::{keys, InterceptorContext, Verdict};
pub use stages::{
    LoggingInterceptor, PerformanceInterceptor, ThrottlingInterceptor, ValidationInterceptor,
};
