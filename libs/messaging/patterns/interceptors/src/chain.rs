//! Interceptor trait and the ordered chain

use crate::context::{InterceptorContext, Verdict};
use crate::stages::{
    LoggingInterceptor, PerformanceInterceptor, ThrottlingInterceptor, ValidationInterceptor,
    DEFAULT_LATENCY_TARGET_US,
};
use network::PerformanceMonitor;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// One pipeline stage.
///
/// Stages are shared across worker threads and receive `&self`; any mutable
/// state must carry its own synchronization.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(&self, context: &mut InterceptorContext) -> Verdict;
}

/// Settings for [`InterceptorChain::standard`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSettings {
    pub throttle_max_per_second: u64,
    pub latency_target_us: f64,
    pub enable_logging: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            throttle_max_per_second: 1_000_000,
            latency_target_us: DEFAULT_LATENCY_TARGET_US,
            enable_logging: true,
        }
    }
}

/// Immutable, ordered list of stages.
///
/// Built once with [`InterceptorChainBuilder`]; traversal takes no locks, so a
/// single chain behind an `Arc` serves every worker thread.
pub struct InterceptorChain {
    stages: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn builder() -> InterceptorChainBuilder {
        InterceptorChainBuilder::default()
    }

    /// Validation, logging (optional), performance, throttle
    pub fn standard(monitor: Arc<PerformanceMonitor>, settings: &ChainSettings) -> Self {
        let mut builder = Self::builder().stage(ValidationInterceptor::new());
        if settings.enable_logging {
            builder = builder.stage(LoggingInterceptor::new());
        }
        let chain = builder
            .stage(PerformanceInterceptor::with_target(monitor, settings.latency_target_us))
            .stage(ThrottlingInterceptor::new(settings.throttle_max_per_second))
            .build();
        info!(stages = ?chain.stage_names(), "Interceptor chain built");
        chain
    }

    /// Run every stage in order, stopping at the first rejection
    pub fn process(&self, context: &mut InterceptorContext) -> Verdict {
        for stage in &self.stages {
            if stage.process(context) == Verdict::Reject {
                context.mark_rejected(stage.name());
                return Verdict::Reject;
            }
        }
        Verdict::Accept
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[derive(Default)]
pub struct InterceptorChainBuilder {
    stages: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChainBuilder {
    /// Append a stage
    pub fn stage(mut self, stage: impl Interceptor + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append a stage that is also held elsewhere (e.g. to read its counters)
    pub fn shared_stage(mut self, stage: Arc<dyn Interceptor>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Drop every stage with this name
    pub fn remove(mut self, name: &str) -> Self {
        self.stages.retain(|s| s.name() != name);
        self
    }

    pub fn build(self) -> InterceptorChain {
        InterceptorChain {
            stages: self.stages,
        }
    }
}
