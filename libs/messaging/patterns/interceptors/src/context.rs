//! Per-message scratch record shared by every stage of one chain pass

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use types::Message;

/// Metadata keys written by the built-in stages
pub mod keys {
    pub const VALIDATION: &str = "validation";
    pub const ERROR: &str = "error";
    pub const LOG: &str = "log";
    pub const LATENCY_US: &str = "latency_us";
    pub const PERFORMANCE_WARNING: &str = "performance_warning";
    pub const THROTTLE_STATUS: &str = "throttle_status";
    pub const THROTTLED: &str = "throttled";
}

/// A stage's vote on whether the message continues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        self == Verdict::Accept
    }
}

#[derive(Debug, Clone)]
pub struct InterceptorContext {
    message: Arc<Message>,
    entered_at: Instant,
    exited_at: Option<Instant>,
    metadata: BTreeMap<&'static str, String>,
    rejected_by: Option<&'static str>,
}

impl InterceptorContext {
    /// Start a pass now
    pub fn new(message: Arc<Message>) -> Self {
        Self::entered_at(message, Instant::now())
    }

    /// Start a pass with an earlier entry time, typically when the bytes were
    /// read off the socket
    pub fn entered_at(message: Arc<Message>, entered_at: Instant) -> Self {
        Self {
            message,
            entered_at,
            exited_at: None,
            metadata: BTreeMap::new(),
            rejected_by: None,
        }
    }

    pub fn message(&self) -> &Arc<Message> {
        &self.message
    }

    pub fn entry_time(&self) -> Instant {
        self.entered_at
    }

    pub fn exit_time(&self) -> Option<Instant> {
        self.exited_at
    }

    /// Record the exit time; the latest stamp wins
    pub fn stamp_exit(&mut self) -> Instant {
        let now = Instant::now();
        self.exited_at = Some(now);
        now
    }

    /// Entry to exit, `None` until an exit has been stamped
    pub fn elapsed(&self) -> Option<Duration> {
        self.exited_at
            .map(|exit| exit.saturating_duration_since(self.entered_at))
    }

    pub fn latency_us(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_nanos() as f64 / 1_000.0)
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    /// Verdicts in key order
    pub fn metadata(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.metadata.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Name of the stage that stopped the chain, if any
    pub fn rejected_by(&self) -> Option<&'static str> {
        self.rejected_by
    }

    pub(crate) fn mark_rejected(&mut self, stage: &'static str) {
        self.rejected_by = Some(stage);
    }

    /// Reason recorded by the rejecting stage
    pub fn rejection_reason(&self) -> Option<&str> {
        self.get(keys::ERROR).or_else(|| self.get(keys::THROTTLED))
    }
}
