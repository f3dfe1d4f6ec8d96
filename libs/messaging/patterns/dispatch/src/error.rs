//! Dispatch Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Service '{name}' is already registered")]
    DuplicateService { name: String },

    #[error("Service '{name}' is not registered")]
    UnknownService { name: String },

    /// Queue at capacity; the message was not enqueued
    #[error("Dispatch queue full ({capacity} messages), dropping message for '{service}'")]
    QueueFull { service: String, capacity: usize },

    #[error("Dispatch router is not running")]
    RouterStopped,

    #[error("Service '{name}' failed to start: {reason}")]
    ServiceStart { name: String, reason: String },

    #[error("Failed to spawn thread '{name}': {source}")]
    ThreadSpawn {
        name: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateService { name: name.into() }
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownService { name: name.into() }
    }

    pub fn queue_full(service: impl Into<String>, capacity: usize) -> Self {
        Self::QueueFull {
            service: service.into(),
            capacity,
        }
    }

    pub fn service_start(name: impl Into<String>, reason: &impl std::fmt::Display) -> Self {
        Self::ServiceStart {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn thread_spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::ThreadSpawn {
            name: name.into(),
            source,
        }
    }

    /// The message was dropped but the caller may carry on
    pub fn is_drop(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::RouterStopped)
    }
}
