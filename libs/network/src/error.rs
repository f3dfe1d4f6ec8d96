//! Transport Error Types
//!
//! Error handling for listener setup, readiness registration, socket tuning
//! and worker threads. Fatal variants abort startup; the rest are logged and
//! cost at most one connection.

use codec::ProtocolError;
use std::net::SocketAddr;
use thiserror::Error;

/// Main transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Listening socket could not be created, bound or put into listen mode
    #[error("Bind error on {addr}: {operation} failed: {source}")]
    Bind {
        addr: SocketAddr,
        operation: &'static str,
        source: nix::Error,
    },

    /// Readiness mechanism failure
    #[error("Epoll error during {operation}: {source}")]
    Epoll {
        operation: &'static str,
        source: nix::Error,
    },

    /// Low-latency socket option could not be applied
    #[error("Socket option {option} failed: {source}")]
    SocketOption {
        option: &'static str,
        source: nix::Error,
    },

    /// Generic I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// CPU pinning failed
    #[error("Affinity error: cannot pin to core {core}: {source}")]
    Affinity { core: usize, source: nix::Error },

    /// Thread could not be spawned
    #[error("Failed to spawn thread '{name}': {source}")]
    ThreadSpawn {
        name: String,
        source: std::io::Error,
    },

    /// Malformed bytes on a connection
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Operation not valid in the server's current lifecycle state
    #[error("Invalid server state: {message}")]
    State { message: String },
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    pub fn bind(addr: SocketAddr, operation: &'static str, source: nix::Error) -> Self {
        Self::Bind {
            addr,
            operation,
            source,
        }
    }

    pub fn epoll(operation: &'static str, source: nix::Error) -> Self {
        Self::Epoll { operation, source }
    }

    pub fn socket_option(option: &'static str, source: nix::Error) -> Self {
        Self::SocketOption { option, source }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }

    pub fn thread_spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::ThreadSpawn {
            name: name.into(),
            source,
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Errors that must abort startup rather than cost a single connection
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::Bind { .. }
                | TransportError::Epoll { .. }
                | TransportError::Configuration { .. }
                | TransportError::ThreadSpawn { .. }
        )
    }

    /// Short label for log fields
    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Bind { .. } => "bind",
            TransportError::Epoll { .. } => "epoll",
            TransportError::SocketOption { .. } => "socket_option",
            TransportError::Io { .. } => "io",
            TransportError::Configuration { .. } => "configuration",
            TransportError::Affinity { .. } => "affinity",
            TransportError::ThreadSpawn { .. } => "thread_spawn",
            TransportError::Protocol(_) => "protocol",
            TransportError::State { .. } => "state",
        }
    }
}
