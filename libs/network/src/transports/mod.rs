//! Transport Layer
//!
//! Socket construction and tuning. Connection lifecycle lives in
//! [`crate::server`].

pub mod tcp;

pub use tcp::{bind_listener, configure_stream, SocketTuning};
