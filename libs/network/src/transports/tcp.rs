//! TCP Socket Setup
//!
//! Listener construction and per-connection tuning for the low-latency path.
//! The listener is built through raw socket calls so address reuse can be set
//! before `bind`, then handed to `std::net::TcpListener` for ownership.

use crate::{Result, TransportError};
use nix::sys::socket::{
    bind, listen, setsockopt, socket, sockopt, AddressFamily, Backlog, SockFlag, SockType,
    SockaddrStorage,
};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use tracing::{debug, info};

/// Create a non-blocking, address-reusing listener bound to `addr`
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let family = if addr.is_ipv4() {
        AddressFamily::Inet
    } else {
        AddressFamily::Inet6
    };

    let fd = socket(
        family,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
        None,
    )
    .map_err(|e| TransportError::bind(addr, "socket", e))?;

    setsockopt(&fd, sockopt::ReuseAddr, &true)
        .map_err(|e| TransportError::bind(addr, "SO_REUSEADDR", e))?;

    bind(fd.as_raw_fd(), &SockaddrStorage::from(addr))
        .map_err(|e| TransportError::bind(addr, "bind", e))?;

    listen(&fd, Backlog::MAXCONN).map_err(|e| TransportError::bind(addr, "listen", e))?;

    let listener = TcpListener::from(fd);
    info!(
        addr = %listener.local_addr().map_err(|e| TransportError::io("local_addr", e))?,
        "TCP listener bound"
    );
    Ok(listener)
}

/// Socket tuning applied to every accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketTuning {
    /// SO_SNDBUF and SO_RCVBUF in bytes
    pub buffer_bytes: usize,
}

impl Default for SocketTuning {
    fn default() -> Self {
        Self {
            buffer_bytes: 64 * 1024,
        }
    }
}

/// Disable Nagle, enable address reuse, size kernel buffers, go non-blocking
pub fn configure_stream(stream: &TcpStream, tuning: SocketTuning) -> Result<()> {
    stream
        .set_nonblocking(true)
        .map_err(|e| TransportError::io("set_nonblocking", e))?;
    setsockopt(stream, sockopt::TcpNoDelay, &true)
        .map_err(|e| TransportError::socket_option("TCP_NODELAY", e))?;
    setsockopt(stream, sockopt::ReuseAddr, &true)
        .map_err(|e| TransportError::socket_option("SO_REUSEADDR", e))?;
    setsockopt(stream, sockopt::SndBuf, &tuning.buffer_bytes)
        .map_err(|e| TransportError::socket_option("SO_SNDBUF", e))?;
    setsockopt(stream, sockopt::RcvBuf, &tuning.buffer_bytes)
        .map_err(|e| TransportError::socket_option("SO_RCVBUF", e))?;

    debug!(fd = stream.as_raw_fd(), buffer_bytes = tuning.buffer_bytes, "Socket tuned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::socket::getsockopt;

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(getsockopt(&listener, sockopt::ReuseAddr).unwrap());
    }

    #[test]
    fn test_bind_conflict_is_fatal() {
        let first = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let taken = first.local_addr().unwrap();
        let err = bind_listener(taken).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.category(), "bind");
    }

    #[test]
    fn test_configure_accepted_stream() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).unwrap();

        listener.set_nonblocking(false).unwrap();
        let (accepted, _) = listener.accept().unwrap();
        configure_stream(&accepted, SocketTuning::default()).unwrap();

        assert!(accepted.nodelay().unwrap());
        assert!(getsockopt(&accepted, sockopt::TcpNoDelay).unwrap());
        // Kernel doubles the requested size for bookkeeping
        assert!(getsockopt(&accepted, sockopt::RcvBuf).unwrap() >= 64 * 1024);
    }
}
