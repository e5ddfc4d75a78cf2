//! TCP listener shared by the worker pool.
//!
//! # Responsibilities
//! - Bind to the configured address with `SO_REUSEADDR`
//! - Listen with a small fixed backlog
//! - Hand one listener to every worker, which accept on it independently

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket};

use crate::config::ServerConfig;

/// Pending-connection backlog for the listening socket.
pub const LISTEN_BACKLOG: u32 = 10;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Configured address did not parse.
    Address(String),
    /// Failed to create, configure or bind the socket.
    Bind(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(addr) => write!(f, "Invalid bind address: {}", addr),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Bind the probe listener described by `config`.
pub fn bind(config: &ServerConfig) -> Result<TcpListener, ListenerError> {
    let raw = config.bind_address();
    let addr: SocketAddr = raw.parse().map_err(|_| ListenerError::Address(raw))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(ListenerError::Bind)?;

    // Restarts must not wait out sockets lingering in TIME_WAIT.
    socket.set_reuseaddr(true).map_err(ListenerError::Bind)?;
    socket.bind(addr).map_err(ListenerError::Bind)?;
    let listener = socket.listen(LISTEN_BACKLOG).map_err(ListenerError::Bind)?;

    tracing::info!(
        address = %listener.local_addr().map_err(ListenerError::Bind)?,
        backlog = LISTEN_BACKLOG,
        "Listener bound"
    );

    Ok(listener)
}
