//! Connection identity and lifecycle states.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Name the stages a probe connection passes through

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Stage of a probe connection.
///
/// ```text
/// Accepted → ParsedRequest → Probed → Responded → Closed
///        ╰──────────────────────────────────────────╯ (read/write error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Returned by `accept`.
    Accepted,
    /// Request line read and target resolved (or found missing).
    ParsedRequest,
    /// Probe executed and status record updated.
    Probed,
    /// Response written.
    Responded,
    /// Socket shut down.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Accepted => "accepted",
            ConnectionState::ParsedRequest => "parsed-request",
            ConnectionState::Probed => "probed",
            ConnectionState::Responded => "responded",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
