//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (shared socket, SO_REUSEADDR, backlog 10)
//!     → request.rs (first line, second token = target id)
//!     → dispatcher.rs (probe → status store → state machine)
//!     → response.rs (status line, headers, body)
//!
//! Connection States (connection.rs):
//!     Accepted → ParsedRequest → Probed → Responded → Closed
//! ```
//!
//! # Design Decisions
//! - One probe per connection; the socket is closed on every exit path
//! - No HTTP parsing beyond the request line

pub mod connection;
pub mod dispatcher;
pub mod listener;
pub mod request;
pub mod response;

pub use dispatcher::Dispatcher;
