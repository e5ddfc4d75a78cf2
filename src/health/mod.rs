//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Probe request for target T:
//!     → probe.rs (connect, ping, close → Reachable | Unreachable)
//!     → store.rs (lock T, read T's record)
//!     → state.rs (current record + probe → next record, HTTP status, remediate?)
//!     → store.rs (write T's record if it changed, unlock)
//!     → remediation.rs (on the edge into Dead only)
//! ```
//!
//! # Design Decisions
//! - All cross-probe state lives in the status store, never in a worker
//! - State transitions require consecutive failures
//! - Health state is per-target

pub mod probe;
pub mod remediation;
pub mod state;
pub mod store;

pub use probe::{DbProber, Prober};
pub use state::{transition, HealthState, HttpStatus, ProbeResult, StatusRecord, Transition};
pub use store::{StatusStore, StoreError};
