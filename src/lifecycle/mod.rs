//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (supervisor.rs):
//!     Load config → Bind listener → Write pid file → Spawn workers
//!
//! Shutdown (supervisor.rs):
//!     Signal received → Abort workers → Close listener → Remove pid file
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds before workers start (traffic only when ready)
//! - Shutdown runs once no matter how many signals arrive

pub mod pidfile;
pub mod signals;
pub mod supervisor;

pub use supervisor::{Supervisor, SupervisorError, WorkerId};
