//! Database health-check daemon for TCP load balancers.
//!
//! A load balancer connects, sends `GET <target> HTTP/1.0`, and reads back
//! `200 OK` or `503 Service Unavailable`. Consecutive failed probes move a
//! target from UP through DOWN to DEAD; crossing into DEAD runs the target's
//! fencing and failover commands exactly once.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::HadbConfig;
pub use health::{DbProber, Prober, StatusStore};
pub use lifecycle::Supervisor;
