//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HadbConfig (validated, immutable)
//!     → shared via Arc to every worker
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup; changes require a restart
//! - All server fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any load error is fatal before the listener is bound

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{Engine, HadbConfig, ObservabilityConfig, ServerConfig, TargetConfig};

/// Config path used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hadb/hadb.toml";
