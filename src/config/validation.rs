//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker count, thresholds, ports)
//! - Reject target identifiers that are unsafe as status file names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HadbConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::IpAddr;

use crate::config::schema::HadbConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.ip_address `{0}` is not an IP address")]
    BindAddress(String),
    #[error("server.children must be at least 1")]
    NoWorkers,
    #[error("{0}: dead_limit must be at least 1")]
    DeadLimit(String),
    #[error("no targets configured")]
    NoTargets,
    #[error("target id `{0}` may only contain [A-Za-z0-9_.-] and must not start with '.'")]
    TargetId(String),
    #[error("targets.{0}: host must not be empty")]
    EmptyHost(String),
    #[error("targets.{0}: port must not be 0")]
    ZeroPort(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &HadbConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if server.ip_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindAddress(server.ip_address.clone()));
    }
    if server.children == 0 {
        errors.push(ValidationError::NoWorkers);
    }
    if server.dead_limit == 0 {
        errors.push(ValidationError::DeadLimit("server".to_string()));
    }
    if config.targets.is_empty() {
        errors.push(ValidationError::NoTargets);
    }

    for (id, target) in &config.targets {
        if !is_valid_target_id(id) {
            errors.push(ValidationError::TargetId(id.clone()));
        }
        if target.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost(id.clone()));
        }
        if target.port == 0 {
            errors.push(ValidationError::ZeroPort(id.clone()));
        }
        if target.dead_limit == Some(0) {
            errors.push(ValidationError::DeadLimit(format!("targets.{id}")));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Target ids double as status file names.
pub fn is_valid_target_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
