//! Per-connection probe pipeline.
//!
//! # Responsibilities
//! - Read the request line and resolve the target
//! - Run the probe, fold it into the target's status record
//! - Write the response and close the connection on every path
//!
//! # Design Decisions
//! - One connection = one probe = one response; no keep-alive
//! - Unknown or missing targets fail closed with 503 and touch nothing
//! - The target's store lock is held across read→decide→write only,
//!   never across the probe or the response write

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use crate::config::{HadbConfig, TargetConfig};
use crate::health::{
    remediation, transition, HealthState, HttpStatus, Prober, StatusRecord, StatusStore,
    StoreError, Transition,
};
use crate::net::connection::{ConnectionId, ConnectionState};
use crate::net::request;
use crate::net::response::ProbeResponse;
use crate::observability::metrics;

/// Drives accepted connections through probe → store → state machine → response.
pub struct Dispatcher<P> {
    config: Arc<HadbConfig>,
    store: Arc<StatusStore>,
    prober: P,
}

impl<P: Prober> Dispatcher<P> {
    pub fn new(config: Arc<HadbConfig>, store: Arc<StatusStore>, prober: P) -> Self {
        Self {
            config,
            store,
            prober,
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Serve one connection to completion. Never panics on I/O errors.
    pub async fn handle<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = ConnectionId::new();
        self.serve(stream)
            .instrument(tracing::debug_span!("probe", connection_id = %id))
            .await
    }

    async fn serve<S>(&self, mut stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        tracing::trace!(state = %ConnectionState::Accepted);

        let line = request::read_request_line(&mut stream).await;
        let response = self.respond_to(&line).await;

        if let Err(e) = stream.write_all(&response.to_bytes()).await {
            tracing::debug!(error = %e, "Failed to write response");
        } else {
            tracing::trace!(state = %ConnectionState::Responded, status = response.status.code());
        }

        if let Err(e) = stream.flush().await {
            tracing::debug!(error = %e, "Failed to flush response");
        }
        let _ = stream.shutdown().await;
        tracing::trace!(state = %ConnectionState::Closed);
    }

    /// Compute the response for a raw request line.
    pub async fn respond_to(&self, line: &str) -> ProbeResponse {
        let Some(target_id) = request::target_id(line) else {
            metrics::record_malformed_request();
            tracing::warn!(request = %line.trim_end(), "Malformed probe request");
            return ProbeResponse::new(HttpStatus::ServiceUnavailable, "Malformed probe request");
        };

        let Some(target) = self.config.target(target_id) else {
            metrics::record_malformed_request();
            tracing::warn!(target_id, "Probe for unknown target");
            return ProbeResponse::new(
                HttpStatus::ServiceUnavailable,
                format!("Unknown target `{target_id}`"),
            );
        };
        tracing::trace!(state = %ConnectionState::ParsedRequest, target_id);

        let outcome = self.probe(target_id, target).await;
        tracing::trace!(state = %ConnectionState::Probed, target_id);

        ProbeResponse::new(outcome.http_status, message(target_id, target, &outcome))
    }

    /// Probe `target` and fold the result into its status record.
    pub async fn probe(&self, target_id: &str, target: &TargetConfig) -> Transition {
        let result = self.prober.check(target).await;
        metrics::record_probe(target_id, result);

        let outcome = {
            let _guard = self.store.lock(target_id).await;

            let (current, writable) = match self.store.read(target_id).await {
                Ok(record) => (record, true),
                Err(e @ StoreError::Corrupt { .. }) => {
                    tracing::warn!(target_id, error = %e, "Replacing corrupt status record");
                    (StatusRecord::up(), true)
                }
                Err(e) => {
                    // Writing blind could overwrite a DEAD record we failed to see.
                    tracing::error!(target_id, error = %e, "Failed to read status record");
                    (StatusRecord::up(), false)
                }
            };

            let mut outcome = transition(&current, result, self.config.dead_limit_for(target));
            log_transition(target_id, &current, &outcome, result.is_reachable());

            if !writable && outcome.remediate {
                tracing::warn!(target_id, "Skipping remediation, stored status is unknown");
                outcome.remediate = false;
            }

            if writable && outcome.needs_persist() {
                if let Err(e) = self.store.write(target_id, &outcome.next).await {
                    tracing::error!(target_id, error = %e, "Failed to persist status record");
                }
            }
            outcome
        };

        metrics::record_state(target_id, outcome.next.state);
        if outcome.remediate {
            drop(remediation::spawn(target_id, target));
        }
        outcome
    }
}

fn log_transition(target_id: &str, current: &StatusRecord, outcome: &Transition, reachable: bool) {
    let next = &outcome.next;
    match (current.state, next.state) {
        (HealthState::Dead, _) => {
            tracing::debug!(
                target_id,
                probe = if reachable { "UP" } else { "DOWN" },
                "Target is DEAD"
            );
        }
        (_, HealthState::Dead) => {
            tracing::error!(target_id, failures = next.failures, "Target is DEAD");
        }
        (_, HealthState::Down) => {
            tracing::error!(target_id, failures = next.failures, "Target is DOWN");
        }
        (HealthState::Up, HealthState::Up) if !outcome.needs_persist() => {
            tracing::debug!(target_id, "Target is working hard");
        }
        (_, HealthState::Up) => {
            tracing::info!(target_id, "Target is back up");
        }
    }
}

fn message(target_id: &str, target: &TargetConfig, outcome: &Transition) -> String {
    match outcome.next.state {
        HealthState::Up => format!("{} on {target_id} is A-Okay!", target.engine),
        HealthState::Down => format!(
            "Uh-oh! {} on {target_id} did not respond ({} consecutive failures). :(",
            target.engine, outcome.next.failures
        ),
        HealthState::Dead => format!(
            "{} on {target_id} is DEAD after {} consecutive failures.",
            target.engine, outcome.next.failures
        ),
    }
}
