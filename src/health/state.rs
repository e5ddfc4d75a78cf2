//! Target health state machine.
//!
//! # States
//! - Up: target answered its last probe
//! - Down: target failed fewer than `dead_limit` consecutive probes
//! - Dead: target crossed `dead_limit`; remediation has been triggered
//!
//! # State Transitions
//! ```text
//! Up/Down → Down: probe fails, failures + 1 < dead_limit
//! Up/Down → Dead: probe fails, failures + 1 >= dead_limit (remediate once)
//! Up/Down → Up:   probe succeeds, failures reset to 0
//! Dead    → Dead: any probe; record left untouched
//! ```
//!
//! # Design Decisions
//! - Pure function: no I/O, the caller persists and remediates
//! - Dead is sticky; leaving it requires an operator reset
//! - Remediation fires only on the edge into Dead

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Classification of a monitored target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Up,
    Down,
    Dead,
}

impl HealthState {
    /// Token written to the status file.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Up => "UP",
            HealthState::Down => "DOWN",
            HealthState::Dead => "DEAD",
        }
    }

    /// Numeric encoding for the state gauge.
    pub fn as_gauge(&self) -> f64 {
        match self {
            HealthState::Up => 0.0,
            HealthState::Down => 1.0,
            HealthState::Dead => 2.0,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown state token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown health state `{0}`")]
pub struct ParseStateError(pub String);

impl FromStr for HealthState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "UP" => Ok(HealthState::Up),
            "DOWN" => Ok(HealthState::Down),
            "DEAD" => Ok(HealthState::Dead),
            other => Err(ParseStateError(other.to_string())),
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Reachable,
    Unreachable,
}

impl ProbeResult {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeResult::Reachable)
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeResult::Reachable => "reachable",
            ProbeResult::Unreachable => "unreachable",
        }
    }
}

/// Persisted status of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub state: HealthState,
    pub failures: u32,
    pub last_updated: DateTime<Utc>,
}

impl StatusRecord {
    /// Fresh record for a target never probed before.
    pub fn up() -> Self {
        Self {
            state: HealthState::Up,
            failures: 0,
            last_updated: Utc::now(),
        }
    }

    /// Same `{state, failures}` pair, ignoring the timestamp.
    pub fn same_status(&self, other: &StatusRecord) -> bool {
        self.state == other.state && self.failures == other.failures
    }
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self::up()
    }
}

/// HTTP status returned to the load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok,
    ServiceUnavailable,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        match self {
            HttpStatus::Ok => 200,
            HttpStatus::ServiceUnavailable => 503,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            HttpStatus::Ok => "OK",
            HttpStatus::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Outcome of feeding one probe into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: StatusRecord,
    pub http_status: HttpStatus,
    /// True only on the edge into `Dead`.
    pub remediate: bool,
    needs_persist: bool,
}

impl Transition {
    /// Whether `next` differs from the stored record and must be written.
    pub fn needs_persist(&self) -> bool {
        self.needs_persist
    }
}

/// Combine the stored record with a new probe result.
pub fn transition(current: &StatusRecord, probe: ProbeResult, dead_limit: u32) -> Transition {
    if current.state == HealthState::Dead {
        return Transition {
            next: current.clone(),
            http_status: HttpStatus::ServiceUnavailable,
            remediate: false,
            needs_persist: false,
        };
    }

    match probe {
        ProbeResult::Unreachable => {
            let failures = current.failures.saturating_add(1);
            let dead = failures >= dead_limit;
            Transition {
                next: StatusRecord {
                    state: if dead { HealthState::Dead } else { HealthState::Down },
                    failures,
                    last_updated: Utc::now(),
                },
                http_status: HttpStatus::ServiceUnavailable,
                remediate: dead,
                needs_persist: true,
            }
        }
        ProbeResult::Reachable => {
            let recovered = current.state != HealthState::Up || current.failures != 0;
            Transition {
                next: if recovered {
                    StatusRecord::up()
                } else {
                    current.clone()
                },
                http_status: HttpStatus::Ok,
                remediate: false,
                needs_persist: recovered,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ProbeResult::{Reachable as R, Unreachable as U};

    fn run(probes: &[ProbeResult], dead_limit: u32) -> Vec<Transition> {
        let mut record = StatusRecord::up();
        probes
            .iter()
            .map(|probe| {
                let t = transition(&record, *probe, dead_limit);
                record = t.next.clone();
                t
            })
            .collect()
    }

    fn summary(t: &Transition) -> (HealthState, u32, u16, bool) {
        (t.next.state, t.next.failures, t.http_status.code(), t.remediate)
    }

    #[test]
    fn three_failures_cross_into_dead() {
        let steps = run(&[U, U, U], 3);
        let got: Vec<_> = steps.iter().map(summary).collect();
        assert_eq!(
            got,
            vec![
                (HealthState::Down, 1, 503, false),
                (HealthState::Down, 2, 503, false),
                (HealthState::Dead, 3, 503, true),
            ]
        );
    }

    #[test]
    fn success_resets_failures() {
        let steps = run(&[U, U, R], 3);
        let got: Vec<_> = steps.iter().map(summary).collect();
        assert_eq!(
            got,
            vec![
                (HealthState::Down, 1, 503, false),
                (HealthState::Down, 2, 503, false),
                (HealthState::Up, 0, 200, false),
            ]
        );
        assert!(steps[2].needs_persist());
    }

    #[test]
    fn below_threshold_never_remediates() {
        for dead_limit in 1..12 {
            let probes = vec![U; dead_limit as usize - 1];
            for t in run(&probes, dead_limit) {
                assert_eq!(t.next.state, HealthState::Down);
                assert!(!t.remediate);
            }
        }
    }

    #[test]
    fn dead_is_sticky_and_quiet() {
        let steps = run(&[U, U, U, U, R, U], 2);
        assert_eq!(steps.iter().filter(|t| t.remediate).count(), 1);
        for t in &steps[1..] {
            assert_eq!(t.next.state, HealthState::Dead);
            assert_eq!(t.next.failures, 2);
            assert_eq!(t.http_status, HttpStatus::ServiceUnavailable);
        }
        for t in &steps[2..] {
            assert!(!t.needs_persist());
            assert!(!t.remediate);
        }
    }

    #[test]
    fn dead_record_is_returned_unchanged() {
        let dead = StatusRecord {
            state: HealthState::Dead,
            failures: 7,
            last_updated: Utc::now(),
        };
        let t = transition(&dead, U, 3);
        assert_eq!(t.next, dead);
    }

    #[test]
    fn steady_up_skips_write() {
        let t = transition(&StatusRecord::up(), R, 3);
        assert_eq!(t.http_status, HttpStatus::Ok);
        assert!(!t.needs_persist());
    }

    #[test]
    fn threshold_of_one_kills_on_first_failure() {
        let t = transition(&StatusRecord::up(), U, 1);
        assert_eq!(t.next.state, HealthState::Dead);
        assert!(t.remediate);
    }

    #[test]
    fn state_tokens_round_trip() {
        for state in [HealthState::Up, HealthState::Down, HealthState::Dead] {
            assert_eq!(state.as_str().parse::<HealthState>(), Ok(state));
        }
        assert!("ALIVE".parse::<HealthState>().is_err());
    }
}
