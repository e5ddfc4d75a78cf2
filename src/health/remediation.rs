//! External remediation commands.
//!
//! # Responsibilities
//! - Run a dead target's `stonith_cmd` then `failover_cmd` through the shell
//! - Log launch failures and non-zero exits; never fail the caller

use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::config::TargetConfig;
use crate::observability::metrics;

/// Run remediation for `target_id` on a detached task.
///
/// The returned handle resolves once every configured command has finished;
/// callers in the request path drop it.
pub fn spawn(target_id: &str, target: &TargetConfig) -> JoinHandle<()> {
    let target_id = target_id.to_string();
    metrics::record_remediation(&target_id);

    if !target.has_remediation() {
        tracing::warn!(target_id = %target_id, "Target is dead but no remediation is configured");
        return tokio::spawn(async {});
    }

    let commands: Vec<(&'static str, String)> = [
        ("stonith", target.stonith_cmd.clone()),
        ("failover", target.failover_cmd.clone()),
    ]
    .into_iter()
    .filter_map(|(kind, cmd)| cmd.map(|cmd| (kind, cmd)))
    .collect();

    tokio::spawn(async move {
        for (kind, cmd) in commands {
            tracing::error!(target_id = %target_id, kind, command = %cmd, "Running remediation");
            match run(&cmd).await {
                Ok(status) if status.success() => {
                    tracing::info!(target_id = %target_id, kind, "Remediation finished");
                }
                Ok(status) => {
                    tracing::warn!(target_id = %target_id, kind, %status, "Remediation exited unsuccessfully");
                }
                Err(e) => {
                    tracing::error!(target_id = %target_id, kind, error = %e, "Failed to launch remediation");
                }
            }
        }
    })
}

async fn run(cmd: &str) -> std::io::Result<ExitStatus> {
    Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Engine;

    #[tokio::test]
    async fn runs_stonith_before_failover() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("order");
        let mut target = TargetConfig::new(Engine::Tcp, "db", 1);
        target.stonith_cmd = Some(format!("echo stonith >> {}", log.display()));
        target.failover_cmd = Some(format!("echo failover >> {}", log.display()));

        spawn("db1", &target).await.unwrap();

        let written = std::fs::read_to_string(&log).unwrap();
        assert_eq!(written, "stonith\nfailover\n");
    }

    #[tokio::test]
    async fn failing_command_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let mut target = TargetConfig::new(Engine::Tcp, "db", 1);
        target.stonith_cmd = Some("exit 3".to_string());
        target.failover_cmd = Some(format!("touch {}", marker.display()));

        spawn("db1", &target).await.unwrap();

        assert!(marker.exists());
    }

    #[tokio::test]
    async fn nothing_configured_is_a_no_op() {
        let target = TargetConfig::new(Engine::Tcp, "db", 1);
        spawn("db1", &target).await.unwrap();
    }
}
