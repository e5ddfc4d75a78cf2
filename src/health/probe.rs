//! Probe executor.
//!
//! # Responsibilities
//! - Open one connection to a target using its engine
//! - Confirm the connection is alive
//! - Release the connection on every path before returning
//!
//! # Design Decisions
//! - Every failure collapses into `Unreachable`; nothing propagates
//! - No retries; repeated failures are counted by the state machine
//! - Optional deadline; without one the driver's own timeouts apply

use std::future::Future;
use std::time::Duration;

use sqlx::mysql::MySqlConnectOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tokio::net::TcpStream;
use tokio::time;

use crate::config::{Engine, TargetConfig};
use crate::health::state::ProbeResult;

/// Connectivity check for a single target.
pub trait Prober: Send + Sync + 'static {
    fn check(&self, target: &TargetConfig) -> impl Future<Output = ProbeResult> + Send;
}

/// Production prober speaking each engine's protocol.
#[derive(Debug, Clone, Default)]
pub struct DbProber {
    timeout: Option<Duration>,
}

impl DbProber {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn connect(target: &TargetConfig) -> Result<(), sqlx::Error> {
        match target.engine {
            Engine::Postgres => {
                let mut options = PgConnectOptions::new()
                    .host(&target.host)
                    .port(target.port);
                if let Some(name) = &target.name {
                    options = options.database(name);
                }
                if let Some(username) = &target.username {
                    options = options.username(username);
                }
                if let Some(password) = &target.password {
                    options = options.password(password);
                }
                ping_and_close(options.connect().await?).await
            }
            Engine::Mysql => {
                let mut options = MySqlConnectOptions::new()
                    .host(&target.host)
                    .port(target.port);
                if let Some(name) = &target.name {
                    options = options.database(name);
                }
                if let Some(username) = &target.username {
                    options = options.username(username);
                }
                if let Some(password) = &target.password {
                    options = options.password(password);
                }
                ping_and_close(options.connect().await?).await
            }
            Engine::Tcp => {
                // Dropping the stream closes it.
                TcpStream::connect((target.host.as_str(), target.port)).await?;
                Ok(())
            }
        }
    }
}

async fn ping_and_close<C: Connection>(mut conn: C) -> Result<(), sqlx::Error> {
    let pinged = conn.ping().await;
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "Closing probe connection failed");
    }
    pinged
}

impl Prober for DbProber {
    async fn check(&self, target: &TargetConfig) -> ProbeResult {
        let attempt = Self::connect(target);
        let outcome = match self.timeout {
            Some(limit) => match time::timeout(limit, attempt).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        host = %target.host,
                        port = target.port,
                        timeout_ms = limit.as_millis() as u64,
                        "Probe timed out"
                    );
                    return ProbeResult::Unreachable;
                }
            },
            None => attempt.await,
        };

        match outcome {
            Ok(()) => ProbeResult::Reachable,
            Err(e) => {
                tracing::warn!(
                    engine = %target.engine,
                    host = %target.host,
                    port = target.port,
                    error = %e,
                    "Probe failed"
                );
                ProbeResult::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn tcp_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = TargetConfig::new(Engine::Tcp, "127.0.0.1", port);

        let result = DbProber::default().check(&target).await;
        assert_eq!(result, ProbeResult::Reachable);
    }

    #[tokio::test]
    async fn tcp_probe_to_closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = TargetConfig::new(Engine::Tcp, "127.0.0.1", port);

        let result = DbProber::new(Some(Duration::from_secs(2))).check(&target).await;
        assert_eq!(result, ProbeResult::Unreachable);
    }

    #[tokio::test]
    async fn postgres_probe_against_silent_peer_times_out() {
        // Accepts but never speaks the protocol.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let target = TargetConfig::new(Engine::Postgres, "127.0.0.1", port);

        let result = DbProber::new(Some(Duration::from_millis(200)))
            .check(&target)
            .await;
        assert_eq!(result, ProbeResult::Unreachable);
    }
}
