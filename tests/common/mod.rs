//! Shared utilities for integration tests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hadb::config::{Engine, HadbConfig, TargetConfig};
use hadb::health::ProbeResult;
use hadb::Prober;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Prober that replays a script of results, then repeats `fallback`.
#[allow(dead_code)]
#[derive(Clone)]
pub struct ScriptedProber {
    script: Arc<Mutex<VecDeque<ProbeResult>>>,
    fallback: ProbeResult,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl ScriptedProber {
    pub fn new(script: &[ProbeResult], fallback: ProbeResult) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.iter().copied().collect())),
            fallback,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every probe takes at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Prober for ScriptedProber {
    async fn check(&self, _target: &TargetConfig) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        result
    }
}

/// Loopback config on an ephemeral port with scratch pid/status paths.
pub fn test_config(dir: &Path, children: usize) -> HadbConfig {
    let mut config = HadbConfig::default();
    config.server.ip_address = "127.0.0.1".into();
    config.server.port = 0;
    config.server.children = children;
    config.server.pid_file = dir.join("hadb.pid");
    config.server.status_dir = dir.join("status");
    config
}

/// A `tcp` target with the given dead limit.
pub fn tcp_target(port: u16, dead_limit: u32) -> TargetConfig {
    let mut target = TargetConfig::new(Engine::Tcp, "127.0.0.1", port);
    target.dead_limit = Some(dead_limit);
    target
}

/// Send one raw request line and return the full response.
pub async fn send(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut response = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .expect("response timed out")
        .unwrap();
    response
}

/// Probe `target` and return the status line.
pub async fn probe(addr: SocketAddr, target: &str) -> String {
    let response = send(addr, format!("GET {target} HTTP/1.0\r\n\r\n").as_bytes()).await;
    response.lines().next().unwrap_or_default().to_string()
}

/// Read `<status_dir>/<id>.status` as `(state, failures)`.
pub fn status_of(dir: &Path, id: &str) -> Option<(String, u32)> {
    let text = std::fs::read_to_string(dir.join("status").join(format!("{id}.status"))).ok()?;
    let mut lines = text.lines();
    let state = lines.next()?.to_string();
    let failures = lines.next()?.parse().ok()?;
    Some((state, failures))
}
