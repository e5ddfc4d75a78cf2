//! Worker pool supervision.
//!
//! # Responsibilities
//! - Bind the shared listener and write the pid file
//! - Spawn a fixed pool of workers that accept independently
//! - Stop every worker and release the socket exactly once
//!
//! # Design Decisions
//! - A worker is a task with its own sequential accept loop; a hung probe
//!   stalls only that worker
//! - Worker handles are owned here, not in process-wide state
//! - Shutdown aborts workers, in-flight probes included, instead of draining them

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::HadbConfig;
use crate::health::{Prober, StatusStore};
use crate::lifecycle::pidfile::PidFile;
use crate::net::dispatcher::Dispatcher;
use crate::net::listener::{self, ListenerError};

/// Pause after a failed `accept` so persistent errors (e.g. EMFILE) don't spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Error type for supervisor startup.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("pid file: {0}")]
    PidFile(#[source] std::io::Error),
}

/// Identity of a pool worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(usize);

impl WorkerId {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

struct Worker {
    id: WorkerId,
    handle: JoinHandle<()>,
}

/// Owns the listener, the worker pool and the pid file.
pub struct Supervisor {
    listener: Option<Arc<TcpListener>>,
    local_addr: SocketAddr,
    workers: Vec<Worker>,
    stopped: bool,
    pid_file: Option<PidFile>,
    remove_pid_on_exit: bool,
}

impl Supervisor {
    /// Bind, write the pid file and spawn `server.children` workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<P: Prober>(config: Arc<HadbConfig>, prober: P) -> Result<Self, SupervisorError> {
        let server = &config.server;
        let listener = Arc::new(listener::bind(server)?);
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
        let pid_file = PidFile::create(&server.pid_file).map_err(SupervisorError::PidFile)?;

        let store = Arc::new(StatusStore::new(&server.status_dir));
        let dispatcher = Arc::new(Dispatcher::new(config.clone(), store, prober));

        let workers = (0..server.children)
            .map(|n| {
                let id = WorkerId(n);
                let handle = tokio::spawn(run_worker(id, listener.clone(), dispatcher.clone()));
                Worker { id, handle }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            address = %local_addr,
            workers = workers.len(),
            pid = std::process::id(),
            pid_file = %pid_file.path().display(),
            status_dir = %server.status_dir.display(),
            "Health-check daemon started"
        );

        Ok(Self {
            listener: Some(listener),
            local_addr,
            workers,
            stopped: false,
            pid_file: Some(pid_file),
            remove_pid_on_exit: server.remove_pid_on_exit,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Identities of workers still tracked.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(|w| w.id).collect()
    }

    /// Stop every worker and close the listener.
    ///
    /// Returns false when shutdown already ran; repeat calls do nothing.
    pub fn shutdown(&mut self) -> bool {
        if std::mem::replace(&mut self.stopped, true) {
            return false;
        }
        tracing::info!("Shutting down health-check daemon");

        for worker in self.workers.drain(..) {
            worker.handle.abort();
            tracing::info!(worker = %worker.id, "Stopped worker");
        }

        // Aborted workers release their clones as they are dropped.
        self.listener.take();

        if let Some(pid_file) = self.pid_file.take() {
            if self.remove_pid_on_exit {
                pid_file.remove();
            }
        }
        true
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker<P: Prober>(
    id: WorkerId,
    listener: Arc<TcpListener>,
    dispatcher: Arc<Dispatcher<P>>,
) {
    tracing::debug!(worker = %id, "Worker accepting");
    // Runs until the supervisor aborts the task.
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::debug!(worker = %id, peer_addr = %peer, "Connection accepted");
                dispatcher.handle(stream).await;
            }
            Err(e) => {
                tracing::warn!(worker = %id, error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}
