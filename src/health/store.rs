//! File-backed status records.
//!
//! # Responsibilities
//! - Persist one `{state, failures, timestamp}` record per target
//! - Create the default UP/0 record on first read
//! - Serialize read→decide→write per target inside this process
//!
//! # Design Decisions
//! - One file per target: `<status_dir>/<id>.status`, three lines
//! - Writes land in a uniquely named temp file then `rename`, so readers never
//!   see a torn record and concurrent writers never share a temp file
//! - Per-target async mutexes live in a `DashMap`; different targets never contend
//! - Separate daemons sharing a directory still race (last writer wins)

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::health::state::{HealthState, ParseStateError, StatusRecord};

const STATUS_EXTENSION: &str = "status";

/// Error type for status persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("status I/O on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt status record {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Durable per-target status storage shared by all workers.
#[derive(Debug)]
pub struct StatusStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StatusStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    /// Path of the record for `target_id`.
    pub fn path_for(&self, target_id: &str) -> PathBuf {
        self.dir.join(format!("{target_id}.{STATUS_EXTENSION}"))
    }

    /// Exclusive access to `target_id`'s record until the guard drops.
    pub async fn lock(&self, target_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(target_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Read the record without creating it.
    pub async fn load(&self, target_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let path = self.path_for(target_id);
        match fs::read_to_string(&path).await {
            Ok(content) => parse_record(&content)
                .map(Some)
                .map_err(|reason| StoreError::Corrupt { path, reason }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Read the record, persisting a default UP/0 record if none exists.
    pub async fn read(&self, target_id: &str) -> Result<StatusRecord, StoreError> {
        if let Some(record) = self.load(target_id).await? {
            return Ok(record);
        }
        let record = StatusRecord::up();
        self.write(target_id, &record).await?;
        Ok(record)
    }

    /// Replace the record for `target_id`.
    pub async fn write(&self, target_id: &str, record: &StatusRecord) -> Result<(), StoreError> {
        let path = self.path_for(target_id);
        let dir = self.dir.clone();
        let dest = path.clone();
        let content = render_record(record);

        tokio::task::spawn_blocking(move || replace_file(&dir, &dest, &content))
            .await
            .map_err(io::Error::other)
            .and_then(|written| written)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            path = %path.display(),
            state = %record.state,
            failures = record.failures,
            updated = %record.last_updated.to_rfc3339(),
            "Status updated"
        );
        Ok(())
    }
}

/// Write `content` to a fresh temp file in `dir` and rename it over `dest`.
fn replace_file(dir: &Path, dest: &Path, content: &str) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn render_record(record: &StatusRecord) -> String {
    format!(
        "{}\n{}\n{}\n",
        record.state,
        record.failures,
        record.last_updated.to_rfc3339()
    )
}

fn parse_record(content: &str) -> Result<StatusRecord, String> {
    let mut lines = content.lines();

    let state: HealthState = lines
        .next()
        .ok_or("empty record")?
        .parse()
        .map_err(|e: ParseStateError| e.to_string())?;

    let failures: u32 = lines
        .next()
        .ok_or("missing failure count")?
        .trim()
        .parse()
        .map_err(|e| format!("bad failure count: {e}"))?;

    // Older records may lack a parseable timestamp; treat them as just written.
    let last_updated = lines
        .next()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts.trim()).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(StatusRecord {
        state,
        failures,
        last_updated,
    })
}
