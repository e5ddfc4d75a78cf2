//! Pid file bookkeeping.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A pid file written at startup.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Replace any stale pid file at `path` with one holding this process id.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        match fs::remove_file(&path) {
            Ok(()) => tracing::info!(path = %path.display(), "Removed stale pid file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let mut file = fs::File::create(&path)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the pid file, logging rather than failing.
    pub fn remove(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not delete pid file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hadb.pid");
        fs::write(&path, "1\n2\n3\n").unwrap();

        let pid_file = PidFile::create(&path).unwrap();
        let contents = fs::read_to_string(pid_file.path()).unwrap();
        assert_eq!(contents, format!("{}\n", std::process::id()));

        pid_file.remove();
        assert!(!path.exists());
        // Second removal is quiet.
        pid_file.remove();
    }
}
