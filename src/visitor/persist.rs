//! Durable load/save of the visitor log.
//!
//! Writes go through a uniquely named temp file next to the state file. It is
//! fsynced and then renamed over the state file, so a crash mid-write leaves
//! the previous state in place.

use crate::error::{Result, VisitorError};
use crate::visitor::record::VisitorMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

/// Backing store for the visitor log.
pub trait VisitorPersistence: Send + Sync {
    /// Read the full visitor log. A missing backing store yields an empty map.
    ///
    /// # Errors
    /// `CorruptState` when data exists but cannot be parsed, `Io` when it
    /// cannot be read.
    fn load(&self) -> Result<VisitorMap>;

    /// Replace the persisted log with `visitors`.
    ///
    /// When `abort` is cancelled before the new state is installed the write
    /// is dropped and the previous state stays authoritative.
    fn save(&self, visitors: &VisitorMap, abort: &CancellationToken) -> Result<()>;
}

/// JSON file backend (`visitors.json`).
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl VisitorPersistence for JsonFilePersistence {
    fn load(&self) -> Result<VisitorMap> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VisitorMap::new());
            }
            Err(e) => {
                return Err(VisitorError::Io(format!(
                    "cannot read '{}': {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            VisitorError::CorruptState(format!("cannot parse '{}': {e}", self.path.display()))
        })
    }

    fn save(&self, visitors: &VisitorMap, abort: &CancellationToken) -> Result<()> {
        let dir = self.state_dir();
        std::fs::create_dir_all(dir).map_err(|e| {
            VisitorError::Io(format!(
                "cannot create state directory '{}': {e}",
                dir.display()
            ))
        })?;

        let json = serde_json::to_vec_pretty(visitors)
            .map_err(|e| VisitorError::Io(format!("cannot serialize visitor log: {e}")))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
            VisitorError::Io(format!("cannot create temp file in '{}': {e}", dir.display()))
        })?;
        tmp.write_all(&json)
            .map_err(|e| VisitorError::Io(format!("cannot write temp file: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| VisitorError::Io(format!("cannot sync temp file: {e}")))?;

        // Dropping `tmp` removes it.
        if abort.is_cancelled() {
            return Err(VisitorError::Io("save abandoned after timeout".to_owned()));
        }

        tmp.persist(&self.path).map_err(|e| {
            VisitorError::Io(format!(
                "cannot rename '{}' to '{}': {}",
                e.file.path().display(),
                self.path.display(),
                e.error
            ))
        })?;
        Ok(())
    }
}
