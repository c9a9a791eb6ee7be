//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{NodeId, OrgNode};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Rename/move a file.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Persistence collaborator: one named record holding the serialized chart.
pub trait SnapshotStore: Send + Sync {
    /// Read the record. `Ok(None)` if nothing has been saved yet.
    fn load(&self) -> io::Result<Option<String>>;

    /// Overwrite the record.
    fn save(&self, record: &str) -> io::Result<()>;

    /// Delete the record. Clearing an absent record is not an error.
    fn clear(&self) -> io::Result<()>;
}

/// Lazy-load collaborator: supplies a node's children on demand.
#[async_trait]
pub trait ChildLoader: Send + Sync {
    async fn fetch_children(&self, parent: &NodeId) -> io::Result<Vec<OrgNode>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Record stored as a JSON file.
///
/// Saves go to a temporary sibling first and are renamed over the target,
/// so readers never see a half-written record.
pub struct FileSnapshotStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> io::Result<Option<String>> {
        if !self.fs.exists(&self.path) {
            return Ok(None);
        }
        self.fs.read_to_string(&self.path).map(Some)
    }

    fn save(&self, record: &str) -> io::Result<()> {
        debug!("save: path={}", self.path.display());
        self.fs.ensure_parent(&self.path)?;
        let staging = self.staging_path();
        self.fs.write(&staging, record)?;
        self.fs.rename(&staging, &self.path)
    }

    fn clear(&self) -> io::Result<()> {
        if self.fs.exists(&self.path) {
            self.fs.remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Record kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    record: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record.
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(record.into())),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, record: &str) -> io::Result<()> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Loader for charts without a people directory: nobody has hidden reports.
#[derive(Debug, Default)]
pub struct EmptyChildLoader;

#[async_trait]
impl ChildLoader for EmptyChildLoader {
    async fn fetch_children(&self, _parent: &NodeId) -> io::Result<Vec<OrgNode>> {
        Ok(Vec::new())
    }
}

/// Loader backed by a JSON directory file: `{ "<parentId>": [OrgNode, ...] }`.
///
/// The file is re-read on every fetch; `latency` simulates a remote lookup.
pub struct DirectoryChildLoader {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    latency: Duration,
}

impl DirectoryChildLoader {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>, latency: Duration) -> Self {
        Self {
            fs,
            path: path.into(),
            latency,
        }
    }
}

#[async_trait]
impl ChildLoader for DirectoryChildLoader {
    async fn fetch_children(&self, parent: &NodeId) -> io::Result<Vec<OrgNode>> {
        debug!("fetch_children: parent={} dir={}", parent, self.path.display());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let content = self.fs.read_to_string(&self.path)?;
        let mut directory: HashMap<String, Vec<OrgNode>> = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(directory.remove(parent.as_str()).unwrap_or_default())
    }
}
