/// Temporary storage for produced media files.
///
/// A single directory holds every file a request produces. Files are owned by
/// a [`TempFile`] guard while a request is in flight and deleted when the
/// guard drops; anything that escapes is reclaimed by the periodic sweep.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::SweepReport;

/// Owner of the shared temp directory.
#[derive(Debug, Clone)]
pub struct TempStorage {
    dir: PathBuf,
}

impl TempStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory (and parents) if missing. Idempotent.
    pub async fn ensure_directory(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Fresh random filename component for one request.
    pub fn new_job_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Guard for `<dir>/<job_id><suffix>`. The file itself is created by
    /// whoever writes to the path.
    pub fn temp_file(&self, job_id: &str, suffix: &str) -> TempFile {
        TempFile::new(self.dir.join(format!("{}{}", job_id, suffix)))
    }

    /// Delete every regular file (or symlink to one) whose last modification
    /// is older than `retention`. Per-entry failures are logged and counted; they never
    /// abort the pass.
    pub async fn sweep(&self, retention: Duration) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read temp directory {}: {}", self.dir.display(), e);
                return report;
            }
        };

        let now = SystemTime::now();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error listing temp directory {}: {}", self.dir.display(), e);
                    report.failed += 1;
                    break;
                }
            };
            let path = entry.path();

            // Follows symlinks: a link to a stale file is judged by its target
            // and the link itself is what gets unlinked.
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Cannot stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(t) => t,
                Err(e) => {
                    warn!("No modification time for {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            // Future mtimes yield Err here and count as fresh.
            let expired = now
                .duration_since(modified)
                .map(|age| age > retention)
                .unwrap_or(false);
            if !expired {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Swept stale temp file {}", path.display());
                    report.removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to delete stale temp file {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Run [`TempStorage::sweep`] every `period` for the lifetime of the process.
/// The first pass happens one period after the call.
pub fn spawn_sweeper(storage: Arc<TempStorage>, period: Duration, retention: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        loop {
            interval.tick().await;
            let report = storage.sweep(retention).await;
            if report.removed > 0 || report.failed > 0 {
                info!(
                    "Temp sweep removed {} file(s), {} failure(s)",
                    report.removed, report.failed
                );
            }
        }
    })
}

/// A file in the temp directory owned by the current request.
///
/// Dropping the guard deletes the file; a file that was never created or was
/// already swept is not an error.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, e.g. `3f2a..e1.mp3`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Keep the file on disk and hand responsibility to the sweep.
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Delete the file now instead of at drop.
    pub async fn remove(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed temp file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Error deleting temp file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Blocking unlink on the current worker thread; a single syscall.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temp file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Error deleting temp file {}: {}", self.path.display(), e),
        }
    }
}
