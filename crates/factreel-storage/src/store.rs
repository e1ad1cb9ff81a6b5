//! Artifact store over one working directory.
//!
//! Files are named `{kind}_{id}.{ext}`; the file's modification time is its
//! creation time. No index is kept: lookups probe each kind in
//! [`ArtifactKind::PRIORITY`] order.

use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, error, info};

use factreel_models::{ArtifactId, ArtifactKind, VideoArtifact};

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::{move_no_clobber, write_no_clobber};

/// Name of the directory holding per-run scratch space.
pub const SCRATCH_DIR_NAME: &str = "tmp";

/// Result of looking up an artifact id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(VideoArtifact),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_option(self) -> Option<VideoArtifact> {
        match self {
            Lookup::Found(artifact) => Some(artifact),
            Lookup::NotFound => None,
        }
    }
}

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Write-once, read-many store of generated artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the working directory if absent.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(SCRATCH_DIR_NAME)).await?;
        info!("Artifact store opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent of per-run scratch directories. Swept by directory age.
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR_NAME)
    }

    /// Scratch directory path for the run producing `id`.
    pub fn run_dir(&self, id: &ArtifactId) -> PathBuf {
        self.scratch_dir().join(format!("run_{id}"))
    }

    /// Path an artifact of `kind` with `id` is stored at.
    pub fn artifact_path(&self, id: &ArtifactId, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name(id))
    }

    /// Generate an id not used by any stored artifact or scratch directory.
    pub async fn new_id(&self) -> StorageResult<ArtifactId> {
        loop {
            let id = ArtifactId::generate();
            let mut taken = fs::try_exists(self.run_dir(&id)).await?;
            for kind in ArtifactKind::PRIORITY {
                taken |= fs::try_exists(self.artifact_path(&id, kind)).await?;
            }
            if !taken {
                return Ok(id);
            }
            debug!(id = %id, "Artifact id collision, regenerating");
        }
    }

    /// Move a finished file into the store under a fresh id.
    pub async fn put_file(&self, src: &Path, kind: ArtifactKind) -> StorageResult<VideoArtifact> {
        let id = self.new_id().await?;
        self.put_file_as(&id, src, kind).await
    }

    /// Move a finished file into the store under a reserved id.
    pub async fn put_file_as(
        &self,
        id: &ArtifactId,
        src: &Path,
        kind: ArtifactKind,
    ) -> StorageResult<VideoArtifact> {
        let dst = self.artifact_path(id, kind);
        move_no_clobber(src, &dst).await?;
        info!(id = %id, kind = %kind, "Stored artifact {}", dst.display());
        self.stat(id, kind, dst).await
    }

    /// Write bytes into the store under a fresh id.
    pub async fn put_bytes(&self, bytes: &[u8], kind: ArtifactKind) -> StorageResult<VideoArtifact> {
        let id = self.new_id().await?;
        let dst = self.artifact_path(&id, kind);
        write_no_clobber(bytes, &dst).await?;
        info!(id = %id, kind = %kind, "Stored artifact {}", dst.display());
        self.stat(&id, kind, dst).await
    }

    /// Resolve an id, preferring video over audio-only.
    pub async fn get(&self, id: &ArtifactId) -> StorageResult<Lookup> {
        for kind in ArtifactKind::PRIORITY {
            let path = self.artifact_path(id, kind);
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    return Ok(Lookup::Found(VideoArtifact {
                        id: id.clone(),
                        path,
                        kind,
                        created_at: modified_at(&meta),
                    }));
                }
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Lookup::NotFound)
    }

    /// Delete every file stored under `id`. Returns whether anything was removed.
    pub async fn remove(&self, id: &ArtifactId) -> StorageResult<bool> {
        let mut removed = false;
        for kind in ArtifactKind::PRIORITY {
            match fs::remove_file(self.artifact_path(id, kind)).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::delete_failed(format!("{id}: {e}")));
                }
            }
        }
        if removed {
            info!(id = %id, "Removed artifact");
        }
        Ok(removed)
    }

    /// Delete everything older than `retention`.
    pub async fn sweep(&self, retention: Duration) -> SweepReport {
        self.sweep_at(SystemTime::now(), retention).await
    }

    /// Delete everything older than `retention` as seen from `now`.
    ///
    /// Individual failures are logged and counted; the sweep never aborts.
    pub async fn sweep_at(&self, now: SystemTime, retention: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let scratch = self.scratch_dir();

        self.sweep_dir(&self.root, now, retention, &mut report, |path, is_dir| {
            !is_dir && path != scratch.as_path()
        })
        .await;
        self.sweep_dir(&scratch, now, retention, &mut report, |_, is_dir| is_dir)
            .await;

        if report.deleted > 0 || report.failed > 0 {
            info!(
                scanned = report.scanned,
                deleted = report.deleted,
                failed = report.failed,
                "Retention sweep complete"
            );
        }
        metrics::counter!("factreel_sweep_deleted_total").increment(report.deleted as u64);

        report
    }

    async fn sweep_dir<F>(
        &self,
        dir: &Path,
        now: SystemTime,
        retention: Duration,
        report: &mut SweepReport,
        eligible: F,
    ) where
        F: Fn(&Path, bool) -> bool,
    {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Sweep could not read {}: {}", dir.display(), e);
                report.failed += 1;
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!("Sweep could not list {}: {}", dir.display(), e);
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Removed concurrently.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    error!("Sweep could not stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            if !eligible(&path, meta.is_dir()) {
                continue;
            }
            report.scanned += 1;

            let age = meta
                .modified()
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok())
                .unwrap_or_default();
            if age <= retention {
                continue;
            }

            let removed = if meta.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };

            match removed {
                Ok(()) => {
                    debug!(age_secs = age.as_secs(), "Swept {}", path.display());
                    report.deleted += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    error!("Sweep failed to delete {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    async fn stat(
        &self,
        id: &ArtifactId,
        kind: ArtifactKind,
        path: PathBuf,
    ) -> StorageResult<VideoArtifact> {
        let meta = fs::metadata(&path).await?;
        Ok(VideoArtifact {
            id: id.clone(),
            path,
            kind,
            created_at: modified_at(&meta),
        })
    }
}

fn modified_at(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}
