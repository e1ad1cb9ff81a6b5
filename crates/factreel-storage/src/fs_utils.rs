//! Filesystem utilities for committing finished files.
//!
//! Artifacts are published with a hard link, which fails if the destination
//! exists, so a commit never clobbers another artifact and readers never see
//! a half-written file. Sources on another filesystem are first copied next
//! to the destination.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{StorageError, StorageResult};

/// Move `src` to `dst`, failing if `dst` already exists.
pub async fn move_no_clobber(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> StorageResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !fs::try_exists(src).await? {
        return Err(StorageError::SourceNotFound(src.to_path_buf()));
    }

    match link_no_clobber(src, dst).await {
        Ok(()) => {}
        Err(StorageError::Io(e)) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device link detected, falling back to copy: {} -> {}",
                src.display(),
                dst.display()
            );
            let staged = staging_path(dst);
            fs::copy(src, &staged).await.map_err(|e| {
                tracing::error!(
                    "Failed to copy file during cross-device commit: {} -> {}: {}",
                    src.display(),
                    staged.display(),
                    e
                );
                StorageError::from(e)
            })?;
            let linked = link_no_clobber(&staged, dst).await;
            let _ = fs::remove_file(&staged).await;
            linked?;
        }
        Err(e) => return Err(e),
    }

    // Source removal is best effort; the artifact is already published.
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!("Failed to remove source after commit: {}: {}", src.display(), e);
    }

    Ok(())
}

/// Write `bytes` to `dst`, failing if `dst` already exists.
pub async fn write_no_clobber(bytes: &[u8], dst: impl AsRef<Path>) -> StorageResult<()> {
    let dst = dst.as_ref();
    let staged = staging_path(dst);

    fs::write(&staged, bytes).await?;
    let linked = link_no_clobber(&staged, dst).await;
    let _ = fs::remove_file(&staged).await;
    linked
}

async fn link_no_clobber(src: &Path, dst: &Path) -> StorageResult<()> {
    match fs::hard_link(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(StorageError::AlreadyExists(dst.to_path_buf()))
        }
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// Hidden sibling of `dst` used while a file is being written.
fn staging_path(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dst.with_file_name(format!(".{name}.partial"))
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV is error code 18 on Linux/macOS
    e.raw_os_error() == Some(18)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_same_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("voice.mp3");
        let dst = dir.path().join("audio_0a1b2c3d.mp3");

        fs::write(&src, b"ID3").await.unwrap();
        move_no_clobber(&src, &dst).await.unwrap();

        assert!(!src.exists(), "Source file should be removed");
        assert_eq!(fs::read(&dst).await.unwrap(), b"ID3");
    }

    #[tokio::test]
    async fn test_move_refuses_to_clobber() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.mp4");
        let dst = dir.path().join("video_0a1b2c3d.mp4");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        let err = move_no_clobber(&src, &dst).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(fs::read(&dst).await.unwrap(), b"old");
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = move_no_clobber(dir.path().join("nope"), dir.path().join("dst"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_write_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("audio_deadbeef.mp3");
        write_no_clobber(b"bytes", &dst).await.unwrap();

        assert_eq!(fs::read(&dst).await.unwrap(), b"bytes");
        assert!(!staging_path(&dst).exists());
        assert!(write_no_clobber(b"again", &dst).await.is_err());
    }

    #[test]
    fn test_is_cross_device_error() {
        let exdev_error = std::io::Error::from_raw_os_error(18);
        assert!(is_cross_device_error(&exdev_error));

        let not_found = std::io::Error::from_raw_os_error(2);
        assert!(!is_cross_device_error(&not_found));
    }
}
