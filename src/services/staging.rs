use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::{TransferError, TransferResult};
use crate::models::ObjectKey;

/// Scratch copy of a downloaded object. The file is removed when this value
/// is released or dropped, whichever happens first.
#[derive(Debug)]
pub struct StagingFile {
    path: TempPath,
    size: u64,
}

impl StagingFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Materializes remote streams into a local scratch directory before decoding.
#[derive(Debug, Clone)]
pub struct StagingStore {
    dir: PathBuf,
}

impl StagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `stream` to `<dir>/<file name of key>`.
    ///
    /// The cleanup guard is taken before the file is created, so a failed or
    /// partial copy never leaves an artifact behind.
    pub async fn stage<R>(&self, key: &ObjectKey, mut stream: R) -> TransferResult<StagingFile>
    where
        R: AsyncRead + Unpin + Send,
    {
        let file_name = key.file_name().ok_or_else(|| {
            TransferError::invalid_input(format!("Object key '{}' has no file name", key))
        })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = TempPath::try_from_path(self.dir.join(file_name))?;

        let mut file = tokio::fs::File::create(&path).await?;
        let size = tokio::io::copy(&mut stream, &mut file).await?;
        file.flush().await?;
        drop(file);

        tracing::debug!("Staged {} ({} bytes) at {}", key, size, path.display());
        Ok(StagingFile { path, size })
    }

    pub async fn read_all(&self, staged: &StagingFile) -> TransferResult<Vec<u8>> {
        Ok(tokio::fs::read(staged.path()).await?)
    }

    /// Deletes the scratch file now instead of waiting for drop.
    pub fn release(&self, staged: StagingFile) {
        let shown = staged.path().display().to_string();
        if let Err(e) = staged.path.close() {
            tracing::warn!("Failed to remove staging file {}: {}", shown, e);
        }
    }

    /// Number of files currently sitting in the staging directory.
    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                    .count()
            })
            .unwrap_or(0)
    }
}
