use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use git2::Oid;
use tokio::fs;
use tracing::trace;

use super::hash_path;
use crate::{AppError, AppResult};

/// Directory under the output root holding one file per unique blob.
pub const BLOBS_DIR: &str = "blobs";

/// Blob contents stored once under `blobs/<2 hex>/<38 hex>`.
#[derive(Debug, Clone)]
pub struct BlobPool {
    root: PathBuf,
}

impl BlobPool {
    pub fn new(output_root: &Path) -> Self {
        Self {
            root: output_root.join(BLOBS_DIR),
        }
    }

    pub fn path_for(&self, id: Oid) -> PathBuf {
        self.root.join(hash_path(id))
    }

    pub async fn create(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Write `content` as the pool entry for `id`.
    ///
    /// Returns `false` when an identical entry is already present. The file
    /// is written beside the pool and renamed into place, so a partially
    /// written entry is never visible under its final name.
    pub async fn store(&self, id: Oid, content: &[u8]) -> AppResult<bool> {
        let path = self.path_for(id);
        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                if meta.len() == content.len() as u64 && fs::read(&path).await? == content {
                    trace!("Blob {id} already pooled");
                    return Ok(false);
                }
                return Err(AppError::output_conflict(
                    path,
                    format!("Pool entry does not hold the bytes of blob {id}."),
                ));
            }
            Ok(_) => {
                return Err(AppError::output_conflict(
                    path,
                    "Pool entry is not a regular file.",
                ));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp = self.root.join(format!(".{id}.tmp"));
        fs::write(&temp, content).await?;
        fs::rename(&temp, &path).await?;
        trace!("Pooled blob {id} ({} bytes)", content.len());
        Ok(true)
    }
}
