use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use super::SnapshotPlan;
use crate::{AppError, AppResult};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Where a file of a commit's tree lives in the blob pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub blob: String,
    pub executable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub symlink: bool,
}

/// Stand-in for `commit-trees/` on filesystems without hard links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Number of commit paths referring to each pooled blob.
    pub blobs: BTreeMap<String, usize>,
    /// Commit id to `/`-separated path (see [`manifest_key`]) to entry.
    pub commits: BTreeMap<String, BTreeMap<String, ManifestEntry>>,
}

/// JSON key for a raw git path.
///
/// UTF-8 text is kept as is except `%`, which becomes `%25`; bytes that are
/// not valid UTF-8 become `%XX`. Distinct paths therefore get distinct keys.
pub fn manifest_key(path: &[u8]) -> String {
    let mut key = String::with_capacity(path.len());
    for chunk in path.utf8_chunks() {
        for c in chunk.valid().chars() {
            if c == '%' {
                key.push_str("%25");
            } else {
                key.push(c);
            }
        }
        for byte in chunk.invalid() {
            key.push_str(&format!("%{byte:02X}"));
        }
    }
    key
}

impl Manifest {
    pub fn from_plans(plans: &[SnapshotPlan]) -> Self {
        let mut manifest = Self::default();
        for plan in plans {
            let files = manifest.commits.entry(plan.commit.to_string()).or_default();
            for file in &plan.files {
                let blob = file.blob.to_string();
                *manifest.blobs.entry(blob.clone()).or_default() += 1;
                files.insert(
                    manifest_key(&file.path),
                    ManifestEntry {
                        blob,
                        executable: file.executable,
                        symlink: file.symlink,
                    },
                );
            }
        }
        manifest
    }
}

/// Write `manifest.json` for `plans`, accepting an identical existing file.
pub(crate) async fn write_manifest(output_root: &Path, plans: &[SnapshotPlan]) -> AppResult<()> {
    let mut data = serde_json::to_vec_pretty(&Manifest::from_plans(plans))?;
    data.push(b'\n');

    let path = output_root.join(MANIFEST_FILE);
    match fs::read(&path).await {
        Ok(existing) if existing == data => return Ok(()),
        Ok(_) => {
            return Err(AppError::output_conflict(
                path,
                "Manifest from an earlier run describes different trees.",
            ));
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    fs::write(&path, data).await?;
    info!("Wrote manifest for {} commits to {}", plans.len(), path.display());
    Ok(())
}
