use std::path::Path;

use git2::{FileMode, ObjectType, Oid, Repository};
use tracing::{debug, trace};

use super::{CommitInfo, EntryKind, ObjectStore, TreeEntry};
use crate::{AppError, AppResult};

/// Read-only object store over an on-disk git repository.
pub struct GitStore {
    repo: Repository,
}

impl std::fmt::Debug for GitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitStore")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl GitStore {
    /// Open the repository containing `path`, searching parent directories.
    #[tracing::instrument(name = "Opening repository", level = "debug")]
    pub fn discover(path: &Path) -> AppResult<Self> {
        let repo = Repository::discover(path)?;
        debug!("Found repository at {}", repo.path().display());
        Ok(Self { repo })
    }
}

fn entry_kind(id: Oid, kind: Option<ObjectType>, filemode: i32) -> Option<EntryKind> {
    match kind? {
        ObjectType::Tree => Some(EntryKind::Tree { id }),
        ObjectType::Commit => Some(EntryKind::Submodule { commit: id }),
        ObjectType::Blob if filemode == i32::from(FileMode::Link) => {
            Some(EntryKind::Symlink { id })
        }
        ObjectType::Blob => Some(EntryKind::Blob {
            id,
            executable: filemode == i32::from(FileMode::BlobExecutable),
        }),
        _ => None,
    }
}

impl ObjectStore for GitStore {
    fn resolve_revision(&self, rev: &str) -> AppResult<Oid> {
        let resolution_error = |e: git2::Error| AppError::RevisionResolution {
            rev: rev.to_string(),
            reason: e.message().to_string(),
        };
        let object = self.repo.revparse_single(rev).map_err(resolution_error)?;
        let commit = object.peel_to_commit().map_err(resolution_error)?;
        trace!("Resolved {rev} to {}", commit.id());
        Ok(commit.id())
    }

    fn commit(&self, id: Oid) -> AppResult<CommitInfo> {
        let commit = self
            .repo
            .find_commit(id)
            .map_err(|e| AppError::repository_access(id, e.message()))?;
        let time = commit.time();
        Ok(CommitInfo {
            id,
            parents: commit.parent_ids().collect(),
            tree: commit.tree_id(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            time: time.seconds(),
            offset_minutes: time.offset_minutes(),
        })
    }

    fn tree(&self, id: Oid) -> AppResult<Vec<TreeEntry>> {
        let tree = self
            .repo
            .find_tree(id)
            .map_err(|e| AppError::repository_access(id, e.message()))?;
        tree.iter()
            .map(|entry| {
                let kind = entry_kind(entry.id(), entry.kind(), entry.filemode())
                    .ok_or_else(|| {
                        AppError::repository_access(
                            id,
                            format!(
                                "tree entry '{}' has unsupported type",
                                String::from_utf8_lossy(entry.name_bytes())
                            ),
                        )
                    })?;
                Ok(TreeEntry::new(entry.name_bytes(), kind))
            })
            .collect()
    }

    fn blob(&self, id: Oid) -> AppResult<Vec<u8>> {
        let blob = self
            .repo
            .find_blob(id)
            .map_err(|e| AppError::repository_access(id, e.message()))?;
        Ok(blob.content().to_vec())
    }

    fn changed_paths(&self, info: &CommitInfo) -> AppResult<Vec<String>> {
        let access = |e: git2::Error| AppError::repository_access(info.id, e.message());
        let commit = self.repo.find_commit(info.id).map_err(access)?;
        let new_tree = commit.tree().map_err(access)?;
        let old_tree = match commit.parents().next() {
            Some(parent) => Some(parent.tree().map_err(access)?),
            None => None,
        };
        let diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)
            .map_err(access)?;
        let mut paths: Vec<String> = diff
            .deltas()
            .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}
