use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::task::JoinSet;
use tracing::{Span, debug};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::pool::BlobPool;
use super::{SnapshotPlan, hash_path, join_git_path, progress_style};
use crate::{AppError, AppResult};

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(_: &Metadata, _: &Metadata) -> bool {
    false
}

async fn ensure_dir(path: &Path) -> AppResult<()> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(AppError::output_conflict(
            path,
            "Expected a directory but found a file.",
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(path).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Hard-link `target` to the pooled `source`.
///
/// A target that already is that link is left alone; a plain copy with the
/// same bytes is swapped for the link. Returns whether a link was made.
async fn link_file(source: &Path, target: &Path) -> AppResult<bool> {
    match fs::symlink_metadata(target).await {
        Ok(existing) if existing.is_file() => {
            let pooled = fs::metadata(source).await?;
            if same_file(&pooled, &existing) {
                return Ok(false);
            }
            if existing.len() != pooled.len() || fs::read(target).await? != fs::read(source).await? {
                return Err(AppError::output_conflict(
                    target,
                    format!("Content differs from {}.", source.display()),
                ));
            }
            fs::remove_file(target).await?;
        }
        Ok(_) => {
            return Err(AppError::output_conflict(
                target,
                "Expected a file but found something else.",
            ));
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::hard_link(source, target).await?;
    Ok(true)
}

/// Rebuild one commit's tree under `root`.
async fn materialize_snapshot(pool: BlobPool, root: PathBuf, plan: SnapshotPlan) -> AppResult<usize> {
    ensure_dir(&root).await?;
    for dir in &plan.dirs {
        ensure_dir(&join_git_path(&root, dir)).await?;
    }

    let mut created = 0;
    for file in &plan.files {
        if link_file(&pool.path_for(file.blob), &join_git_path(&root, &file.path)).await? {
            created += 1;
        }
    }
    debug!("Linked {created} of {} files for {}", plan.files.len(), plan.commit);
    Ok(created)
}

/// Build every planned snapshot under `trees_root`, one task per commit.
///
/// Snapshots share nothing but the read-only pool, so they are built
/// concurrently; the first failure aborts the remaining tasks.
#[tracing::instrument(
    name = "Linking commit trees",
    level = "info",
    skip_all,
    fields(commits = plans.len())
)]
pub(crate) async fn materialize_all(
    pool: &BlobPool,
    trees_root: &Path,
    plans: Vec<SnapshotPlan>,
) -> AppResult<usize> {
    let span = Span::current();
    span.pb_set_style(&progress_style());
    span.pb_set_length(plans.len() as u64);

    let mut tasks = JoinSet::new();
    for plan in plans {
        let root = trees_root.join(hash_path(plan.commit));
        tasks.spawn(materialize_snapshot(pool.clone(), root, plan));
    }

    let mut links = 0;
    while let Some(result) = tasks.join_next().await {
        links += result??;
        span.pb_inc(1);
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn file_where_directory_belongs_conflicts() {
        let out = TempDir::new().unwrap();
        let path = out.path().join("lib");
        std::fs::write(&path, b"not a dir").unwrap();

        let err = ensure_dir(&path).await.unwrap_err();
        assert!(matches!(err, AppError::OutputConflict { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn relinking_an_existing_link_is_skipped() {
        let out = TempDir::new().unwrap();
        let source = out.path().join("pooled");
        let target = out.path().join("linked");
        std::fs::write(&source, b"content").unwrap();

        assert!(link_file(&source, &target).await.unwrap());
        assert!(!link_file(&source, &target).await.unwrap());
    }

    #[tokio::test]
    async fn directory_where_file_belongs_conflicts() {
        let out = TempDir::new().unwrap();
        let source = out.path().join("pooled");
        let target = out.path().join("taken");
        std::fs::write(&source, b"content").unwrap();
        std::fs::create_dir(&target).unwrap();

        let err = link_file(&source, &target).await.unwrap_err();
        assert!(matches!(err, AppError::OutputConflict { .. }), "{err:?}");
    }
}
