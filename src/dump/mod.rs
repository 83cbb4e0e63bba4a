/// JSON manifest used instead of hard links.
pub mod manifest;

/// Content-addressed blob pool.
pub mod pool;

/// Per-commit tree reconstruction.
pub mod snapshot;

use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use git2::Oid;
use tokio::fs;
use tracing::{Span, debug, info, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::style::ProgressStyle;

use crate::git::{CommitInfo, EntryKind, ObjectStore, TreeEntry, child_path};
use crate::history::resolve;
use crate::{AppError, AppResult};
use pool::BlobPool;

/// Directory under the output root holding one tree per commit.
pub const COMMIT_TREES_DIR: &str = "commit-trees";

/// How commit snapshots refer to the blob pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkMode {
    /// Real directory trees whose files are hard links into the pool.
    #[default]
    HardLink,
    /// A single `manifest.json` mapping each commit path to its blob.
    Manifest,
}

/// What a dump did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub commits: usize,
    pub unique_blobs: usize,
    pub blobs_written: usize,
    pub links_created: usize,
}

/// `<first two hex digits>/<remaining 38>` for an object id.
pub fn hash_path(id: Oid) -> PathBuf {
    let hex = id.to_string();
    Path::new(&hex[..2]).join(&hex[2..])
}

#[cfg(unix)]
fn os_component(name: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(name).to_os_string()
}

// Without byte-level file names, names that are not UTF-8 are converted lossily.
#[cfg(not(unix))]
fn os_component(name: &[u8]) -> OsString {
    String::from_utf8_lossy(name).into_owned().into()
}

/// Join a raw `/`-separated git path onto `root`, one component at a time,
/// keeping every name byte for byte.
pub fn join_git_path(root: &Path, path: &[u8]) -> PathBuf {
    let mut joined = root.to_path_buf();
    for component in path.split(|b| *b == b'/') {
        joined.push(os_component(component));
    }
    joined
}

/// A file leaf of a commit's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Raw `/`-separated path relative to the commit's root.
    pub path: Vec<u8>,
    pub blob: Oid,
    pub executable: bool,
    pub symlink: bool,
}

/// Everything needed to rebuild one commit's tree on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPlan {
    pub commit: Oid,
    /// Raw subdirectory paths, each listed after its parent.
    pub dirs: Vec<Vec<u8>>,
    pub files: Vec<PlannedFile>,
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{span_name} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Reject entry names that would step outside the directory being built.
fn checked_name(tree: Oid, name: &[u8]) -> AppResult<&[u8]> {
    if name.is_empty()
        || name == b"."
        || name == b".."
        || name.iter().any(|b| matches!(b, b'/' | b'\\' | b'\0'))
    {
        return Err(AppError::repository_access(
            tree,
            format!(
                "tree entry name {:?} is not a safe path component",
                String::from_utf8_lossy(name)
            ),
        ));
    }
    Ok(name)
}

fn cached_tree(
    store: &dyn ObjectStore,
    cache: &mut HashMap<Oid, Vec<TreeEntry>>,
    id: Oid,
) -> AppResult<Vec<TreeEntry>> {
    if let Some(entries) = cache.get(&id) {
        return Ok(entries.clone());
    }
    let entries = store.tree(id)?;
    cache.insert(id, entries.clone());
    Ok(entries)
}

/// Walk a commit's root tree, listing directories and file leaves.
fn plan_snapshot(
    store: &dyn ObjectStore,
    commit: &CommitInfo,
    cache: &mut HashMap<Oid, Vec<TreeEntry>>,
) -> AppResult<SnapshotPlan> {
    let mut plan = SnapshotPlan {
        commit: commit.id,
        dirs: Vec::new(),
        files: Vec::new(),
    };
    let mut pending = vec![(Vec::new(), commit.tree)];
    while let Some((prefix, tree)) = pending.pop() {
        for entry in cached_tree(store, cache, tree)? {
            let path = child_path(&prefix, checked_name(tree, &entry.name)?);
            match entry.kind {
                EntryKind::Tree { id } => {
                    plan.dirs.push(path.clone());
                    pending.push((path, id));
                }
                EntryKind::Blob { id, executable } => plan.files.push(PlannedFile {
                    path,
                    blob: id,
                    executable,
                    symlink: false,
                }),
                EntryKind::Symlink { id } => plan.files.push(PlannedFile {
                    path,
                    blob: id,
                    executable: false,
                    symlink: true,
                }),
                EntryKind::Submodule { commit: sub } => {
                    debug!(
                        "Skipping submodule {} at {sub} in {}",
                        String::from_utf8_lossy(&path),
                        commit.id
                    );
                }
            }
        }
    }
    Ok(plan)
}

#[tracing::instrument(
    name = "Writing blob pool",
    level = "info",
    skip_all,
    fields(blobs = blobs.len())
)]
async fn write_blobs(
    store: &dyn ObjectStore,
    pool: &BlobPool,
    blobs: &BTreeSet<Oid>,
) -> AppResult<usize> {
    let span = Span::current();
    span.pb_set_style(&progress_style());
    span.pb_set_length(blobs.len() as u64);

    let mut written = 0;
    for id in blobs {
        let content = store.blob(*id)?;
        if pool.store(*id, &content).await? {
            written += 1;
        }
        span.pb_inc(1);
    }
    Ok(written)
}

/// Materialize every commit in `rev1..rev2` under `output_root`.
///
/// Each unique blob is written once to `blobs/`; each commit gets a tree
/// under `commit-trees/` (or an entry in `manifest.json`, depending on
/// `mode`). Output already on disk from an earlier run is accepted when it
/// matches; anything written before a failure is left in place.
#[tracing::instrument(name = "Dumping all trees", level = "info", skip(store))]
pub async fn dump(
    store: &dyn ObjectStore,
    rev1: &str,
    rev2: &str,
    output_root: &Path,
    mode: LinkMode,
) -> AppResult<DumpSummary> {
    let range = resolve(store, rev1, rev2)?;
    if range.is_empty() {
        warn!("{rev2} adds no commits over {rev1}; nothing to materialize");
    } else {
        info!("Materializing {} commits", range.len());
    }

    let mut cache = HashMap::new();
    let mut plans = Vec::with_capacity(range.len());
    let mut blobs = BTreeSet::new();
    for id in range.iter() {
        let commit = store.commit(id)?;
        let plan = plan_snapshot(store, &commit, &mut cache)?;
        blobs.extend(plan.files.iter().map(|f| f.blob));
        plans.push(plan);
    }
    debug!("Planned {} snapshots over {} unique blobs", plans.len(), blobs.len());

    fs::create_dir_all(output_root).await?;
    let pool = BlobPool::new(output_root);
    pool.create().await?;
    let blobs_written = write_blobs(store, &pool, &blobs).await?;

    let commits = plans.len();
    let links_created = match mode {
        LinkMode::HardLink => {
            let trees_root = output_root.join(COMMIT_TREES_DIR);
            fs::create_dir_all(&trees_root).await?;
            snapshot::materialize_all(&pool, &trees_root, plans).await?
        }
        LinkMode::Manifest => {
            manifest::write_manifest(output_root, &plans).await?;
            0
        }
    };

    Ok(DumpSummary {
        commits,
        unique_blobs: blobs.len(),
        blobs_written,
        links_created,
    })
}
