/// `git2`-backed object store.
pub mod repo;

/// In-memory object store for graph-shape tests.
#[cfg(test)]
pub(crate) mod memory;

/// Helpers for building real repositories in temporary directories.
#[cfg(test)]
pub(crate) mod fixtures;

use std::collections::BTreeMap;

use git2::Oid;

use crate::AppResult;

pub(crate) use repo::GitStore;

/// Read-only view of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: Oid,
    pub parents: Vec<Oid>,
    pub tree: Oid,
    pub message: String,
    /// Commit time in seconds since the Unix epoch.
    pub time: i64,
    /// Committer's UTC offset in minutes.
    pub offset_minutes: i32,
}

/// What a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob { id: Oid, executable: bool },
    /// Symbolic link; the blob holds the link target.
    Symlink { id: Oid },
    Tree { id: Oid },
    /// Gitlink to a commit in another repository.
    Submodule { commit: Oid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Raw name bytes as stored in the tree; git does not require UTF-8.
    pub name: Vec<u8>,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn new(name: impl Into<Vec<u8>>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Read-only access to a repository's commit graph and objects.
///
/// Every operation takes the store explicitly; nothing in the crate holds a
/// global repository handle.
pub trait ObjectStore {
    /// Resolve a revision expression to the id of the commit it names.
    fn resolve_revision(&self, rev: &str) -> AppResult<Oid>;

    fn commit(&self, id: Oid) -> AppResult<CommitInfo>;

    /// Entries of a tree, in the store's order.
    fn tree(&self, id: Oid) -> AppResult<Vec<TreeEntry>>;

    fn blob(&self, id: Oid) -> AppResult<Vec<u8>>;

    /// Paths changed by `commit` relative to its first parent, sorted.
    ///
    /// Root commits are compared against the empty tree. The paths are for
    /// display, so names that are not UTF-8 are converted lossily.
    fn changed_paths(&self, commit: &CommitInfo) -> AppResult<Vec<String>> {
        let new = flatten_tree(self, commit.tree)?;
        let old = match commit.parents.first() {
            Some(parent) => flatten_tree(self, self.commit(*parent)?.tree)?,
            None => BTreeMap::new(),
        };
        let mut paths: Vec<String> = new
            .iter()
            .filter(|(path, kind)| old.get(*path) != Some(*kind))
            .map(|(path, _)| path)
            .chain(old.keys().filter(|path| !new.contains_key(*path)))
            .map(|path| String::from_utf8_lossy(path).into_owned())
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Append `name` to a `/`-separated raw path.
pub(crate) fn child_path(prefix: &[u8], name: &[u8]) -> Vec<u8> {
    if prefix.is_empty() {
        return name.to_vec();
    }
    let mut path = Vec::with_capacity(prefix.len() + 1 + name.len());
    path.extend_from_slice(prefix);
    path.push(b'/');
    path.extend_from_slice(name);
    path
}

/// Map every non-tree leaf under `tree` to its kind, keyed by raw `/`-joined path.
fn flatten_tree<S: ObjectStore + ?Sized>(
    store: &S,
    tree: Oid,
) -> AppResult<BTreeMap<Vec<u8>, EntryKind>> {
    let mut leaves = BTreeMap::new();
    let mut pending = vec![(Vec::new(), tree)];
    while let Some((prefix, id)) = pending.pop() {
        for entry in store.tree(id)? {
            let path = child_path(&prefix, &entry.name);
            match entry.kind {
                EntryKind::Tree { id } => pending.push((path, id)),
                kind => {
                    leaves.insert(path, kind);
                }
            }
        }
    }
    Ok(leaves)
}
