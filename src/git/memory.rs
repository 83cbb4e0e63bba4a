use std::collections::HashMap;
use std::fmt::Write;

use git2::{ObjectType, Oid};

use super::{CommitInfo, EntryKind, ObjectStore, TreeEntry};
use crate::{AppError, AppResult};

impl EntryKind {
    pub(crate) fn file(id: Oid) -> Self {
        EntryKind::Blob {
            id,
            executable: false,
        }
    }
}

/// Object store held entirely in memory. Ids are real git hashes of a
/// textual rendering of each object, so they are stable across runs.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    commits: HashMap<Oid, CommitInfo>,
    trees: HashMap<Oid, Vec<TreeEntry>>,
    blobs: HashMap<Oid, Vec<u8>>,
    refs: HashMap<String, Oid>,
}

impl MemoryStore {
    pub fn add_blob(&mut self, content: &[u8]) -> Oid {
        let id = Oid::hash_object(ObjectType::Blob, content).unwrap();
        self.blobs.insert(id, content.to_vec());
        id
    }

    pub fn add_tree(&mut self, entries: Vec<TreeEntry>) -> Oid {
        let mut text = String::new();
        for entry in &entries {
            writeln!(text, "{:?} {:?}", entry.kind, entry.name).unwrap();
        }
        let id = Oid::hash_object(ObjectType::Tree, text.as_bytes()).unwrap();
        self.trees.insert(id, entries);
        id
    }

    pub fn add_commit(&mut self, parents: &[Oid], tree: Oid, message: &str, time: i64) -> Oid {
        let mut text = format!("tree {tree}\n");
        for parent in parents {
            writeln!(text, "parent {parent}").unwrap();
        }
        write!(text, "time {time}\n\n{message}").unwrap();
        let id = Oid::hash_object(ObjectType::Commit, text.as_bytes()).unwrap();
        self.commits.insert(
            id,
            CommitInfo {
                id,
                parents: parents.to_vec(),
                tree,
                message: message.to_string(),
                time,
                offset_minutes: 0,
            },
        );
        id
    }

    /// Build a history from `(name, "parent parent")` pairs, in order. Each
    /// commit gets a one-file tree, the timestamp of its position, and a ref
    /// with its name.
    pub fn from_history(shape: &[(&str, &str)]) -> (Self, HashMap<String, Oid>) {
        let mut store = Self::default();
        let mut ids: HashMap<String, Oid> = HashMap::new();
        for (time, (name, parents)) in shape.iter().enumerate() {
            let blob = store.add_blob(name.as_bytes());
            let tree = store.add_tree(vec![TreeEntry::new("file", EntryKind::file(blob))]);
            let parents: Vec<Oid> = parents.split_whitespace().map(|p| ids[p]).collect();
            let id = store.add_commit(&parents, tree, name, time as i64);
            store.set_ref(name, id);
            ids.insert(name.to_string(), id);
        }
        (store, ids)
    }

    pub fn set_ref(&mut self, name: &str, id: Oid) {
        self.refs.insert(name.to_string(), id);
    }

    /// Drop an object to simulate a damaged repository.
    pub fn forget(&mut self, id: Oid) {
        self.commits.remove(&id);
        self.trees.remove(&id);
        self.blobs.remove(&id);
    }
}

impl ObjectStore for MemoryStore {
    fn resolve_revision(&self, rev: &str) -> AppResult<Oid> {
        let unresolved = |reason: &str| AppError::RevisionResolution {
            rev: rev.to_string(),
            reason: reason.to_string(),
        };
        let id = match self.refs.get(rev) {
            Some(id) => *id,
            None => Oid::from_str(rev).map_err(|e| unresolved(e.message()))?,
        };
        if self.commits.contains_key(&id) {
            Ok(id)
        } else {
            Err(unresolved("not a known commit"))
        }
    }

    fn commit(&self, id: Oid) -> AppResult<CommitInfo> {
        self.commits
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::repository_access(id, "missing commit"))
    }

    fn tree(&self, id: Oid) -> AppResult<Vec<TreeEntry>> {
        self.trees
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::repository_access(id, "missing tree"))
    }

    fn blob(&self, id: Oid) -> AppResult<Vec<u8>> {
        self.blobs
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::repository_access(id, "missing blob"))
    }
}
