use std::collections::BTreeMap;
use std::path::Path;

use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

use super::GitStore;

/// A scratch repository that lives as long as the fixture.
pub(crate) struct TestRepo {
    repo: Repository,
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { repo, dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> GitStore {
        GitStore::discover(self.path()).unwrap()
    }

    /// Commit plain files given as `(path, contents)`.
    pub fn commit(&self, parents: &[Oid], files: &[(&str, &str)], message: &str, time: i64) -> Oid {
        let files: Vec<(&str, &str, bool)> = files.iter().map(|(p, c)| (*p, *c, false)).collect();
        self.commit_with(parents, &files, message, time)
    }

    /// Commit files given as `(path, contents, executable)`; `/` in a path
    /// creates subtrees.
    pub fn commit_with(
        &self,
        parents: &[Oid],
        files: &[(&str, &str, bool)],
        message: &str,
        time: i64,
    ) -> Oid {
        let tree_id = self.write_tree(files);
        self.commit_tree(parents, tree_id, message, time)
    }

    /// Commit a flat tree of plain files whose names are raw bytes, which
    /// need not be UTF-8.
    #[cfg(unix)]
    pub fn commit_raw_names(
        &self,
        parents: &[Oid],
        files: &[(&[u8], &str)],
        message: &str,
        time: i64,
    ) -> Oid {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut builder = self.repo.treebuilder(None).unwrap();
        for (name, contents) in files {
            let blob = self.repo.blob(contents.as_bytes()).unwrap();
            builder
                .insert(Path::new(OsStr::from_bytes(name)), blob, 0o100644)
                .unwrap();
        }
        let tree_id = builder.write().unwrap();
        self.commit_tree(parents, tree_id, message, time)
    }

    fn commit_tree(&self, parents: &[Oid], tree_id: Oid, message: &str, time: i64) -> Oid {
        let tree = self.repo.find_tree(tree_id).unwrap();
        let parents: Vec<git2::Commit> = parents
            .iter()
            .map(|id| self.repo.find_commit(*id).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let sig = Signature::new("Test Author", "author@example.com", &Time::new(time, 0)).unwrap();
        self.repo
            .commit(None, &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    pub fn branch(&self, name: &str, target: Oid) {
        let commit = self.repo.find_commit(target).unwrap();
        self.repo.branch(name, &commit, true).unwrap();
    }

    fn write_tree(&self, files: &[(&str, &str, bool)]) -> Oid {
        let mut builder = self.repo.treebuilder(None).unwrap();
        let mut subdirs: BTreeMap<&str, Vec<(&str, &str, bool)>> = BTreeMap::new();
        for (path, contents, executable) in files {
            match path.split_once('/') {
                Some((dir, rest)) => subdirs
                    .entry(dir)
                    .or_default()
                    .push((rest, *contents, *executable)),
                None => {
                    let blob = self.repo.blob(contents.as_bytes()).unwrap();
                    let mode = if *executable { 0o100755 } else { 0o100644 };
                    builder.insert(*path, blob, mode).unwrap();
                }
            }
        }
        for (dir, entries) in subdirs {
            let subtree = self.write_tree(&entries);
            builder.insert(dir, subtree, 0o040000).unwrap();
        }
        builder.write().unwrap()
    }
}
