use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use git2::Oid;
use tracing::{debug, trace};

use super::range::ResolvedRange;
use crate::git::{CommitInfo, ObjectStore};
use crate::{AppError, AppResult};

/// Structured prose attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub title: String,
    pub body: Vec<String>,
}

/// Supplies the optional annotation for a commit.
pub trait Annotator {
    fn annotate(&self, commit: &CommitInfo) -> Option<Annotation>;
}

/// Reads the commit message as a title line followed by paragraphs
/// separated by blank lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageAnnotator;

impl Annotator for MessageAnnotator {
    fn annotate(&self, commit: &CommitInfo) -> Option<Annotation> {
        let mut lines = commit.message.lines().skip_while(|l| l.trim().is_empty());
        let title = lines.next()?.trim().to_string();

        let mut body = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                if !paragraph.is_empty() {
                    body.push(paragraph.join(" "));
                    paragraph.clear();
                }
            } else {
                paragraph.push(line);
            }
        }
        if !paragraph.is_empty() {
            body.push(paragraph.join(" "));
        }

        Some(Annotation { title, body })
    }
}

/// One rendered unit of history, corresponding to exactly one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Zero-based position in the section order.
    pub position: usize,
    pub commit: CommitInfo,
    pub changed_paths: Vec<String>,
    pub annotation: Option<Annotation>,
}

impl Section {
    pub fn id(&self) -> Oid {
        self.commit.id
    }
}

/// Order the commits of `range` so that every commit follows all of its
/// parents that are also in the range, and attach each commit's annotation.
///
/// Commits with no ordering constraint between them are emitted by ascending
/// `(commit time, id)`, so the output only depends on the repository
/// contents.
#[tracing::instrument(
    name = "Building sections",
    level = "debug",
    skip_all,
    fields(commits = range.len())
)]
pub fn build(
    store: &dyn ObjectStore,
    range: &ResolvedRange,
    annotator: &dyn Annotator,
) -> AppResult<Vec<Section>> {
    let mut commits: HashMap<Oid, CommitInfo> = HashMap::with_capacity(range.len());
    for id in range.iter() {
        commits.insert(id, store.commit(id)?);
    }

    let mut waiting_on: HashMap<Oid, usize> = HashMap::with_capacity(commits.len());
    let mut children: HashMap<Oid, Vec<Oid>> = HashMap::new();
    let mut ready = BinaryHeap::new();
    for commit in commits.values() {
        let parents: BTreeSet<Oid> = commit
            .parents
            .iter()
            .copied()
            .filter(|p| range.contains(p))
            .collect();
        for parent in &parents {
            children.entry(*parent).or_default().push(commit.id);
        }
        if parents.is_empty() {
            ready.push(Reverse((commit.time, commit.id)));
        } else {
            waiting_on.insert(commit.id, parents.len());
        }
    }

    let mut sections = Vec::with_capacity(commits.len());
    while let Some(Reverse((_, id))) = ready.pop() {
        let Some(commit) = commits.remove(&id) else {
            continue;
        };
        for child in children.remove(&id).unwrap_or_default() {
            if let Some(count) = waiting_on.get_mut(&child) {
                *count -= 1;
                if *count == 0 {
                    waiting_on.remove(&child);
                    if let Some(info) = commits.get(&child) {
                        ready.push(Reverse((info.time, child)));
                    }
                }
            }
        }

        trace!("Section {} is commit {id}", sections.len());
        let changed_paths = store.changed_paths(&commit)?;
        let annotation = annotator.annotate(&commit);
        sections.push(Section {
            position: sections.len(),
            commit,
            changed_paths,
            annotation,
        });
    }

    if sections.len() != range.len() {
        let stuck = waiting_on.keys().next().copied().unwrap_or_else(Oid::zero);
        return Err(AppError::repository_access(
            stuck,
            "commit graph contains a cycle",
        ));
    }

    debug!("Built {} sections", sections.len());
    Ok(sections)
}
