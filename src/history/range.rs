use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use git2::Oid;
use tracing::debug;

use crate::AppResult;
use crate::git::ObjectStore;

/// Commits reachable from an end revision but not from a start revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRange {
    commits: BTreeSet<Oid>,
}

impl ResolvedRange {
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn contains(&self, id: &Oid) -> bool {
        self.commits.contains(id)
    }

    /// Commit ids in ascending hash order.
    pub fn iter(&self) -> impl Iterator<Item = Oid> + '_ {
        self.commits.iter().copied()
    }
}

impl FromIterator<Oid> for ResolvedRange {
    fn from_iter<I: IntoIterator<Item = Oid>>(iter: I) -> Self {
        Self {
            commits: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Reachable from the start revision.
    Excluded,
    Included,
}

/// Paint every commit reachable from `tip` with `mark`, never crossing a
/// commit that already carries a mark.
fn paint(
    store: &dyn ObjectStore,
    tip: Oid,
    mark: Mark,
    marks: &mut HashMap<Oid, Mark>,
) -> AppResult<usize> {
    let mut painted = 0;
    let mut pending = vec![tip];
    while let Some(id) = pending.pop() {
        match marks.entry(id) {
            Entry::Occupied(_) => continue,
            Entry::Vacant(slot) => {
                slot.insert(mark);
            }
        }
        painted += 1;
        let commit = store.commit(id)?;
        pending.extend(
            commit
                .parents
                .into_iter()
                .filter(|parent| !marks.contains_key(parent)),
        );
    }
    Ok(painted)
}

/// Resolve `rev1..rev2`: every commit reachable from `rev2` that is neither
/// `rev1` nor reachable from it.
///
/// The ancestry of `rev1` is painted once up front, so the walk from `rev2`
/// stops as soon as it meets shared history and visits each commit at most
/// once, however many merge paths lead to it.
#[tracing::instrument(name = "Resolving revision range", level = "debug", skip(store))]
pub fn resolve(store: &dyn ObjectStore, rev1: &str, rev2: &str) -> AppResult<ResolvedRange> {
    let start = store.resolve_revision(rev1)?;
    let end = store.resolve_revision(rev2)?;
    if start == end {
        return Ok(ResolvedRange::default());
    }

    let mut marks = HashMap::new();
    let excluded = paint(store, start, Mark::Excluded, &mut marks)?;
    let included = paint(store, end, Mark::Included, &mut marks)?;
    debug!("Excluded {excluded} commits reachable from {rev1}; {included} remain in range");

    Ok(marks
        .into_iter()
        .filter(|(_, mark)| *mark == Mark::Included)
        .map(|(id, _)| id)
        .collect())
}
