//! Node documents: the multi-revision state of one tree path.
//!
//! A document stores, per property, a map from revision to serialized value.
//! System maps use names starting with `_`. User properties whose names start
//! with `_` are stored escaped with a second underscore.

use crate::error::Result;
use crate::path::Path;
use crate::update_op::{Condition, Operation, UpdateOp};
use revsweep_revision::Revision;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Deletion marker map: `"true"` if the node was deleted in that revision,
/// `"false"` if it was created.
pub const DELETED: &str = "_deleted";

/// Commit root map: the depth of the ancestor holding the commit record.
pub const COMMIT_ROOT: &str = "_commitRoot";

/// Commit records for revisions whose commit root is this document.
pub const REVISIONS: &str = "_revisions";

/// Revisions marked as branch commits.
pub const BRANCH_COMMITS: &str = "_bc";

/// Per cluster member sweep checkpoints, root document only.
pub const SWEEP_REVISION: &str = "_sweepRev";

/// Set once the node was deleted at least once.
pub const DELETED_ONCE: &str = "_deletedOnce";

/// The value of a `_deleted` entry recording a node creation.
pub const NOT_DELETED: &str = "false";

/// Revision → serialized value, restricted to entries stored on a document.
pub type RevisionMap = BTreeMap<Revision, String>;

/// Returns true for user property names (including escaped ones).
pub fn is_property_name(name: &str) -> bool {
    !name.starts_with('_') || name.starts_with("__")
}

pub fn is_deleted_entry(name: &str) -> bool {
    name == DELETED
}

pub fn is_commit_root_entry(name: &str) -> bool {
    name == COMMIT_ROOT
}

pub fn is_revisions_entry(name: &str) -> bool {
    name == REVISIONS
}

/// Read-only view of a document, as consumed by the sweeper.
///
/// Maps are local: only entries physically stored on this document.
pub trait DocumentView {
    fn id(&self) -> &str;

    fn path(&self) -> &Path;

    /// Names of all map properties present on the document.
    fn keys(&self) -> Vec<&str>;

    fn local_map(&self, property: &str) -> Option<&RevisionMap>;

    fn was_deleted_once(&self) -> bool;

    fn local_branch_commits(&self) -> BTreeSet<Revision> {
        self.local_map(BRANCH_COMMITS)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    fn local_deleted(&self) -> Option<&RevisionMap> {
        self.local_map(DELETED)
    }

    fn local_commit_root(&self) -> Option<&RevisionMap> {
        self.local_map(COMMIT_ROOT)
    }

    fn local_revisions(&self) -> Option<&RevisionMap> {
        self.local_map(REVISIONS)
    }
}

impl<T: DocumentView + ?Sized> DocumentView for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn path(&self) -> &Path {
        (**self).path()
    }

    fn keys(&self) -> Vec<&str> {
        (**self).keys()
    }

    fn local_map(&self, property: &str) -> Option<&RevisionMap> {
        (**self).local_map(property)
    }

    fn was_deleted_once(&self) -> bool {
        (**self).was_deleted_once()
    }
}

/// The stored state of one tree path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDocument {
    id: String,
    path: Path,
    maps: BTreeMap<String, RevisionMap>,
    #[serde(default)]
    deleted_once: bool,
    #[serde(default)]
    mod_count: u64,
}

impl NodeDocument {
    /// Create an empty document for a path.
    pub fn new(path: Path) -> Self {
        NodeDocument {
            id: path.to_id(),
            path,
            maps: BTreeMap::new(),
            deleted_once: false,
            mod_count: 0,
        }
    }

    /// Create an empty document for the path encoded in a document id.
    pub fn from_id(id: &str) -> Result<Self> {
        Ok(NodeDocument::new(Path::from_id(id)?))
    }

    pub fn builder(path: Path) -> NodeDocumentBuilder {
        NodeDocumentBuilder {
            doc: NodeDocument::new(path),
        }
    }

    /// Number of updates applied to this document.
    pub fn mod_count(&self) -> u64 {
        self.mod_count
    }

    /// All revisions of a cluster member found in the maps of this
    /// document. Sweep checkpoints are not changes and are skipped.
    pub fn revisions_of(&self, cluster_id: u32) -> BTreeSet<Revision> {
        self.maps
            .iter()
            .filter(|(name, _)| name.as_str() != SWEEP_REVISION)
            .flat_map(|(_, m)| m.keys())
            .filter(|rev| rev.cluster_id() == cluster_id)
            .copied()
            .collect()
    }

    /// Check whether all conditions of `op` hold on this document.
    pub fn check_conditions(&self, op: &UpdateOp) -> bool {
        op.conditions().all(|(key, condition)| {
            let current = key
                .revision()
                .and_then(|rev| self.maps.get(key.name()).and_then(|m| m.get(&rev)));
            match condition {
                Condition::Exists => current.is_some(),
                Condition::NotExists => current.is_none(),
                Condition::Equals(expected) => current == Some(expected),
            }
        })
    }

    /// Apply the changes of `op` in place, ignoring its conditions.
    pub fn apply(&mut self, op: &UpdateOp) {
        for (key, operation) in op.changes() {
            match (operation, key.revision()) {
                (Operation::SetMapEntry(value), Some(rev)) => {
                    self.maps
                        .entry(key.name().to_string())
                        .or_default()
                        .insert(rev, value.clone());
                }
                (Operation::RemoveMapEntry, Some(rev)) => {
                    if let Some(map) = self.maps.get_mut(key.name()) {
                        map.remove(&rev);
                        if map.is_empty() {
                            self.maps.remove(key.name());
                        }
                    }
                }
                (Operation::MaxRevision(value), Some(rev)) => {
                    let map = self.maps.entry(key.name().to_string()).or_default();
                    let newer = match map.get(&rev).and_then(|v| v.parse::<Revision>().ok()) {
                        Some(current) => value.is_newer_than(&current),
                        None => true,
                    };
                    if newer {
                        map.insert(rev, value.to_string());
                    }
                }
                (Operation::SetFlag(value), _) if key.name() == DELETED_ONCE => {
                    self.deleted_once = *value;
                }
                (operation, _) => {
                    tracing::warn!(
                        "Ignoring unsupported change {:?} on {} for {}",
                        operation,
                        key.name(),
                        self.id
                    );
                }
            }
        }
        self.mod_count += 1;
    }
}

impl DocumentView for NodeDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keys(&self) -> Vec<&str> {
        self.maps.keys().map(String::as_str).collect()
    }

    fn local_map(&self, property: &str) -> Option<&RevisionMap> {
        self.maps.get(property)
    }

    fn was_deleted_once(&self) -> bool {
        self.deleted_once
    }
}

/// Builder for documents in a given state, mainly for tests and fixtures.
pub struct NodeDocumentBuilder {
    doc: NodeDocument,
}

impl NodeDocumentBuilder {
    /// Add a map entry.
    pub fn entry(mut self, property: &str, revision: Revision, value: impl Into<String>) -> Self {
        self.doc
            .maps
            .entry(property.to_string())
            .or_default()
            .insert(revision, value.into());
        self
    }

    pub fn deleted(self, revision: Revision, deleted: bool) -> Self {
        self.entry(DELETED, revision, deleted.to_string())
    }

    pub fn commit_root(self, revision: Revision, depth: usize) -> Self {
        self.entry(COMMIT_ROOT, revision, depth.to_string())
    }

    pub fn revision(self, revision: Revision, commit_value: impl Into<String>) -> Self {
        self.entry(REVISIONS, revision, commit_value)
    }

    pub fn branch_commit(self, revision: Revision) -> Self {
        self.entry(BRANCH_COMMITS, revision, "true")
    }

    pub fn deleted_once(mut self, deleted_once: bool) -> Self {
        self.doc.deleted_once = deleted_once;
        self
    }

    pub fn build(self) -> NodeDocument {
        self.doc
    }
}
