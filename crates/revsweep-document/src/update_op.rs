//! Conditional update operations on a single document.
//!
//! An `UpdateOp` is plain data: a set of changes and a set of conditions
//! targeted at one document id. A store applies it atomically, and only if
//! every condition holds.

use crate::document::{BRANCH_COMMITS, COMMIT_ROOT, DELETED_ONCE, REVISIONS, SWEEP_REVISION};
use revsweep_revision::Revision;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// The target of a change or condition: a property name, and for map
/// properties the revision of the entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    name: String,
    revision: Option<Revision>,
}

impl Key {
    pub fn new(name: impl Into<String>, revision: Option<Revision>) -> Self {
        Key {
            name: name.into(),
            revision,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }
}

/// A single change to a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Set the map entry for the key's revision.
    SetMapEntry(String),
    /// Remove the map entry for the key's revision.
    RemoveMapEntry,
    /// Set a boolean flag on the document.
    SetFlag(bool),
    /// Set the map entry to the given revision unless the stored revision is
    /// already newer.
    MaxRevision(Revision),
}

/// A condition that must hold for the update to be applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// The map entry exists.
    Exists,
    /// The map entry does not exist.
    NotExists,
    /// The map entry exists and has the given value.
    Equals(String),
}

/// A set of changes and conditions for one document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOp {
    id: String,
    is_new: bool,
    #[serde(with = "entries")]
    changes: BTreeMap<Key, Operation>,
    #[serde(with = "entries")]
    conditions: BTreeMap<Key, Condition>,
}

// Keys are structs, so maps are written as lists of pairs.
mod entries {
    use super::*;

    pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize,
        V: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
    {
        let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl UpdateOp {
    /// Create an empty update for the document with the given id. `is_new`
    /// allows a store to create the document if it does not exist.
    pub fn new(id: impl Into<String>, is_new: bool) -> Self {
        UpdateOp {
            id: id.into(),
            is_new,
            changes: BTreeMap::new(),
            conditions: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether this operation changes anything. Conditions alone are not
    /// changes.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changes(&self) -> impl Iterator<Item = (&Key, &Operation)> {
        self.changes.iter()
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&Key, &Condition)> {
        self.conditions.iter()
    }

    /// Look up the change for a key.
    pub fn change(&self, name: &str, revision: Option<Revision>) -> Option<&Operation> {
        self.changes.get(&Key::new(name, revision))
    }

    /// Look up the condition for a key.
    pub fn condition(&self, name: &str, revision: Option<Revision>) -> Option<&Condition> {
        self.conditions.get(&Key::new(name, revision))
    }

    pub fn set_map_entry(&mut self, property: &str, revision: Revision, value: impl Into<String>) {
        self.changes.insert(
            Key::new(property, Some(revision)),
            Operation::SetMapEntry(value.into()),
        );
    }

    pub fn remove_map_entry(&mut self, property: &str, revision: Revision) {
        self.changes
            .insert(Key::new(property, Some(revision)), Operation::RemoveMapEntry);
    }

    pub fn set_flag(&mut self, property: &str, value: bool) {
        self.changes
            .insert(Key::new(property, None), Operation::SetFlag(value));
    }

    pub fn max_revision(&mut self, property: &str, key: Revision, value: Revision) {
        self.changes
            .insert(Key::new(property, Some(key)), Operation::MaxRevision(value));
    }

    pub fn contains_map_entry(&mut self, property: &str, revision: Revision, exists: bool) {
        let condition = if exists {
            Condition::Exists
        } else {
            Condition::NotExists
        };
        self.conditions
            .insert(Key::new(property, Some(revision)), condition);
    }

    pub fn equals(&mut self, property: &str, revision: Revision, value: impl Into<String>) {
        self.conditions.insert(
            Key::new(property, Some(revision)),
            Condition::Equals(value.into()),
        );
    }

    // Store-level vocabulary for the system maps.

    pub fn remove_commit_root(&mut self, revision: Revision) {
        self.remove_map_entry(COMMIT_ROOT, revision);
    }

    pub fn remove_revision(&mut self, revision: Revision) {
        self.remove_map_entry(REVISIONS, revision);
    }

    pub fn set_commit_root(&mut self, revision: Revision, depth: usize) {
        self.set_map_entry(COMMIT_ROOT, revision, depth.to_string());
    }

    pub fn set_revision(&mut self, revision: Revision, commit_value: impl Into<String>) {
        self.set_map_entry(REVISIONS, revision, commit_value);
    }

    pub fn set_branch_commit(&mut self, revision: Revision) {
        self.set_map_entry(BRANCH_COMMITS, revision, "true");
    }

    pub fn set_deleted_once(&mut self) {
        self.set_flag(DELETED_ONCE, true);
    }

    /// Record the sweep checkpoint for `revision.cluster_id()`. The entry is
    /// keyed by a zero revision of that cluster member and never moves
    /// backwards.
    pub fn set_sweep_revision(&mut self, revision: Revision) {
        let key = Revision::new(0, 0, revision.cluster_id());
        self.max_revision(SWEEP_REVISION, key, revision);
    }
}
