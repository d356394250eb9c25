//! Revision vector: one revision per cluster member.
//!
//! A revision vector is a node's view of global progress. The head revision
//! of the store is a revision vector, and so is the persisted set of sweep
//! checkpoints.

use crate::revision::{Revision, RevisionParseError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// An immutable mapping from cluster id to the latest known revision of
/// that cluster member.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RevisionVector {
    revisions: BTreeMap<u32, Revision>,
}

impl RevisionVector {
    /// Create an empty revision vector.
    pub fn new() -> Self {
        RevisionVector {
            revisions: BTreeMap::new(),
        }
    }

    /// Create a revision vector from revisions. If more than one revision is
    /// given for a cluster id, the newest one wins.
    pub fn from_revisions(revisions: impl IntoIterator<Item = Revision>) -> Self {
        let mut map: BTreeMap<u32, Revision> = BTreeMap::new();
        for rev in revisions {
            map.entry(rev.cluster_id())
                .and_modify(|current| {
                    if rev.is_newer_than(current) {
                        *current = rev;
                    }
                })
                .or_insert(rev);
        }
        RevisionVector { revisions: map }
    }

    /// Get the component for a cluster member, if that member was observed.
    pub fn revision(&self, cluster_id: u32) -> Option<Revision> {
        self.revisions.get(&cluster_id).copied()
    }

    /// Return a new vector with the component for `rev.cluster_id()` set to
    /// `rev`.
    pub fn update(&self, rev: Revision) -> RevisionVector {
        let mut revisions = self.revisions.clone();
        revisions.insert(rev.cluster_id(), rev);
        RevisionVector { revisions }
    }

    /// Return a new vector without a component for the given cluster id.
    pub fn remove(&self, cluster_id: u32) -> RevisionVector {
        let mut revisions = self.revisions.clone();
        revisions.remove(&cluster_id);
        RevisionVector { revisions }
    }

    /// Component-wise maximum by revision time.
    pub fn pmax(&self, other: &RevisionVector) -> RevisionVector {
        let mut revisions = self.revisions.clone();
        for (cluster_id, rev) in &other.revisions {
            let current = revisions.entry(*cluster_id).or_insert(*rev);
            if rev.is_newer_than(current) {
                *current = *rev;
            }
        }
        RevisionVector { revisions }
    }

    /// Returns true if `rev` is newer than the component of its cluster
    /// member, or if this vector has no component for that member.
    pub fn is_revision_newer(&self, rev: &Revision) -> bool {
        match self.revisions.get(&rev.cluster_id()) {
            Some(current) => rev.is_newer_than(current),
            None => true,
        }
    }

    /// Iterate over the components in cluster id order.
    pub fn iter(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.values()
    }

    /// Number of cluster members in this vector.
    pub fn dimensions(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl fmt::Display for RevisionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for rev in self.revisions.values() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}", rev)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for RevisionVector {
    type Err = RevisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut revisions = BTreeMap::new();
        if s.is_empty() {
            return Ok(RevisionVector { revisions });
        }
        for part in s.split(',') {
            let rev: Revision = part.parse()?;
            if revisions.insert(rev.cluster_id(), rev).is_some() {
                return Err(RevisionParseError::DuplicateClusterId(rev.cluster_id()));
            }
        }
        Ok(RevisionVector { revisions })
    }
}

impl FromIterator<Revision> for RevisionVector {
    fn from_iter<T: IntoIterator<Item = Revision>>(iter: T) -> Self {
        RevisionVector::from_revisions(iter)
    }
}

impl Serialize for RevisionVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RevisionVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
