//! Logical timestamps identifying a single write.
//!
//! A revision is the triple (timestamp, counter, cluster id) plus a branch
//! flag. Revisions created by the same cluster member are totally ordered by
//! (timestamp, counter). Across members only the wall-clock component can be
//! compared, which is an approximation and never a causal order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing revisions or revision vectors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevisionParseError {
    #[error("Revision string is empty")]
    Empty,

    #[error("Unknown revision prefix in '{0}', expected 'r' or 'b'")]
    InvalidPrefix(String),

    #[error("Malformed revision '{0}'")]
    Malformed(String),

    #[error("Duplicate cluster id {0} in revision vector")]
    DuplicateClusterId(u32),
}

/// A logical timestamp for one write of one cluster member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Revision {
    /// Wall-clock time in milliseconds when the revision was created.
    timestamp: u64,
    /// Disambiguates revisions created within the same millisecond.
    counter: u32,
    /// The cluster member that created the revision.
    cluster_id: u32,
    /// Whether this revision belongs to a not yet merged branch.
    branch: bool,
}

impl Revision {
    /// Create a trunk revision.
    pub fn new(timestamp: u64, counter: u32, cluster_id: u32) -> Self {
        Revision {
            timestamp,
            counter,
            cluster_id,
            branch: false,
        }
    }

    /// Create a branch revision.
    pub fn new_branch(timestamp: u64, counter: u32, cluster_id: u32) -> Self {
        Revision {
            timestamp,
            counter,
            cluster_id,
            branch: true,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn cluster_id(&self) -> u32 {
        self.cluster_id
    }

    pub fn is_branch(&self) -> bool {
        self.branch
    }

    /// The same revision with the branch flag cleared.
    pub fn as_trunk(&self) -> Revision {
        Revision {
            branch: false,
            ..*self
        }
    }

    /// The same revision with the branch flag set.
    pub fn as_branch(&self) -> Revision {
        Revision {
            branch: true,
            ..*self
        }
    }

    /// Compare by revision time: timestamp, then counter, then cluster id.
    ///
    /// Use this for head-boundary checks only. Two revisions of different
    /// cluster members compare by their clocks, which are loosely synchronized.
    pub fn compare_revision_time(&self, other: &Revision) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.counter.cmp(&other.counter))
            .then(self.cluster_id.cmp(&other.cluster_id))
    }

    /// Returns true if this revision is strictly newer than `other` by
    /// revision time.
    pub fn is_newer_than(&self, other: &Revision) -> bool {
        self.compare_revision_time(other) == Ordering::Greater
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_revision_time(other)
            .then(self.branch.cmp(&other.branch))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.branch { 'b' } else { 'r' };
        write!(
            f,
            "{}{:x}-{:x}-{:x}",
            prefix, self.timestamp, self.counter, self.cluster_id
        )
    }
}

impl FromStr for Revision {
    type Err = RevisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let branch = match chars.next() {
            None => return Err(RevisionParseError::Empty),
            Some('r') => false,
            Some('b') => true,
            Some(_) => return Err(RevisionParseError::InvalidPrefix(s.to_string())),
        };

        let malformed = || RevisionParseError::Malformed(s.to_string());
        let mut parts = chars.as_str().split('-');
        let timestamp = parts
            .next()
            .and_then(|p| u64::from_str_radix(p, 16).ok())
            .ok_or_else(malformed)?;
        let counter = parts
            .next()
            .and_then(|p| u32::from_str_radix(p, 16).ok())
            .ok_or_else(malformed)?;
        let cluster_id = parts
            .next()
            .and_then(|p| u32::from_str_radix(p, 16).ok())
            .ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Revision {
            timestamp,
            counter,
            cluster_id,
            branch,
        })
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
