//! Commit values stored in the `_revisions` map of a commit root document.
//!
//! A trunk commit is recorded as `c`. A branch that was merged is recorded
//! as `c-<merge revision>`. Anything else means the revision is not
//! committed.

use crate::revision::Revision;

/// Value written for a revision committed on trunk.
pub const TRUNK_COMMIT: &str = "c";

/// Prefix of the value written for a merged branch commit.
pub const MERGED_BRANCH_PREFIX: &str = "c-";

/// The resolved outcome of a revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitValue {
    /// Committed on trunk with its own revision.
    Trunk,
    /// A branch commit that became visible with the given merge revision.
    MergedBranch(Revision),
}

impl CommitValue {
    /// Parse a stored commit value. Returns `None` for values that do not
    /// denote a commit or carry a malformed merge revision.
    pub fn parse(value: &str) -> Option<CommitValue> {
        if value == TRUNK_COMMIT {
            return Some(CommitValue::Trunk);
        }
        value
            .strip_prefix(MERGED_BRANCH_PREFIX)
            .and_then(|rev| rev.parse().ok())
            .map(CommitValue::MergedBranch)
    }

    /// The string form stored in the `_revisions` map.
    pub fn to_value(&self) -> String {
        match self {
            CommitValue::Trunk => TRUNK_COMMIT.to_string(),
            CommitValue::MergedBranch(rev) => format!("{}{}", MERGED_BRANCH_PREFIX, rev),
        }
    }

    /// The revision at which the change identified by `rev` became visible.
    pub fn commit_revision(&self, rev: &Revision) -> Revision {
        match self {
            CommitValue::Trunk => *rev,
            CommitValue::MergedBranch(merge) => *merge,
        }
    }
}

/// Returns true if the stored value marks a committed change.
pub fn is_committed(value: &str) -> bool {
    value.starts_with(TRUNK_COMMIT)
}

/// Resolve the commit revision of `rev` given its commit value.
///
/// A trunk commit resolves to `rev` itself, a merged branch commit resolves
/// to its merge revision. Values that cannot be parsed resolve to `rev`.
pub fn resolve_commit_revision(rev: &Revision, commit_value: &str) -> Revision {
    CommitValue::parse(commit_value)
        .map(|cv| cv.commit_revision(rev))
        .unwrap_or(*rev)
}
