//! # revsweep-revision
//!
//! Revision types for the revsweep MVCC document store.
//!
//! This crate provides:
//! - `Revision`: a logical timestamp (wall clock, counter, cluster id)
//! - `RevisionVector`: one revision per cluster member, e.g. the head
//! - `CommitValue`: the resolved commit outcome of a revision
//!
//! ## Example
//!
//! ```rust
//! use revsweep_revision::{Revision, RevisionVector};
//!
//! let head = RevisionVector::from_revisions([Revision::new(200, 0, 1)]);
//! let rev: Revision = "r64-0-1".parse().unwrap();
//!
//! assert_eq!(rev.timestamp(), 100);
//! assert!(!head.is_revision_newer(&rev));
//! assert_eq!(head.revision(2), None);
//! ```

mod commit;
mod revision;
mod vector;

pub use commit::{is_committed, resolve_commit_revision, CommitValue, MERGED_BRANCH_PREFIX, TRUNK_COMMIT};
pub use revision::{Revision, RevisionParseError};
pub use vector::RevisionVector;
