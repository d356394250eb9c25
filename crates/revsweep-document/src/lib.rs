//! # revsweep-document
//!
//! Document layer for the revsweep MVCC document store.
//!
//! This crate provides:
//! - `NodeDocument`: per-path, multi-revision property maps
//! - `DocumentView`: the read-only capability the sweeper works against
//! - `UpdateOp`: conditional, atomic updates of one document
//! - `DocumentStore` and the in-memory `MemoryDocumentStore`
//!
//! ## Example
//!
//! ```rust
//! use revsweep_document::{DocumentStore, DocumentView, MemoryDocumentStore, NodeDocument, Path, UpdateOp};
//! use revsweep_revision::Revision;
//!
//! let rev = Revision::new(100, 0, 1);
//! let doc = NodeDocument::builder(Path::new("/a/b").unwrap())
//!     .entry("p", rev, "\"v1\"")
//!     .build();
//! let store = MemoryDocumentStore::with_documents([doc]);
//!
//! // Remove the entry, but only if it is still there
//! let mut op = UpdateOp::new("2:/a/b", false);
//! op.contains_map_entry("p", rev, true);
//! op.remove_map_entry("p", rev);
//! store.find_and_update(&op).unwrap();
//!
//! let doc = store.find("2:/a/b").unwrap().unwrap();
//! assert!(doc.local_map("p").is_none());
//! ```

pub mod document;
pub mod error;
pub mod path;
pub mod store;
pub mod update_op;

pub use document::{
    is_commit_root_entry, is_deleted_entry, is_property_name, is_revisions_entry, DocumentView,
    NodeDocument, NodeDocumentBuilder, RevisionMap, BRANCH_COMMITS, COMMIT_ROOT, DELETED,
    DELETED_ONCE, NOT_DELETED, REVISIONS, SWEEP_REVISION,
};
pub use error::StoreError;
pub use path::Path;
pub use store::{DocumentStore, MemoryDocumentStore};
pub use update_op::{Condition, Key, Operation, UpdateOp};
