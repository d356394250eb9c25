//! Revision context: what a sweeper needs to know about its cluster member.

use crate::clock::Clock;
use revsweep_document::{DocumentStore, DocumentView, StoreError};
use revsweep_revision::{is_committed, Revision, RevisionVector};
use std::sync::Arc;

/// Supplies the cluster id, head revision, clock and commit values.
pub trait RevisionContext {
    /// The cluster member this context belongs to.
    fn cluster_id(&self) -> u32;

    /// The current head revision.
    fn head_revision(&self) -> RevisionVector;

    /// The commit value of `revision` for a change on `doc`, or `None` if
    /// no commit record exists.
    fn commit_value(
        &self,
        revision: &Revision,
        doc: &dyn DocumentView,
    ) -> Result<Option<String>, StoreError>;

    fn clock(&self) -> &dyn Clock;
}

/// A revision context that resolves commit values from a document store.
///
/// The commit record of a revision is either on the changed document itself
/// (`_revisions`) or on the ancestor at the depth given by `_commitRoot`.
pub struct StoreRevisionContext<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    cluster_id: u32,
    head: RevisionVector,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore + ?Sized> StoreRevisionContext<S> {
    pub fn new(store: Arc<S>, cluster_id: u32, head: RevisionVector, clock: Arc<dyn Clock>) -> Self {
        StoreRevisionContext {
            store,
            cluster_id,
            head,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: DocumentStore + ?Sized> RevisionContext for StoreRevisionContext<S> {
    fn cluster_id(&self) -> u32 {
        self.cluster_id
    }

    fn head_revision(&self) -> RevisionVector {
        self.head.clone()
    }

    fn commit_value(
        &self,
        revision: &Revision,
        doc: &dyn DocumentView,
    ) -> Result<Option<String>, StoreError> {
        if let Some(value) = doc.local_revisions().and_then(|m| m.get(revision)) {
            return Ok(Some(value.clone()).filter(|v| is_committed(v)));
        }

        let depth = match doc.local_commit_root().and_then(|m| m.get(revision)) {
            Some(depth) => depth,
            None => return Ok(None),
        };
        let depth: usize = match depth.parse() {
            Ok(depth) => depth,
            Err(_) => {
                tracing::warn!(
                    "Malformed commit root '{}' on {} @ {}",
                    depth,
                    doc.id(),
                    revision
                );
                return Ok(None);
            }
        };

        let root_path = match doc.path().ancestor_at_depth(depth) {
            Some(path) if &path != doc.path() => path,
            _ => return Ok(None),
        };
        let commit_root = match self.store.find_path(&root_path)? {
            Some(root) => root,
            None => return Ok(None),
        };
        Ok(commit_root
            .local_revisions()
            .and_then(|m| m.get(revision))
            .filter(|v| is_committed(v))
            .cloned())
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use revsweep_document::{MemoryDocumentStore, NodeDocument, Path};

    fn context(store: MemoryDocumentStore) -> StoreRevisionContext<MemoryDocumentStore> {
        let head = RevisionVector::from_revisions([Revision::new(200, 0, 1)]);
        StoreRevisionContext::new(Arc::new(store), 1, head, Arc::new(VirtualClock::new(0)))
    }

    #[test]
    fn test_commit_value_on_document() {
        let rev = Revision::new(100, 0, 1);
        let doc = NodeDocument::builder(Path::new("/a").unwrap())
            .entry("p", rev, "\"v\"")
            .revision(rev, "c")
            .build();
        let ctx = context(MemoryDocumentStore::new());
        assert_eq!(ctx.commit_value(&rev, &doc).unwrap(), Some("c".to_string()));
        assert_eq!(ctx.commit_value(&Revision::new(150, 0, 1), &doc).unwrap(), None);
    }

    #[test]
    fn test_commit_value_on_commit_root() {
        let committed = Revision::new(100, 0, 1);
        let pending = Revision::new(110, 0, 1);
        let root = NodeDocument::builder(Path::root())
            .revision(committed, "c")
            .revision(pending, "b6e-0-1")
            .build();
        let doc = NodeDocument::builder(Path::new("/a/b").unwrap())
            .entry("p", committed, "\"v1\"")
            .commit_root(committed, 0)
            .entry("p", pending, "\"v2\"")
            .commit_root(pending, 0)
            .build();

        let ctx = context(MemoryDocumentStore::with_documents([root]));
        assert_eq!(ctx.commit_value(&committed, &doc).unwrap(), Some("c".to_string()));
        assert_eq!(ctx.commit_value(&pending, &doc).unwrap(), None);
    }

    #[test]
    fn test_missing_commit_root_document() {
        let rev = Revision::new(100, 0, 1);
        let doc = NodeDocument::builder(Path::new("/a/b").unwrap())
            .entry("p", rev, "\"v1\"")
            .commit_root(rev, 1)
            .build();
        let ctx = context(MemoryDocumentStore::new());
        assert_eq!(ctx.commit_value(&rev, &doc).unwrap(), None);
    }

    #[test]
    fn test_store_failure_propagates() {
        let rev = Revision::new(100, 0, 1);
        let doc = NodeDocument::builder(Path::new("/a/b").unwrap())
            .commit_root(rev, 0)
            .build();
        let store = MemoryDocumentStore::new();
        store.set_unavailable(true);
        let ctx = context(store);
        assert!(matches!(
            ctx.commit_value(&rev, &doc),
            Err(StoreError::Unavailable(_))
        ));
    }
}
