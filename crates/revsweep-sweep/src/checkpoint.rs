//! Persisted sweep revisions.
//!
//! After a sweep the caller records the returned revision on the root
//! document, one entry per cluster member. The entry only moves forward.

use crate::error::Result;
use revsweep_document::{DocumentStore, DocumentView, Path, UpdateOp, SWEEP_REVISION};
use revsweep_revision::{Revision, RevisionVector};

/// Record `revision` as the sweep revision of its cluster member.
pub fn persist_sweep_revision<S: DocumentStore + ?Sized>(store: &S, revision: Revision) -> Result<()> {
    let mut op = UpdateOp::new(Path::root().to_id(), true);
    op.set_sweep_revision(revision);
    store.create_or_update(&op)?;
    Ok(())
}

/// Read the sweep revisions of all cluster members.
pub fn sweep_revisions<S: DocumentStore + ?Sized>(store: &S) -> Result<RevisionVector> {
    let root = match store.find_path(&Path::root())? {
        Some(root) => root,
        None => return Ok(RevisionVector::new()),
    };
    let mut revisions = Vec::new();
    if let Some(map) = root.local_map(SWEEP_REVISION) {
        for value in map.values() {
            revisions.push(value.parse::<Revision>()?);
        }
    }
    Ok(RevisionVector::from_revisions(revisions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use revsweep_document::{MemoryDocumentStore, NodeDocument};

    #[test]
    fn test_checkpoint_moves_forward_only() {
        let store = MemoryDocumentStore::new();
        assert!(sweep_revisions(&store).unwrap().is_empty());

        persist_sweep_revision(&store, Revision::new(500, 0, 1)).unwrap();
        persist_sweep_revision(&store, Revision::new(300, 0, 2)).unwrap();
        persist_sweep_revision(&store, Revision::new(400, 0, 1)).unwrap();

        let revisions = sweep_revisions(&store).unwrap();
        assert_eq!(revisions.revision(1), Some(Revision::new(500, 0, 1)));
        assert_eq!(revisions.revision(2), Some(Revision::new(300, 0, 2)));
    }

    #[test]
    fn test_malformed_checkpoint() {
        let root = NodeDocument::builder(Path::root())
            .entry(SWEEP_REVISION, Revision::new(0, 0, 1), "garbage")
            .build();
        let store = MemoryDocumentStore::with_documents([root]);
        assert!(matches!(sweep_revisions(&store), Err(SweepError::Revision(_))));
    }
}
