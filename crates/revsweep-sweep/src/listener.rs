//! Receivers of sweep corrections.

use revsweep_document::{
    Condition, DocumentStore, DocumentView, Path, StoreError, UpdateOp, COMMIT_ROOT,
};
use revsweep_revision::is_committed;
use std::sync::Arc;

/// An ordered batch of corrections, in the order the documents were swept.
pub type SweepBatch = Vec<(Path, UpdateOp)>;

/// Receives batches of corrections from a sweeper.
pub trait SweepListener {
    /// Apply a batch. Every update should be applied conditionally so it is
    /// rejected if the document changed since the sweeper observed it.
    fn sweep_update(&mut self, updates: SweepBatch) -> Result<(), StoreError>;
}

impl<F> SweepListener for F
where
    F: FnMut(SweepBatch) -> Result<(), StoreError>,
{
    fn sweep_update(&mut self, updates: SweepBatch) -> Result<(), StoreError> {
        self(updates)
    }
}

/// Applies corrections to a document store with conditional updates.
///
/// Conditions on the swept document cannot see a commit recorded on an
/// ancestor commit root, so before each update the commit roots named by
/// its `_commitRoot` conditions are read again. A correction whose revision
/// got committed there in the meantime is rejected.
pub struct StoreSweepListener<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    applied: u64,
    rejected: u64,
}

impl<S: DocumentStore + ?Sized> StoreSweepListener<S> {
    pub fn new(store: Arc<S>) -> Self {
        StoreSweepListener {
            store,
            applied: 0,
            rejected: 0,
        }
    }

    /// Number of updates the store applied.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Number of updates the store rejected because the document changed
    /// concurrently.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Whether a revision reverted by `op` was committed on its commit root
    /// after the sweeper read the document.
    fn committed_since_sweep(&self, path: &Path, op: &UpdateOp) -> Result<bool, StoreError> {
        for (key, condition) in op.conditions() {
            let (rev, depth) = match (key.revision(), condition) {
                (Some(rev), Condition::Equals(depth)) if key.name() == COMMIT_ROOT => (rev, depth),
                _ => continue,
            };
            let root = match depth.parse::<usize>().ok().and_then(|d| path.ancestor_at_depth(d)) {
                Some(root) => root,
                None => continue,
            };
            let committed = self
                .store
                .find_path(&root)?
                .and_then(|doc| doc.local_revisions().and_then(|m| m.get(&rev)).cloned())
                .map_or(false, |value| is_committed(&value));
            if committed {
                tracing::debug!("{} @ {} committed on {} since it was swept", path, rev, root);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<S: DocumentStore + ?Sized> SweepListener for StoreSweepListener<S> {
    fn sweep_update(&mut self, updates: SweepBatch) -> Result<(), StoreError> {
        for (path, op) in &updates {
            if self.committed_since_sweep(path, op)? {
                self.rejected += 1;
                continue;
            }
            match self.store.find_and_update(op)? {
                Some(_) => self.applied += 1,
                None => {
                    tracing::debug!("Sweep update on {} rejected, document changed", path);
                    self.rejected += 1;
                }
            }
        }
        Ok(())
    }
}
