//! Document store trait and an in-memory implementation.
//!
//! The store holds one document per tree path, keyed by document id, and
//! applies `UpdateOp`s atomically. Conditional updates are the only way the
//! sweeper and live commits are kept from overwriting each other.

use crate::document::{DocumentView, NodeDocument};
use crate::error::{Result, StoreError};
use crate::path::Path;
use crate::update_op::UpdateOp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Trait for stores of node documents.
pub trait DocumentStore: Send + Sync {
    /// Get a copy of the document with the given id.
    fn find(&self, id: &str) -> Result<Option<NodeDocument>>;

    /// Get a copy of the document for a path.
    fn find_path(&self, path: &Path) -> Result<Option<NodeDocument>> {
        self.find(&path.to_id())
    }

    /// Apply an update atomically if all its conditions hold.
    ///
    /// Returns the document as it was before the update, or `None` if a
    /// condition failed or the document does not exist and the update is not
    /// marked as new.
    fn find_and_update(&self, op: &UpdateOp) -> Result<Option<NodeDocument>>;

    /// Apply an update without checking conditions, creating the document if
    /// needed. Returns the previous state, if any.
    fn create_or_update(&self, op: &UpdateOp) -> Result<Option<NodeDocument>>;

    /// All documents carrying at least one revision entry created by the
    /// given cluster member, ordered by id.
    fn query_cluster_documents(&self, cluster_id: u32) -> Result<Vec<NodeDocument>>;
}

/// Snapshot of the store contents, for persistence and debugging.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    documents: BTreeMap<String, NodeDocument>,
}

/// In-memory implementation of DocumentStore.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    /// All documents indexed by id.
    documents: RwLock<BTreeMap<String, NodeDocument>>,

    /// When set, every call fails with `StoreError::Unavailable`.
    unavailable: AtomicBool,
}

impl MemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        MemoryDocumentStore {
            documents: RwLock::new(BTreeMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Create a store holding the given documents.
    pub fn with_documents(documents: impl IntoIterator<Item = NodeDocument>) -> Self {
        let store = Self::new();
        {
            let mut map = store.documents.write();
            for doc in documents {
                map.insert(doc.id().to_string(), doc);
            }
        }
        store
    }

    /// Simulate an outage: while set, every operation fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Remove a document, returning it.
    pub fn remove(&self, id: &str) -> Result<Option<NodeDocument>> {
        self.check_available()?;
        Ok(self.documents.write().remove(id))
    }

    /// Number of documents in the store.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Serialize all documents as JSON.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = StoreSnapshot {
            documents: self.documents.read().clone(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Restore a store from JSON written by `to_json`.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        Ok(MemoryDocumentStore {
            documents: RwLock::new(snapshot.documents),
            unavailable: AtomicBool::new(false),
        })
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find(&self, id: &str) -> Result<Option<NodeDocument>> {
        self.check_available()?;
        Ok(self.documents.read().get(id).cloned())
    }

    fn find_and_update(&self, op: &UpdateOp) -> Result<Option<NodeDocument>> {
        self.check_available()?;
        let mut documents = self.documents.write();
        match documents.get_mut(op.id()) {
            Some(doc) => {
                if !doc.check_conditions(op) {
                    tracing::debug!("Conditions not met for update on {}", op.id());
                    return Ok(None);
                }
                let before = doc.clone();
                doc.apply(op);
                Ok(Some(before))
            }
            None if op.is_new() => {
                let mut doc = NodeDocument::from_id(op.id())?;
                if !doc.check_conditions(op) {
                    return Ok(None);
                }
                doc.apply(op);
                documents.insert(op.id().to_string(), doc);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn create_or_update(&self, op: &UpdateOp) -> Result<Option<NodeDocument>> {
        self.check_available()?;
        let mut documents = self.documents.write();
        if let Some(doc) = documents.get_mut(op.id()) {
            let before = doc.clone();
            doc.apply(op);
            return Ok(Some(before));
        }
        let mut doc = NodeDocument::from_id(op.id())?;
        doc.apply(op);
        documents.insert(op.id().to_string(), doc);
        Ok(None)
    }

    fn query_cluster_documents(&self, cluster_id: u32) -> Result<Vec<NodeDocument>> {
        self.check_available()?;
        Ok(self
            .documents
            .read()
            .values()
            .filter(|doc| !doc.revisions_of(cluster_id).is_empty())
            .cloned()
            .collect())
    }
}
