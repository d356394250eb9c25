//! Integration tests for the document store.
//!
//! These tests verify:
//! - Conditional updates behave as compare-and-set under contention
//! - A failed condition leaves the whole document untouched
//! - Applying an update is all-or-nothing across properties

use proptest::prelude::*;
use revsweep_document::{
    DocumentStore, DocumentView, MemoryDocumentStore, NodeDocument, Path, UpdateOp, REVISIONS,
};
use revsweep_revision::Revision;
use std::sync::Arc;
use std::thread;

fn node(path: &str) -> NodeDocument {
    NodeDocument::builder(Path::new(path).unwrap()).build()
}

#[test]
fn test_only_one_conditional_writer_wins() {
    let store = Arc::new(MemoryDocumentStore::with_documents([node("/a")]));
    let rev = Revision::new(100, 0, 1);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut op = UpdateOp::new("1:/a", false);
                op.contains_map_entry(REVISIONS, rev, false);
                op.set_revision(rev, format!("c-r{:x}-0-1", 200 + i));
                store.find_and_update(&op).unwrap().is_some()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);

    let doc = store.find("1:/a").unwrap().unwrap();
    assert_eq!(doc.local_revisions().unwrap().len(), 1);
    assert_eq!(doc.mod_count(), 1);
}

#[test]
fn test_failed_condition_changes_nothing() {
    let rev = Revision::new(100, 0, 1);
    let doc = NodeDocument::builder(Path::new("/a/b").unwrap())
        .entry("p", rev, "\"v1\"")
        .commit_root(rev, 0)
        .build();
    let store = MemoryDocumentStore::with_documents([doc.clone()]);

    let mut op = UpdateOp::new("2:/a/b", false);
    op.equals("_commitRoot", rev, "1");
    op.remove_map_entry("p", rev);
    op.remove_commit_root(rev);
    op.set_deleted_once();

    assert!(store.find_and_update(&op).unwrap().is_none());
    assert_eq!(store.find("2:/a/b").unwrap().unwrap(), doc);
}

#[test]
fn test_find_path() {
    let store = MemoryDocumentStore::with_documents([node("/a/b")]);
    let found = store.find_path(&Path::new("/a/b").unwrap()).unwrap();
    assert_eq!(found.unwrap().path().as_str(), "/a/b");
    assert!(store.find_path(&Path::root()).unwrap().is_none());
}

proptest! {
    #[test]
    fn update_is_all_or_nothing(
        entries in prop::collection::btree_map(0u64..50, "[a-z]{1,4}", 1..10),
        expect_present in any::<bool>(),
    ) {
        let mut builder = NodeDocument::builder(Path::new("/x").unwrap());
        for (ts, value) in &entries {
            builder = builder.entry("p", Revision::new(*ts, 0, 1), value.clone());
        }
        let original = builder.build();
        let store = MemoryDocumentStore::with_documents([original.clone()]);

        // Condition on an entry that never exists
        let missing = Revision::new(1000, 0, 1);
        let mut op = UpdateOp::new("1:/x", false);
        op.contains_map_entry("p", missing, expect_present);
        for ts in entries.keys() {
            op.remove_map_entry("p", Revision::new(*ts, 0, 1));
        }

        let applied = store.find_and_update(&op).unwrap().is_some();
        let stored = store.find("1:/x").unwrap().unwrap();
        prop_assert_eq!(applied, !expect_present);
        if applied {
            prop_assert!(stored.local_map("p").is_none());
        } else {
            prop_assert_eq!(stored, original);
        }
    }
}
