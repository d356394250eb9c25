//! # revsweep-sweep
//!
//! Revision sweep for the revsweep MVCC document store.
//!
//! This crate provides:
//! - `Sweeper`: reverts uncommitted changes of one cluster member and marks
//!   merged branch commits
//! - `RevisionContext`: cluster id, head revision, clock and commit values
//! - `SweepListener`: receives batches of corrections
//! - Sweep checkpoints persisted on the root document
//!
//! ## Architecture
//!
//! Each cluster member sweeps only its own revisions:
//! 1. The head revision is captured when the sweeper is created
//! 2. Every entry of the member is classified by its commit value
//! 3. Corrections are delivered in batches as conditional updates
//! 4. The returned head is persisted as the member's sweep revision
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use revsweep_document::{MemoryDocumentStore, NodeDocument, Path};
//! use revsweep_revision::{Revision, RevisionVector};
//! use revsweep_sweep::{run_sweep, StoreRevisionContext, SweepConfig, SystemClock};
//!
//! // A change of cluster member 1 that was never committed
//! let rev = Revision::new(100, 0, 1);
//! let doc = NodeDocument::builder(Path::new("/a/b").unwrap())
//!     .entry("p", rev, "\"v1\"")
//!     .build();
//! let store = Arc::new(MemoryDocumentStore::with_documents([doc]));
//!
//! let head = RevisionVector::from_revisions([Revision::new(200, 0, 1)]);
//! let context = StoreRevisionContext::new(store, 1, head, Arc::new(SystemClock));
//! let outcome = run_sweep(context, SweepConfig::default()).unwrap();
//!
//! assert_eq!(outcome.sweep_revision, Some(Revision::new(200, 0, 1)));
//! assert_eq!(outcome.applied, 1);
//! ```

mod agent;
mod checkpoint;
mod clock;
mod config;
mod context;
mod error;
mod listener;
mod progress;
mod sweeper;

pub use agent::{run_sweep, SweepOutcome};
pub use checkpoint::{persist_sweep_revision, sweep_revisions};
pub use clock::{Clock, SystemClock, VirtualClock};
pub use config::{PropertyFilter, SweepConfig, PROGRESS_INTERVAL_MS, SWEEP_BATCH_SIZE};
pub use context::{RevisionContext, StoreRevisionContext};
pub use error::SweepError;
pub use listener::{StoreSweepListener, SweepBatch, SweepListener};
pub use progress::format_duration;
pub use sweeper::{SweepStats, Sweeper};
