//! Runs a complete sweep of one cluster member against a document store.

use crate::checkpoint::{persist_sweep_revision, sweep_revisions};
use crate::config::SweepConfig;
use crate::context::{RevisionContext, StoreRevisionContext};
use crate::error::Result;
use crate::listener::StoreSweepListener;
use crate::sweeper::{SweepStats, Sweeper};
use revsweep_document::DocumentStore;
use revsweep_revision::Revision;
use std::sync::Arc;

/// Result of a store-backed sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// The new sweep revision, persisted on the root document.
    pub sweep_revision: Option<Revision>,

    /// Counters of the run.
    pub stats: SweepStats,

    /// Corrections the store applied.
    pub applied: u64,

    /// Corrections the store rejected because documents changed.
    pub rejected: u64,
}

/// Sweep every document carrying a revision of the context's cluster member
/// newer than its last sweep revision, apply the corrections and persist the
/// new sweep revision.
pub fn run_sweep<S: DocumentStore + ?Sized>(
    context: StoreRevisionContext<S>,
    config: SweepConfig,
) -> Result<SweepOutcome> {
    config.validate()?;
    let store = Arc::clone(context.store());
    let cluster_id = context.cluster_id();

    let checkpoint = sweep_revisions(store.as_ref())?;
    let candidates = store.query_cluster_documents(cluster_id)?;
    tracing::info!(
        "Sweeping {} candidate documents for cluster node [{}] since {:?}",
        candidates.len(),
        cluster_id,
        checkpoint.revision(cluster_id).map(|r| r.to_string())
    );
    let documents = candidates.into_iter().filter(|doc| {
        doc.revisions_of(cluster_id)
            .iter()
            .any(|rev| checkpoint.is_revision_newer(rev))
    });

    let mut sweeper = Sweeper::new(context, config);
    let mut listener = StoreSweepListener::new(Arc::clone(&store));
    let sweep_revision = sweeper.sweep(documents, &mut listener)?;

    if let Some(rev) = sweep_revision {
        persist_sweep_revision(store.as_ref(), rev)?;
        tracing::info!(
            "Sweep on cluster node [{}] done, sweep revision is now {}",
            cluster_id,
            rev
        );
    }

    Ok(SweepOutcome {
        sweep_revision,
        stats: sweeper.stats().clone(),
        applied: listener.applied(),
        rejected: listener.rejected(),
    })
}
