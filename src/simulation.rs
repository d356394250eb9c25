use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revsweep_document::{DocumentStore, DocumentView, MemoryDocumentStore, NodeDocument, Path, UpdateOp};
use revsweep_revision::{Revision, RevisionVector};
use revsweep_sweep::{run_sweep, SweepConfig, SweepError, SweepOutcome, StoreRevisionContext, SystemClock};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Statistics collected during a crash and recovery run
#[derive(Clone, Debug, Default)]
pub struct RecoveryStats {
    pub cluster_members: usize,
    pub writes_per_member: usize,
    pub crashed_members: usize,
    pub documents: usize,
    pub reverted_changes: u64,
    pub branch_commits_marked: u64,
    pub rejected: u64,
    pub resweep_updates: u64,
    pub leftovers: usize,
    pub total_time: Duration,
}

impl RecoveryStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Recovery Statistics                           ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Cluster Members:           {:>30} ║", self.cluster_members);
        println!("║  Writes per Member:         {:>30} ║", self.writes_per_member);
        println!("║  Crashed Members:           {:>30} ║", self.crashed_members);
        println!("║  Documents in Store:        {:>30} ║", self.documents);
        println!("║  Reverted Changes:          {:>30} ║", self.reverted_changes);
        println!("║  Branch Commits Marked:     {:>30} ║", self.branch_commits_marked);
        println!("║  Rejected Corrections:      {:>30} ║", self.rejected);
        println!("║  Updates on Second Sweep:   {:>30} ║", self.resweep_updates);
        println!("║  Uncommitted Leftovers:     {:>30} ║", self.leftovers);
        println!("║  Total Time:                {:>29}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// What a cluster member does in one write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Write {
    /// A change committed on trunk.
    Trunk,

    /// A change whose commit never completed.
    Uncommitted,

    /// A node creation whose commit never completed.
    FailedCreation,

    /// A branch commit merged into trunk, written before branch markers.
    MergedBranch,
}

/// Generator for the writes of one cluster member. Members that crash stop
/// committing after `crash_after` writes and leave every later change
/// uncommitted.
fn write_generator(
    cluster_id: u32,
    num_writes: usize,
    num_paths: usize,
    crash_after: Option<usize>,
) -> impl Stream<Item = (usize, Write)> {
    stream! {
        let mut rng = StdRng::seed_from_u64(cluster_id as u64);
        for i in 0..num_writes {
            let path = rng.gen_range(0..num_paths);
            let write = match crash_after {
                Some(n) if i >= n => {
                    if rng.gen_bool(0.3) { Write::FailedCreation } else { Write::Uncommitted }
                }
                _ if rng.gen_bool(0.2) => Write::MergedBranch,
                _ => Write::Trunk,
            };
            yield (path, write);
        }
    }
}

/// Apply one write of a cluster member to the store.
fn apply_write(
    store: &MemoryDocumentStore,
    cluster_id: u32,
    ts: u64,
    path: usize,
    write: Write,
) -> Result<(), SweepError> {
    let rev = Revision::new(ts, 0, cluster_id);
    let value = format!("\"{}-{}\"", cluster_id, ts);
    let op = match write {
        Write::Trunk => {
            let mut op = UpdateOp::new(Path::new(&format!("/n{}", path))?.to_id(), true);
            op.set_map_entry("p", rev, value);
            op.set_revision(rev, "c");
            op
        }
        Write::Uncommitted => {
            let mut op = UpdateOp::new(Path::new(&format!("/n{}", path))?.to_id(), true);
            op.set_map_entry("p", rev, value);
            op.set_commit_root(rev, 0);
            op
        }
        Write::FailedCreation => {
            let mut op = UpdateOp::new(Path::new(&format!("/c{}-{}", cluster_id, ts))?.to_id(), true);
            op.set_map_entry(revsweep_document::DELETED, rev, "false");
            op.set_commit_root(rev, 0);
            op
        }
        Write::MergedBranch => {
            let merge = Revision::new(ts + 1, 0, cluster_id);
            let mut op = UpdateOp::new(Path::new(&format!("/n{}", path))?.to_id(), true);
            op.set_map_entry("p", rev, value);
            op.set_revision(rev, format!("c-{}", merge));
            op
        }
    };
    store.create_or_update(&op)?;
    Ok(())
}

/// Entries of a cluster member still recorded with a commit root but never
/// committed on it.
fn uncommitted_leftovers(store: &MemoryDocumentStore, cluster_id: u32) -> Result<usize, SweepError> {
    let root = store.find_path(&Path::root())?;
    let committed = root.as_ref().and_then(|r| r.local_revisions());
    Ok(store
        .query_cluster_documents(cluster_id)?
        .iter()
        .flat_map(|doc| doc.local_commit_root().into_iter().flat_map(|m| m.keys().copied()).collect::<Vec<_>>())
        .filter(|rev| rev.cluster_id() == cluster_id)
        .filter(|rev| committed.map_or(true, |c| !c.contains_key(rev)))
        .count())
}

async fn recover(
    store: &Arc<MemoryDocumentStore>,
    heads: &[(u32, u64)],
) -> Result<Vec<SweepOutcome>, SweepError> {
    let mut handles = vec![];
    for &(cluster_id, ts) in heads {
        let store = Arc::clone(store);
        let handle = tokio::task::spawn_blocking(move || {
            let head = RevisionVector::from_revisions([Revision::new(ts, 0, cluster_id)]);
            let context = StoreRevisionContext::new(store, cluster_id, head, Arc::new(SystemClock));
            run_sweep(context, SweepConfig::recovery())
        });
        handles.push(handle);
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome?),
            Err(e) => tracing::error!("Recovery task failed: {}", e),
        }
    }
    Ok(outcomes)
}

/// Let every cluster member write concurrently, crash some of them and run
/// their recovery sweeps in parallel against the shared store.
pub async fn crash_and_recover(
    num_members: usize,
    writes_per_member: usize,
    num_crashed: usize,
) -> Result<RecoveryStats, SweepError> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Crash and Recovery Simulation                       ║");
    println!("║  Members: {} | Writes/Member: {} | Crashed: {} ║",
             num_members, writes_per_member, num_crashed);
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let num_paths = writes_per_member.max(1);

    let root = NodeDocument::builder(Path::root())
        .deleted(Revision::new(1, 0, 1), false)
        .revision(Revision::new(1, 0, 1), "c")
        .build();
    let store = Arc::new(MemoryDocumentStore::with_documents([root]));

    println!("\n[Phase 1/3] Cluster members writing...");

    let mut handles = vec![];
    for idx in 0..num_members {
        let cluster_id = idx as u32 + 1;
        let crash_after = (idx < num_crashed).then_some(writes_per_member * 3 / 4);
        let store = Arc::clone(&store);
        let handle = tokio::spawn(async move {
            let mut writes = Box::pin(write_generator(cluster_id, writes_per_member, num_paths, crash_after));
            let mut ts = 10u64;
            while let Some((path, write)) = writes.next().await {
                // merged branches take two revisions
                ts += 2;
                apply_write(&store, cluster_id, ts, path, write)?;
                if ts % 100 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            Ok::<_, SweepError>((cluster_id, ts))
        });
        handles.push(handle);
    }

    let mut heads = vec![];
    for (idx, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(result) => {
                let head = result?;
                if idx < num_crashed {
                    heads.push(head);
                }
            }
            Err(e) => tracing::error!("Writer task failed: {}", e),
        }
    }

    println!("[Phase 1/3] ✓ Completed");
    println!("[Phase 2/3] Recovering crashed members...");

    let outcomes = recover(&store, &heads).await?;
    let mut stats = RecoveryStats {
        cluster_members: num_members,
        writes_per_member,
        crashed_members: heads.len(),
        ..Default::default()
    };
    for outcome in &outcomes {
        stats.reverted_changes += outcome.stats.reverted_changes;
        stats.branch_commits_marked += outcome.stats.branch_commits_marked;
        stats.rejected += outcome.rejected;
    }

    println!("[Phase 2/3] ✓ Completed");
    println!("[Phase 3/3] Sweeping a restored snapshot again...");

    // corrections and sweep revisions must survive a snapshot round trip
    let store = Arc::new(MemoryDocumentStore::from_json(&store.to_json()?)?);
    for outcome in recover(&store, &heads).await? {
        stats.resweep_updates += outcome.stats.documents_updated;
    }
    for &(cluster_id, _) in &heads {
        stats.leftovers += uncommitted_leftovers(&store, cluster_id)?;
    }
    stats.documents = store.len();
    stats.total_time = start.elapsed();

    println!("[Phase 3/3] ✓ Completed");
    Ok(stats)
}
