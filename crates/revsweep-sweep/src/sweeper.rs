//! The document sweeper.
//!
//! A sweeper removes uncommitted changes of one cluster member from node
//! documents and marks merged branch commits. It only ever looks at revision
//! entries created by its own cluster member, so members can sweep
//! concurrently against the same store without coordination.
//!
//! A sweeper is not meant to be shared between threads: `sweep` takes
//! `&mut self` and the run counters are reset at the start of every run.

use crate::config::{PropertyFilter, SweepConfig};
use crate::context::RevisionContext;
use crate::error::Result;
use crate::listener::{SweepBatch, SweepListener};
use crate::progress::ProgressReporter;
use revsweep_document::{
    is_deleted_entry, DocumentView, UpdateOp, BRANCH_COMMITS, COMMIT_ROOT, NOT_DELETED, REVISIONS,
};
use revsweep_revision::{resolve_commit_revision, Revision, RevisionVector};
use std::collections::BTreeSet;

/// Counters of a single sweep run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Documents looked at.
    pub documents_scanned: u64,

    /// Documents for which a correction was produced.
    pub documents_updated: u64,

    /// Revision entries reverted.
    pub reverted_changes: u64,

    /// Revisions newly marked as branch commits.
    pub branch_commits_marked: u64,

    /// Batches handed to the listener.
    pub batches_delivered: u64,
}

/// Reverts uncommitted changes of one cluster member.
pub struct Sweeper<C: RevisionContext> {
    context: C,
    cluster_id: u32,
    head_revision: RevisionVector,
    config: SweepConfig,
    filter: PropertyFilter,
    stats: SweepStats,
}

impl<C: RevisionContext> Sweeper<C> {
    /// Create a sweeper for the cluster member of `context`.
    ///
    /// The head revision is read from the context once, here, and used for
    /// every later call to [`Sweeper::sweep`]. The head may lag behind the
    /// store as long as the swept documents reflect every change visible
    /// from it. Without `sweep_newer_than_head`, only uncommitted changes up
    /// to the head are reverted. With it, newer uncommitted changes are
    /// reverted too, which is only correct when the cluster member has no
    /// commit in progress, e.g. during its recovery.
    pub fn new(context: C, config: SweepConfig) -> Self {
        let cluster_id = context.cluster_id();
        let head_revision = context.head_revision();
        Sweeper {
            context,
            cluster_id,
            head_revision,
            config,
            filter: PropertyFilter::default(),
            stats: SweepStats::default(),
        }
    }

    /// Replace the filter selecting which properties are swept.
    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The head revision vector in use by this sweeper.
    pub fn head_revision(&self) -> &RevisionVector {
        &self.head_revision
    }

    /// The cluster member whose changes this sweeper corrects.
    pub fn cluster_id(&self) -> u32 {
        self.cluster_id
    }

    /// The configuration this sweeper was created with.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// The context commit values and time are read from.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Counters of the last run.
    pub fn stats(&self) -> &SweepStats {
        &self.stats
    }

    /// Sweep the documents and report corrections to the listener.
    ///
    /// Corrections are delivered in batches of at most `batch_size`, in the
    /// order of `documents`. Returns the new sweep revision for this cluster
    /// member, which the caller is responsible for persisting, or `None` if
    /// the head revision has no component for this cluster member.
    ///
    /// A failure to resolve a commit value or to apply a batch aborts the run.
    /// Batches already delivered are not rolled back.
    pub fn sweep<I, D, L>(&mut self, documents: I, listener: &mut L) -> Result<Option<Revision>>
    where
        I: IntoIterator<Item = D>,
        D: DocumentView,
        L: SweepListener + ?Sized,
    {
        self.stats = SweepStats::default();

        let head = match self.head_revision.revision(self.cluster_id) {
            Some(head) => head,
            None => {
                tracing::warn!(
                    "Head revision does not have an entry for clusterId {}. Sweeping of documents is skipped.",
                    self.cluster_id
                );
                return Ok(None);
            }
        };

        let batch_size = self.config.batch_size.max(1);
        let mut progress = ProgressReporter::new(
            self.cluster_id,
            self.config.progress_interval_ms,
            self.context.clock().now_millis(),
        );
        let mut batch: SweepBatch = Vec::with_capacity(batch_size);

        for doc in documents {
            let op = self.sweep_one(&doc, &head)?;
            self.stats.documents_scanned += 1;
            progress.document_scanned(self.context.clock().now_millis());

            if let Some(op) = op {
                self.stats.documents_updated += 1;
                batch.push((doc.path().clone(), op));
                if batch.len() >= batch_size {
                    let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    self.deliver(full, listener)?;
                }
            }
        }
        if !batch.is_empty() {
            self.deliver(batch, listener)?;
        }

        tracing::debug!("Document sweep finished");
        Ok(Some(head))
    }

    fn deliver<L: SweepListener + ?Sized>(&mut self, batch: SweepBatch, listener: &mut L) -> Result<()> {
        listener.sweep_update(batch)?;
        self.stats.batches_delivered += 1;
        Ok(())
    }

    /// Classify every entry of this cluster member on one document. Returns
    /// `None` if the document needs no correction.
    fn sweep_one<D: DocumentView>(&mut self, doc: &D, head: &Revision) -> Result<Option<UpdateOp>> {
        let mut op = UpdateOp::new(doc.id(), false);
        let branch_commits = doc.local_branch_commits();

        let properties: Vec<&str> = doc
            .keys()
            .into_iter()
            .filter(|p| self.filter.matches(p))
            .collect();

        for property in properties {
            let revisions: Vec<Revision> = match doc.local_map(property) {
                Some(map) => map
                    .keys()
                    .filter(|rev| rev.cluster_id() == self.cluster_id)
                    .copied()
                    .collect(),
                None => continue,
            };

            for rev in revisions {
                match self.commit_revision(doc, &rev)? {
                    None => self.uncommitted(doc, property, &rev, head, &branch_commits, &mut op),
                    Some(commit_rev) if commit_rev == rev => {
                        tracing::debug!("Committed change on {}, {} @ {}", op.id(), property, rev);
                    }
                    Some(commit_rev) => {
                        self.committed_branch(property, &rev, &commit_rev, head, &branch_commits, &mut op)
                    }
                }
            }
        }

        Ok(if op.has_changes() { Some(op) } else { None })
    }

    fn uncommitted<D: DocumentView>(
        &mut self,
        doc: &D,
        property: &str,
        rev: &Revision,
        head: &Revision,
        branch_commits: &BTreeSet<Revision>,
        op: &mut UpdateOp,
    ) {
        if rev.is_newer_than(head) && !self.config.sweep_newer_than_head {
            // left for a later sweep with a newer head
            tracing::debug!(
                "Uncommitted change on {}, {} @ {} newer than head {}",
                op.id(),
                property,
                rev,
                head
            );
            return;
        }

        if branch_commits.contains(rev) {
            // not yet merged branch commit
            tracing::debug!("Unmerged branch commit on {}, {} @ {}", op.id(), property, rev);
            return;
        }

        // Without a branch commit marker this may still be an unmerged branch
        // commit written before markers existed. Such a branch can no longer
        // be merged, so it is reverted like any other leftover.
        tracing::debug!("Uncommitted change on {}, {} @ {}", op.id(), property, rev);
        op.remove_map_entry(property, *rev);
        op.contains_map_entry(property, *rev, true);

        match doc.local_commit_root().and_then(|m| m.get(rev)) {
            Some(depth) => {
                op.remove_commit_root(*rev);
                op.equals(COMMIT_ROOT, *rev, depth.clone());
            }
            None => {
                op.remove_revision(*rev);
                match doc.local_revisions().and_then(|m| m.get(rev)) {
                    Some(value) => op.equals(REVISIONS, *rev, value.clone()),
                    None => op.contains_map_entry(REVISIONS, *rev, false),
                }
            }
        }

        // a failed node creation still counts as a node that existed
        if is_deleted_entry(property)
            && !doc.was_deleted_once()
            && doc.local_deleted().and_then(|m| m.get(rev)).map(String::as_str) == Some(NOT_DELETED)
        {
            op.set_deleted_once();
        }

        self.stats.reverted_changes += 1;
    }

    fn committed_branch(
        &mut self,
        property: &str,
        rev: &Revision,
        commit_rev: &Revision,
        head: &Revision,
        branch_commits: &BTreeSet<Revision>,
        op: &mut UpdateOp,
    ) {
        let newer_than_head = if commit_rev.is_newer_than(head) {
            " (newer than head)"
        } else {
            ""
        };
        tracing::debug!(
            "Committed branch change on {}, {} @ {}/{}{}",
            op.id(),
            property,
            rev,
            commit_rev,
            newer_than_head
        );

        if !branch_commits.contains(rev) && op.change(BRANCH_COMMITS, Some(*rev)).is_none() {
            op.set_branch_commit(*rev);
            op.contains_map_entry(BRANCH_COMMITS, *rev, false);
            self.stats.branch_commits_marked += 1;
        }
    }

    fn commit_revision<D: DocumentView>(&self, doc: &D, rev: &Revision) -> Result<Option<Revision>> {
        Ok(self
            .context
            .commit_value(rev, doc)?
            .map(|value| resolve_commit_revision(rev, &value)))
    }
}
