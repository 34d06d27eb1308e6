//! Render Scheduler.
//!
//! A render request enqueues the entity unless it is already pending, so any
//! number of writes within one tick collapse into one render. A checkpoint
//! takes the whole queue at once; requests made while it runs (from hooks or
//! templates) land in the next checkpoint.
//!
//! Dependency-triggered renders are deferred: each carries the checkpoint it
//! is due in, one after the checkpoint that renders the write's source. A
//! write made inside a checkpoint has its source rendered in the next one,
//! so the dependent waits for the one after that.

use indexmap::{IndexMap, IndexSet};

use super::entity::EntityId;
use crate::Error;

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    queue: IndexSet<EntityId>,
    /// Deferred dependents and the checkpoint each is due in.
    deferred: IndexMap<EntityId, u64>,
    checkpoint: u64,
}

impl Scheduler {
    /// Mark `id` pending. Returns false when it already was.
    pub(crate) fn request(&mut self, id: EntityId) -> bool {
        self.queue.insert(id)
    }

    /// Render `id` one checkpoint after the source written now renders.
    ///
    /// The source renders in checkpoint `checkpoint + 1` whether the write
    /// happens between checkpoints or during one, so the dependent is due in
    /// `checkpoint + 2`. Deferring again keeps the later due checkpoint.
    pub(crate) fn defer(&mut self, id: EntityId) {
        let due = self.checkpoint + 2;
        let entry = self.deferred.entry(id).or_insert(due);
        *entry = (*entry).max(due);
    }

    pub(crate) fn is_pending(&self, id: EntityId) -> bool {
        self.queue.contains(&id)
    }

    /// Start a checkpoint: promote the deferred dependents due now, clear
    /// every pending flag and return the batch in first-request order.
    pub(crate) fn begin_checkpoint(&mut self) -> (u64, Vec<EntityId>) {
        self.checkpoint += 1;
        let now = self.checkpoint;
        let due: Vec<EntityId> = self
            .deferred
            .iter()
            .filter(|(_, due)| **due <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in due {
            self.deferred.shift_remove(&id);
            self.queue.insert(id);
        }
        (now, self.queue.drain(..).collect())
    }

    pub(crate) fn forget(&mut self, id: EntityId) {
        self.queue.shift_remove(&id);
        self.deferred.shift_remove(&id);
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.deferred.is_empty()
    }

    pub(crate) fn checkpoint(&self) -> u64 {
        self.checkpoint
    }
}

/// What one checkpoint did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Checkpoint number, starting at 1.
    pub checkpoint: u64,
    /// Entities rendered successfully, in render order.
    pub rendered: Vec<EntityId>,
    /// Entities whose render failed, with the error.
    pub failures: Vec<(EntityId, Error)>,
    /// Persistent entries written at the end of the checkpoint.
    pub persisted: usize,
    pub storage_error: Option<Error>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.storage_error.is_none()
    }
}
