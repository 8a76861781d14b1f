//! Reusable storage for entity records.
//!
//! Records are addressed by [`RecordId`], an index into the pool's backing
//! vector. A `RecordId` is neither `Copy` nor `Clone`: the
//! single value is either held by a generation slot or sitting on the free
//! list, so a record cannot be issued twice or released twice.

use crate::entity::{EntityRecord, Identity};

/// Handle to a record stored in an [`EntityPool`].
#[derive(Debug, PartialEq, Eq)]
pub struct RecordId(usize);

impl RecordId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Arena of entity records with a free-index stack.
#[derive(Debug, Default)]
pub struct EntityPool {
    records: Vec<EntityRecord>,
    free: Vec<RecordId>,
}

impl EntityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a record for `id`, reusing a free one when available.
    ///
    /// The record is reset before it is returned; callers must still fill
    /// every field they rely on.
    pub fn acquire(&mut self, id: Identity) -> RecordId {
        let handle = match self.free.pop() {
            Some(handle) => handle,
            None => {
                self.records.push(EntityRecord::default());
                RecordId(self.records.len() - 1)
            }
        };
        self.records[handle.0].reset(id);
        handle
    }

    /// Returns a record to the free list.
    pub fn release(&mut self, handle: RecordId) {
        debug_assert!(handle.0 < self.records.len());
        self.free.push(handle);
    }

    pub fn get(&self, handle: &RecordId) -> &EntityRecord {
        &self.records[handle.0]
    }

    pub fn get_mut(&mut self, handle: &RecordId) -> &mut EntityRecord {
        &mut self.records[handle.0]
    }

    /// Total number of records ever allocated.
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Number of records waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of records currently owned by generations.
    pub fn in_use(&self) -> usize {
        self.records.len() - self.free.len()
    }
}
