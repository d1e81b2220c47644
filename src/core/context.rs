//! Explicit worker identity, handed to each worker at spawn time.

use uuid::Uuid;

/// Slot index used by the thread that owns the pool.
pub const OWNER_WORKER_INDEX: usize = 0;

/// Identity of one participant in a pool: which pool, and which queue slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerContext {
    pool_id: Uuid,
    worker_index: usize,
}

impl WorkerContext {
    /// Context for slot `worker_index` of pool `pool_id`.
    #[must_use]
    pub const fn new(pool_id: Uuid, worker_index: usize) -> Self {
        Self {
            pool_id,
            worker_index,
        }
    }

    /// Context of the owning thread.
    #[must_use]
    pub const fn owner(pool_id: Uuid) -> Self {
        Self::new(pool_id, OWNER_WORKER_INDEX)
    }

    /// Pool this context belongs to.
    #[must_use]
    pub const fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    /// Queue/waiter slot of this participant.
    #[must_use]
    pub const fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Whether this is the owner's slot.
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        self.worker_index == OWNER_WORKER_INDEX
    }
}
