use std::sync::Arc;

use parking_lot::RwLock;
use trellis_common::Snapshot;

use crate::{CacheRound, FinalRound, GraphError};

/// An open round that keeps accepting snapshots while other threads read it.
///
/// Readers take a [`copy`](Self::copy) under the read lock and never see a
/// round with a half-applied snapshot.
#[derive(Debug)]
pub struct SharedCacheRound {
    inner: RwLock<CacheRound>,
}

impl SharedCacheRound {
    pub fn new(round: CacheRound) -> Self {
        SharedCacheRound {
            inner: RwLock::new(round),
        }
    }

    pub fn push(&self, s: Arc<Snapshot>) -> Result<(), GraphError> {
        self.inner.write().push(s)
    }

    pub fn copy(&self) -> CacheRound {
        self.inner.read().copy()
    }

    /// Seals the round as it stands now.
    pub fn as_final(&self) -> Result<FinalRound, GraphError> {
        self.inner.read().as_final()
    }

    /// Swaps in `next` and returns the round it replaced.
    pub fn replace(&self, next: CacheRound) -> CacheRound {
        std::mem::replace(&mut *self.inner.write(), next)
    }

    pub fn number(&self) -> u64 {
        self.inner.read().number
    }
}
