use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::Backend;

/// Holds the backend that every allocation is routed through.
///
/// Readers never block. Replacing the backend is atomic with respect to readers, but blocks that
/// were issued by the previous backend must still be released through it, which is why hosts are
/// expected to install their backend once, before other threads start allocating.
#[derive(Debug)]
pub(crate) struct Registry {
    active: ArcSwap<Backend>,
}

impl Registry {
    pub(crate) fn new(initial: Backend) -> Self {
        Self {
            active: ArcSwap::from_pointee(initial),
        }
    }

    /// Copies the three functions out of `candidate` and makes them the active backend.
    pub(crate) fn install(&self, candidate: &Backend) {
        debug!(backend = ?candidate, "installing allocator backend");
        self.active.store(Arc::new(*candidate));
    }

    /// A copy of the active backend.
    #[inline]
    pub(crate) fn current(&self) -> Backend {
        **self.active.load()
    }
}
