//! The facade proper: routes every call through the active backend and keeps the books.

use std::ptr::NonNull;
use std::sync::LazyLock;
use std::sync::atomic::{self, AtomicIsize};

use tracing::error;

use crate::ledger::Ledger;
use crate::pal::{Platform, PlatformFacade};
use crate::registry::Registry;
use crate::{AlignmentPolicy, Backend, LeakReport, Origin};

/// The process-wide facade instance used by the public free functions.
pub(crate) static HEAP: LazyLock<Heap> =
    LazyLock::new(|| Heap::new(AlignmentPolicy::BUILD_TARGET.backend(), PlatformFacade::target()));

/// Registry, provenance ledger and live-allocation counter bundled together.
#[derive(Debug)]
pub(crate) struct Heap {
    registry: Registry,
    ledger: Ledger,
    live: AtomicIsize,
    platform: PlatformFacade,
}

impl Heap {
    pub(crate) fn new(backend: Backend, platform: PlatformFacade) -> Self {
        Self {
            registry: Registry::new(backend),
            ledger: Ledger::default(),
            live: AtomicIsize::new(0),
            platform,
        }
    }

    pub(crate) fn set_backend(&self, candidate: &Backend) {
        self.registry.install(candidate);
    }

    pub(crate) fn backend(&self) -> Backend {
        self.registry.current()
    }

    /// Never returns on exhaustion.
    pub(crate) fn allocate(&self, size: usize, origin: &Origin) -> NonNull<u8> {
        let backend = self.registry.current();

        // SAFETY: Whoever installed the backend vouched for its contract.
        let mut ptr = unsafe { backend.allocate(size) };

        if ptr.is_null() && size == 0 {
            // Some allocators refuse zero-byte requests; callers still get a unique handle.
            // SAFETY: As above.
            ptr = unsafe { backend.allocate(1) };
        }

        let Some(ptr) = NonNull::new(ptr) else {
            self.out_of_memory(size);
        };

        // Relaxed is sufficient: we only need atomicity, not ordering w.r.t. other memory ops.
        self.live.fetch_add(1, atomic::Ordering::Relaxed);
        self.ledger.record(ptr, origin);

        ptr
    }

    /// Never returns on exhaustion. A null `ptr` is a fresh allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this heap. It is dangling afterwards, unless the
    /// same address is returned.
    pub(crate) unsafe fn reallocate(
        &self,
        ptr: *mut u8,
        size: usize,
        origin: &Origin,
    ) -> NonNull<u8> {
        let previous = NonNull::new(ptr);

        // The backend may hand the same address back, so the old record must be gone before the
        // new one goes in.
        if let Some(previous) = previous {
            self.ledger.release(previous);
        }

        let backend = self.registry.current();

        // A C realloc() may treat zero bytes as "free it", so zero-byte requests go in as one
        // byte from the start.
        // SAFETY: Forwarding to the caller; `ptr` is null or a live block of this backend.
        let new = unsafe { backend.reallocate(ptr, size.max(1)) };

        let Some(new) = NonNull::new(new) else {
            self.out_of_memory(size);
        };

        if previous.is_none() {
            self.live.fetch_add(1, atomic::Ordering::Relaxed);
        }

        self.ledger.record(new, origin);

        new
    }

    /// A null `ptr` is ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this heap. It is dangling afterwards.
    pub(crate) unsafe fn free(&self, ptr: *mut u8) {
        let Some(block) = NonNull::new(ptr) else {
            return;
        };

        self.live.fetch_sub(1, atomic::Ordering::Relaxed);

        // Forget the address before the backend can reissue it to another thread.
        self.ledger.release(block);

        // SAFETY: Forwarding to the caller; `ptr` is a live block of this backend.
        unsafe { self.registry.current().free(ptr) };
    }

    pub(crate) fn live_allocations(&self) -> isize {
        self.live.load(atomic::Ordering::Relaxed)
    }

    pub(crate) fn report_leaks(&self) -> LeakReport {
        self.ledger.drain()
    }

    #[cfg(test)]
    pub(crate) fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[cold]
    pub(crate) fn out_of_memory(&self, size: usize) -> ! {
        error!(size, "allocation backend is exhausted");

        self.platform
            .crash(&format!("Out of memory while trying to allocate {size} bytes"))
    }
}
