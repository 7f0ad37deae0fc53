use tracing::info;

use crate::LeakReport;
use crate::heap::{HEAP, Heap};

/// Scopes leak diagnostics to the lifetime of the application.
///
/// Create one at startup, before allocating anything worth tracking, and keep it alive until the
/// shutdown point where every block is expected to have been freed. At that point the provenance
/// ledger is drained and every block still in it is reported through `tracing`.
///
/// Call [`finish()`][Self::finish] to get the report as a value. Dropping the guard reports to the
/// log only.
///
/// # Examples
///
/// ```
/// use alloc_facade::Diagnostics;
///
/// let diagnostics = Diagnostics::start();
///
/// let block = alloc_facade::allocate(128);
/// // SAFETY: The block came from the facade and is not used afterwards.
/// unsafe { alloc_facade::free(block.as_ptr()) };
///
/// // Anything still allocated at this point is a leak.
/// print!("{}", diagnostics.finish());
/// ```
#[derive(Debug)]
pub struct Diagnostics {
    heap: &'static Heap,
    live_at_start: isize,
    finished: bool,
}

impl Diagnostics {
    /// Starts a diagnostics scope for the process-wide facade.
    #[must_use]
    pub fn start() -> Self {
        Self::start_on(&HEAP)
    }

    fn start_on(heap: &'static Heap) -> Self {
        let live_at_start = heap.live_allocations();

        info!(live = live_at_start, "allocation diagnostics started");

        Self {
            heap,
            live_at_start,
            finished: false,
        }
    }

    /// Ends the scope, returning every block that was still tracked.
    #[must_use]
    pub fn finish(mut self) -> LeakReport {
        self.finished = true;
        self.report()
    }

    fn report(&self) -> LeakReport {
        let report = self.heap.report_leaks();

        info!(
            live = self.heap.live_allocations(),
            live_at_start = self.live_at_start,
            leaks = report.len(),
            "allocation diagnostics finished"
        );

        report
    }
}

impl Drop for Diagnostics {
    fn drop(&mut self) {
        if !self.finished {
            // Logged by the ledger as it drains; nobody is left to receive the value.
            drop(self.report());
        }
    }
}
