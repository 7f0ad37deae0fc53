//! The provenance ledger: which live block was allocated where.
//!
//! Compiled in with the `provenance` feature. Without it, every operation is a no-op and draining
//! always yields an empty report.

#[cfg(feature = "provenance")]
use std::cmp::Reverse;
#[cfg(feature = "provenance")]
use std::collections::HashMap;
#[cfg(feature = "provenance")]
use std::mem;
use std::ptr::NonNull;
#[cfg(feature = "provenance")]
use std::sync::Mutex;

#[cfg(feature = "provenance")]
use crate::constants::ERR_POISONED_LOCK;
#[cfg(feature = "provenance")]
use crate::report::LeakedAllocation;
use crate::{LeakReport, Origin};

#[cfg(feature = "provenance")]
#[derive(Debug)]
struct Record {
    origin: String,
    // Insertion order, so reports can list the newest allocation first.
    sequence: u64,
}

#[cfg(feature = "provenance")]
#[derive(Debug, Default)]
struct LedgerState {
    // Keyed by address: at most one record per live block.
    records: HashMap<usize, Record, foldhash::fast::RandomState>,
    next_sequence: u64,
}

/// Concurrent record of every live allocation and its origin.
///
/// A single mutex guards all structural changes. Every tracked allocate, reallocate and free
/// passes through it, which is the price of exact leak diagnostics; builds that cannot afford it
/// disable the `provenance` feature.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    #[cfg(feature = "provenance")]
    state: Mutex<LedgerState>,
}

#[cfg(feature = "provenance")]
impl Ledger {
    /// Associates `address` with `origin`, replacing any stale record for the same address.
    pub(crate) fn record(&self, address: NonNull<u8>, origin: &Origin) {
        // Render outside the lock.
        let origin = origin.to_string();

        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        let sequence = state.next_sequence;
        state.next_sequence = sequence.wrapping_add(1);

        state
            .records
            .insert(address.addr().get(), Record { origin, sequence });
    }

    /// Forgets `address`. Addresses that were never recorded are ignored.
    pub(crate) fn release(&self, address: NonNull<u8>) {
        let removed = self
            .state
            .lock()
            .expect(ERR_POISONED_LOCK)
            .records
            .remove(&address.addr().get());

        // Dropped outside the lock.
        drop(removed);
    }

    /// Empties the ledger in one step and reports whatever was still in it.
    pub(crate) fn drain(&self) -> LeakReport {
        let records = mem::take(&mut self.state.lock().expect(ERR_POISONED_LOCK).records);

        let mut records: Vec<_> = records.into_iter().collect();
        records.sort_unstable_by_key(|(_, record)| Reverse(record.sequence));

        let report = LeakReport::new(
            records
                .into_iter()
                .map(|(address, record)| LeakedAllocation::new(address, record.origin))
                .collect(),
        );

        report.emit();
        report
    }

    #[cfg(test)]
    pub(crate) fn origin_of(&self, address: NonNull<u8>) -> Option<String> {
        self.state
            .lock()
            .expect(ERR_POISONED_LOCK)
            .records
            .get(&address.addr().get())
            .map(|record| record.origin.clone())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().expect(ERR_POISONED_LOCK).records.len()
    }
}

#[cfg(not(feature = "provenance"))]
impl Ledger {
    #[inline]
    pub(crate) fn record(&self, _address: NonNull<u8>, _origin: &Origin) {}

    #[inline]
    pub(crate) fn release(&self, _address: NonNull<u8>) {}

    pub(crate) fn drain(&self) -> LeakReport {
        LeakReport::default()
    }

    #[cfg(test)]
    pub(crate) fn origin_of(&self, _address: NonNull<u8>) -> Option<String> {
        None
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        0
    }
}
