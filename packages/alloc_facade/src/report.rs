//! Leak reports produced by draining the provenance ledger.

use std::fmt;
use std::ptr;
use std::slice;
use std::vec;

use tracing::{info, warn};

/// A live allocation that was still recorded in the provenance ledger when it was drained.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeakedAllocation {
    address: usize,
    origin: String,
}

impl LeakedAllocation {
    pub(crate) fn new(address: usize, origin: String) -> Self {
        Self { address, origin }
    }

    /// Address of the block, as handed out by the facade.
    #[must_use]
    pub fn address(&self) -> usize {
        self.address
    }

    /// The rendered [`Origin`][crate::Origin] of the allocation.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl fmt::Display for LeakedAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} ({})", self.address, self.origin)
    }
}

/// Every allocation the ledger still knew about when it was drained, newest first.
///
/// A report is a snapshot: it owns its data and can be sent to other threads.
///
/// # Examples
///
/// ```
/// let block = alloc_facade::allocate(16);
///
/// for leak in &alloc_facade::report_leaks() {
///     println!("{:#x} allocated at {}", leak.address(), leak.origin());
/// }
///
/// // SAFETY: The block came from the facade and is not used afterwards.
/// unsafe { alloc_facade::free(block.as_ptr()) };
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LeakReport {
    leaks: Vec<LeakedAllocation>,
}

impl LeakReport {
    pub(crate) fn new(leaks: Vec<LeakedAllocation>) -> Self {
        Self { leaks }
    }

    /// Whether no leaks were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaks.is_empty()
    }

    /// Number of leaked allocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaks.len()
    }

    /// Iterates over the leaked allocations, newest first.
    pub fn iter(&self) -> slice::Iter<'_, LeakedAllocation> {
        self.leaks.iter()
    }

    /// The entry for the block at `address`, if it leaked.
    #[must_use]
    pub fn find(&self, address: *const u8) -> Option<&LeakedAllocation> {
        self.leaks.iter().find(|leak| leak.address == address.addr())
    }

    /// Sends one event per leak to the logging subscriber.
    pub(crate) fn emit(&self) {
        for leak in &self.leaks {
            warn!(
                address = ?ptr::without_provenance::<u8>(leak.address),
                origin = %leak.origin,
                "allocation was never freed"
            );
        }

        if !self.is_empty() {
            info!(count = self.len(), "leak report finished");
        }
    }
}

impl<'a> IntoIterator for &'a LeakReport {
    type Item = &'a LeakedAllocation;
    type IntoIter = slice::Iter<'a, LeakedAllocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for LeakReport {
    type Item = LeakedAllocation;
    type IntoIter = vec::IntoIter<LeakedAllocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.leaks.into_iter()
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for leak in &self.leaks {
            writeln!(f, "  {leak}")?;
        }

        Ok(())
    }
}
