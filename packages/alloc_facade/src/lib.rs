//! Process-wide allocation facade with a fixed alignment boundary, a swappable backend and
//! optional leak provenance tracking.
//!
//! Every allocation in a program that uses this package goes through a small set of free
//! functions:
//!
//! - [`allocate()`], [`reallocate()`] and [`free()`] - the core primitives
//! - [`duplicate()`], [`zero_allocate()`] and the string duplication helpers - conveniences
//!   built on top of the core primitives
//! - [`set_backend()`] - redirects all allocation through a custom [`Backend`]
//! - [`live_allocations()`] and [`report_leaks()`] - diagnostics
//!
//! Allocation never fails from the caller's perspective: a request the backend cannot satisfy
//! terminates the process, after triggering a debugger breakpoint in debug builds.
//!
//! # Alignment
//!
//! The default backend returns blocks aligned to 32 bytes (see [`alignment()`]). On Windows it
//! delegates to the platform's aligned heap. Elsewhere it over-allocates from the C heap and
//! stores the distance to the aligned address in a header byte in front of the block. The
//! `pass_through` feature skips all of that and hands out what the C heap returns.
//!
//! # Custom backends
//!
//! A [`Backend`] is three C-ABI functions: allocate, reallocate and free. Install one at startup,
//! before any other thread allocates, because blocks must be freed by the backend that allocated
//! them.
//!
//! # Leak diagnostics
//!
//! With the `provenance` feature (enabled by default) every live block is recorded together with
//! its [`Origin`]: the source location of the caller and an optional tag. [`report_leaks()`]
//! drains the record and logs every remaining block through `tracing`; [`Diagnostics`] ties that
//! to the lifetime of the application.
//!
//! ```
//! use alloc_facade::{Diagnostics, Origin};
//!
//! let diagnostics = Diagnostics::start();
//!
//! let block = alloc_facade::allocate_with_origin(256, Origin::tagged("scratch buffer"));
//! assert_eq!(block.addr().get() % alloc_facade::alignment(), 0);
//!
//! // SAFETY: The block is not shared with anyone else.
//! let block = unsafe { alloc_facade::reallocate(block.as_ptr(), 1024) };
//!
//! // SAFETY: The block came from the facade and is not used afterwards.
//! unsafe { alloc_facade::free(block.as_ptr()) };
//!
//! print!("{}", diagnostics.finish());
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod aligned;
mod api;
mod backend;
mod constants;
mod diagnostics;
mod duplicate;
mod envelope;
mod heap;
mod ledger;
mod origin;
mod pal;
mod registry;
mod report;

pub use aligned::*;
pub use api::*;
pub use backend::*;
pub use diagnostics::*;
pub use duplicate::WideChar;
pub use origin::*;
pub use report::*;
