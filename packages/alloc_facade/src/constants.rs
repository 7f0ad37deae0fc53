/// Every non-null pointer handed out by the default backend is a multiple of this many bytes.
///
/// 32 bytes covers AVX vectors and half a cache line while keeping the header-byte overhead
/// bounded: the stored offset is at most this value, so it always fits in a single byte.
pub(crate) const ALIGNMENT: usize = 32;

pub(crate) const ERR_POISONED_LOCK: &str = "poisoned lock - safe execution no longer possible";

/// Placeholder reason recorded when a caller supplies no origin.
pub(crate) const UNKNOWN_ORIGIN: &str = "unknown";

// The header byte stores an offset in 1..=ALIGNMENT.
const _: () = assert!(ALIGNMENT.is_power_of_two() && ALIGNMENT <= u8::MAX as usize);
