//! Utilities used by the compactor and by bindings.

/// The address types (Address and ObjectReference)
pub mod address;
/// Constants used by the compactor.
pub mod constants;
/// Calculation, conversion and rounding for memory related numbers.
pub mod conversions;
/// Linear scan through a range of packed objects.
pub mod linear_scan;
/// Logger initialization
pub mod logger;
/// Wrapper functions for memory syscalls such as mmap.
pub mod memory;
/// Compactor command line options.
pub mod options;
/// A segmented stack in mmapped memory.
pub mod relocation_stack;
/// Counters collected during a compaction cycle.
pub mod statistics;
/// Test utilities. The mock binding is also used by benchmarks.
#[cfg(any(test, feature = "mock_test"))]
pub mod test_util;

/// Wrapper functions for the `log` crate.
pub(crate) mod log;

pub use self::address::Address;
pub use self::address::ObjectReference;
