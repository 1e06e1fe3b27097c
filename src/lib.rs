//! A compaction engine for mark-compact garbage collectors whose heap is made of fixed-size,
//! aligned chunks.
//!
//! Given a heap in which every reachable object has been marked, the engine decides where each
//! surviving object goes, rewrites every reference to point there, and then either moves the
//! objects of a chunk (compacting) or leaves them in place and formats the dead space between
//! them (sweeping). The relocation metadata lives in the dead space itself, so a cycle allocates
//! nothing proportional to the number of objects.
//!
//! A runtime plugs in by implementing [`vm::VMBinding`] and the traits it names, then drives
//! cycles through [`Compactor`].
//!
//! Logging goes through the `log` crate. The `builtin_env_logger` feature (on by default)
//! provides [`util::logger::try_init`] to install `env_logger`.

#[cfg(any(test, feature = "mock_test"))]
#[macro_use]
extern crate lazy_static;

pub mod compactor;
pub mod policy;
pub mod util;
pub mod vm;

pub use crate::compactor::{CompactionSummary, Compactor};
pub use crate::util::options::Options;
