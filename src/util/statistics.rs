//! Counters collected over one compaction cycle.

use crate::util::log;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A counter that can be bumped from several worker threads.
#[derive(Default)]
pub struct SynchronizedCounter {
    count: AtomicUsize,
}

impl SynchronizedCounter {
    pub const fn new() -> Self {
        SynchronizedCounter {
            count: AtomicUsize::new(0),
        }
    }

    pub fn reset(&self) -> usize {
        self.count.swap(0, Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn add(&self, n: usize) {
        debug_assert!(self.count.load(Ordering::Relaxed) <= usize::MAX - n);
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn peek(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

macro_rules! compaction_stats {
    ($($(#[$outer:meta])* $name:ident),*,) => {
        /// Statistics of one compaction cycle. All counters are reset at the start of a cycle.
        #[derive(Default)]
        pub struct CompactionStats {
            $($(#[$outer])* pub $name: SynchronizedCounter),*
        }

        impl CompactionStats {
            pub fn reset(&self) {
                $(self.$name.reset();)*
            }

            /// A plain copy of the current counter values.
            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($name: self.$name.peek()),*
                }
            }
        }

        /// Counter values read at one point in time.
        #[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
        pub struct StatsSnapshot {
            $($(#[$outer])* pub $name: usize),*
        }

        impl fmt::Display for StatsSnapshot {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut first = true;
                $(
                    if !first {
                        write!(f, " ")?;
                    }
                    first = false;
                    write!(f, "{}={}", stringify!($name), self.$name)?;
                )*
                let _ = first;
                Ok(())
            }
        }
    };
}

compaction_stats! {
    /// Live sequences found by planning.
    sequences,
    /// Bytes of marked objects.
    live_bytes,
    /// Bytes copied to a different address.
    moved_bytes,
    /// Bytes dropped from chunk tops by trailing gaps.
    truncated_bytes,
    /// Reference slots rewritten.
    references_fixed,
    /// Reference slots cleared because the referent died.
    references_cleared,
    /// Bytes covered by filler objects in swept chunks.
    filler_bytes,
    /// Chunks handled in compaction mode.
    chunks_compacted,
    /// Chunks handled in sweeping mode.
    chunks_swept,
}

impl CompactionStats {
    pub fn log(&self) {
        log::info!("Compaction statistics: {}", self.snapshot());
    }
}
