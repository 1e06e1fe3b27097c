//! The compaction engine of a mark-compact collector for chunked spaces.
//!
//! A collection cycle runs these phases over all chunks, in allocation order. Each phase
//! finishes on every chunk before the next phase starts.
//!
//! 1. [`planning`]: one forward scan per chunk finds the live sequences (maximal runs of marked
//!    objects), assigns each a destination, and stores a relocation record for it in the dead
//!    space right below it. Chunks marked for sweeping keep their objects in place.
//! 2. [`fixup`] and [`roots`]: every reference into the space, in surviving objects and in
//!    roots, is rewritten using [`forwarding::new_address`].
//! 3. [`sweeping`]: the gaps of swept chunks are covered with filler objects.
//! 4. [`compacting`]: the sequences of compacted chunks are moved to their destinations.
//!
//! No side table proportional to the number of objects is allocated: relocation records live
//! in dead space, and brick and first-object tables are provided by the binding.

pub mod compacting;
pub mod fixup;
pub mod forwarding;
pub mod planning;
pub mod record;
pub mod roots;
pub mod sweeping;

pub use self::fixup::Holder;
pub use self::record::{CompressedLayout, LiveSequence, RecordLayout, WideLayout};
pub use self::roots::{RootEnumerator, RootSet, RootSlots, RootStrength};
