use super::fixup::{Holder, ObjectFixup};
use crate::util::constants::{BYTES_IN_COMPRESSED_REFERENCE, BYTES_IN_WIDE_REFERENCE};
use crate::util::log;
use crate::util::statistics::CompactionStats;
use crate::util::{Address, ObjectReference};
use crate::vm::*;

/// Whether a run of root slots keeps its referents alive. Only marking distinguishes the two.
/// By the time of fixup the owner of a strong run may itself have died in this cycle, so a dead
/// referent is cleared in runs of either strength.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RootStrength {
    Strong,
    Weak,
}

/// A run of contiguous root slots outside the heap, e.g. the embedded references of one piece
/// of compiled code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RootSlots {
    /// The first slot.
    pub start: Address,
    /// Number of slots.
    pub count: usize,
    /// Whether the slots hold compressed references.
    pub compressed: bool,
    /// Reported to marking. Fixup treats both strengths alike.
    pub strength: RootStrength,
}

impl RootSlots {
    pub fn new(start: Address, count: usize, compressed: bool, strength: RootStrength) -> Self {
        RootSlots {
            start,
            count,
            compressed,
            strength,
        }
    }

    /// Bytes from one slot of the run to the next.
    pub fn slot_size(&self) -> usize {
        if self.compressed {
            BYTES_IN_COMPRESSED_REFERENCE
        } else {
            BYTES_IN_WIDE_REFERENCE
        }
    }
}

/// Enumerates the references the compactor must fix up outside the compacted space.
pub trait RootEnumerator {
    /// Report each run of root slots.
    fn enumerate_root_slots(&mut self, visitor: &mut dyn FnMut(RootSlots));

    /// Report each object outside the compacted space (e.g. large objects) whose fields may
    /// refer into it. The default reports none.
    fn enumerate_holder_objects(&mut self, _visitor: &mut dyn FnMut(ObjectReference)) {}
}

/// A fixed list of roots.
#[derive(Default, Debug, Clone)]
pub struct RootSet {
    pub slots: Vec<RootSlots>,
    pub holders: Vec<ObjectReference>,
}

impl RootEnumerator for RootSet {
    fn enumerate_root_slots(&mut self, visitor: &mut dyn FnMut(RootSlots)) {
        for run in self.slots.iter() {
            visitor(*run);
        }
    }

    fn enumerate_holder_objects(&mut self, visitor: &mut dyn FnMut(ObjectReference)) {
        for object in self.holders.iter() {
            visitor(*object);
        }
    }
}

/// Applies reference fixup to roots instead of heap objects.
///
/// Root slots have no holder object. A root whose referent did not survive is cleared, whatever
/// its strength: its owner may have been invalidated in this cycle.
pub struct RootFixup<'a, VM: VMBinding> {
    objects: ObjectFixup<'a, VM>,
}

impl<'a, VM: VMBinding> RootFixup<'a, VM> {
    pub fn new(stats: &'a CompactionStats) -> Self {
        RootFixup {
            objects: ObjectFixup::new(stats),
        }
    }

    pub fn fixup_roots<R: RootEnumerator + ?Sized>(&self, roots: &mut R) {
        let mut runs = 0usize;
        roots.enumerate_root_slots(&mut |run: RootSlots| {
            log::trace!("Fixing up {:?}", run);
            self.objects.references().fixup_references(
                run.start,
                run.compressed,
                run.slot_size(),
                Holder::Absent,
                run.count,
            );
            runs += 1;
        });

        let mut holders = 0usize;
        roots.enumerate_holder_objects(&mut |object: ObjectReference| {
            debug_assert!(
                VM::VMChunkModel::chunk_containing(object.to_raw_address()).is_none(),
                "Holder object {} is inside the compacted space",
                object
            );
            self.objects.fixup_object(object);
            holders += 1;
        });
        log::debug!(
            "Fixed up {} root slot runs and {} holder objects",
            runs,
            holders
        );
    }
}
