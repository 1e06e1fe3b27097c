use super::forwarding;
use super::record;
use crate::util::constants::{BYTES_IN_COMPRESSED_REFERENCE, BYTES_IN_WIDE_REFERENCE};
use crate::util::linear_scan::{DefaultObjectSize, ObjectIterator};
use crate::util::log;
use crate::util::statistics::CompactionStats;
use crate::util::{Address, ObjectReference};
use crate::vm::slot::{CompressedSlot, SimpleSlot, Slot};
use crate::vm::*;
use std::marker::PhantomData;

/// The owner of a slot being fixed up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Holder {
    /// A field of a heap object.
    Object(ObjectReference),
    /// A slot outside the heap, such as a root in compiled code metadata.
    Absent,
}

/// Rewrites reference slots to point to the new addresses of their referents.
pub struct ReferenceFixup<'a, VM: VMBinding> {
    stats: &'a CompactionStats,
    _p: PhantomData<VM>,
}

impl<'a, VM: VMBinding> ReferenceFixup<'a, VM> {
    pub fn new(stats: &'a CompactionStats) -> Self {
        ReferenceFixup {
            stats,
            _p: PhantomData,
        }
    }

    /// Fix up one slot. Null slots and references outside the compacted space are left alone.
    ///
    /// A reference to an object that did not survive is cleared if `holder` is absent or
    /// reference-shaped, and is fatal otherwise.
    pub fn fixup_slot<SL: Slot>(&self, slot: SL, holder: Holder) {
        let Some(object) = slot.load() else {
            return;
        };
        let addr = object.to_raw_address();
        let Some(chunk) = VM::VMChunkModel::chunk_containing(addr) else {
            return;
        };
        match forwarding::new_address::<VM>(chunk, addr) {
            Some(new_addr) => {
                if new_addr != addr {
                    slot.store(unsafe { ObjectReference::from_raw_address_unchecked(new_addr) });
                }
                self.stats.references_fixed.increment();
            }
            None if Self::tolerates_dead_referent(holder) => {
                log::trace!(
                    "Clearing slot {} of {:?}: {} is dead",
                    slot.as_address(),
                    holder,
                    object
                );
                slot.clear();
                self.stats.references_cleared.increment();
            }
            None => panic!(
                "Slot {} of {:?} refers to dead object {}",
                slot.as_address(),
                holder,
                object
            ),
        }
    }

    fn tolerates_dead_referent(holder: Holder) -> bool {
        match holder {
            Holder::Absent => true,
            Holder::Object(object) => VM::VMReferenceGlue::is_reference(object),
        }
    }

    /// Fix up `count` slots of the same shape, `slot_size` bytes apart, starting at
    /// `first_slot`. Compressed slots are decoded with the compressed base and shift of the
    /// object model.
    pub fn fixup_references(
        &self,
        first_slot: Address,
        compressed: bool,
        slot_size: usize,
        holder: Holder,
        count: usize,
    ) {
        debug_assert!(
            slot_size
                >= if compressed {
                    BYTES_IN_COMPRESSED_REFERENCE
                } else {
                    BYTES_IN_WIDE_REFERENCE
                }
        );
        let mut slot_addr = first_slot;
        for _ in 0..count {
            if compressed {
                let slot = CompressedSlot::from_address(
                    slot_addr,
                    VM::VMObjectModel::compressed_base(),
                    VM::VMObjectModel::LOG_COMPRESSED_SHIFT,
                );
                self.fixup_slot(slot, holder);
            } else {
                self.fixup_slot(SimpleSlot::from_address(slot_addr), holder);
            }
            slot_addr += slot_size;
        }
    }
}

/// Fixes up every reference held by an object.
pub struct ObjectFixup<'a, VM: VMBinding> {
    references: ReferenceFixup<'a, VM>,
}

impl<'a, VM: VMBinding> ObjectFixup<'a, VM> {
    pub fn new(stats: &'a CompactionStats) -> Self {
        ObjectFixup {
            references: ReferenceFixup::new(stats),
        }
    }

    pub fn references(&self) -> &ReferenceFixup<'a, VM> {
        &self.references
    }

    pub fn fixup_object(&self, object: ObjectReference) {
        let holder = Holder::Object(object);
        if VM::VMReferenceGlue::is_reference(object) {
            self.references
                .fixup_slot(VM::VMReferenceGlue::referent_slot(object), holder);
        }
        VM::VMScanning::scan_object(object, &mut |slot: VM::VMSlot| {
            self.references.fixup_slot(slot, holder)
        });
    }
}

/// Fixes up every surviving object of a chunk, and records it in the first-object table at its
/// destination. The first-object tables of all chunks must be reset before any chunk is
/// visited.
pub struct FixupVisitor<'a, VM: VMBinding> {
    objects: ObjectFixup<'a, VM>,
}

impl<'a, VM: VMBinding> FixupVisitor<'a, VM> {
    pub fn new(stats: &'a CompactionStats) -> Self {
        FixupVisitor {
            objects: ObjectFixup::new(stats),
        }
    }

    pub fn visit_chunk(&self, chunk: Chunk) {
        let first = VM::VMChunkModel::objects_start(chunk);
        let mut objects = 0usize;
        record::visit::<VM::VMRecordLayout, _>(first, |sequence| {
            if sequence.is_empty() {
                return true;
            }
            let destination_chunk = Chunk::align_down::<VM>(sequence.destination);
            let mut iter =
                ObjectIterator::<VM, DefaultObjectSize<VM>>::new(sequence.start, sequence.end());
            while let Some(object) = iter.next() {
                self.objects.fixup_object(object);
                let start = object.to_raw_address();
                let end = iter.cursor();
                VM::VMFirstObjectTable::set_table_for_object(
                    destination_chunk,
                    sequence.destination + (start - sequence.start),
                    sequence.destination + (end - sequence.start),
                );
                objects += 1;
            }
            true
        });
        log::debug!("Fixed up {} objects in chunk {}", objects, chunk);
    }
}
