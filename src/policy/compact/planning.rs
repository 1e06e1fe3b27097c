use super::record::RecordLayout;
use crate::util::linear_scan::{HeapObjectSize, LinearScanObjectSize};
use crate::util::log;
use crate::util::statistics::CompactionStats;
use crate::util::{Address, ObjectReference};
use crate::vm::*;
use std::marker::PhantomData;

/// The position where the next compacted sequence goes. There is one cursor per collection
/// cycle. It only moves forward through the chunks, so surviving objects keep their relative
/// order across the whole space.
pub struct AllocationCursor<VM: VMBinding> {
    chunk: Chunk,
    top: Address,
    _p: PhantomData<VM>,
}

impl<VM: VMBinding> AllocationCursor<VM> {
    /// A cursor at the objects start of the first chunk.
    pub fn new(first: Chunk) -> Self {
        AllocationCursor {
            chunk: first,
            top: VM::VMChunkModel::objects_start(first),
            _p: PhantomData,
        }
    }

    pub fn chunk(&self) -> Chunk {
        self.chunk
    }

    pub fn top(&self) -> Address {
        self.top
    }

    /// Reserve `size` bytes for a sequence, moving on to the next chunk if the current one
    /// cannot hold it.
    pub fn allocate(&mut self, size: usize) -> Address {
        if self.top + size > VM::VMChunkModel::objects_end(self.chunk) {
            let next = match VM::VMChunkModel::next(self.chunk) {
                Some(next) => next,
                None => panic!(
                    "Ran out of chunks to allocate a sequence of {} bytes after {}",
                    size, self.chunk
                ),
            };
            assert!(
                !VM::VMChunkModel::should_sweep(next),
                "Allocation cursor rolled into chunk {} which is being swept",
                next
            );
            log::trace!("Allocation cursor moves from {} to {}", self.chunk, next);
            self.chunk = next;
            self.top = VM::VMChunkModel::objects_start(next);
            assert!(
                self.top + size <= VM::VMChunkModel::objects_end(next),
                "A sequence of {} bytes does not fit in chunk {}",
                size,
                next
            );
        }
        let result = self.top;
        self.top += size;
        result
    }

    /// Continue allocating right above the (already truncated) top of a swept chunk. Space left
    /// in the chunks before it is given up for this cycle.
    ///
    /// Chunks are ordered by the chain, not by address, so only the current chunk can be checked.
    pub fn skip_past(&mut self, chunk: Chunk) {
        debug_assert!(chunk != self.chunk || self.top <= VM::VMChunkModel::top(chunk));
        self.chunk = chunk;
        self.top = VM::VMChunkModel::top(chunk);
    }
}

/// Decides where every live sequence goes. Visits each chunk once in allocation order, writes
/// the relocation chain and the brick table of the chunk, clears the marks, and truncates the
/// top of the chunk to the end of its last live sequence.
pub struct PlanningVisitor<'a, VM: VMBinding> {
    cursor: AllocationCursor<VM>,
    stats: &'a CompactionStats,
}

/// The scan state of one chunk.
struct ChunkPlan {
    chunk: Chunk,
    sweeping: bool,
    /// The start of the current (or last closed) sequence, whose record is being written.
    sequence: Address,
    sequence_size: usize,
    gap_size: usize,
    brick_index: usize,
    brick_length: usize,
}

impl<'a, VM: VMBinding> PlanningVisitor<'a, VM> {
    pub fn new(first: Chunk, stats: &'a CompactionStats) -> Self {
        PlanningVisitor {
            cursor: AllocationCursor::new(first),
            stats,
        }
    }

    pub fn cursor(&self) -> &AllocationCursor<VM> {
        &self.cursor
    }

    pub fn visit_chunk(&mut self, chunk: Chunk) {
        let objects_start = VM::VMChunkModel::objects_start(chunk);
        let init_top = VM::VMChunkModel::top(chunk);
        debug_assert!(
            VM::VMChunkModel::objects_end(chunk) - objects_start
                <= VM::VMRecordLayout::MAX_SEQUENCE_BYTES
        );
        let mut plan = ChunkPlan {
            chunk,
            sweeping: VM::VMChunkModel::should_sweep(chunk),
            sequence: objects_start,
            sequence_size: 0,
            gap_size: 0,
            brick_index: 0,
            brick_length: VM::VMBrickTable::length(chunk),
        };

        // The chain always starts with a record at the objects start. It stays empty if the
        // chunk starts with a gap.
        VM::VMRecordLayout::init_empty(objects_start);
        VM::VMBrickTable::set(chunk, 0, objects_start);

        let mut p = objects_start;
        while p < init_top {
            let object = unsafe { ObjectReference::from_raw_address_unchecked(p) };
            let size = HeapObjectSize::<VM>::size(object);
            debug_assert!(size >= VM::MIN_OBJECT_SIZE, "Bad size {} of {}", size, object);
            if VM::VMObjectModel::is_marked(object) {
                VM::VMObjectModel::clear_mark(object);
                if plan.gap_size != 0 {
                    // A gap ends here, so a new sequence starts.
                    VM::VMRecordLayout::set_next_offset(plan.sequence, p - plan.sequence);
                    plan.sequence = p;
                    VM::VMRecordLayout::set_next_offset(p, 0);
                    plan.gap_size = 0;
                }
                plan.sequence_size += size;
            } else {
                if plan.sequence_size != 0 {
                    self.close_sequence(&mut plan, p);
                }
                plan.gap_size += size;
            }
            p += size;
        }
        assert_eq!(
            p, init_top,
            "Objects in chunk {} overran its top {}",
            chunk, init_top
        );

        if plan.gap_size != 0 {
            // Dead space at the end of the chunk is reclaimed in place.
            let new_top = init_top - plan.gap_size;
            VM::VMChunkModel::set_top(chunk, new_top);
            self.stats.truncated_bytes.add(plan.gap_size);
        } else if plan.sequence_size != 0 {
            self.close_sequence(&mut plan, init_top);
        }

        if plan.sweeping {
            self.cursor.skip_past(chunk);
        }

        // Bricks after the last closed sequence all lead to it.
        while plan.brick_index + 1 < plan.brick_length {
            plan.brick_index += 1;
            VM::VMBrickTable::set(chunk, plan.brick_index, plan.sequence);
        }

        log::debug!(
            "Planned chunk {} ({}): top {} -> {}",
            chunk,
            if plan.sweeping { "sweep" } else { "compact" },
            init_top,
            VM::VMChunkModel::top(chunk)
        );
    }

    /// Assign a destination to the open sequence, which ends at `end`, and point the bricks up
    /// to `end` at it.
    fn close_sequence(&mut self, plan: &mut ChunkPlan, end: Address) {
        let size = plan.sequence_size;
        debug_assert_eq!(plan.sequence + size, end);
        let destination = if plan.sweeping {
            plan.sequence
        } else {
            self.cursor.allocate(size)
        };
        VM::VMRecordLayout::set_destination(plan.sequence, destination);
        VM::VMRecordLayout::set_size(plan.sequence, size);
        log::trace!(
            "Sequence {} ({} bytes) -> {}",
            plan.sequence,
            size,
            destination
        );

        let last_brick = VM::VMBrickTable::index(plan.chunk, end).min(plan.brick_length - 1);
        while plan.brick_index < last_brick {
            plan.brick_index += 1;
            VM::VMBrickTable::set(plan.chunk, plan.brick_index, plan.sequence);
        }

        plan.sequence_size = 0;
        self.stats.sequences.increment();
        self.stats.live_bytes.add(size);
    }
}
