use super::record;
use crate::util::log;
use crate::util::statistics::CompactionStats;
use crate::util::Address;
use crate::vm::*;
use std::marker::PhantomData;

/// Leaves the live sequences of a chunk in place and covers every gap between them with filler
/// objects.
pub struct SweepingVisitor<'a, VM: VMBinding> {
    stats: &'a CompactionStats,
    _p: PhantomData<VM>,
}

impl<'a, VM: VMBinding> SweepingVisitor<'a, VM> {
    pub fn new(stats: &'a CompactionStats) -> Self {
        SweepingVisitor {
            stats,
            _p: PhantomData,
        }
    }

    pub fn visit_chunk(&self, chunk: Chunk) {
        debug_assert!(VM::VMChunkModel::should_sweep(chunk));
        let objects_start = VM::VMChunkModel::objects_start(chunk);
        let top = VM::VMChunkModel::top(chunk);
        let mut filled = 0usize;
        // Filling a gap overwrites the record of the next sequence, which `visit` has already
        // read by then.
        record::visit::<VM::VMRecordLayout, _>(objects_start, |sequence| {
            debug_assert_eq!(sequence.destination, sequence.start);
            let gap_start = sequence.end();
            let gap_end = sequence.next.unwrap_or(top);
            debug_assert!(gap_end >= gap_start);
            if gap_end > gap_start {
                self.fill(chunk, gap_start, gap_end - gap_start);
                filled += gap_end - gap_start;
            }
            true
        });
        self.stats.filler_bytes.add(filled);
        self.stats.chunks_swept.increment();
        log::debug!("Swept chunk {}, {} bytes of fillers", chunk, filled);
    }

    /// Cover `[start, start + size)` with at most one array filler followed by at most one
    /// fixed filler.
    fn fill(&self, chunk: Chunk, start: Address, size: usize) {
        let mut cursor = start;
        let mut remaining = size;
        if remaining >= VM::VMFiller::MIN_ARRAY_FILLER_BYTES {
            let length = VM::VMFiller::array_filler_length(remaining);
            let array_size = VM::VMFiller::array_filler_size(length);
            debug_assert!(array_size <= remaining);
            VM::VMFiller::format_array_filler(cursor, length);
            VM::VMFirstObjectTable::set_table_for_object(chunk, cursor, cursor + array_size);
            cursor += array_size;
            remaining -= array_size;
        }
        if remaining != 0 {
            assert_eq!(
                remaining,
                VM::VMFiller::FIXED_FILLER_BYTES,
                "Cannot fill {} bytes at {} in chunk {}",
                remaining,
                cursor,
                chunk
            );
            VM::VMFiller::format_fixed_filler(cursor);
            VM::VMFirstObjectTable::set_table_for_object(chunk, cursor, cursor + remaining);
        }
        log::trace!("Filled {} bytes at {}", size, start);
    }
}
