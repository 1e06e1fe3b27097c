use super::record;
use crate::util::log;
use crate::util::statistics::CompactionStats;
use crate::vm::*;
use std::marker::PhantomData;

/// Moves the live sequences of a chunk to their destinations.
///
/// Chunks must be visited in allocation order, and only after every chunk has been fixed up:
/// moving a sequence destroys the records that address resolution reads. A destination never
/// lies after its source in chain order, so a sequence only overwrites bytes already moved or
/// dead.
pub struct CompactingVisitor<'a, VM: VMBinding> {
    stats: &'a CompactionStats,
    _p: PhantomData<VM>,
}

impl<'a, VM: VMBinding> CompactingVisitor<'a, VM> {
    pub fn new(stats: &'a CompactionStats) -> Self {
        CompactingVisitor {
            stats,
            _p: PhantomData,
        }
    }

    pub fn visit_chunk(&self, chunk: Chunk) {
        debug_assert!(!VM::VMChunkModel::should_sweep(chunk));
        let objects_start = VM::VMChunkModel::objects_start(chunk);
        // The top is rebuilt from the sequences that land in this chunk.
        VM::VMChunkModel::set_top(chunk, objects_start);

        record::visit::<VM::VMRecordLayout, _>(objects_start, |sequence| {
            if sequence.is_empty() {
                return true;
            }
            let destination_chunk = Chunk::align_down::<VM>(sequence.destination);
            if sequence.destination != sequence.start {
                // A sequence may move to a chunk at a higher address that comes earlier in the
                // chain. Within a chunk it only moves down.
                debug_assert!(
                    destination_chunk != chunk || sequence.destination < sequence.start,
                    "Sequence {} would move forward to {}",
                    sequence.start,
                    sequence.destination
                );
                unsafe {
                    std::ptr::copy(
                        sequence.start.to_ptr::<u8>(),
                        sequence.destination.to_mut_ptr::<u8>(),
                        sequence.size,
                    );
                }
                self.stats.moved_bytes.add(sequence.size);
            }
            VM::VMChunkModel::set_top(destination_chunk, sequence.destination + sequence.size);
            true
        });
        self.stats.chunks_compacted.increment();
        log::debug!(
            "Compacted chunk {}, top {}",
            chunk,
            VM::VMChunkModel::top(chunk)
        );
    }
}
