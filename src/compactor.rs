//! The driver of a compaction cycle.

use crate::policy::compact::compacting::CompactingVisitor;
use crate::policy::compact::fixup::FixupVisitor;
use crate::policy::compact::planning::PlanningVisitor;
use crate::policy::compact::record::RecordLayout;
use crate::policy::compact::roots::{RootEnumerator, RootFixup};
use crate::policy::compact::sweeping::SweepingVisitor;
use crate::util::log;
use crate::util::memory;
use crate::util::options::Options;
use crate::util::relocation_stack::RelocationStack;
use crate::util::statistics::{CompactionStats, StatsSnapshot};
use crate::util::{Address, ObjectReference};
use crate::vm::*;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The outcome of one compaction cycle.
#[derive(Debug, Clone)]
pub struct CompactionSummary {
    /// Compacted chunks that hold no object any more. The caller may release them.
    pub empty_chunks: Vec<Chunk>,
    /// Counters of the cycle.
    pub stats: StatsSnapshot,
}

/// Compacts the chunks of one space. All mutators must be stopped, and every reachable object
/// must be marked, before a cycle starts. A cycle always runs to completion.
///
/// The phases can also be run one by one (`plan`, `fixup`, `sweep`, `compact`), in that order.
/// Each phase must complete on every chunk before the next one starts.
pub struct Compactor<VM: VMBinding> {
    options: Options,
    stats: CompactionStats,
    _p: PhantomData<VM>,
}

impl<VM: VMBinding> Compactor<VM> {
    /// Create a compactor. Panics if the options are invalid, or if the binding describes a
    /// heap the record layout cannot encode.
    ///
    /// This attempts to initialize a logger. A runtime that wants its own logger should install
    /// it before creating a compactor.
    pub fn new(options: Options) -> Self {
        match crate::util::logger::try_init() {
            Ok(_) => log::debug!("The compactor initialized the logger."),
            Err(_) => log::debug!(
                "The compactor failed to initialize the logger. Possibly a logger has been initialized by user."
            ),
        }
        if let Err(e) = options.validate() {
            panic!("Invalid compactor options: {}", e);
        }
        Self::check_binding();
        Compactor {
            options,
            stats: CompactionStats::default(),
            _p: PhantomData,
        }
    }

    fn check_binding() {
        let chunk_bytes = 1usize << VM::LOG_BYTES_IN_CHUNK;
        assert_eq!(
            VM::VMRecordLayout::BYTES_IN_REFERENCE,
            VM::VMObjectModel::BYTES_IN_REFERENCE,
            "The relocation record layout does not match the reference width"
        );
        assert!(
            VM::VMRecordLayout::fits_chunk(chunk_bytes),
            "Chunks of {} bytes are too large for the record layout (max {})",
            chunk_bytes,
            VM::VMRecordLayout::MAX_SEQUENCE_BYTES
        );
        assert!(
            VM::MIN_OBJECT_SIZE >= VM::VMRecordLayout::BYTES,
            "The minimum object size {} cannot hold a relocation record of {} bytes",
            VM::MIN_OBJECT_SIZE,
            VM::VMRecordLayout::BYTES
        );
        assert!(
            VM::MIN_ALIGNMENT % VM::VMRecordLayout::GRANULE == 0
                && VM::MIN_OBJECT_SIZE % VM::MIN_ALIGNMENT == 0,
            "Object alignment {} does not fit the record layout",
            VM::MIN_ALIGNMENT
        );
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn stats(&self) -> &CompactionStats {
        &self.stats
    }

    /// A work stack for the marking phase that precedes a cycle, with segments of the
    /// configured size. It never allocates on the Rust heap.
    pub fn new_mark_stack(&self) -> RelocationStack<ObjectReference> {
        RelocationStack::new(self.options.relocation_stack_segment_size)
    }

    /// Run a whole cycle over the chunks starting at `first`.
    pub fn collect<R: RootEnumerator + ?Sized>(
        &self,
        first: Chunk,
        roots: &mut R,
    ) -> CompactionSummary {
        self.stats.reset();
        self.plan(first);
        self.fixup(first, roots);
        self.sweep(first);
        let empty_chunks = self.compact(first);
        self.stats.log();
        CompactionSummary {
            empty_chunks,
            stats: self.stats.snapshot(),
        }
    }

    /// Decide the destination of every live sequence. Sequential: the allocation cursor
    /// visits chunks in order.
    pub fn plan(&self, first: Chunk) {
        log::info!("Planning from chunk {}", first);
        let mut planning = PlanningVisitor::<VM>::new(first, &self.stats);
        for chunk in chunks::<VM>(first) {
            planning.visit_chunk(chunk);
        }
        log::info!(
            "Planning done, allocation cursor at {} in chunk {}",
            planning.cursor().top(),
            planning.cursor().chunk()
        );
    }

    /// Fix up every reference in surviving objects and in `roots`, and rebuild the
    /// first-object tables.
    pub fn fixup<R: RootEnumerator + ?Sized>(&self, first: Chunk, roots: &mut R) {
        log::info!("Fixing up references");
        let chunks = chunks::<VM>(first);
        // Fixup records objects in the tables of their destination chunks, which may be visited
        // by another worker.
        for chunk in chunks.iter() {
            VM::VMFirstObjectTable::reset(*chunk);
        }
        let fixup = FixupVisitor::<VM>::new(&self.stats);
        self.for_each_chunk(&chunks, |chunk| fixup.visit_chunk(chunk));
        RootFixup::<VM>::new(&self.stats).fixup_roots(roots);
        log::info!("Fixup done");
    }

    /// Fill the gaps of every chunk being swept.
    pub fn sweep(&self, first: Chunk) {
        let chunks: Vec<Chunk> = chunks::<VM>(first)
            .into_iter()
            .filter(|c| VM::VMChunkModel::should_sweep(*c))
            .collect();
        log::info!("Sweeping {} chunks", chunks.len());
        let sweeping = SweepingVisitor::<VM>::new(&self.stats);
        self.for_each_chunk(&chunks, |chunk| sweeping.visit_chunk(chunk));
    }

    /// Move the live sequences of every chunk not being swept. Sequential: a sequence may move
    /// into a chunk visited earlier. Returns the compacted chunks left empty.
    pub fn compact(&self, first: Chunk) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = chunks::<VM>(first)
            .into_iter()
            .filter(|c| !VM::VMChunkModel::should_sweep(*c))
            .collect();
        log::info!("Compacting {} chunks", chunks.len());
        let old_tops: Vec<Address> = chunks
            .iter()
            .map(|c| VM::VMChunkModel::top(*c))
            .collect();

        let compacting = CompactingVisitor::<VM>::new(&self.stats);
        for chunk in chunks.iter() {
            compacting.visit_chunk(*chunk);
        }

        let mut empty = vec![];
        for (chunk, old_top) in chunks.iter().zip(old_tops) {
            let top = VM::VMChunkModel::top(*chunk);
            if self.options.zap_reclaimed_space && top < old_top {
                memory::zero(top, old_top - top);
            }
            if top == VM::VMChunkModel::objects_start(*chunk) {
                empty.push(*chunk);
            }
        }
        log::info!("Compaction done, {} chunks empty", empty.len());
        empty
    }

    /// Run `f` on every chunk, spread over the worker threads. Returns once all are done.
    fn for_each_chunk<F: Fn(Chunk) + Sync>(&self, chunks: &[Chunk], f: F) {
        let threads = self.options.threads.min(chunks.len());
        if threads <= 1 {
            chunks.iter().for_each(|c| f(*c));
            return;
        }
        let next = AtomicUsize::new(0);
        let result = crossbeam::scope(|s| {
            for _ in 0..threads {
                s.spawn(|_| loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    match chunks.get(i) {
                        Some(chunk) => f(*chunk),
                        None => break,
                    }
                });
            }
        });
        if let Err(e) = result {
            std::panic::resume_unwind(e);
        }
    }
}

/// The chunks linked from `first`, in allocation order.
pub fn chunks<VM: VMBinding>(first: Chunk) -> Vec<Chunk> {
    let mut chunks = vec![];
    let mut cursor = Some(first);
    while let Some(chunk) = cursor {
        chunks.push(chunk);
        cursor = VM::VMChunkModel::next(chunk);
    }
    chunks
}
