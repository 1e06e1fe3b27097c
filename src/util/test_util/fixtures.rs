// Some tests are conditionally compiled. So not all the code in this module will be used. We simply allow dead code in this module.
#![allow(dead_code)]

use crate::compactor::Compactor;
use crate::policy::compact::RootSet;
use crate::util::linear_scan::{DefaultObjectSize, ObjectIterator};
use crate::util::memory;
use crate::util::options::Options;
use crate::util::relocation_stack::RelocationStack;
use crate::util::test_util::mock_vm::*;
use crate::util::{Address, ObjectReference};
use crate::vm::slot::Slot;
use crate::vm::*;

/// A compactor for a mock heap with default options and `threads` workers.
pub fn mock_compactor<F: MockFlavor>(threads: usize) -> Compactor<MockVM<F>> {
    let mut options = Options::with_defaults();
    options.threads = threads;
    Compactor::new(options)
}

pub fn no_roots() -> RootSet {
    RootSet::default()
}

/// Bytes mapped for objects outside the compacted chunks.
const OUTSIDE_BYTES: usize = BYTES_IN_MOCK_CHUNK;

/// A heap of linked mock chunks, plus a region outside of them for objects that hold
/// references into the chunks (e.g. large objects). Everything is unmapped on drop.
pub struct MockHeap<F: MockFlavor = Wide> {
    start: Address,
    chunks: Vec<Chunk>,
    outside: Address,
    outside_top: Address,
    _p: std::marker::PhantomData<F>,
}

type VM<F> = MockVM<F>;

impl<F: MockFlavor> MockHeap<F> {
    pub fn new(n_chunks: usize) -> Self {
        assert!(n_chunks > 0);
        let start =
            memory::map_anonymous_aligned(n_chunks * BYTES_IN_MOCK_CHUNK, BYTES_IN_MOCK_CHUNK)
                .unwrap();
        let outside = memory::map_anonymous(OUTSIDE_BYTES).unwrap();
        F::heap_mapped(start);

        let chunks: Vec<Chunk> = (0..n_chunks)
            .map(|i| Chunk::from_aligned_address::<VM<F>>(start + i * BYTES_IN_MOCK_CHUNK))
            .collect();
        for (i, chunk) in chunks.iter().enumerate() {
            VM::<F>::init_chunk(*chunk);
            VM::<F>::set_next(*chunk, chunks.get(i + 1).copied());
            VM::<F>::register_chunk(*chunk);
        }
        MockHeap {
            start,
            chunks,
            outside,
            outside_top: outside,
            _p: std::marker::PhantomData,
        }
    }

    /// Chain the chunks in a different order. `order` lists the current indices in their new
    /// chain order. Indices of this heap follow the chain afterwards.
    pub fn relink(&mut self, order: &[usize]) {
        assert_eq!(order.len(), self.chunks.len());
        self.chunks = order.iter().map(|i| self.chunks[*i]).collect();
        for (i, chunk) in self.chunks.iter().enumerate() {
            VM::<F>::set_next(*chunk, self.chunks.get(i + 1).copied());
        }
    }

    pub fn first(&self) -> Chunk {
        self.chunks[0]
    }

    pub fn chunk(&self, index: usize) -> Chunk {
        self.chunks[index]
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn objects_start(&self, index: usize) -> Address {
        VM::<F>::objects_start(self.chunks[index])
    }

    pub fn top(&self, index: usize) -> Address {
        VM::<F>::top(self.chunks[index])
    }

    pub fn set_sweep(&self, index: usize, sweep: bool) {
        VM::<F>::set_sweep(self.chunks[index], sweep);
    }

    /// Allocate an ordinary object with `nrefs` null reference fields at the top of a chunk.
    pub fn alloc(&mut self, index: usize, nrefs: usize, tag: usize) -> ObjectReference {
        self.alloc_with(index, VM::<F>::object_size(nrefs), MockKind::Plain, nrefs, tag)
    }

    /// Allocate an ordinary object of `size` bytes without reference fields.
    pub fn alloc_sized(&mut self, index: usize, size: usize, tag: usize) -> ObjectReference {
        self.alloc_with(index, size, MockKind::Plain, 0, tag)
    }

    /// Allocate a reference-shaped object. Its referent is field 0.
    pub fn alloc_reference(&mut self, index: usize, nrefs: usize, tag: usize) -> ObjectReference {
        assert!(nrefs >= 1);
        self.alloc_with(
            index,
            VM::<F>::object_size(nrefs),
            MockKind::Reference,
            nrefs,
            tag,
        )
    }

    pub fn alloc_with(
        &mut self,
        index: usize,
        size: usize,
        kind: MockKind,
        nrefs: usize,
        tag: usize,
    ) -> ObjectReference {
        let chunk = self.chunks[index];
        let top = VM::<F>::top(chunk);
        assert!(
            top + size <= VM::<F>::objects_end(chunk),
            "Chunk {} is full",
            chunk
        );
        let object = VM::<F>::format_object(top, size, kind, nrefs, tag);
        VM::<F>::set_top(chunk, top + size);
        object
    }

    /// Fill the rest of a chunk with dead objects of `size` bytes, or as many as fit.
    pub fn fill_dead(&mut self, index: usize, size: usize) {
        let chunk = self.chunks[index];
        while VM::<F>::top(chunk) + size <= VM::<F>::objects_end(chunk) {
            self.alloc_sized(index, size, 0);
        }
    }

    /// Allocate an object outside the chunks.
    pub fn alloc_outside(&mut self, nrefs: usize, tag: usize) -> ObjectReference {
        let size = VM::<F>::object_size(nrefs);
        assert!(self.outside_top + size <= self.outside + OUTSIDE_BYTES);
        let object = VM::<F>::format_object(self.outside_top, size, MockKind::Plain, nrefs, tag);
        self.outside_top += size;
        object
    }

    pub fn set_ref(&self, object: ObjectReference, index: usize, target: Option<ObjectReference>) {
        let slot = VM::<F>::ref_slot(object, index);
        match target {
            Some(target) => slot.store(target),
            None => slot.clear(),
        }
    }

    pub fn get_ref(&self, object: ObjectReference, index: usize) -> Option<ObjectReference> {
        VM::<F>::ref_slot(object, index).load()
    }

    /// Mark everything reachable from `roots` through the chunks, the way a marking phase
    /// before compaction would. Referents of reference objects are not traced. A slot that
    /// refers to a forwarded object is updated to the copy.
    pub fn mark_from(
        &self,
        stack: &mut RelocationStack<ObjectReference>,
        roots: &[ObjectReference],
    ) {
        debug_assert!(stack.is_empty());
        for root in roots {
            stack.push(*root);
        }
        while let Some(object) = stack.pop() {
            let in_chunks = VM::<F>::chunk_containing(object.to_raw_address()).is_some();
            if in_chunks {
                if VM::<F>::is_marked(object) {
                    continue;
                }
                VM::<F>::set_mark(object);
            }
            VM::<F>::scan_object(object, &mut |slot: F::Slot| {
                if let Some(target) = slot.load() {
                    match VM::<F>::get_forwarded_object(target) {
                        Some(copy) => {
                            slot.store(copy);
                            stack.push(copy);
                        }
                        None => stack.push(target),
                    }
                }
            });
        }
    }

    /// The objects of a chunk, from its objects start to its top.
    pub fn objects_in(&self, index: usize) -> Vec<ObjectReference> {
        let chunk = self.chunks[index];
        ObjectIterator::<VM<F>, DefaultObjectSize<VM<F>>>::new(
            VM::<F>::objects_start(chunk),
            VM::<F>::top(chunk),
        )
        .collect()
    }

    /// The tags of all non-filler objects, in address order.
    pub fn tags(&self) -> Vec<usize> {
        (0..self.chunks.len())
            .flat_map(|i| self.objects_in(i))
            .filter(|o| !VM::<F>::kind(*o).is_filler())
            .map(VM::<F>::tag)
            .collect()
    }

    /// Check that every card below the top of a chunk records the object covering its first
    /// byte, and that no card above the top records anything.
    pub fn verify_first_object_table(&self, index: usize) {
        let chunk = self.chunks[index];
        let top = VM::<F>::top(chunk);
        let objects = self.objects_in(index);
        let mut covering = objects.iter().peekable();
        for card in 0..CARDS_IN_CHUNK {
            let card_start = VM::<F>::card_start(chunk, card);
            let recorded = VM::<F>::first_object_in_card(chunk, card);
            if card_start >= top {
                assert_eq!(recorded, None, "Card {} of {} is above the top", card, chunk);
                continue;
            }
            while let Some(o) = covering.peek() {
                let end = o.to_raw_address() + VM::<F>::get_current_size(**o);
                if end > card_start {
                    break;
                }
                covering.next();
            }
            let expected = covering.peek().map(|o| o.to_raw_address());
            assert_eq!(recorded, expected, "Card {} of {}", card, chunk);
        }
    }

    /// Find the non-filler object with `tag`.
    pub fn find(&self, tag: usize) -> Option<ObjectReference> {
        (0..self.chunks.len())
            .flat_map(|i| self.objects_in(i))
            .find(|o| !VM::<F>::kind(*o).is_filler() && VM::<F>::tag(*o) == tag)
    }
}

impl<F: MockFlavor> Drop for MockHeap<F> {
    fn drop(&mut self) {
        for chunk in self.chunks.iter() {
            VM::<F>::unregister_chunk(*chunk);
        }
        memory::munmap(self.start, self.chunks.len() * BYTES_IN_MOCK_CHUNK).unwrap();
        memory::munmap(self.outside, OUTSIDE_BYTES).unwrap();
    }
}
