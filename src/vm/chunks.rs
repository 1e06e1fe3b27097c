use crate::util::Address;
use crate::vm::VMBinding;
use std::fmt;

/// A chunk is a fixed-size region of the heap, aligned to its size, that holds objects packed
/// from its objects start up to its top. It is represented by its start address.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chunk(Address);

impl Chunk {
    /// Create a chunk from its start address.
    pub fn from_aligned_address<VM: VMBinding>(start: Address) -> Self {
        debug_assert!(
            start.is_aligned_to(1 << VM::LOG_BYTES_IN_CHUNK),
            "{} is not chunk aligned",
            start
        );
        Chunk(start)
    }

    /// The chunk that `addr` lies in, assuming `addr` lies in some chunk.
    pub fn align_down<VM: VMBinding>(addr: Address) -> Self {
        Chunk(addr.align_down(1 << VM::LOG_BYTES_IN_CHUNK))
    }

    pub fn start(&self) -> Address {
        self.0
    }

    pub fn end<VM: VMBinding>(&self) -> Address {
        self.0 + (1usize << VM::LOG_BYTES_IN_CHUNK)
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk({})", self.0)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// VM-specific methods for enumerating and updating chunks.
///
/// Chunks are linked in allocation order. The compactor visits them in that order, and relies
/// on it to keep surviving objects in their relative order.
pub trait ChunkModel<VM: VMBinding> {
    /// The address of the first object in the chunk. At least one relocation record must fit
    /// in the bytes immediately before it.
    fn objects_start(chunk: Chunk) -> Address;

    /// The end of the space objects may occupy in the chunk.
    fn objects_end(chunk: Chunk) -> Address;

    /// The allocation boundary of the chunk.
    fn top(chunk: Chunk) -> Address;

    fn set_top(chunk: Chunk, top: Address);

    /// Should the chunk be swept in place instead of compacted in this cycle?
    fn should_sweep(chunk: Chunk) -> bool;

    /// The chunk after `chunk` in allocation order.
    fn next(chunk: Chunk) -> Option<Chunk>;

    /// The compacted space chunk that contains `addr`, or `None` if `addr` is outside the space.
    fn chunk_containing(addr: Address) -> Option<Chunk>;
}

/// VM-specific access to the brick table of a chunk. A brick table divides the objects area of
/// a chunk into fixed-size bricks and stores, for each brick, the start of a live sequence at or
/// before it. It is written by planning and read by address resolution.
pub trait BrickTable<VM: VMBinding> {
    /// Number of bricks in a chunk.
    fn length(chunk: Chunk) -> usize;

    /// The brick that `addr` lies in.
    fn index(chunk: Chunk, addr: Address) -> usize;

    fn get(chunk: Chunk, index: usize) -> Address;

    fn set(chunk: Chunk, index: usize, sequence_start: Address);
}

/// VM-specific access to the first-object table of a chunk, which maps address ranges to the
/// first object overlapping them. The compactor only writes it.
pub trait FirstObjectTable<VM: VMBinding> {
    /// Forget every entry of the chunk.
    fn reset(chunk: Chunk);

    /// Record the object occupying `[start, end)` in the chunk.
    fn set_table_for_object(chunk: Chunk, start: Address, end: Address);
}
