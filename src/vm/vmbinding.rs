use super::*;
use crate::policy::compact::record::RecordLayout;

/// Default min alignment 8 bytes
const DEFAULT_LOG_MIN_ALIGNMENT: usize = 3;

/// The `VMBinding` trait associates with each trait, and provides VM-specific constants.
///
/// A binding is a zero-sized type that names every collaborator the compactor needs, in the
/// same way for every phase of a collection.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    /// Header protocol, object sizes and reference width.
    type VMObjectModel: ObjectModel<Self>;
    /// Enumerates the reference slots of an object.
    type VMScanning: Scanning<Self>;
    /// Access to the hidden referent of weak-reference-shaped objects.
    type VMReferenceGlue: ReferenceGlue<Self>;
    /// Chunk enumeration, tops and the per-cycle sweep flag.
    type VMChunkModel: ChunkModel<Self>;
    /// The per-chunk index from address ranges to live sequence starts.
    type VMBrickTable: BrickTable<Self>;
    /// The per-chunk index from address ranges to the first overlapping object.
    type VMFirstObjectTable: FirstObjectTable<Self>;
    /// Formats dead space in swept chunks.
    type VMFiller: Filler<Self>;
    /// The type of reference slots inside heap objects.
    type VMSlot: slot::Slot;
    /// How relocation records are laid out in dead space. The layout must match the reference
    /// width of [`VMBinding::VMObjectModel`].
    type VMRecordLayout: RecordLayout;

    /// Allowed minimal alignment in bytes. Every object size is a multiple of it.
    const MIN_ALIGNMENT: usize = 1 << DEFAULT_LOG_MIN_ALIGNMENT;
    /// log2 of the bytes in a chunk. Chunks are aligned to their size.
    const LOG_BYTES_IN_CHUNK: usize;
    /// The smallest object the binding can allocate. Every dead gap is at least this large.
    const MIN_OBJECT_SIZE: usize;
}
