use crate::util::Address;
use crate::vm::VMBinding;

/// VM-specific methods for formatting filler objects over dead space, so that a linear scan of a
/// swept chunk sees a valid object everywhere below the top.
pub trait Filler<VM: VMBinding> {
    /// The size of the fixed-shape filler.
    const FIXED_FILLER_BYTES: usize;

    /// The size of the smallest array-shaped filler.
    const MIN_ARRAY_FILLER_BYTES: usize;

    /// The length of the largest array filler that fits in `bytes`.
    fn array_filler_length(bytes: usize) -> usize;

    /// The size of an array filler of `length` elements.
    fn array_filler_size(length: usize) -> usize;

    /// Format an array filler of `length` elements at `start`.
    fn format_array_filler(start: Address, length: usize);

    /// Format a fixed-shape filler at `start`.
    fn format_fixed_filler(start: Address);
}
