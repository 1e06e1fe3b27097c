use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

/// VM-specific methods for the object header and object layout.
///
/// The compactor assumes that an [`ObjectReference`] points to the first byte of an object and
/// that objects in a chunk are laid out back to back from the chunk's objects start up to its
/// top. Marking is done outside the compactor, which only tests and clears the mark.
pub trait ObjectModel<VM: VMBinding> {
    /// Bytes in a reference field. Either 8 (wide references) or 4 (compressed references).
    const BYTES_IN_REFERENCE: usize;

    /// The shift applied to compressed references. Ignored for wide references.
    const LOG_COMPRESSED_SHIFT: u8 = 3;

    /// The base that compressed references are relative to. Ignored for wide references.
    fn compressed_base() -> Address {
        Address::ZERO
    }

    /// Return the size of an object as it lies in the heap.
    ///
    /// Arguments:
    /// * `object`: The object to be queried. It must not be forwarded.
    fn get_current_size(object: ObjectReference) -> usize;

    /// If the header of `object` was replaced by a forwarding pointer, return the object it was
    /// forwarded to.
    fn get_forwarded_object(object: ObjectReference) -> Option<ObjectReference>;

    /// Return the size the object had before it was forwarded to `forwarded`. This is the size
    /// of the copy minus any fields the copy gained, such as an identity hash field.
    fn get_size_before_forwarding(forwarded: ObjectReference) -> usize;

    /// Is the object marked live by the current collection?
    fn is_marked(object: ObjectReference) -> bool;

    /// Clear the mark of an object. Other header state, such as the remembered-set bit, must be
    /// preserved.
    fn clear_mark(object: ObjectReference);
}
