use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// VM-specific methods for weak-reference-shaped objects.
///
/// A reference-shaped object holds its referent in a hidden slot that is not reported by
/// [`crate::vm::Scanning::scan_object`]. When the referent of such an object dies, the slot is
/// cleared during fixup instead of being treated as a dangling pointer.
pub trait ReferenceGlue<VM: VMBinding> {
    /// Is `object` reference-shaped?
    fn is_reference(object: ObjectReference) -> bool;

    /// The hidden referent slot of a reference-shaped object.
    fn referent_slot(object: ObjectReference) -> VM::VMSlot;
}
