use crate::util::ObjectReference;
use crate::vm::slot::Slot;
use crate::vm::VMBinding;

/// Callback trait of scanning functions that report slots.
pub trait SlotVisitor<SL: Slot> {
    /// Call this function for each slot.
    fn visit_slot(&mut self, slot: SL);
}

/// This lets us use closures as SlotVisitor.
impl<SL: Slot, F: FnMut(SL)> SlotVisitor<SL> for F {
    fn visit_slot(&mut self, slot: SL) {
        self(slot)
    }
}

/// VM-specific methods for scanning objects.
pub trait Scanning<VM: VMBinding> {
    /// Delegated scanning of an object, visiting each reference field encountered.
    ///
    /// The hidden referent of a weak-reference-shaped object must not be reported. The compactor
    /// reaches it through [`crate::vm::ReferenceGlue::referent_slot`] instead.
    ///
    /// Arguments:
    /// * `object`: The object to be scanned.
    /// * `slot_visitor`: Called back for each slot of the object.
    fn scan_object<SV: SlotVisitor<VM::VMSlot>>(object: ObjectReference, slot_visitor: &mut SV);
}
