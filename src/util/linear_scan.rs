use crate::util::Address;
use crate::util::ObjectReference;
use crate::vm::ObjectModel;
use crate::vm::VMBinding;
use std::marker::PhantomData;

/// Iterate over an address range of objects packed back to back, such as the objects of a live
/// sequence. The size of each object tells where the next one starts.
pub struct ObjectIterator<VM: VMBinding, S: LinearScanObjectSize> {
    end: Address,
    cursor: Address,
    _p: PhantomData<(VM, S)>,
}

impl<VM: VMBinding, S: LinearScanObjectSize> ObjectIterator<VM, S> {
    /// Create an iterator for the address range. The caller must ensure that an object starts at
    /// `start`, and that the last object ends exactly at `end`.
    pub fn new(start: Address, end: Address) -> Self {
        debug_assert!(start <= end);
        ObjectIterator {
            end,
            cursor: start,
            _p: PhantomData,
        }
    }

    /// The end of the object last returned, which is also where the next one starts.
    pub fn cursor(&self) -> Address {
        self.cursor
    }
}

impl<VM: VMBinding, S: LinearScanObjectSize> std::iter::Iterator for ObjectIterator<VM, S> {
    type Item = ObjectReference;

    fn next(&mut self) -> Option<<Self as Iterator>::Item> {
        if self.cursor >= self.end {
            debug_assert_eq!(self.cursor, self.end, "Objects overran the scanned range");
            return None;
        }
        let object = unsafe { ObjectReference::from_raw_address_unchecked(self.cursor) };
        let size = S::size(object);
        debug_assert!(
            size >= VM::MIN_OBJECT_SIZE && size % VM::MIN_ALIGNMENT == 0,
            "Bad size {} for object {}",
            size,
            object
        );
        self.cursor += size;
        Some(object)
    }
}

/// Describe object size for linear scan.
pub trait LinearScanObjectSize {
    /// The object size in bytes for the given object.
    fn size(object: ObjectReference) -> usize;
}

/// Default object size as ObjectModel::get_current_size()
pub struct DefaultObjectSize<VM: VMBinding>(PhantomData<VM>);
impl<VM: VMBinding> LinearScanObjectSize for DefaultObjectSize<VM> {
    fn size(object: ObjectReference) -> usize {
        VM::VMObjectModel::get_current_size(object)
    }
}

/// The size an object occupies in its chunk before compaction. An object whose header was
/// replaced by a forwarding pointer no longer knows its own size, so it is taken from the copy.
pub struct HeapObjectSize<VM: VMBinding>(PhantomData<VM>);
impl<VM: VMBinding> LinearScanObjectSize for HeapObjectSize<VM> {
    fn size(object: ObjectReference) -> usize {
        match VM::VMObjectModel::get_forwarded_object(object) {
            Some(forwarded) => VM::VMObjectModel::get_size_before_forwarding(forwarded),
            None => VM::VMObjectModel::get_current_size(object),
        }
    }
}
