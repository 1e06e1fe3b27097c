//! This module provides the trait [`Slot`] and the two slot shapes the compactor can fix up
//! directly: word-sized slots holding raw addresses and 32-bit slots holding compressed
//! references.

use std::fmt::Debug;
use std::hash::Hash;

use atomic::Atomic;

use crate::util::{Address, ObjectReference};

/// `Slot` is an abstraction for the compactor to load and update object references in memory.
///
/// A slot can be in an object (a.k.a. a field), or in any other place that holds references
/// into the heap, such as the metadata of compiled code. A `Slot` value *points to* a slot, and
/// is not the slot itself. It can be copied, and the copy points to the same slot.
///
/// The compactor only cares about object references held inside slots. `load` returns `None`
/// for null or any other non-reference value, and such slots are never updated.
///
/// # Performance notes
///
/// The methods of this trait are called on hot paths.  Please ensure they have high performance.
pub trait Slot: Copy + Send + Debug + PartialEq + Eq + Hash {
    /// Load object reference from the slot.
    fn load(&self) -> Option<ObjectReference>;

    /// Store the object reference `object` into the slot.
    fn store(&self, object: ObjectReference);

    /// Clear the slot so that it holds null.
    fn clear(&self);

    /// The address of the slot itself. Used for diagnostics.
    fn as_address(&self) -> Address;
}

/// A simple slot implementation that represents a word-sized slot which holds the raw address of
/// an `ObjectReference`, or 0 if it is holding a null reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SimpleSlot {
    slot_addr: *mut Atomic<Address>,
}

impl SimpleSlot {
    /// Create a simple slot from an address.
    ///
    /// Arguments:
    /// *   `address`: The address in memory where an `ObjectReference` is stored.
    pub fn from_address(address: Address) -> Self {
        Self {
            slot_addr: address.to_mut_ptr(),
        }
    }
}

unsafe impl Send for SimpleSlot {}

impl Slot for SimpleSlot {
    fn load(&self) -> Option<ObjectReference> {
        let addr = unsafe { (*self.slot_addr).load(atomic::Ordering::Relaxed) };
        ObjectReference::from_raw_address(addr)
    }

    fn store(&self, object: ObjectReference) {
        unsafe { (*self.slot_addr).store(object.to_raw_address(), atomic::Ordering::Relaxed) }
    }

    fn clear(&self) {
        unsafe { (*self.slot_addr).store(Address::ZERO, atomic::Ordering::Relaxed) }
    }

    fn as_address(&self) -> Address {
        Address::from_mut_ptr(self.slot_addr)
    }
}

/// A 32-bit slot holding a compressed reference, decoded as `base + (value << shift)`. The value
/// 0 is null.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompressedSlot {
    slot_addr: *mut Atomic<u32>,
    base: Address,
    shift: u8,
}

unsafe impl Send for CompressedSlot {}

impl CompressedSlot {
    pub fn from_address(address: Address, base: Address, shift: u8) -> Self {
        Self {
            slot_addr: address.to_mut_ptr(),
            base,
            shift,
        }
    }

    /// Encode a reference for a compressed slot with the given base and shift.
    pub fn compress(object: ObjectReference, base: Address, shift: u8) -> u32 {
        let addr = object.to_raw_address();
        debug_assert!(addr > base, "{} is not above the compressed base {}", addr, base);
        debug_assert!(addr.is_aligned_to(1 << shift));
        let compressed = (addr - base) >> shift;
        debug_assert!(
            compressed <= u32::MAX as usize,
            "{} is too far from the compressed base {}",
            addr,
            base
        );
        compressed as u32
    }
}

impl Slot for CompressedSlot {
    fn load(&self) -> Option<ObjectReference> {
        let compressed = unsafe { (*self.slot_addr).load(atomic::Ordering::Relaxed) };
        if compressed == 0 {
            return None;
        }
        ObjectReference::from_raw_address(self.base + ((compressed as usize) << self.shift))
    }

    fn store(&self, object: ObjectReference) {
        let compressed = Self::compress(object, self.base, self.shift);
        unsafe { (*self.slot_addr).store(compressed, atomic::Ordering::Relaxed) }
    }

    fn clear(&self) {
        unsafe { (*self.slot_addr).store(0, atomic::Ordering::Relaxed) }
    }

    fn as_address(&self) -> Address {
        Address::from_mut_ptr(self.slot_addr)
    }
}

#[test]
fn a_simple_slot_should_have_the_same_size_as_a_pointer() {
    assert_eq!(
        std::mem::size_of::<SimpleSlot>(),
        std::mem::size_of::<*mut libc::c_void>()
    );
}
