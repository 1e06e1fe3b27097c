//! A self-contained binding for tests and benchmarks.
//!
//! `MockVM` describes a toy heap made of 64KB chunks. Every chunk starts with a small header
//! holding its top, its successor and its flags, followed by the brick table and the
//! first-object table. Objects start at [`OBJECTS_START_OFFSET`].
//!
//! Every object starts with two words:
//! * status: bit 0 is the mark bit, bit 1 the remembered bit, bit 2 says the object was
//!   forwarded, in which case the remaining bits are the address of the copy.
//! * descriptor: `size << 32 | nrefs << 8 | hashed << 4 | kind`. Forwarding zeroes it.
//!
//! The third word holds a tag (or the length of an array filler), and reference fields follow
//! it. A [`MockKind::Reference`] object keeps its referent in its first reference field, which
//! is hidden from scanning.
//!
//! The flavor picks the reference width: [`Wide`] uses 8-byte references and
//! [`WideLayout`] records, [`Compressed`] uses 4-byte references relative to a global base and
//! [`CompressedLayout`] records.

#![allow(dead_code)]

use crate::policy::compact::record::{CompressedLayout, RecordLayout, WideLayout};
use crate::util::constants::{BYTES_IN_COMPRESSED_REFERENCE, BYTES_IN_WIDE_REFERENCE};
use crate::util::conversions::raw_align_up;
use crate::util::{Address, ObjectReference};
use crate::vm::slot::{CompressedSlot, SimpleSlot, Slot};
use crate::vm::*;
use static_assertions::const_assert;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

pub const LOG_BYTES_IN_MOCK_CHUNK: usize = 16;
pub const BYTES_IN_MOCK_CHUNK: usize = 1 << LOG_BYTES_IN_MOCK_CHUNK;

const TOP_OFFSET: usize = 0;
const NEXT_OFFSET: usize = 8;
const FLAGS_OFFSET: usize = 16;
const BRICK_TABLE_OFFSET: usize = 24;

/// Where objects start in a chunk.
pub const OBJECTS_START_OFFSET: usize = 2048;

pub const LOG_BYTES_IN_BRICK: usize = 10;
pub const BRICKS_IN_CHUNK: usize =
    (BYTES_IN_MOCK_CHUNK - OBJECTS_START_OFFSET) >> LOG_BYTES_IN_BRICK;

const FIRST_OBJECT_TABLE_OFFSET: usize = BRICK_TABLE_OFFSET + BRICKS_IN_CHUNK * 8;
pub const LOG_BYTES_IN_CARD: usize = 9;
pub const CARDS_IN_CHUNK: usize =
    (BYTES_IN_MOCK_CHUNK - OBJECTS_START_OFFSET) >> LOG_BYTES_IN_CARD;
const EMPTY_CARD: usize = usize::MAX;

// The record of the first sequence goes right below the objects start.
const_assert!(FIRST_OBJECT_TABLE_OFFSET + CARDS_IN_CHUNK * 8 + 16 <= OBJECTS_START_OFFSET);

const FLAG_SWEEP: usize = 1;

const STATUS_OFFSET: usize = 0;
const DESCRIPTOR_OFFSET: usize = 8;
const TAG_OFFSET: usize = 16;
/// The first reference field of an object.
pub const REFS_OFFSET: usize = 24;

const MARK_BIT: usize = 1;
const REMEMBERED_BIT: usize = 1 << 1;
const FORWARDED_BIT: usize = 1 << 2;
const STATUS_BITS: usize = MARK_BIT | REMEMBERED_BIT | FORWARDED_BIT;

const KIND_MASK: usize = 0xF;
const HASHED_BIT: usize = 1 << 4;
const NREFS_SHIFT: usize = 8;
const NREFS_MASK: usize = 0xFF_FFFF;
const SIZE_SHIFT: usize = 32;

/// The identity hash field a copied object gains.
pub const BYTES_IN_HASH_FIELD: usize = 8;

pub const FIXED_FILLER_BYTES: usize = 16;
pub const MIN_ARRAY_FILLER_BYTES: usize = REFS_OFFSET;
const BYTES_IN_ARRAY_FILLER_ELEMENT: usize = 8;

#[repr(usize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MockKind {
    Plain = 0,
    Reference = 1,
    ArrayFiller = 2,
    FixedFiller = 3,
}

impl MockKind {
    fn from_descriptor(descriptor: usize) -> Self {
        match descriptor & KIND_MASK {
            0 => MockKind::Plain,
            1 => MockKind::Reference,
            2 => MockKind::ArrayFiller,
            3 => MockKind::FixedFiller,
            k => panic!("Bad object kind {}", k),
        }
    }

    pub fn is_filler(self) -> bool {
        matches!(self, MockKind::ArrayFiller | MockKind::FixedFiller)
    }
}

lazy_static! {
    // Chunks of all live mock heaps. Tests run in parallel, each with its own heap.
    static ref MOCK_CHUNKS: RwLock<HashSet<Chunk>> = RwLock::default();
}

static COMPRESSED_BASE: AtomicUsize = AtomicUsize::new(0);

/// Reference width and record layout of a mock binding.
pub trait MockFlavor: 'static + Send + Sync + Default {
    type Slot: Slot;
    type Layout: RecordLayout;
    const BYTES_IN_REFERENCE: usize;

    fn compressed_base() -> Address;

    fn slot(addr: Address) -> Self::Slot;

    /// Called once the backing memory of a heap is mapped.
    fn heap_mapped(_start: Address) {}
}

/// 8-byte references.
#[derive(Default)]
pub struct Wide;

impl MockFlavor for Wide {
    type Slot = SimpleSlot;
    type Layout = WideLayout;
    const BYTES_IN_REFERENCE: usize = BYTES_IN_WIDE_REFERENCE;

    fn compressed_base() -> Address {
        Address::ZERO
    }

    fn slot(addr: Address) -> SimpleSlot {
        SimpleSlot::from_address(addr)
    }
}

/// 4-byte references relative to the start of the most recently mapped heap. Tests using this
/// flavor must run under [`crate::util::test_util::serial_test`].
#[derive(Default)]
pub struct Compressed;

pub const LOG_MOCK_COMPRESSED_SHIFT: u8 = 3;

impl MockFlavor for Compressed {
    type Slot = CompressedSlot;
    type Layout = CompressedLayout<LOG_MOCK_COMPRESSED_SHIFT>;
    const BYTES_IN_REFERENCE: usize = BYTES_IN_COMPRESSED_REFERENCE;

    fn compressed_base() -> Address {
        unsafe { Address::from_usize(COMPRESSED_BASE.load(Ordering::Relaxed)) }
    }

    fn slot(addr: Address) -> CompressedSlot {
        CompressedSlot::from_address(addr, Self::compressed_base(), LOG_MOCK_COMPRESSED_SHIFT)
    }

    fn heap_mapped(start: Address) {
        COMPRESSED_BASE.store(start.as_usize(), Ordering::Relaxed);
    }
}

#[derive(Default)]
pub struct MockVM<F: MockFlavor = Wide>(PhantomData<F>);

impl<F: MockFlavor> VMBinding for MockVM<F> {
    type VMObjectModel = MockVM<F>;
    type VMScanning = MockVM<F>;
    type VMReferenceGlue = MockVM<F>;
    type VMChunkModel = MockVM<F>;
    type VMBrickTable = MockVM<F>;
    type VMFirstObjectTable = MockVM<F>;
    type VMFiller = MockVM<F>;
    type VMSlot = F::Slot;
    type VMRecordLayout = F::Layout;

    const LOG_BYTES_IN_CHUNK: usize = LOG_BYTES_IN_MOCK_CHUNK;
    const MIN_OBJECT_SIZE: usize = FIXED_FILLER_BYTES;
}

fn load_word(addr: Address) -> usize {
    unsafe { addr.load::<usize>() }
}

fn store_word(addr: Address, value: usize) {
    unsafe { addr.store::<usize>(value) }
}

fn atomic_word(addr: Address) -> &'static AtomicUsize {
    unsafe { &*addr.to_ptr::<AtomicUsize>() }
}

/// Chunk and object helpers used by tests to build heaps.
impl<F: MockFlavor> MockVM<F> {
    pub fn register_chunk(chunk: Chunk) {
        let mut chunks = MOCK_CHUNKS.write().unwrap_or_else(|p| p.into_inner());
        chunks.insert(chunk);
    }

    pub fn unregister_chunk(chunk: Chunk) {
        let mut chunks = MOCK_CHUNKS.write().unwrap_or_else(|p| p.into_inner());
        chunks.remove(&chunk);
    }

    /// Format the header of an empty chunk.
    pub fn init_chunk(chunk: Chunk) {
        let start = chunk.start();
        store_word(start + TOP_OFFSET, (start + OBJECTS_START_OFFSET).as_usize());
        store_word(start + NEXT_OFFSET, 0);
        store_word(start + FLAGS_OFFSET, 0);
        for i in 0..BRICKS_IN_CHUNK {
            store_word(start + BRICK_TABLE_OFFSET + i * 8, 0);
        }
        <Self as FirstObjectTable<Self>>::reset(chunk);
    }

    pub fn set_next(chunk: Chunk, next: Option<Chunk>) {
        let raw = next.map_or(0, |c| c.start().as_usize());
        store_word(chunk.start() + NEXT_OFFSET, raw);
    }

    pub fn set_sweep(chunk: Chunk, sweep: bool) {
        let flags = load_word(chunk.start() + FLAGS_OFFSET);
        let flags = if sweep {
            flags | FLAG_SWEEP
        } else {
            flags & !FLAG_SWEEP
        };
        store_word(chunk.start() + FLAGS_OFFSET, flags);
    }

    /// The lowest start of an object recorded for a card, if any.
    pub fn first_object_in_card(chunk: Chunk, card: usize) -> Option<Address> {
        assert!(card < CARDS_IN_CHUNK);
        match atomic_word(Self::card_entry(chunk, card)).load(Ordering::Relaxed) {
            EMPTY_CARD => None,
            raw => Some(unsafe { Address::from_usize(raw) }),
        }
    }

    pub fn card_index(chunk: Chunk, addr: Address) -> usize {
        (addr - <Self as ChunkModel<Self>>::objects_start(chunk)) >> LOG_BYTES_IN_CARD
    }

    pub fn card_start(chunk: Chunk, card: usize) -> Address {
        <Self as ChunkModel<Self>>::objects_start(chunk) + (card << LOG_BYTES_IN_CARD)
    }

    fn card_entry(chunk: Chunk, card: usize) -> Address {
        chunk.start() + FIRST_OBJECT_TABLE_OFFSET + card * 8
    }

    /// The size of an ordinary object with `nrefs` reference fields.
    pub fn object_size(nrefs: usize) -> usize {
        raw_align_up(REFS_OFFSET + nrefs * F::BYTES_IN_REFERENCE, 8)
    }

    /// Write the header of an unmarked object at `addr`.
    pub fn format_object(
        addr: Address,
        size: usize,
        kind: MockKind,
        nrefs: usize,
        tag: usize,
    ) -> ObjectReference {
        debug_assert!(nrefs <= NREFS_MASK);
        store_word(addr + STATUS_OFFSET, 0);
        store_word(
            addr + DESCRIPTOR_OFFSET,
            size << SIZE_SHIFT | nrefs << NREFS_SHIFT | kind as usize,
        );
        if kind == MockKind::FixedFiller {
            debug_assert!(size == FIXED_FILLER_BYTES && nrefs == 0);
            return unsafe { ObjectReference::from_raw_address_unchecked(addr) };
        }
        debug_assert!(size >= Self::object_size(nrefs), "{} bytes are too small", size);
        store_word(addr + TAG_OFFSET, tag);
        for i in 0..nrefs {
            F::slot(addr + REFS_OFFSET + i * F::BYTES_IN_REFERENCE).clear();
        }
        unsafe { ObjectReference::from_raw_address_unchecked(addr) }
    }

    fn status(object: ObjectReference) -> usize {
        load_word(object.to_raw_address() + STATUS_OFFSET)
    }

    fn set_status(object: ObjectReference, status: usize) {
        store_word(object.to_raw_address() + STATUS_OFFSET, status)
    }

    fn descriptor(object: ObjectReference) -> usize {
        load_word(object.to_raw_address() + DESCRIPTOR_OFFSET)
    }

    pub fn kind(object: ObjectReference) -> MockKind {
        MockKind::from_descriptor(Self::descriptor(object))
    }

    pub fn nrefs(object: ObjectReference) -> usize {
        (Self::descriptor(object) >> NREFS_SHIFT) & NREFS_MASK
    }

    pub fn tag(object: ObjectReference) -> usize {
        load_word(object.to_raw_address() + TAG_OFFSET)
    }

    pub fn set_mark(object: ObjectReference) {
        Self::set_status(object, Self::status(object) | MARK_BIT);
    }

    pub fn is_remembered(object: ObjectReference) -> bool {
        Self::status(object) & REMEMBERED_BIT != 0
    }

    pub fn set_remembered(object: ObjectReference) {
        Self::set_status(object, Self::status(object) | REMEMBERED_BIT);
    }

    /// Mark `object` as a copy that gained an identity hash field.
    pub fn set_hashed(object: ObjectReference) {
        let addr = object.to_raw_address() + DESCRIPTOR_OFFSET;
        store_word(addr, load_word(addr) | HASHED_BIT);
    }

    /// Replace the header of `object` with a forwarding pointer to `copy`.
    pub fn forward(object: ObjectReference, copy: ObjectReference) {
        debug_assert!(copy.to_raw_address().is_aligned_to(8));
        Self::set_status(object, copy.to_raw_address().as_usize() | FORWARDED_BIT);
        store_word(object.to_raw_address() + DESCRIPTOR_OFFSET, 0);
    }

    /// The `index`-th reference field of `object`, including the referent of a reference
    /// object.
    pub fn ref_slot(object: ObjectReference, index: usize) -> F::Slot {
        debug_assert!(index < Self::nrefs(object));
        F::slot(object.to_raw_address() + REFS_OFFSET + index * F::BYTES_IN_REFERENCE)
    }

    pub fn array_filler_length_of(object: ObjectReference) -> usize {
        debug_assert_eq!(Self::kind(object), MockKind::ArrayFiller);
        load_word(object.to_raw_address() + TAG_OFFSET)
    }
}

impl<F: MockFlavor> ObjectModel<MockVM<F>> for MockVM<F> {
    const BYTES_IN_REFERENCE: usize = F::BYTES_IN_REFERENCE;
    const LOG_COMPRESSED_SHIFT: u8 = LOG_MOCK_COMPRESSED_SHIFT;

    fn compressed_base() -> Address {
        F::compressed_base()
    }

    fn get_current_size(object: ObjectReference) -> usize {
        let descriptor = Self::descriptor(object);
        debug_assert!(
            descriptor != 0,
            "{} is forwarded and has no size of its own",
            object
        );
        descriptor >> SIZE_SHIFT
    }

    fn get_forwarded_object(object: ObjectReference) -> Option<ObjectReference> {
        let status = Self::status(object);
        if status & FORWARDED_BIT == 0 {
            return None;
        }
        ObjectReference::from_raw_address(unsafe { Address::from_usize(status & !STATUS_BITS) })
    }

    fn get_size_before_forwarding(forwarded: ObjectReference) -> usize {
        let size = Self::get_current_size(forwarded);
        if Self::descriptor(forwarded) & HASHED_BIT != 0 {
            size - BYTES_IN_HASH_FIELD
        } else {
            size
        }
    }

    fn is_marked(object: ObjectReference) -> bool {
        Self::status(object) & (MARK_BIT | FORWARDED_BIT) == MARK_BIT
    }

    fn clear_mark(object: ObjectReference) {
        Self::set_status(object, Self::status(object) & !MARK_BIT);
    }
}

impl<F: MockFlavor> Scanning<MockVM<F>> for MockVM<F> {
    fn scan_object<SV: SlotVisitor<<MockVM<F> as VMBinding>::VMSlot>>(
        object: ObjectReference,
        slot_visitor: &mut SV,
    ) {
        let first = match Self::kind(object) {
            MockKind::Plain => 0,
            // The referent is hidden.
            MockKind::Reference => 1,
            MockKind::ArrayFiller | MockKind::FixedFiller => return,
        };
        for i in first..Self::nrefs(object) {
            slot_visitor.visit_slot(Self::ref_slot(object, i));
        }
    }
}

impl<F: MockFlavor> ReferenceGlue<MockVM<F>> for MockVM<F> {
    fn is_reference(object: ObjectReference) -> bool {
        Self::kind(object) == MockKind::Reference
    }

    fn referent_slot(object: ObjectReference) -> <MockVM<F> as VMBinding>::VMSlot {
        Self::ref_slot(object, 0)
    }
}

impl<F: MockFlavor> ChunkModel<MockVM<F>> for MockVM<F> {
    fn objects_start(chunk: Chunk) -> Address {
        chunk.start() + OBJECTS_START_OFFSET
    }

    fn objects_end(chunk: Chunk) -> Address {
        chunk.end::<Self>()
    }

    fn top(chunk: Chunk) -> Address {
        unsafe { Address::from_usize(load_word(chunk.start() + TOP_OFFSET)) }
    }

    fn set_top(chunk: Chunk, top: Address) {
        debug_assert!(top >= Self::objects_start(chunk) && top <= Self::objects_end(chunk));
        store_word(chunk.start() + TOP_OFFSET, top.as_usize())
    }

    fn should_sweep(chunk: Chunk) -> bool {
        load_word(chunk.start() + FLAGS_OFFSET) & FLAG_SWEEP != 0
    }

    fn next(chunk: Chunk) -> Option<Chunk> {
        match load_word(chunk.start() + NEXT_OFFSET) {
            0 => None,
            raw => Some(Chunk::from_aligned_address::<Self>(unsafe {
                Address::from_usize(raw)
            })),
        }
    }

    fn chunk_containing(addr: Address) -> Option<Chunk> {
        let chunk = Chunk::align_down::<Self>(addr);
        let chunks = MOCK_CHUNKS.read().unwrap_or_else(|p| p.into_inner());
        if chunks.contains(&chunk) {
            Some(chunk)
        } else {
            None
        }
    }
}

impl<F: MockFlavor> BrickTable<MockVM<F>> for MockVM<F> {
    fn length(_chunk: Chunk) -> usize {
        BRICKS_IN_CHUNK
    }

    fn index(chunk: Chunk, addr: Address) -> usize {
        (addr - Self::objects_start(chunk)) >> LOG_BYTES_IN_BRICK
    }

    fn get(chunk: Chunk, index: usize) -> Address {
        debug_assert!(index < BRICKS_IN_CHUNK);
        unsafe { Address::from_usize(load_word(chunk.start() + BRICK_TABLE_OFFSET + index * 8)) }
    }

    fn set(chunk: Chunk, index: usize, sequence_start: Address) {
        debug_assert!(index < BRICKS_IN_CHUNK);
        store_word(
            chunk.start() + BRICK_TABLE_OFFSET + index * 8,
            sequence_start.as_usize(),
        )
    }
}

impl<F: MockFlavor> FirstObjectTable<MockVM<F>> for MockVM<F> {
    fn reset(chunk: Chunk) {
        for card in 0..CARDS_IN_CHUNK {
            atomic_word(Self::card_entry(chunk, card)).store(EMPTY_CARD, Ordering::Relaxed);
        }
    }

    fn set_table_for_object(chunk: Chunk, start: Address, end: Address) {
        debug_assert!(start < end);
        debug_assert_eq!(Chunk::align_down::<Self>(start), chunk);
        let first = Self::card_index(chunk, start);
        let last = Self::card_index(chunk, end - 1usize);
        // Objects of one chunk may be recorded by several workers.
        for card in first..=last {
            atomic_word(Self::card_entry(chunk, card))
                .fetch_min(start.as_usize(), Ordering::Relaxed);
        }
    }
}

impl<F: MockFlavor> Filler<MockVM<F>> for MockVM<F> {
    const FIXED_FILLER_BYTES: usize = FIXED_FILLER_BYTES;
    const MIN_ARRAY_FILLER_BYTES: usize = MIN_ARRAY_FILLER_BYTES;

    fn array_filler_length(bytes: usize) -> usize {
        (bytes - MIN_ARRAY_FILLER_BYTES) / BYTES_IN_ARRAY_FILLER_ELEMENT
    }

    fn array_filler_size(length: usize) -> usize {
        MIN_ARRAY_FILLER_BYTES + length * BYTES_IN_ARRAY_FILLER_ELEMENT
    }

    fn format_array_filler(start: Address, length: usize) {
        let size = Self::array_filler_size(length);
        store_word(start + STATUS_OFFSET, 0);
        store_word(
            start + DESCRIPTOR_OFFSET,
            size << SIZE_SHIFT | MockKind::ArrayFiller as usize,
        );
        store_word(start + TAG_OFFSET, length);
    }

    fn format_fixed_filler(start: Address) {
        store_word(start + STATUS_OFFSET, 0);
        store_word(
            start + DESCRIPTOR_OFFSET,
            FIXED_FILLER_BYTES << SIZE_SHIFT | MockKind::FixedFiller as usize,
        );
    }
}
