//! Relocation records.
//!
//! A relocation record describes one live sequence: where it moves to, how many bytes it holds,
//! and how far away the next sequence of the same chunk starts. The record lives in the bytes
//! immediately below the sequence it describes, which are dead space (or, for the first
//! sequence of a chunk, space reserved in front of the objects start). The records of a chunk
//! form a chain rooted at the objects start.

use crate::util::conversions;
use crate::util::Address;
use memoffset::offset_of;
use static_assertions::const_assert_eq;
use std::mem;

/// Whether each record write is read back and checked.
const VERIFY_RECORDS: bool = cfg!(any(debug_assertions, feature = "extreme_assertions"));

/// The encoding of relocation records. A binding picks one layout at compile time through
/// [`crate::vm::VMBinding::VMRecordLayout`].
///
/// The `encode_*` and `decode_*` methods are the raw field accessors. The `set_*` methods
/// encode a value and, when assertions are enabled, check that it decodes to the same value.
/// A value that does not survive the round trip exceeds what the layout can represent and is
/// fatal.
pub trait RecordLayout: 'static + Send + Sync {
    /// Bytes in one record.
    const BYTES: usize;
    /// The reference width this layout is meant for.
    const BYTES_IN_REFERENCE: usize;
    /// The granule sizes, offsets and displacements are scaled by.
    const GRANULE: usize;
    /// The largest sequence size and next offset the layout can encode.
    const MAX_SEQUENCE_BYTES: usize;

    /// The address of the record of the sequence starting at `seq`.
    fn record_address(seq: Address) -> Address {
        seq - Self::BYTES
    }

    /// Can every sequence size and next offset in a chunk of `chunk_bytes` be encoded? The
    /// objects area starts at a granule boundary with at least one record before it, so no span
    /// covers the whole chunk.
    fn fits_chunk(chunk_bytes: usize) -> bool {
        let header = conversions::raw_align_up(Self::BYTES, Self::GRANULE);
        chunk_bytes - header <= Self::MAX_SEQUENCE_BYTES
    }

    fn decode_destination(seq: Address) -> Address;
    fn encode_destination(seq: Address, destination: Address);
    fn decode_size(seq: Address) -> usize;
    fn encode_size(seq: Address, size: usize);
    fn decode_next_offset(seq: Address) -> usize;
    fn encode_next_offset(seq: Address, offset: usize);

    fn destination(seq: Address) -> Address {
        Self::decode_destination(seq)
    }

    fn set_destination(seq: Address, destination: Address) {
        debug_assert!(destination.is_aligned_to(Self::GRANULE));
        Self::encode_destination(seq, destination);
        if VERIFY_RECORDS {
            let decoded = Self::decode_destination(seq);
            assert_eq!(
                decoded, destination,
                "Destination {} of sequence {} cannot be encoded",
                destination, seq
            );
        }
    }

    fn size(seq: Address) -> usize {
        Self::decode_size(seq)
    }

    fn set_size(seq: Address, size: usize) {
        debug_assert!(size % Self::GRANULE == 0);
        Self::encode_size(seq, size);
        if VERIFY_RECORDS {
            let decoded = Self::decode_size(seq);
            assert_eq!(
                decoded, size,
                "Size {} of sequence {} cannot be encoded",
                size, seq
            );
        }
    }

    fn next_offset(seq: Address) -> usize {
        Self::decode_next_offset(seq)
    }

    fn set_next_offset(seq: Address, offset: usize) {
        debug_assert!(offset % Self::GRANULE == 0);
        Self::encode_next_offset(seq, offset);
        if VERIFY_RECORDS {
            let decoded = Self::decode_next_offset(seq);
            assert_eq!(
                decoded, offset,
                "Next offset {} of sequence {} cannot be encoded",
                offset, seq
            );
        }
    }

    /// The start of the next sequence in the chain, or `None` if `seq` is the last one.
    fn next_sequence(seq: Address) -> Option<Address> {
        match Self::next_offset(seq) {
            0 => None,
            offset => Some(seq + offset),
        }
    }

    /// Write a record for an empty sequence at `seq` that stays in place and ends the chain.
    fn init_empty(seq: Address) {
        Self::set_destination(seq, seq);
        Self::set_size(seq, 0);
        Self::set_next_offset(seq, 0);
    }
}

/// A record for wide (8-byte) references.
#[repr(C)]
struct WideRecord {
    destination: u64,
    size: u32,
    next_offset: u32,
}

const_assert_eq!(mem::size_of::<WideRecord>(), 16);

/// Absolute destinations with 32-bit sizes and offsets. Record: 16 bytes.
#[derive(Default)]
pub struct WideLayout;

impl WideLayout {
    fn field(seq: Address, offset: usize) -> Address {
        Self::record_address(seq) + offset
    }
}

impl RecordLayout for WideLayout {
    const BYTES: usize = mem::size_of::<WideRecord>();
    const BYTES_IN_REFERENCE: usize = crate::util::constants::BYTES_IN_WIDE_REFERENCE;
    const GRANULE: usize = 1;
    const MAX_SEQUENCE_BYTES: usize = u32::MAX as usize;

    fn decode_destination(seq: Address) -> Address {
        let raw = unsafe { Self::field(seq, offset_of!(WideRecord, destination)).load::<u64>() };
        unsafe { Address::from_usize(raw as usize) }
    }

    fn encode_destination(seq: Address, destination: Address) {
        let raw = destination.as_usize() as u64;
        unsafe { Self::field(seq, offset_of!(WideRecord, destination)).store::<u64>(raw) }
    }

    fn decode_size(seq: Address) -> usize {
        unsafe { Self::field(seq, offset_of!(WideRecord, size)).load::<u32>() as usize }
    }

    fn encode_size(seq: Address, size: usize) {
        unsafe { Self::field(seq, offset_of!(WideRecord, size)).store::<u32>(size as u32) }
    }

    fn decode_next_offset(seq: Address) -> usize {
        unsafe { Self::field(seq, offset_of!(WideRecord, next_offset)).load::<u32>() as usize }
    }

    fn encode_next_offset(seq: Address, offset: usize) {
        unsafe {
            Self::field(seq, offset_of!(WideRecord, next_offset)).store::<u32>(offset as u32)
        }
    }
}

/// A record for compressed (4-byte) references.
#[repr(C)]
struct CompressedRecord {
    /// `(destination - seq) >> LOG_ALIGNMENT`
    delta: i32,
    /// `size >> LOG_ALIGNMENT`
    size: u16,
    /// `next_offset >> LOG_ALIGNMENT`
    next_offset: u16,
}

const_assert_eq!(mem::size_of::<CompressedRecord>(), 8);

/// Signed destination displacements with 16-bit sizes and offsets, all scaled down by the object
/// alignment. Record: 8 bytes. Sequences, and therefore chunks, can hold at most
/// `0xFFFF << LOG_ALIGNMENT` bytes.
#[derive(Default)]
pub struct CompressedLayout<const LOG_ALIGNMENT: u8>;

impl<const LOG_ALIGNMENT: u8> CompressedLayout<LOG_ALIGNMENT> {
    fn field(seq: Address, offset: usize) -> Address {
        Self::record_address(seq) + offset
    }
}

impl<const LOG_ALIGNMENT: u8> RecordLayout for CompressedLayout<LOG_ALIGNMENT> {
    const BYTES: usize = mem::size_of::<CompressedRecord>();
    const BYTES_IN_REFERENCE: usize = crate::util::constants::BYTES_IN_COMPRESSED_REFERENCE;
    const GRANULE: usize = 1 << LOG_ALIGNMENT;
    const MAX_SEQUENCE_BYTES: usize = (u16::MAX as usize) << LOG_ALIGNMENT;

    fn decode_destination(seq: Address) -> Address {
        let delta = unsafe { Self::field(seq, offset_of!(CompressedRecord, delta)).load::<i32>() };
        seq + ((delta as isize) << LOG_ALIGNMENT)
    }

    fn encode_destination(seq: Address, destination: Address) {
        let delta = (destination.get_offset(seq) >> LOG_ALIGNMENT) as i32;
        unsafe { Self::field(seq, offset_of!(CompressedRecord, delta)).store::<i32>(delta) }
    }

    fn decode_size(seq: Address) -> usize {
        let raw = unsafe { Self::field(seq, offset_of!(CompressedRecord, size)).load::<u16>() };
        (raw as usize) << LOG_ALIGNMENT
    }

    fn encode_size(seq: Address, size: usize) {
        let raw = (size >> LOG_ALIGNMENT) as u16;
        unsafe { Self::field(seq, offset_of!(CompressedRecord, size)).store::<u16>(raw) }
    }

    fn decode_next_offset(seq: Address) -> usize {
        let raw =
            unsafe { Self::field(seq, offset_of!(CompressedRecord, next_offset)).load::<u16>() };
        (raw as usize) << LOG_ALIGNMENT
    }

    fn encode_next_offset(seq: Address, offset: usize) {
        let raw = (offset >> LOG_ALIGNMENT) as u16;
        unsafe { Self::field(seq, offset_of!(CompressedRecord, next_offset)).store::<u16>(raw) }
    }
}

/// The decoded contents of one relocation record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LiveSequence {
    /// The first byte of the sequence.
    pub start: Address,
    /// Live bytes in the sequence. Zero for the empty record a chunk may start with.
    pub size: usize,
    /// Where the first byte of the sequence ends up.
    pub destination: Address,
    /// The start of the next sequence in the chunk.
    pub next: Option<Address>,
}

impl LiveSequence {
    /// Decode the record of the sequence starting at `start`.
    pub fn read<L: RecordLayout>(start: Address) -> Self {
        LiveSequence {
            start,
            size: L::size(start),
            destination: L::destination(start),
            next: L::next_sequence(start),
        }
    }

    /// The end of the sequence, exclusive.
    pub fn end(&self) -> Address {
        self.start + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Walk the chain of records starting with the sequence at `first`, calling `visitor` for each
/// sequence until it returns `false`.
///
/// Both the current record and the record after it are decoded before `visitor` runs. A visitor
/// may therefore overwrite any bytes below the next sequence start, including both records:
/// moving a sequence can clobber its own record, and filling the gap after a sequence clobbers
/// the next record.
pub fn visit<L: RecordLayout, F: FnMut(&LiveSequence) -> bool>(first: Address, mut visitor: F) {
    let mut current = LiveSequence::read::<L>(first);
    loop {
        let next = current.next.map(LiveSequence::read::<L>);
        if !visitor(&current) {
            return;
        }
        match next {
            Some(next) => current = next,
            None => return,
        }
    }
}
