//! A LIFO stack whose storage lives in anonymous mappings instead of the Rust heap. A collector
//! can use it while the heap it manages is being moved, e.g. as a mark stack or to park
//! pending work during compaction.

use crate::util::constants::BYTES_IN_WORD;
use crate::util::conversions;
use crate::util::log;
use crate::util::memory;
use crate::util::Address;
use std::marker::PhantomData;
use std::mem;

/// The first words of every segment.
#[repr(C)]
struct SegmentHeader {
    /// The segment below this one, or zero.
    previous: Address,
    /// Number of entries stored in this segment.
    count: usize,
}

const HEADER_BYTES: usize = mem::size_of::<SegmentHeader>();

/// A segmented LIFO of `T` values. Segments are mapped on demand, and a segment is unmapped as
/// soon as popping drains it.
pub struct RelocationStack<T: Copy> {
    /// The top segment, or zero if the stack holds no segment.
    top: Address,
    segment_bytes: usize,
    capacity: usize,
    _p: PhantomData<T>,
}

// Entries are plain `Copy` values and the segments are owned exclusively by the stack.
unsafe impl<T: Copy + Send> Send for RelocationStack<T> {}

impl<T: Copy> RelocationStack<T> {
    /// Create an empty stack using segments of `segment_bytes` bytes. No memory is mapped
    /// until the first push.
    pub fn new(segment_bytes: usize) -> Self {
        assert!(
            conversions::raw_is_aligned(segment_bytes, crate::util::constants::BYTES_IN_PAGE),
            "Segment size {} is not a multiple of the page size",
            segment_bytes
        );
        assert!(mem::align_of::<T>() <= BYTES_IN_WORD);
        let capacity = (segment_bytes - HEADER_BYTES) / mem::size_of::<T>().max(1);
        assert!(capacity > 0, "Segment size {} too small", segment_bytes);
        RelocationStack {
            top: Address::ZERO,
            segment_bytes,
            capacity,
            _p: PhantomData,
        }
    }

    /// Entries one segment can hold.
    pub fn segment_capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        // An empty segment never stays mapped.
        self.top.is_zero()
    }

    pub fn push(&mut self, value: T) {
        if self.top.is_zero() || self.header().count == self.capacity {
            self.push_segment();
        }
        let header = self.header_mut();
        let slot = header.count;
        header.count += 1;
        unsafe { self.entry(slot).store(value) };
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.top.is_zero() {
            return None;
        }
        let header = self.header_mut();
        debug_assert!(header.count > 0);
        header.count -= 1;
        let slot = header.count;
        let value = unsafe { self.entry(slot).load::<T>() };
        if slot == 0 {
            self.pop_segment();
        }
        Some(value)
    }

    /// Release every segment. The stack stays usable afterwards.
    pub fn tear_down(&mut self) {
        while !self.top.is_zero() {
            self.pop_segment();
        }
    }

    fn header(&self) -> &SegmentHeader {
        debug_assert!(!self.top.is_zero());
        unsafe { &*self.top.to_ptr::<SegmentHeader>() }
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        debug_assert!(!self.top.is_zero());
        unsafe { &mut *self.top.to_mut_ptr::<SegmentHeader>() }
    }

    fn entry(&self, index: usize) -> Address {
        self.top + HEADER_BYTES + index * mem::size_of::<T>()
    }

    fn push_segment(&mut self) {
        let segment = match memory::map_anonymous(self.segment_bytes) {
            Ok(segment) => segment,
            Err(e) => panic!(
                "Failed to map a relocation stack segment of {} bytes: {}",
                self.segment_bytes, e
            ),
        };
        log::trace!("Mapped relocation stack segment {}", segment);
        unsafe {
            segment.store(SegmentHeader {
                previous: self.top,
                count: 0,
            })
        };
        self.top = segment;
    }

    fn pop_segment(&mut self) {
        let segment = self.top;
        self.top = self.header().previous;
        if let Err(e) = memory::munmap(segment, self.segment_bytes) {
            panic!("Failed to unmap relocation stack segment {}: {}", segment, e);
        }
        log::trace!("Unmapped relocation stack segment {}", segment);
    }

    #[cfg(test)]
    fn segments(&self) -> usize {
        let mut n = 0;
        let mut cursor = self.top;
        while !cursor.is_zero() {
            n += 1;
            cursor = unsafe { cursor.load::<Address>() };
        }
        n
    }
}

impl<T: Copy> Drop for RelocationStack<T> {
    fn drop(&mut self) {
        self.tear_down();
    }
}
