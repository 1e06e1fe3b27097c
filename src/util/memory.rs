//! Raw native memory used outside the managed heap: relocation stack segments, and the backing
//! store of test heaps. Nothing here ever touches the Rust heap allocator.

use crate::util::Address;
use std::io::{Error, Result};

/// Set `len` bytes starting at `start` to zero.
pub fn zero(start: Address, len: usize) {
    set(start, 0, len);
}

/// Set `len` bytes starting at `start` to `val`.
pub fn set(start: Address, val: u8, len: usize) {
    unsafe {
        std::ptr::write_bytes::<u8>(start.to_mut_ptr(), val, len);
    }
}

/// Demand-zero mmap at an address chosen by the OS.
/// This function guarantees to zero all mapped memory.
pub fn map_anonymous(size: usize) -> Result<Address> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE;
    let ret = unsafe { libc::mmap(std::ptr::null_mut(), size, prot, flags, -1, 0) };
    if ret == libc::MAP_FAILED {
        Err(Error::last_os_error())
    } else {
        Ok(Address::from_mut_ptr(ret))
    }
}

/// Demand-zero mmap of `size` bytes whose start is aligned to `align`. The mapping is
/// over-reserved and trimmed, so `munmap(result, size)` releases all of it.
pub fn map_anonymous_aligned(size: usize, align: usize) -> Result<Address> {
    debug_assert!(align.is_power_of_two());
    let reserved = size + align;
    let raw = map_anonymous(reserved)?;
    let start = raw.align_up(align);
    let head = start - raw;
    let tail = reserved - head - size;
    if head != 0 {
        munmap(raw, head)?;
    }
    if tail != 0 {
        munmap(start + size, tail)?;
    }
    Ok(start)
}

/// Unmap memory previously returned by [`map_anonymous`] or [`map_anonymous_aligned`].
pub fn munmap(start: Address, size: usize) -> Result<()> {
    wrap_libc_call(&|| unsafe { libc::munmap(start.to_mut_ptr(), size) }, 0)
}

fn wrap_libc_call<T: PartialEq>(f: &dyn Fn() -> T, expect: T) -> Result<()> {
    let ret = f();
    if ret == expect {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}
