/// log2 of the number of bytes in a byte
pub const LOG_BYTES_IN_BYTE: u8 = 0;
/// The number of bytes in a byte
pub const BYTES_IN_BYTE: usize = 1;
/// log2 of the number of bits in a byte
pub const LOG_BITS_IN_BYTE: u8 = 3;
/// The number of bits in a byte
pub const BITS_IN_BYTE: usize = 1 << LOG_BITS_IN_BYTE;

/// log2 of the number of bytes in a kilobyte
pub const LOG_BYTES_IN_KBYTE: u8 = 10;
/// The number of bytes in a kilobyte
pub const BYTES_IN_KBYTE: usize = 1 << LOG_BYTES_IN_KBYTE;

/// log2 of the number of bytes in a megabyte
pub const LOG_BYTES_IN_MBYTE: u8 = 20;
/// The number of bytes in a megabyte
pub const BYTES_IN_MBYTE: usize = 1 << LOG_BYTES_IN_MBYTE;

/// log2 of the number of bytes in a 32 bit integer
pub const LOG_BYTES_IN_INT: u8 = 2;
/// The number of bytes in a 32 bit integer
pub const BYTES_IN_INT: usize = 1 << LOG_BYTES_IN_INT;

/// log2 of the number of bytes in a 64 bit integer
pub const LOG_BYTES_IN_LONG: u8 = 3;
/// The number of bytes in a 64 bit integer
pub const BYTES_IN_LONG: usize = 1 << LOG_BYTES_IN_LONG;

#[cfg(target_pointer_width = "32")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 2;
#[cfg(target_pointer_width = "64")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;

/// log2 of the number of bytes in a word
pub const LOG_BYTES_IN_WORD: u8 = LOG_BYTES_IN_ADDRESS;
/// The number of bytes in a word
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;

/// log2 of the number of bytes in a page
pub const LOG_BYTES_IN_PAGE: u8 = 12;
/// The number of bytes in a page
pub const BYTES_IN_PAGE: usize = 1 << LOG_BYTES_IN_PAGE;

/// A wide (uncompressed) reference occupies a full 64 bit word.
pub const BYTES_IN_WIDE_REFERENCE: usize = BYTES_IN_LONG;
/// A compressed reference occupies 32 bits.
pub const BYTES_IN_COMPRESSED_REFERENCE: usize = BYTES_IN_INT;

/// The default size of one segment of the relocation stack.
pub const DEFAULT_RELOCATION_STACK_SEGMENT_BYTES: usize = 64 * BYTES_IN_KBYTE;
