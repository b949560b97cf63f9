//! # Capture Format Constants
//!
//! All constants describing the on-disk capture layout live here. The
//! reader and writer must agree on every one of these, so they are defined
//! once and imported everywhere else.
//!
//! ## File Layout
//!
//! ```text
//! Offset 0:                  File header (128 bytes)
//! block_dir_offset:          block_count x { offset u64, length u64 }
//! chapter_dir_offset:        chapter_count x { name_len u16, name bytes,
//!                                              chapter record }
//! (block offsets):           raw block bytes
//! ```
//!
//! ## Dependency Notes
//!
//! - `FILE_HEADER_SIZE` is the size of `CaptureFileHeader`; a compile-time
//!   assertion in `storage::header` enforces the match.
//! - `MIN_SUPPORTED_VERSION <= CURRENT_VERSION` is enforced below. A file
//!   older than the minimum (or newer than current) is rejected at open.
//! - `MAX_CHAPTERS` / `MAX_BLOCKS` bound the directory sizes read from the
//!   header before any allocation, so a corrupt header cannot drive an
//!   oversized read.

/// Size of the fixed file header at offset 0.
pub const FILE_HEADER_SIZE: usize = 128;

/// Magic bytes identifying a capture file. Exactly 16 bytes.
pub const CAPTURE_MAGIC: &[u8; 16] = b"SnapView Capture";

/// Format version written by this crate.
pub const CURRENT_VERSION: u32 = 1;

/// Oldest format version this crate can still read.
pub const MIN_SUPPORTED_VERSION: u32 = 1;

const _: () = assert!(MIN_SUPPORTED_VERSION <= CURRENT_VERSION);

/// Chapter encoding discriminators (2-byte little-endian on disk).
pub const CHAPTER_SINGLE_VALUE: u16 = 1;
pub const CHAPTER_CONSTANT_SIZE_ARRAY: u16 = 2;
pub const CHAPTER_DYNAMIC_SIZE_ARRAY: u16 = 3;

/// Maximum UTF-8 byte length of a chapter name.
pub const MAX_CHAPTER_NAME_LEN: usize = 255;

/// Upper bound on the chapter count accepted from a file header.
pub const MAX_CHAPTERS: u32 = 4096;

/// Upper bound on the block count accepted from a file header.
pub const MAX_BLOCKS: u32 = 1024;

/// Size of one block directory record: offset (u64) + length (u64).
pub const BLOCK_DIR_ENTRY_SIZE: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_is_exactly_sixteen_bytes() {
        assert_eq!(CAPTURE_MAGIC.len(), 16);
    }

    #[test]
    fn discriminators_are_distinct() {
        assert_ne!(CHAPTER_SINGLE_VALUE, CHAPTER_CONSTANT_SIZE_ARRAY);
        assert_ne!(CHAPTER_CONSTANT_SIZE_ARRAY, CHAPTER_DYNAMIC_SIZE_ARRAY);
        assert_ne!(CHAPTER_SINGLE_VALUE, CHAPTER_DYNAMIC_SIZE_ARRAY);
    }
}
