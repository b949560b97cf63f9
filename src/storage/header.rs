//! # Capture File Header
//!
//! The 128-byte header at offset 0 of every capture file. Contains magic
//! bytes, the format version, and the geometry of the block and chapter
//! directories.
//!
//! ## Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  ---------------------------------
//! 0       16    magic ("SnapView Capture")
//! 16      4     version (u32 LE)
//! 20      4     flags (u32 LE, reserved)
//! 24      4     chapter_count (u32 LE)
//! 28      4     block_count (u32 LE)
//! 32      8     block_dir_offset (u64 LE)
//! 40      8     chapter_dir_offset (u64 LE)
//! 48      80    reserved
//! ```
//!
//! ## Zerocopy Safety
//!
//! The struct derives `FromBytes`/`IntoBytes`/`Immutable`/`KnownLayout`/
//! `Unaligned` so it can be read in place from the mmap without copying
//! and without alignment requirements. A compile-time assertion pins the
//! size to `FILE_HEADER_SIZE`.
//!
//! ## Version Policy
//!
//! `from_bytes` rejects files whose version is below
//! `MIN_SUPPORTED_VERSION` or above `CURRENT_VERSION`. Both cases are
//! format errors fatal to opening the capture; no partial state escapes.

use eyre::{ensure, Result};
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{
    CAPTURE_MAGIC, CURRENT_VERSION, FILE_HEADER_SIZE, MAX_BLOCKS, MAX_CHAPTERS,
    MIN_SUPPORTED_VERSION,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct CaptureFileHeader {
    magic: [u8; 16],
    version: U32,
    flags: U32,
    chapter_count: U32,
    block_count: U32,
    block_dir_offset: U64,
    chapter_dir_offset: U64,
    reserved: [u8; 80],
}

const _: () = assert!(std::mem::size_of::<CaptureFileHeader>() == FILE_HEADER_SIZE);

impl CaptureFileHeader {
    pub fn new() -> Self {
        Self {
            magic: *CAPTURE_MAGIC,
            version: U32::new(CURRENT_VERSION),
            flags: U32::new(0),
            chapter_count: U32::new(0),
            block_count: U32::new(0),
            block_dir_offset: U64::new(0),
            chapter_dir_offset: U64::new(0),
            reserved: [0u8; 80],
        }
    }

    /// Parses and validates a header from the start of a capture file.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for CaptureFileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse CaptureFileHeader: {:?}", e))?;

        ensure!(
            &header.magic == CAPTURE_MAGIC,
            "invalid magic bytes in capture file"
        );

        ensure!(
            header.version.get() >= MIN_SUPPORTED_VERSION,
            "capture version {} is older than minimum supported {}",
            header.version.get(),
            MIN_SUPPORTED_VERSION
        );
        ensure!(
            header.version.get() <= CURRENT_VERSION,
            "capture version {} is newer than supported {}",
            header.version.get(),
            CURRENT_VERSION
        );

        ensure!(
            header.chapter_count.get() <= MAX_CHAPTERS,
            "chapter count {} exceeds limit {}",
            header.chapter_count.get(),
            MAX_CHAPTERS
        );
        ensure!(
            header.block_count.get() <= MAX_BLOCKS,
            "block count {} exceeds limit {}",
            header.block_count.get(),
            MAX_BLOCKS
        );

        Ok(header)
    }

    crate::zerocopy_accessors! {
        version: u32,
        flags: u32,
        chapter_count: u32,
        block_count: u32,
        block_dir_offset: u64,
        chapter_dir_offset: u64,
    }
}

impl Default for CaptureFileHeader {
    fn default() -> Self {
        Self::new()
    }
}
