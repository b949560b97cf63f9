//! # Capture File Reader
//!
//! `CaptureFile` opens a capture once, validates its directories, and then
//! serves zero-copy entry reads for the lifetime of the snapshot.
//!
//! ## Open Path
//!
//! 1. Map the file read-only (`memmap2::Mmap`). The capture is immutable
//!    by contract, so the map never needs to grow or remap.
//! 2. Parse and validate the 128-byte header (magic, version range,
//!    directory size caps).
//! 3. Read the block directory and check every block lies inside the file.
//! 4. Read the chapter directory and check every chapter references an
//!    existing block and fits inside it.
//!
//! Any failure in these steps is a format error fatal to the open: the
//! caller gets an `Err` and no partially-initialized reader exists.
//!
//! ## Read Path
//!
//! After a successful open, `entry_bytes(chapter, i)` is pure slicing:
//! the entry index is the only thing checked (an out-of-range index is a
//! caller bug and asserts), because the chapter-to-block geometry was
//! proven at open time.

use std::fs::File;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use hashbrown::HashMap;
use memmap2::Mmap;

use super::chapter::Chapter;
use super::header::CaptureFileHeader;
use crate::config::{BLOCK_DIR_ENTRY_SIZE, MAX_CHAPTER_NAME_LEN};

#[derive(Debug, Clone, Copy)]
struct BlockSpan {
    offset: u64,
    length: u64,
}

/// Reads a little-endian u64. The caller has already bounds-checked the
/// directory region this reads from.
fn read_u64_at(bytes: &[u8], pos: usize) -> u64 {
    u64::from_le_bytes([
        bytes[pos],
        bytes[pos + 1],
        bytes[pos + 2],
        bytes[pos + 3],
        bytes[pos + 4],
        bytes[pos + 5],
        bytes[pos + 6],
        bytes[pos + 7],
    ])
}

/// A capture file opened for reading.
#[derive(Debug)]
pub struct CaptureFile {
    mmap: Mmap,
    blocks: Vec<BlockSpan>,
    chapters: Vec<(String, Chapter)>,
    chapter_index: HashMap<String, usize>,
}

impl CaptureFile {
    /// Opens and validates a capture file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open capture file '{}'", path.display()))?;

        // Safety: the capture is treated as immutable for the lifetime of
        // this reader; no writer exists once a capture has been produced.
        let mmap = unsafe { Mmap::map(&file) }
            .wrap_err_with(|| format!("failed to mmap capture file '{}'", path.display()))?;

        let header = CaptureFileHeader::from_bytes(&mmap)
            .wrap_err_with(|| format!("invalid capture file '{}'", path.display()))?;

        let blocks = Self::read_block_dir(&mmap, header)?;
        let (chapters, chapter_index) = Self::read_chapter_dir(&mmap, header, &blocks)?;

        Ok(Self {
            mmap,
            blocks,
            chapters,
            chapter_index,
        })
    }

    fn read_block_dir(bytes: &[u8], header: &CaptureFileHeader) -> Result<Vec<BlockSpan>> {
        let count = header.block_count() as usize;
        let dir_start = header.block_dir_offset() as usize;
        let dir_len = count * BLOCK_DIR_ENTRY_SIZE;
        ensure!(
            dir_start
                .checked_add(dir_len)
                .is_some_and(|end| end <= bytes.len()),
            "block directory extends past end of file"
        );

        let mut blocks = Vec::with_capacity(count);
        let mut pos = dir_start;
        for i in 0..count {
            let offset = read_u64_at(bytes, pos);
            let length = read_u64_at(bytes, pos + 8);
            pos += BLOCK_DIR_ENTRY_SIZE;

            ensure!(
                offset
                    .checked_add(length)
                    .is_some_and(|end| end <= bytes.len() as u64),
                "block {} at offset {} with length {} extends past end of file ({} bytes)",
                i,
                offset,
                length,
                bytes.len()
            );
            blocks.push(BlockSpan { offset, length });
        }
        Ok(blocks)
    }

    fn read_chapter_dir(
        bytes: &[u8],
        header: &CaptureFileHeader,
        blocks: &[BlockSpan],
    ) -> Result<(Vec<(String, Chapter)>, HashMap<String, usize>)> {
        let count = header.chapter_count() as usize;
        let mut pos = header.chapter_dir_offset() as usize;

        let mut chapters = Vec::with_capacity(count);
        let mut index = HashMap::with_capacity(count);
        for _ in 0..count {
            ensure!(
                pos + 2 <= bytes.len(),
                "unexpected end of data reading chapter name length"
            );
            let name_len = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
            pos += 2;

            ensure!(
                name_len <= MAX_CHAPTER_NAME_LEN,
                "chapter name length {} exceeds limit {}",
                name_len,
                MAX_CHAPTER_NAME_LEN
            );
            ensure!(
                pos + name_len <= bytes.len(),
                "unexpected end of data reading chapter name"
            );
            let name = std::str::from_utf8(&bytes[pos..pos + name_len])
                .map_err(|e| eyre::eyre!("invalid UTF-8 in chapter name: {}", e))?
                .to_string();
            pos += name_len;

            let (chapter, new_pos) = Chapter::parse(bytes, pos)
                .wrap_err_with(|| format!("invalid chapter record for '{}'", name))?;
            pos = new_pos;

            let block = chapter.block_index() as usize;
            ensure!(
                block < blocks.len(),
                "chapter '{}' references block {} but only {} blocks exist",
                name,
                block,
                blocks.len()
            );
            ensure!(
                chapter.section_end() <= blocks[block].length,
                "chapter '{}' section ends at {} past block {} length {}",
                name,
                chapter.section_end(),
                block,
                blocks[block].length
            );

            ensure!(
                !index.contains_key(&name),
                "duplicate chapter name '{}'",
                name
            );
            index.insert(name.clone(), chapters.len());
            chapters.push((name, chapter));
        }
        Ok((chapters, index))
    }

    /// Number of raw byte blocks in this capture.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of named chapters in this capture.
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Looks up a chapter by name.
    pub fn chapter(&self, name: &str) -> Option<&Chapter> {
        self.chapter_index.get(name).map(|&i| &self.chapters[i].1)
    }

    /// Names of all chapters, in directory order.
    pub fn chapter_names(&self) -> impl Iterator<Item = &str> {
        self.chapters.iter().map(|(name, _)| name.as_str())
    }

    /// Raw bytes of one block.
    pub fn block(&self, index: u32) -> &[u8] {
        let span = self.blocks[index as usize];
        &self.mmap[span.offset as usize..(span.offset + span.length) as usize]
    }

    /// Bytes of entry `i` of a chapter, zero-copy out of the mmap. The
    /// entry index must be in range (`entry_count()`); geometry beyond
    /// that was validated at open time.
    pub fn entry_bytes(&self, chapter: &Chapter, i: usize) -> &[u8] {
        let start = chapter.byte_offset(i) as usize;
        let len = chapter.byte_length(i) as usize;
        let block = self.block(chapter.block_index());
        &block[start..start + len]
    }
}
