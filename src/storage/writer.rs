//! # Capture File Writer
//!
//! `CaptureWriter` is the producing counterpart of `CaptureFile`: it
//! accumulates raw blocks and named chapters, then lays out and writes a
//! capture file the reader accepts. Tests and capture-producing tools use
//! it; the query engine itself never writes.
//!
//! ## Encoding Selection
//!
//! `add_entries` packs a list of entry payloads into a fresh block and
//! picks the most compact chapter encoding for them:
//!
//! - one entry: `SingleValue`
//! - several entries of one size: `ConstantSizeArray`
//! - anything else: `DynamicSizeArray`
//!
//! Callers with pre-packed blocks can `add_block` + `add_chapter` with an
//! explicit encoding instead.

use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use zerocopy::IntoBytes;

use super::chapter::Chapter;
use super::header::CaptureFileHeader;
use crate::config::{BLOCK_DIR_ENTRY_SIZE, FILE_HEADER_SIZE, MAX_BLOCKS, MAX_CHAPTERS, MAX_CHAPTER_NAME_LEN};

/// Builds a capture file block by block, chapter by chapter.
#[derive(Debug, Default)]
pub struct CaptureWriter {
    blocks: Vec<Vec<u8>>,
    chapters: Vec<(String, Chapter)>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw block and returns its index.
    pub fn add_block(&mut self, bytes: Vec<u8>) -> Result<u32> {
        ensure!(
            self.blocks.len() < MAX_BLOCKS as usize,
            "capture cannot hold more than {} blocks",
            MAX_BLOCKS
        );
        self.blocks.push(bytes);
        Ok((self.blocks.len() - 1) as u32)
    }

    /// Registers a chapter over an existing block.
    pub fn add_chapter(&mut self, name: impl Into<String>, chapter: Chapter) -> Result<()> {
        let name = name.into();
        ensure!(
            self.chapters.len() < MAX_CHAPTERS as usize,
            "capture cannot hold more than {} chapters",
            MAX_CHAPTERS
        );
        ensure!(
            name.len() <= MAX_CHAPTER_NAME_LEN,
            "chapter name '{}' exceeds {} bytes",
            name,
            MAX_CHAPTER_NAME_LEN
        );
        ensure!(
            !self.chapters.iter().any(|(n, _)| n == &name),
            "duplicate chapter name '{}'",
            name
        );

        let block = chapter.block_index() as usize;
        ensure!(
            block < self.blocks.len(),
            "chapter '{}' references block {} but only {} blocks exist",
            name,
            block,
            self.blocks.len()
        );
        ensure!(
            chapter.section_end() <= self.blocks[block].len() as u64,
            "chapter '{}' section ends at {} past block {} length {}",
            name,
            chapter.section_end(),
            block,
            self.blocks[block].len()
        );

        self.chapters.push((name, chapter));
        Ok(())
    }

    /// Packs entry payloads into a fresh block under the most compact
    /// chapter encoding.
    pub fn add_entries(&mut self, name: impl Into<String>, entries: &[&[u8]]) -> Result<()> {
        let mut block = Vec::new();
        let mut offsets = Vec::with_capacity(entries.len() + 1);
        offsets.push(0u64);
        for entry in entries {
            block.extend_from_slice(entry);
            offsets.push(block.len() as u64);
        }
        let block_index = self.add_block(block)?;

        let chapter = if entries.len() == 1 {
            Chapter::SingleValue {
                block: block_index,
                entry_size: entries[0].len() as u64,
                offset: 0,
            }
        } else if !entries.is_empty() && entries.iter().all(|e| e.len() == entries[0].len()) {
            Chapter::ConstantSizeArray {
                block: block_index,
                entry_size: entries[0].len() as u64,
                count: entries.len() as u64,
            }
        } else {
            Chapter::DynamicSizeArray {
                block: block_index,
                offsets,
            }
        };
        self.add_chapter(name, chapter)
    }

    /// Lays out and writes the capture to `path`.
    pub fn finish<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref();

        let mut chapter_dir = Vec::new();
        for (name, chapter) in &self.chapters {
            chapter_dir.extend((name.len() as u16).to_le_bytes());
            chapter_dir.extend_from_slice(name.as_bytes());
            chapter.encode(&mut chapter_dir);
        }

        let block_dir_offset = FILE_HEADER_SIZE;
        let block_dir_len = self.blocks.len() * BLOCK_DIR_ENTRY_SIZE;
        let chapter_dir_offset = block_dir_offset + block_dir_len;
        let blocks_start = chapter_dir_offset + chapter_dir.len();

        let mut header = CaptureFileHeader::new();
        header.set_chapter_count(self.chapters.len() as u32);
        header.set_block_count(self.blocks.len() as u32);
        header.set_block_dir_offset(block_dir_offset as u64);
        header.set_chapter_dir_offset(chapter_dir_offset as u64);

        let total_len = blocks_start + self.blocks.iter().map(Vec::len).sum::<usize>();
        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(header.as_bytes());

        let mut block_offset = blocks_start as u64;
        for block in &self.blocks {
            out.extend(block_offset.to_le_bytes());
            out.extend((block.len() as u64).to_le_bytes());
            block_offset += block.len() as u64;
        }

        out.extend_from_slice(&chapter_dir);
        for block in &self.blocks {
            out.extend_from_slice(block);
        }

        std::fs::write(path, &out)
            .wrap_err_with(|| format!("failed to write capture file '{}'", path.display()))
    }
}
