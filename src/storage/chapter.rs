//! # Chapter Segment Index
//!
//! A `Chapter` describes how to locate the i-th logical entry (and its
//! byte length) inside one named block of a capture file, without reading
//! the block itself. Three encodings trade compactness for flexibility:
//!
//! | Encoding | Stores | Entry size |
//! |----------|--------|------------|
//! | SingleValue | block, size, offset | fixed, one entry |
//! | ConstantSizeArray | block, size, count | fixed, offset = size * i |
//! | DynamicSizeArray | block, offsets[0..=N] | offsets[i+1] - offsets[i] |
//!
//! The dynamic encoding stores N+1 monotonically non-decreasing offsets;
//! the extra trailing offset makes the last entry's size computable
//! without a special case, and `byte_offset(N)` doubles as the exclusive
//! end of the section for range reads.
//!
//! ## On-Disk Record
//!
//! ```text
//! u16 LE   encoding discriminator (1, 2, or 3)
//! u32 LE   block index
//! ...      encoding-specific fields, all LE
//! ```
//!
//! ## Bounds Contract
//!
//! `byte_length(i)` is defined on `[0, N)` and `byte_offset(i)` on
//! `[0, N]`. Indexes outside those ranges are caller bugs: the accessors
//! assert instead of returning a recoverable error. Callers range-check
//! with `entry_count()` first.

use eyre::{bail, ensure, Result};

use crate::config::{
    CHAPTER_CONSTANT_SIZE_ARRAY, CHAPTER_DYNAMIC_SIZE_ARRAY, CHAPTER_SINGLE_VALUE,
};

/// Locates the entries of one named section inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chapter {
    /// One entry at an explicit offset.
    SingleValue {
        block: u32,
        entry_size: u64,
        offset: u64,
    },
    /// `count` equal-size entries packed from the start of the block.
    ConstantSizeArray {
        block: u32,
        entry_size: u64,
        count: u64,
    },
    /// Variable-size entries; `offsets` holds N+1 non-decreasing values.
    DynamicSizeArray { block: u32, offsets: Vec<u64> },
}

impl Chapter {
    /// Index of the block this chapter's entries live in.
    pub fn block_index(&self) -> u32 {
        match self {
            Chapter::SingleValue { block, .. }
            | Chapter::ConstantSizeArray { block, .. }
            | Chapter::DynamicSizeArray { block, .. } => *block,
        }
    }

    /// Number of logical entries in this section.
    pub fn entry_count(&self) -> usize {
        match self {
            Chapter::SingleValue { .. } => 1,
            Chapter::ConstantSizeArray { count, .. } => *count as usize,
            Chapter::DynamicSizeArray { offsets, .. } => offsets.len() - 1,
        }
    }

    /// Byte length of entry `i`. Defined on `[0, entry_count())`.
    pub fn byte_length(&self, i: usize) -> u64 {
        assert!(
            i < self.entry_count(),
            "entry index {} out of range for chapter with {} entries",
            i,
            self.entry_count()
        );
        match self {
            Chapter::SingleValue { entry_size, .. } => *entry_size,
            Chapter::ConstantSizeArray { entry_size, .. } => *entry_size,
            Chapter::DynamicSizeArray { offsets, .. } => offsets[i + 1] - offsets[i],
        }
    }

    /// Byte offset of entry `i` within the block. Defined on
    /// `[0, entry_count()]`; `i == entry_count()` is the exclusive end of
    /// the section.
    pub fn byte_offset(&self, i: usize) -> u64 {
        assert!(
            i <= self.entry_count(),
            "entry index {} out of range for chapter with {} entries",
            i,
            self.entry_count()
        );
        match self {
            Chapter::SingleValue { entry_size, offset, .. } => {
                offset + if i == 0 { 0 } else { *entry_size }
            }
            Chapter::ConstantSizeArray { entry_size, .. } => entry_size * i as u64,
            Chapter::DynamicSizeArray { offsets, .. } => offsets[i],
        }
    }

    /// Exclusive end of the section within its block, used by the open-time
    /// block-bounds validation.
    pub fn section_end(&self) -> u64 {
        self.byte_offset(self.entry_count())
    }

    /// Serializes the on-disk record.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Chapter::SingleValue {
                block,
                entry_size,
                offset,
            } => {
                buf.extend(CHAPTER_SINGLE_VALUE.to_le_bytes());
                buf.extend(block.to_le_bytes());
                buf.extend(entry_size.to_le_bytes());
                buf.extend(offset.to_le_bytes());
            }
            Chapter::ConstantSizeArray {
                block,
                entry_size,
                count,
            } => {
                buf.extend(CHAPTER_CONSTANT_SIZE_ARRAY.to_le_bytes());
                buf.extend(block.to_le_bytes());
                buf.extend(entry_size.to_le_bytes());
                buf.extend(count.to_le_bytes());
            }
            Chapter::DynamicSizeArray { block, offsets } => {
                buf.extend(CHAPTER_DYNAMIC_SIZE_ARRAY.to_le_bytes());
                buf.extend(block.to_le_bytes());
                buf.extend(((offsets.len() - 1) as u64).to_le_bytes());
                for off in offsets {
                    buf.extend(off.to_le_bytes());
                }
            }
        }
    }

    /// Parses one on-disk record starting at `pos`, returning the chapter
    /// and the position past it. An unrecognized discriminator or a
    /// non-monotonic offset table is a format error.
    pub fn parse(bytes: &[u8], mut pos: usize) -> Result<(Chapter, usize)> {
        ensure!(
            pos + 2 <= bytes.len(),
            "unexpected end of data reading chapter discriminator"
        );
        let discriminator = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
        pos += 2;

        ensure!(
            pos + 4 <= bytes.len(),
            "unexpected end of data reading chapter block index"
        );
        let block = u32::from_le_bytes([
            bytes[pos],
            bytes[pos + 1],
            bytes[pos + 2],
            bytes[pos + 3],
        ]);
        pos += 4;

        match discriminator {
            CHAPTER_SINGLE_VALUE => {
                let (entry_size, pos) = read_u64(bytes, pos, "single-value entry size")?;
                let (offset, pos) = read_u64(bytes, pos, "single-value offset")?;
                Ok((
                    Chapter::SingleValue {
                        block,
                        entry_size,
                        offset,
                    },
                    pos,
                ))
            }
            CHAPTER_CONSTANT_SIZE_ARRAY => {
                let (entry_size, pos) = read_u64(bytes, pos, "constant-size entry size")?;
                let (count, pos) = read_u64(bytes, pos, "constant-size entry count")?;
                Ok((
                    Chapter::ConstantSizeArray {
                        block,
                        entry_size,
                        count,
                    },
                    pos,
                ))
            }
            CHAPTER_DYNAMIC_SIZE_ARRAY => {
                let (count, mut pos) = read_u64(bytes, pos, "dynamic-size entry count")?;
                let count = count as usize;
                let mut offsets = Vec::with_capacity(count + 1);
                for _ in 0..=count {
                    let (off, new_pos) = read_u64(bytes, pos, "dynamic-size offset")?;
                    pos = new_pos;
                    offsets.push(off);
                }
                ensure!(
                    offsets.windows(2).all(|w| w[0] <= w[1]),
                    "dynamic-size offsets are not monotonically non-decreasing"
                );
                Ok((Chapter::DynamicSizeArray { block, offsets }, pos))
            }
            other => bail!("unrecognized chapter encoding discriminator: {}", other),
        }
    }
}

fn read_u64(bytes: &[u8], pos: usize, what: &str) -> Result<(u64, usize)> {
    ensure!(
        pos + 8 <= bytes.len(),
        "unexpected end of data reading {}",
        what
    );
    let val = u64::from_le_bytes([
        bytes[pos],
        bytes[pos + 1],
        bytes[pos + 2],
        bytes[pos + 3],
        bytes[pos + 4],
        bytes[pos + 5],
        bytes[pos + 6],
        bytes[pos + 7],
    ]);
    Ok((val, pos + 8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(chapter: &Chapter) -> Chapter {
        let mut buf = Vec::new();
        chapter.encode(&mut buf);
        let (parsed, consumed) = Chapter::parse(&buf, 0).unwrap();
        assert_eq!(consumed, buf.len());
        parsed
    }

    #[test]
    fn single_value_entry_geometry() {
        let ch = Chapter::SingleValue {
            block: 2,
            entry_size: 40,
            offset: 16,
        };
        assert_eq!(ch.entry_count(), 1);
        assert_eq!(ch.byte_length(0), 40);
        assert_eq!(ch.byte_offset(0), 16);
        assert_eq!(ch.byte_offset(1), 56);
        assert_eq!(roundtrip(&ch), ch);
    }

    #[test]
    fn constant_size_array_offsets_are_derived() {
        let ch = Chapter::ConstantSizeArray {
            block: 0,
            entry_size: 8,
            count: 5,
        };
        assert_eq!(ch.entry_count(), 5);
        assert_eq!(ch.byte_length(4), 8);
        assert_eq!(ch.byte_offset(0), 0);
        assert_eq!(ch.byte_offset(3), 24);
        assert_eq!(ch.byte_offset(5), 40);
        assert_eq!(roundtrip(&ch), ch);
    }

    #[test]
    fn dynamic_size_array_uses_offset_differences() {
        let ch = Chapter::DynamicSizeArray {
            block: 1,
            offsets: vec![0, 10, 10, 25],
        };
        assert_eq!(ch.entry_count(), 3);
        assert_eq!(ch.byte_length(0), 10);
        assert_eq!(ch.byte_length(1), 0);
        assert_eq!(ch.byte_length(2), 15);
        assert_eq!(ch.byte_offset(3), 25);
        assert_eq!(roundtrip(&ch), ch);
    }

    #[test]
    fn parse_rejects_unknown_discriminator() {
        let mut buf = Vec::new();
        buf.extend(99u16.to_le_bytes());
        buf.extend(0u32.to_le_bytes());
        buf.extend(0u64.to_le_bytes());
        buf.extend(0u64.to_le_bytes());

        assert!(Chapter::parse(&buf, 0).is_err());
    }

    #[test]
    fn parse_rejects_decreasing_offsets() {
        let mut buf = Vec::new();
        buf.extend(CHAPTER_DYNAMIC_SIZE_ARRAY.to_le_bytes());
        buf.extend(0u32.to_le_bytes());
        buf.extend(2u64.to_le_bytes());
        for off in [0u64, 20, 10] {
            buf.extend(off.to_le_bytes());
        }

        assert!(Chapter::parse(&buf, 0).is_err());
    }

    #[test]
    fn parse_rejects_truncated_record() {
        let mut buf = Vec::new();
        buf.extend(CHAPTER_SINGLE_VALUE.to_le_bytes());
        buf.extend(0u32.to_le_bytes());
        buf.extend(8u64.to_le_bytes());
        buf.truncate(buf.len() - 1);

        assert!(Chapter::parse(&buf, 0).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn byte_length_asserts_out_of_range() {
        let ch = Chapter::ConstantSizeArray {
            block: 0,
            entry_size: 8,
            count: 2,
        };
        ch.byte_length(2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn byte_offset_asserts_past_end_marker() {
        let ch = Chapter::DynamicSizeArray {
            block: 0,
            offsets: vec![0, 4],
        };
        ch.byte_offset(2);
    }
}
