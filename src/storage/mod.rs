//! # Storage Module
//!
//! The capture-file storage layer: a fixed 128-byte header, a block
//! directory, a chapter directory, and raw byte blocks, all read through
//! a single read-only memory map.
//!
//! ## Architecture Overview
//!
//! A capture is immutable for its whole lifetime, so the storage layer is
//! built around one `Mmap` established at open time:
//!
//! - **Zero-copy reads**: entry lookups return `&[u8]` slices pointing
//!   directly into the mapped region
//! - **Open-time validation**: the header, every chapter record, and every
//!   chapter-to-block reference are checked once; after a successful open,
//!   entry resolution cannot run off the end of a block
//! - **No interior locking**: concurrent readers need no coordination
//!   because nothing mutates mapped bytes
//!
//! ## File Layout
//!
//! ```text
//! Offset 0:                 CaptureFileHeader (128 bytes)
//! header.block_dir_offset:  block_count x { offset u64, length u64 }
//! header.chapter_dir_offset: chapter_count x { name_len u16, name,
//!                                              chapter record }
//! (per block directory):    raw block bytes
//! ```
//!
//! ## Components
//!
//! - [`header`]: the zerocopy file header with magic/version validation
//! - [`chapter`]: the per-section segment index (three encodings)
//! - [`capture`]: `CaptureFile`, the mmap reader resolving
//!   `(chapter, entry)` to byte slices
//! - [`writer`]: `CaptureWriter`, the builder that produces capture files

pub mod capture;
pub mod chapter;
pub mod header;
pub mod writer;

pub use capture::CaptureFile;
pub use chapter::Chapter;
pub use header::CaptureFileHeader;
pub use writer::CaptureWriter;
