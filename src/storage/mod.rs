//! # Storage Module
//!
//! This module provides the storage layer for the index: a memory-mapped
//! page file, a fixed-size buffer pool with pinned frames and per-frame
//! latches, and the RAII page guards the index core navigates with.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │   Index core (header/dir/bucket)     │
//! ├──────────────────────────────────────┤
//! │   Page guards (pin + latch, RAII)    │
//! ├──────────────────────────────────────┤
//! │   BufferPool (frames, SIEVE, table)  │
//! ├──────────────────────────────────────┤
//! │   MmapStorage + Freelist (one file)  │
//! └──────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! One index lives in one file. Page 0 carries the 128-byte
//! [`HashFileHeader`] (magic, version, root page, freelist head, index
//! options); pages 1+ are data pages, each beginning with a 16-byte
//! [`PageHeader`]. Deleted pages are tracked by a trunk-page [`Freelist`]
//! and reused before the file grows.
//!
//! ## Page Identity
//!
//! Pages are addressed by `PageId` (`u32`). Page 0 is never a data page, so
//! [`INVALID_PAGE_ID`] (`0`) doubles as the "no page" sentinel that the hash
//! pages persist in their slot arrays.
//!
//! ## Concurrency
//!
//! The pool is `Send + Sync`. Each frame has an atomic pin count and a
//! `parking_lot::RwLock` latch over its buffer; guards release the latch
//! before the pin on every exit path, so an unpinned frame is never latched.
//! A single mutex orders page-table changes and eviction decisions.
//!
//! ## Module Organization
//!
//! - `mmap`: memory-mapped page file (`MmapStorage`)
//! - `page`: page type and header layout
//! - `headers`: file header on page 0
//! - `freelist`: free page tracking and reuse
//! - `pool`: the buffer pool
//! - `guard`: scoped pin+latch handles

mod freelist;
mod guard;
mod headers;
mod mmap;
mod page;
mod pool;

pub use freelist::{Freelist, TrunkHeader, TRUNK_HEADER_SIZE, TRUNK_MAX_ENTRIES};
pub use guard::{ReadPageGuard, WritePageGuard};
pub use headers::{HashFileHeader, IndexOptions, CURRENT_VERSION, HASH_FILE_MAGIC};
pub use mmap::MmapStorage;
pub use page::{validate_page, PageHeader, PageType};
pub use pool::BufferPool;

pub use crate::config::{
    FILE_HEADER_SIZE, PAGE0_USABLE_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE, PAGE_USABLE_SIZE,
};

use eyre::{ensure, Result};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Identifier of a page within the index file.
pub type PageId = u32;

/// The "no page" sentinel. Page 0 holds the file header and is never a data
/// page, so 0 is free to mean "none" wherever a page id is persisted.
pub const INVALID_PAGE_ID: PageId = 0;

/// Parses a zerocopy struct from a byte slice with size validation.
#[inline]
pub fn parse_zerocopy<'a, T: FromBytes + KnownLayout + Immutable>(
    bytes: &'a [u8],
    type_name: &str,
) -> Result<&'a T> {
    let size = std::mem::size_of::<T>();
    ensure!(
        bytes.len() >= size,
        "buffer too small for {}: {} < {}",
        type_name,
        bytes.len(),
        size
    );
    T::ref_from_bytes(&bytes[..size])
        .map_err(|e| eyre::eyre!("failed to parse {}: {:?}", type_name, e))
}

/// Parses a mutable zerocopy struct from a byte slice with size validation.
#[inline]
pub fn parse_zerocopy_mut<'a, T: FromBytes + KnownLayout + zerocopy::IntoBytes>(
    bytes: &'a mut [u8],
    type_name: &str,
) -> Result<&'a mut T> {
    let size = std::mem::size_of::<T>();
    ensure!(
        bytes.len() >= size,
        "buffer too small for {}: {} < {}",
        type_name,
        bytes.len(),
        size
    );
    T::mut_from_bytes(&mut bytes[..size])
        .map_err(|e| eyre::eyre!("failed to parse {}: {:?}", type_name, e))
}
