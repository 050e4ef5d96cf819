//! # File Header Definition
//!
//! This module provides the type-safe, zerocopy-based header struct for the
//! index file. The header occupies the first 128 bytes of page 0 and holds
//! magic bytes, version information, the root page id, the freelist head,
//! and the index configuration.
//!
//! ## Header Layout
//!
//! ```text
//! +------------------+
//! | Header (128B)    |  <- Index file metadata
//! +------------------+
//! | Page 0 Data      |  <- unused (16256 bytes)
//! +------------------+
//! | Page 1+ (16KB)   |  <- hash pages / freelist trunks
//! +------------------+
//! ```
//!
//! ## Zerocopy Safety
//!
//! The header struct uses zerocopy traits for safe, zero-copy
//! serialization:
//! - `FromBytes`: safe to read from arbitrary bytes
//! - `IntoBytes`: safe to write as bytes
//! - `Immutable`: no interior mutability
//! - `KnownLayout`: compile-time size verification
//! - `Unaligned`: works at any offset of an mmap'd page
//!
//! ## Why the index options live here
//!
//! `header_max_depth`, `directory_max_depth` and `bucket_max_size` shape
//! every page the index writes. Persisting them next to the root page id
//! means an index is reopened with exactly the geometry it was created
//! with, and a caller cannot accidentally reopen a file with mismatched
//! options.
//!
//! ## Endianness
//!
//! All multi-byte fields use little-endian encoding via the zerocopy
//! `U32<LittleEndian>` types, which handle conversion automatically.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{PageId, FILE_HEADER_SIZE};

pub const HASH_FILE_MAGIC: &[u8; 16] = b"diskhash v1\x00\x00\x00\x00\x00";

pub const CURRENT_VERSION: u32 = 1;

/// Geometry of the index, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub header_max_depth: u32,
    pub directory_max_depth: u32,
    pub bucket_max_size: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HashFileHeader {
    magic: [u8; 16],
    version: U32,
    page_size: U32,
    root_page: U32,
    freelist_head: U32,
    freelist_count: U32,
    header_max_depth: U32,
    directory_max_depth: U32,
    bucket_max_size: U32,
    reserved: [u8; 80],
}

const _: () = assert!(std::mem::size_of::<HashFileHeader>() == FILE_HEADER_SIZE);

impl HashFileHeader {
    pub fn new() -> Self {
        Self {
            magic: *HASH_FILE_MAGIC,
            version: U32::new(CURRENT_VERSION),
            page_size: U32::new(super::PAGE_SIZE as u32),
            root_page: U32::new(super::INVALID_PAGE_ID),
            freelist_head: U32::new(0),
            freelist_count: U32::new(0),
            header_max_depth: U32::new(0),
            directory_max_depth: U32::new(0),
            bucket_max_size: U32::new(0),
            reserved: [0u8; 80],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for HashFileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse HashFileHeader: {:?}", e))?;

        ensure!(
            &header.magic == HASH_FILE_MAGIC,
            "invalid magic bytes in index file"
        );

        ensure!(
            header.version.get() == CURRENT_VERSION,
            "unsupported version: {} (expected {})",
            header.version.get(),
            CURRENT_VERSION
        );

        ensure!(
            header.page_size.get() as usize == super::PAGE_SIZE,
            "index file was written with page size {} (expected {})",
            header.page_size.get(),
            super::PAGE_SIZE
        );

        Ok(header)
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for HashFileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );

        let header = Self::mut_from_bytes(&mut bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse HashFileHeader: {:?}", e))?;

        ensure!(
            &header.magic == HASH_FILE_MAGIC,
            "invalid magic bytes in index file"
        );

        Ok(header)
    }

    pub fn version(&self) -> u32 {
        self.version.get()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.get()
    }

    pub fn root_page(&self) -> PageId {
        self.root_page.get()
    }

    pub fn set_root_page(&mut self, page: PageId) {
        self.root_page = U32::new(page);
    }

    pub fn freelist_head(&self) -> PageId {
        self.freelist_head.get()
    }

    pub fn freelist_count(&self) -> u32 {
        self.freelist_count.get()
    }

    pub fn set_freelist(&mut self, head: PageId, count: u32) {
        self.freelist_head = U32::new(head);
        self.freelist_count = U32::new(count);
    }

    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            header_max_depth: self.header_max_depth.get(),
            directory_max_depth: self.directory_max_depth.get(),
            bucket_max_size: self.bucket_max_size.get(),
        }
    }

    pub fn set_options(&mut self, options: IndexOptions) {
        self.header_max_depth = U32::new(options.header_max_depth);
        self.directory_max_depth = U32::new(options.directory_max_depth);
        self.bucket_max_size = U32::new(options.bucket_max_size);
    }
}

impl Default for HashFileHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_128() {
        assert_eq!(std::mem::size_of::<HashFileHeader>(), 128);
    }

    #[test]
    fn header_roundtrip() {
        let mut header = HashFileHeader::new();
        header.set_root_page(1);
        header.set_freelist(9, 4);
        header.set_options(IndexOptions {
            header_max_depth: 2,
            directory_max_depth: 7,
            bucket_max_size: 300,
        });

        let bytes = header.as_bytes();
        let parsed = HashFileHeader::from_bytes(bytes).unwrap();

        assert_eq!(parsed.version(), CURRENT_VERSION);
        assert_eq!(parsed.page_size() as usize, super::super::PAGE_SIZE);
        assert_eq!(parsed.root_page(), 1);
        assert_eq!(parsed.freelist_head(), 9);
        assert_eq!(parsed.freelist_count(), 4);
        assert_eq!(
            parsed.options(),
            IndexOptions {
                header_max_depth: 2,
                directory_max_depth: 7,
                bucket_max_size: 300,
            }
        );
    }

    #[test]
    fn header_rejects_invalid_magic() {
        let mut bytes = [0u8; 128];
        bytes[..16].copy_from_slice(b"Invalid Magic!!!");

        let result = HashFileHeader::from_bytes(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn header_rejects_wrong_version() {
        let mut header = HashFileHeader::new();
        header.version = U32::new(99);

        let result = HashFileHeader::from_bytes(header.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn header_mutable_access() {
        let mut bytes = [0u8; 128];
        bytes.copy_from_slice(HashFileHeader::new().as_bytes());

        let header_mut = HashFileHeader::from_bytes_mut(&mut bytes).unwrap();
        header_mut.set_root_page(3);
        header_mut.set_freelist(17, 2);

        let header_ref = HashFileHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header_ref.root_page(), 3);
        assert_eq!(header_ref.freelist_head(), 17);
        assert_eq!(header_ref.freelist_count(), 2);
    }
}
