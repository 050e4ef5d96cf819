//! # Configuration Constants
//!
//! This module centralizes all configuration constants, grouping
//! interdependent values together and documenting their relationships.
//! Constants that depend on each other are co-located to prevent mismatch
//! bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (16384 bytes)
//!       │
//!       ├─> PAGE_HEADER_SIZE (16 bytes, fixed)
//!       │
//!       ├─> PAGE_USABLE_SIZE (derived: PAGE_SIZE - PAGE_HEADER_SIZE)
//!       │
//!       ├─> FILE_HEADER_SIZE (128 bytes, page 0 only)
//!       │
//!       └─> bucket entry capacity (derived per key/value size pair)
//!
//! HTABLE_HEADER_MAX_DEPTH (9)
//!       │
//!       └─> HTABLE_HEADER_ARRAY_SIZE (2^9 directory slots)
//!             The header page's directory-id array must fit in
//!             PAGE_USABLE_SIZE.
//!
//! HTABLE_DIRECTORY_MAX_DEPTH (9)
//!       │
//!       └─> HTABLE_DIRECTORY_ARRAY_SIZE (2^9 bucket slots)
//!             The directory page's depth and bucket-id arrays must fit in
//!             PAGE_USABLE_SIZE.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. The header page array (4 bytes per slot) fits in a page.
//! 2. The directory page arrays (1 + 4 bytes per slot) fit in a page.
//! 3. `PAGE_USABLE_SIZE` and `PAGE0_USABLE_SIZE` are derived correctly.
//!
//! ## Usage
//!
//! Import constants from this module rather than defining them locally:
//!
//! ```ignore
//! use diskhash::config::{PAGE_SIZE, HTABLE_DIRECTORY_MAX_DEPTH};
//! ```

// ============================================================================
// PAGE LAYOUT CONSTANTS
// These define the fundamental page structure used throughout the index file
// ============================================================================

/// Size of each page in bytes (16KB).
/// This is the fundamental unit of I/O and caching.
pub const PAGE_SIZE: usize = 16384;

/// Size of the page header in bytes.
/// Every page begins with this header containing type, flags, and checksum.
pub const PAGE_HEADER_SIZE: usize = 16;

/// Size of the file header in bytes (page 0 only).
/// The first page carries the index file metadata instead of data.
pub const FILE_HEADER_SIZE: usize = 128;

/// Usable space in a regular page after the header.
pub const PAGE_USABLE_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Usable space in page 0 after the file header.
pub const PAGE0_USABLE_SIZE: usize = PAGE_SIZE - FILE_HEADER_SIZE;

const _: () = assert!(
    PAGE_USABLE_SIZE == PAGE_SIZE - PAGE_HEADER_SIZE,
    "PAGE_USABLE_SIZE derivation mismatch"
);

const _: () = assert!(
    PAGE0_USABLE_SIZE == PAGE_SIZE - FILE_HEADER_SIZE,
    "PAGE0_USABLE_SIZE derivation mismatch"
);

// ============================================================================
// BUFFER POOL CONFIGURATION
// ============================================================================

/// Default number of page frames in the buffer pool.
/// Each frame holds one page; more frames mean fewer disk round-trips but
/// more resident memory.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Smallest pool that keeps the index operational. Insert needs the header,
/// one directory, the full bucket and its split image resident at once, plus
/// headroom for the freelist trunk touched during allocation.
pub const MIN_POOL_SIZE: usize = 8;

const _: () = assert!(
    MIN_POOL_SIZE <= DEFAULT_POOL_SIZE,
    "DEFAULT_POOL_SIZE must be at least MIN_POOL_SIZE"
);

// ============================================================================
// EXTENDIBLE HASH TABLE DEPTH BOUNDS
// The two max depths bound the fanout arrays stored inside one page each
// ============================================================================

/// Maximum depth of the header page: at most 2^9 directory slots.
pub const HTABLE_HEADER_MAX_DEPTH: u32 = 9;

/// Maximum depth of a directory page: at most 2^9 bucket slots.
pub const HTABLE_DIRECTORY_MAX_DEPTH: u32 = 9;

/// Number of directory-id slots physically present in a header page.
pub const HTABLE_HEADER_ARRAY_SIZE: usize = 1 << HTABLE_HEADER_MAX_DEPTH;

/// Number of bucket-id slots physically present in a directory page.
pub const HTABLE_DIRECTORY_ARRAY_SIZE: usize = 1 << HTABLE_DIRECTORY_MAX_DEPTH;

const _: () = assert!(
    4 + HTABLE_HEADER_ARRAY_SIZE * 4 <= PAGE_USABLE_SIZE,
    "header page array must fit in a page"
);

const _: () = assert!(
    8 + HTABLE_DIRECTORY_ARRAY_SIZE * (1 + 4) <= PAGE_USABLE_SIZE,
    "directory page arrays must fit in a page"
);
