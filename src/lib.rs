//! # diskhash - Disk-Resident Extendible Hash Index
//!
//! `diskhash` is a persistent associative container from fixed-size keys to
//! fixed-size values, stored as a tree of three page kinds (header →
//! directory → bucket) managed through a buffer pool. It supports point
//! insertion, point lookup, and point deletion; the table grows by bucket
//! splitting with local-depth doubling and shrinks by local merging,
//! without ever rewriting unrelated buckets.
//!
//! ## Quick Start
//!
//! ```ignore
//! use diskhash::htable::{DefaultComparator, ExtendibleHashTable, Xxh3KeyHasher};
//! use diskhash::storage::BufferPool;
//!
//! let pool = BufferPool::create("orders.dhx", 64)?;
//! let index = ExtendibleHashTable::<u64, u64>::create_default(
//!     pool,
//!     "orders_pk",
//!     DefaultComparator::new(),
//!     Xxh3KeyHasher,
//! )?;
//!
//! index.insert(&42, &1337, None)?;
//!
//! let mut values = Vec::new();
//! if index.get_value(&42, &mut values, None)? {
//!     assert_eq!(values, vec![1337]);
//! }
//! index.remove(&42, None)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  ExtendibleHashTable (driver)       │  navigation, split, merge
//! ├─────────────────────────────────────┤
//! │  Hash pages (header/dir/bucket)     │  zerocopy views over guards
//! ├─────────────────────────────────────┤
//! │  Page guards (pin + latch, RAII)    │
//! ├─────────────────────────────────────┤
//! │  BufferPool (frames, SIEVE)         │
//! ├─────────────────────────────────────┤
//! │  Memory-mapped file + freelist      │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Operations latch pages strictly top-down (header → directory → bucket),
//! releasing each level as soon as the next is secured. Structural
//! modifications (split, merge, directory grow/shrink) run entirely under
//! the directory write latch, so operations on distinct directories proceed
//! in parallel.
//!
//! ## Durability
//!
//! Pages are written back on eviction and on [`storage::BufferPool::flush_all`],
//! each stamped with a CRC-32 payload checksum that loads verify. The header
//! page id persisted in the file header is the durable root; reopening a
//! file resumes the index with the geometry it was created with. There is
//! no write-ahead logging: durability policy is flush + sync.
//!
//! ## Module Overview
//!
//! - [`storage`]: memory-mapped page file, buffer pool, guards, freelist
//! - [`htable`]: the three hash page kinds and the index driver
//! - [`config`]: centralized constants and compile-time assertions
//! - [`transaction`]: opaque transaction handle for future lock hooks

pub mod config;
pub mod htable;
pub mod storage;
pub mod transaction;

pub use htable::{DefaultComparator, ExtendibleHashTable, IdentityKeyHasher, Xxh3KeyHasher};
pub use storage::BufferPool;
pub use transaction::Transaction;
