//! # Disk Extendible Hash Table
//!
//! The index driver: orchestrates point insert, lookup, and removal across
//! the three page kinds, growing by bucket splits and shrinking by local
//! merges, without ever rewriting unrelated buckets.
//!
//! ## Navigation
//!
//! ```text
//! hash(key)            32 bits, truncated from the injected 64-bit hasher
//!   ├─ high bits ──> header slot ──> directory page id
//!   └─ low  bits ──> directory slot ──> bucket page id ──> linear scan
//! ```
//!
//! The header consumes the **high** end of the hash and directories the
//! low end, so redistributing a bucket on one more low bit can never move
//! an entry to a different directory.
//!
//! ## Latch Coupling
//!
//! Latches are acquired strictly top-down: header, then directory, then
//! bucket. The header is released as soon as the directory id is resolved
//! (slots are wired once and directories are never freed, so the id stays
//! valid). The read path then holds the directory latch just long enough
//! to latch the bucket, so a concurrent split or merge cannot slip an
//! entry out from under a lookup. The write paths hold the directory
//! write latch across any structural modification (split, merge,
//! directory grow/shrink), including entry redistribution, so concurrent
//! operations on the same directory serialize while other directories
//! proceed untouched.
//!
//! ## Split
//!
//! A full bucket at local depth `ld` splits into itself and a fresh split
//! image at depth `ld + 1`, after doubling the directory if `ld` equaled
//! the global depth. All slots that shared the bucket are repointed by
//! their bit `ld`, then every entry is rehashed into one of the two pages.
//! If every entry lands on one side, the caller's retry loop splits again;
//! the local depth cap bounds the loop, and an insert that still finds no
//! room fails.
//!
//! ## Merge
//!
//! When a removal empties a bucket, the bucket repeatedly merges with its
//! split image while the two are peers (equal local depth) and at least
//! one of them is empty. The slot's own bucket survives; the partner's
//! entries migrate into it and the partner page returns to the free list.
//! After merging stabilizes, the directory halves while no slot uses its
//! full global depth.
//!
//! ## Transactions
//!
//! The `txn` parameter is an opaque hook for future lock integration. The
//! core never reads it; correctness does not depend on it.

use std::marker::PhantomData;
use std::sync::Arc;

use eyre::{ensure, Result};
use smallvec::SmallVec;

use super::bucket_page::{bucket_array_capacity, HashTableBucketPage, HashTableBucketPageMut};
use super::directory_page::HashTableDirectoryPage;
use super::header_page::HashTableHeaderPage;
use super::keys::{DefaultComparator, EntryData, KeyComparator, KeyHasher, Xxh3KeyHasher};
use crate::config::{HTABLE_DIRECTORY_MAX_DEPTH, HTABLE_HEADER_MAX_DEPTH};
use crate::storage::{BufferPool, IndexOptions, PageId, WritePageGuard, INVALID_PAGE_ID};
use crate::transaction::Transaction;

/// Disk-resident extendible hash table with unique keys.
///
/// `K` and `V` are fixed-size zerocopy types; equality and hashing are
/// injected at construction. The handle owns only the header page id; all
/// pages belong to the buffer pool and are held transiently via guards.
pub struct ExtendibleHashTable<K, V, C = DefaultComparator<K>, H = Xxh3KeyHasher> {
    name: String,
    pool: Arc<BufferPool>,
    cmp: C,
    hasher: H,
    directory_max_depth: u32,
    bucket_max_size: u32,
    header_page_id: PageId,
    _marker: PhantomData<fn(K, V)>,
}

impl<K, V, C, H> ExtendibleHashTable<K, V, C, H>
where
    K: EntryData,
    V: EntryData,
    C: KeyComparator<K>,
    H: KeyHasher<K>,
{
    /// Creates a new index in the pool's file: allocates and initializes
    /// the header page and persists the root id and geometry.
    pub fn create(
        pool: Arc<BufferPool>,
        name: impl Into<String>,
        cmp: C,
        hasher: H,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Self> {
        ensure!(
            header_max_depth <= HTABLE_HEADER_MAX_DEPTH,
            "header_max_depth {} exceeds limit {}",
            header_max_depth,
            HTABLE_HEADER_MAX_DEPTH
        );
        ensure!(
            directory_max_depth <= HTABLE_DIRECTORY_MAX_DEPTH,
            "directory_max_depth {} exceeds limit {}",
            directory_max_depth,
            HTABLE_DIRECTORY_MAX_DEPTH
        );
        let capacity = bucket_array_capacity::<K, V>();
        ensure!(
            bucket_max_size >= 1 && bucket_max_size <= capacity,
            "bucket_max_size {} outside [1, {}]",
            bucket_max_size,
            capacity
        );

        let (header_page_id, mut guard) = pool.new_page_guarded()?;
        HashTableHeaderPage::init(guard.data_mut(), header_page_id, header_max_depth)?;
        drop(guard);

        pool.set_root_page(header_page_id)?;
        pool.set_index_options(IndexOptions {
            header_max_depth,
            directory_max_depth,
            bucket_max_size,
        })?;

        Ok(Self {
            name: name.into(),
            pool,
            cmp,
            hasher,
            directory_max_depth,
            bucket_max_size,
            header_page_id,
            _marker: PhantomData,
        })
    }

    /// Creates a new index with the maximum depths and a bucket capacity
    /// derived from the key/value sizes.
    pub fn create_default(
        pool: Arc<BufferPool>,
        name: impl Into<String>,
        cmp: C,
        hasher: H,
    ) -> Result<Self> {
        Self::create(
            pool,
            name,
            cmp,
            hasher,
            HTABLE_HEADER_MAX_DEPTH,
            HTABLE_DIRECTORY_MAX_DEPTH,
            bucket_array_capacity::<K, V>(),
        )
    }

    /// Reopens the index persisted in the pool's file, resuming the root
    /// page and geometry from the file header.
    pub fn open(pool: Arc<BufferPool>, name: impl Into<String>, cmp: C, hasher: H) -> Result<Self> {
        let header_page_id = pool.root_page()?;
        ensure!(
            header_page_id != INVALID_PAGE_ID,
            "index file has no root page (was the index ever created?)"
        );

        let options = pool.index_options()?;
        let capacity = bucket_array_capacity::<K, V>();
        ensure!(
            options.bucket_max_size >= 1 && options.bucket_max_size <= capacity,
            "persisted bucket_max_size {} is impossible for this key/value pair (capacity {})",
            options.bucket_max_size,
            capacity
        );

        Ok(Self {
            name: name.into(),
            pool,
            cmp,
            hasher,
            directory_max_depth: options.directory_max_depth,
            bucket_max_size: options.bucket_max_size,
            header_page_id,
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    fn hash_of(&self, key: &K) -> u32 {
        self.hasher.hash_key(key) as u32
    }

    /// Looks the key up, appending its value to `result` on a hit. At most
    /// one value is appended (unique-key regime).
    pub fn get_value(
        &self,
        key: &K,
        result: &mut Vec<V>,
        _txn: Option<&Transaction>,
    ) -> Result<bool> {
        let hash = self.hash_of(key);

        let directory_page_id = {
            let guard = self.pool.fetch_page_read(self.header_page_id)?;
            let header = HashTableHeaderPage::from_page(guard.data())?;
            header.directory_page_id(header.hash_to_directory_index(hash))
        };
        if directory_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        // the directory latch is held until the bucket is latched: a split
        // or merge between the two steps could otherwise move the entry
        let directory_guard = self.pool.fetch_page_read(directory_page_id)?;
        let bucket_page_id = {
            let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
            directory.bucket_page_id(directory.hash_to_bucket_index(hash))
        };
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let guard = self.pool.fetch_page_read(bucket_page_id)?;
        drop(directory_guard);
        let bucket = HashTableBucketPage::<K, V>::from_page(guard.data())?;
        match bucket.lookup(key, &self.cmp)? {
            Some(value) => {
                result.push(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Inserts the pair. Returns `Ok(false)` on a duplicate key, on
    /// allocation exhaustion, or when the routed bucket is full and its
    /// local depth has already reached the directory's maximum.
    pub fn insert(&self, key: &K, value: &V, _txn: Option<&Transaction>) -> Result<bool> {
        let hash = self.hash_of(key);

        let mut header_guard = self.pool.fetch_page_write(self.header_page_id)?;
        let (directory_idx, directory_page_id) = {
            let header = HashTableHeaderPage::from_page(header_guard.data())?;
            let idx = header.hash_to_directory_index(hash);
            (idx, header.directory_page_id(idx))
        };

        if directory_page_id == INVALID_PAGE_ID {
            return self.insert_to_new_directory(&mut header_guard, directory_idx, key, value);
        }
        drop(header_guard);

        let mut directory_guard = self.pool.fetch_page_write(directory_page_id)?;

        // retries after each split until the routed bucket has room or no
        // further split is possible; bounded by the directory max depth
        loop {
            let (bucket_idx, bucket_page_id) = {
                let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
                let idx = directory.hash_to_bucket_index(hash);
                (idx, directory.bucket_page_id(idx))
            };

            if bucket_page_id == INVALID_PAGE_ID {
                return self.insert_to_new_bucket(&mut directory_guard, bucket_idx, key, value);
            }

            let mut bucket_guard = self.pool.fetch_page_write(bucket_page_id)?;
            {
                let mut bucket = HashTableBucketPageMut::<K, V>::from_page(bucket_guard.data_mut())?;
                if bucket.as_read().lookup(key, &self.cmp)?.is_some() {
                    return Ok(false);
                }
                if !bucket.is_full() {
                    return bucket.insert(key, value, &self.cmp);
                }
            }

            let (local_depth, global_depth) = {
                let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
                (directory.local_depth(bucket_idx), directory.global_depth())
            };

            if local_depth >= self.directory_max_depth {
                return Ok(false);
            }
            if local_depth == global_depth {
                let directory = HashTableDirectoryPage::from_page_mut(directory_guard.data_mut())?;
                directory.incr_global_depth();
            }

            if !self.split_bucket(&mut directory_guard, &mut bucket_guard, bucket_idx)? {
                return Ok(false);
            }
        }
    }

    /// Removes the key. Returns `Ok(false)` when absent. An emptied bucket
    /// triggers merging and, once merging stabilizes, directory shrinking.
    pub fn remove(&self, key: &K, _txn: Option<&Transaction>) -> Result<bool> {
        let hash = self.hash_of(key);

        let directory_page_id = {
            let guard = self.pool.fetch_page_read(self.header_page_id)?;
            let header = HashTableHeaderPage::from_page(guard.data())?;
            header.directory_page_id(header.hash_to_directory_index(hash))
        };
        if directory_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut directory_guard = self.pool.fetch_page_write(directory_page_id)?;
        let (bucket_idx, bucket_page_id) = {
            let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
            let idx = directory.hash_to_bucket_index(hash);
            (idx, directory.bucket_page_id(idx))
        };
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut bucket_guard = self.pool.fetch_page_write(bucket_page_id)?;
        let (removed, now_empty) = {
            let mut bucket = HashTableBucketPageMut::<K, V>::from_page(bucket_guard.data_mut())?;
            let removed = bucket.remove(key, &self.cmp)?;
            (removed, bucket.is_empty())
        };
        if !removed {
            return Ok(false);
        }

        if now_empty {
            self.merge_bucket(&mut directory_guard, &mut bucket_guard, bucket_idx)?;
        }

        Ok(true)
    }

    /// First insert routed to an empty header slot: allocate and wire a
    /// directory, then delegate to the new-bucket path for its slot 0.
    fn insert_to_new_directory(
        &self,
        header_guard: &mut WritePageGuard,
        directory_idx: u32,
        key: &K,
        value: &V,
    ) -> Result<bool> {
        let (directory_page_id, mut directory_guard) = match self.pool.new_page_guarded() {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("directory allocation failed, insert fails: {e}");
                return Ok(false);
            }
        };
        HashTableDirectoryPage::init(
            directory_guard.data_mut(),
            directory_page_id,
            self.directory_max_depth,
        )?;

        // wire the slot before attempting the bucket: an empty directory is
        // invariant-preserving, an unreferenced page is a leak
        HashTableHeaderPage::from_page_mut(header_guard.data_mut())?
            .set_directory_page_id(directory_idx, directory_page_id);

        log::trace!(
            "{}: new directory {} at header slot {}",
            self.name,
            directory_page_id,
            directory_idx
        );

        // global depth is zero, so every hash routes to slot 0
        self.insert_to_new_bucket(&mut directory_guard, 0, key, value)
    }

    /// Insert routed to a slot with no bucket yet: allocate, initialize,
    /// insert the pair, and wire the slot.
    fn insert_to_new_bucket(
        &self,
        directory_guard: &mut WritePageGuard,
        bucket_idx: u32,
        key: &K,
        value: &V,
    ) -> Result<bool> {
        let (bucket_page_id, mut bucket_guard) = match self.pool.new_page_guarded() {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("bucket allocation failed, insert fails: {e}");
                return Ok(false);
            }
        };

        let mut bucket = HashTableBucketPageMut::<K, V>::init(
            bucket_guard.data_mut(),
            bucket_page_id,
            self.bucket_max_size,
        )?;
        let inserted = bucket.insert(key, value, &self.cmp)?;
        debug_assert!(inserted, "insert into a fresh bucket cannot fail");

        HashTableDirectoryPage::from_page_mut(directory_guard.data_mut())?
            .set_bucket_page_id(bucket_idx, bucket_page_id);

        Ok(true)
    }

    /// Splits the full bucket at `bucket_idx` into itself and a fresh
    /// split image one local-depth level down, repointing every sharing
    /// slot and rehashing all entries. Returns `Ok(false)` when the split
    /// page cannot be allocated.
    ///
    /// Precondition: `local_depth(bucket_idx) < global_depth` (the caller
    /// has already grown the directory if needed).
    fn split_bucket(
        &self,
        directory_guard: &mut WritePageGuard,
        bucket_guard: &mut WritePageGuard,
        bucket_idx: u32,
    ) -> Result<bool> {
        let (bucket_page_id, old_depth) = {
            let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
            (directory.bucket_page_id(bucket_idx), directory.local_depth(bucket_idx))
        };

        let (split_page_id, mut split_guard) = match self.pool.new_page_guarded() {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("split allocation failed, insert fails: {e}");
                return Ok(false);
            }
        };
        HashTableBucketPageMut::<K, V>::init(
            split_guard.data_mut(),
            split_page_id,
            self.bucket_max_size,
        )?;

        let new_depth = (old_depth + 1) as u8;
        {
            let directory = HashTableDirectoryPage::from_page_mut(directory_guard.data_mut())?;
            let size = directory.size();
            let stride = 1u32 << old_depth;
            let split_bit = 1u32 << old_depth;
            let own_side = bucket_idx & split_bit;

            // every slot that shared the bucket under the old stride is
            // repointed by its bit `old_depth`
            let mut slot = bucket_idx & (stride - 1);
            while slot < size {
                if slot & split_bit == own_side {
                    directory.set_bucket_page_id(slot, bucket_page_id);
                } else {
                    directory.set_bucket_page_id(slot, split_page_id);
                }
                directory.set_local_depth(slot, new_depth);
                slot += stride;
            }
        }

        // drain the full bucket and rehash each entry against the updated
        // directory; every target is one of the two pages by construction
        let entries: SmallVec<[(K, V); 8]> = {
            let mut bucket = HashTableBucketPageMut::<K, V>::from_page(bucket_guard.data_mut())?;
            let read = bucket.as_read();
            let mut entries = SmallVec::with_capacity(read.size() as usize);
            for i in 0..read.size() {
                entries.push(read.entry_at(i)?);
            }
            bucket.clear()?;
            entries
        };

        {
            let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
            let mut bucket = HashTableBucketPageMut::<K, V>::from_page(bucket_guard.data_mut())?;
            let mut split = HashTableBucketPageMut::<K, V>::from_page(split_guard.data_mut())?;

            for (k, v) in entries {
                let target_idx = directory.hash_to_bucket_index(self.hash_of(&k));
                let target_page_id = directory.bucket_page_id(target_idx);
                debug_assert!(
                    target_page_id == bucket_page_id || target_page_id == split_page_id,
                    "split invariant: rehash target must be one of the two halves"
                );

                let inserted = if target_page_id == split_page_id {
                    split.insert(&k, &v, &self.cmp)?
                } else {
                    bucket.insert(&k, &v, &self.cmp)?
                };
                debug_assert!(inserted, "redistribution cannot overflow either half");
            }
        }

        log::trace!(
            "{}: split bucket {} (slot {}) into {} at depth {}",
            self.name,
            bucket_page_id,
            bucket_idx,
            split_page_id,
            new_depth
        );

        Ok(true)
    }

    /// Merges the (empty) bucket at `bucket_idx` with its split image
    /// while the two are peers and one side is empty, then shrinks the
    /// directory while possible. Runs entirely under the directory write
    /// latch held by the caller.
    fn merge_bucket(
        &self,
        directory_guard: &mut WritePageGuard,
        bucket_guard: &mut WritePageGuard,
        bucket_idx: u32,
    ) -> Result<()> {
        loop {
            let (local_depth, bucket_page_id) = {
                let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
                (directory.local_depth(bucket_idx), directory.bucket_page_id(bucket_idx))
            };
            if local_depth == 0 {
                break;
            }

            let (split_idx, split_depth, split_page_id) = {
                let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
                let split_idx = directory.split_image_index(bucket_idx);
                (
                    split_idx,
                    directory.local_depth(split_idx),
                    directory.bucket_page_id(split_idx),
                )
            };
            if split_depth != local_depth {
                break;
            }

            ensure!(
                split_page_id != INVALID_PAGE_ID && split_page_id != bucket_page_id,
                "directory corruption: slot {} and its split image {} cannot share page {}",
                bucket_idx,
                split_idx,
                split_page_id
            );

            let mut split_guard = self.pool.fetch_page_write(split_page_id)?;

            let proceed = {
                let bucket = HashTableBucketPage::<K, V>::from_page(bucket_guard.data())?;
                let split = HashTableBucketPage::<K, V>::from_page(split_guard.data())?;
                bucket.is_empty() || split.is_empty()
            };
            if !proceed {
                break;
            }

            // migrate the partner's entries into the surviving bucket; one
            // side is empty, so the survivor cannot overflow
            {
                let split = HashTableBucketPage::<K, V>::from_page(split_guard.data())?;
                let mut entries: SmallVec<[(K, V); 8]> =
                    SmallVec::with_capacity(split.size() as usize);
                for i in 0..split.size() {
                    entries.push(split.entry_at(i)?);
                }

                if !entries.is_empty() {
                    let mut bucket =
                        HashTableBucketPageMut::<K, V>::from_page(bucket_guard.data_mut())?;
                    for (k, v) in entries {
                        let inserted = bucket.insert(&k, &v, &self.cmp)?;
                        debug_assert!(inserted, "merge migration cannot overflow the survivor");
                    }
                }

                HashTableBucketPageMut::<K, V>::from_page(split_guard.data_mut())?.clear()?;
            }
            drop(split_guard);

            // a concurrent flush may still pin the partner frame; deletion
            // is skipped then and the page leaks
            let deleted = self.pool.delete_page(split_page_id)?;
            if !deleted {
                log::debug!(
                    "{}: merge partner {} still pinned, leaving it to its reader",
                    self.name,
                    split_page_id
                );
            }

            {
                let directory = HashTableDirectoryPage::from_page_mut(directory_guard.data_mut())?;
                directory.decr_local_depth(bucket_idx);
                let new_depth = directory.local_depth(bucket_idx);
                let stride = 1u32 << new_depth;
                let size = directory.size();

                let mut slot = bucket_idx & (stride - 1);
                while slot < size {
                    directory.set_bucket_page_id(slot, bucket_page_id);
                    directory.set_local_depth(slot, new_depth as u8);
                    slot += stride;
                }
            }

            log::trace!(
                "{}: merged split image {} (slot {}) into bucket {} at depth {}",
                self.name,
                split_page_id,
                split_idx,
                bucket_page_id,
                local_depth - 1
            );
        }

        let directory = HashTableDirectoryPage::from_page_mut(directory_guard.data_mut())?;
        while directory.can_shrink() {
            directory.decr_global_depth();
        }

        Ok(())
    }

    /// Walks the whole table asserting every structural invariant: depth
    /// bounds, pointer coherence, bucket fanout, entry placement, and
    /// occupancy limits. Violations are programmer errors and abort.
    pub fn verify_integrity(&self) -> Result<()> {
        let header_guard = self.pool.fetch_page_read(self.header_page_id)?;
        let header = HashTableHeaderPage::from_page(header_guard.data())?;

        for directory_idx in 0..header.max_size() {
            let directory_page_id = header.directory_page_id(directory_idx);
            if directory_page_id == INVALID_PAGE_ID {
                continue;
            }

            let directory_guard = self.pool.fetch_page_read(directory_page_id)?;
            let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
            directory.verify_integrity();

            for bucket_idx in 0..directory.size() {
                let bucket_page_id = directory.bucket_page_id(bucket_idx);
                assert_ne!(
                    bucket_page_id, INVALID_PAGE_ID,
                    "live slot {} in directory {} has no bucket",
                    bucket_idx, directory_page_id
                );

                let local_depth = directory.local_depth(bucket_idx);
                let local_mask = (1u32 << local_depth) - 1;

                // visit each bucket once, through its canonical slot
                if bucket_idx != bucket_idx & local_mask {
                    continue;
                }

                let bucket_guard = self.pool.fetch_page_read(bucket_page_id)?;
                let bucket = HashTableBucketPage::<K, V>::from_page(bucket_guard.data())?;
                assert!(
                    bucket.size() <= bucket.max_size(),
                    "bucket {} overflows: {} > {}",
                    bucket_page_id,
                    bucket.size(),
                    bucket.max_size()
                );

                for i in 0..bucket.size() {
                    let (k, _) = bucket.entry_at(i)?;
                    let hash = self.hash_of(&k);
                    assert_eq!(
                        hash & local_mask,
                        bucket_idx & local_mask,
                        "entry in bucket {} disagrees with its slot on the low {} bits",
                        bucket_page_id,
                        local_depth
                    );
                    assert_eq!(
                        header.hash_to_directory_index(hash),
                        directory_idx,
                        "entry in bucket {} routed to the wrong directory",
                        bucket_page_id
                    );
                }
            }
        }

        Ok(())
    }

    /// Logs the table structure (header slots, directory depths, bucket
    /// occupancy) through the `log` facade.
    pub fn print_table(&self) -> Result<()> {
        let header_guard = self.pool.fetch_page_read(self.header_page_id)?;
        let header = HashTableHeaderPage::from_page(header_guard.data())?;

        log::info!(
            "=== {} (header page {}, max_depth {}) ===",
            self.name,
            self.header_page_id,
            header.max_depth()
        );

        for directory_idx in 0..header.max_size() {
            let directory_page_id = header.directory_page_id(directory_idx);
            if directory_page_id == INVALID_PAGE_ID {
                log::info!("  header[{}] -> (empty)", directory_idx);
                continue;
            }

            let directory_guard = self.pool.fetch_page_read(directory_page_id)?;
            let directory = HashTableDirectoryPage::from_page(directory_guard.data())?;
            log::info!(
                "  header[{}] -> directory {} (global_depth {})",
                directory_idx,
                directory_page_id,
                directory.global_depth()
            );

            for bucket_idx in 0..directory.size() {
                let bucket_page_id = directory.bucket_page_id(bucket_idx);
                if bucket_page_id == INVALID_PAGE_ID {
                    log::info!("    dir[{:04b}] -> (empty)", bucket_idx);
                    continue;
                }
                let bucket_guard = self.pool.fetch_page_read(bucket_page_id)?;
                let bucket = HashTableBucketPage::<K, V>::from_page(bucket_guard.data())?;
                log::info!(
                    "    dir[{:04b}] ld={} -> bucket {} ({}/{})",
                    bucket_idx,
                    directory.local_depth(bucket_idx),
                    bucket_page_id,
                    bucket.size(),
                    bucket.max_size()
                );
            }
        }

        Ok(())
    }
}
