//! # Hash Table Directory Page
//!
//! A directory page maps the low `global_depth` bits of a hash to bucket
//! page ids, tracking for each slot the `local_depth` its bucket actually
//! discriminates on. One directory page serves one header slot.
//!
//! ## Page Layout
//!
//! ```text
//! Offset  Size    Field
//! ------  ------  ---------------------------------------------
//! 0       16      PageHeader (type = HashDirectory)
//! 16      4       max_depth
//! 20      4       global_depth
//! 24      512     local_depths[512]
//! 536     2048    bucket_page_ids[512]
//! ```
//!
//! The arrays are physically sized for the maximum depth; only the first
//! `2^global_depth` entries are live.
//!
//! ## Depth Invariants
//!
//! For every live slot `i` with depth `ld(i)` and bucket `bid(i)`:
//!
//! 1. `ld(i) <= global_depth <= max_depth`
//! 2. slots congruent mod `2^ld(i)` share both bucket id and local depth
//! 3. each live bucket is referenced by exactly `2^(global_depth - ld)`
//!    slots, an arithmetic progression with stride `2^ld`
//!
//! [`HashTableDirectoryPage::verify_integrity`] asserts all three; a
//! violation is a programmer error, not an I/O condition, so it is fatal.
//!
//! ## Split Image
//!
//! The split image of slot `i` is the slot that shared `i`'s bucket before
//! the most recent split (or will share it after a merge): `i` with bit
//! `ld(i) - 1` flipped. It is undefined at `ld(i) = 0` — the singleton
//! bucket has no partner.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{HTABLE_DIRECTORY_ARRAY_SIZE, HTABLE_DIRECTORY_MAX_DEPTH};
use crate::storage::{
    parse_zerocopy, parse_zerocopy_mut, PageHeader, PageId, PageType, INVALID_PAGE_ID,
    PAGE_HEADER_SIZE, PAGE_USABLE_SIZE,
};

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HashTableDirectoryPage {
    max_depth: U32,
    global_depth: U32,
    local_depths: [u8; HTABLE_DIRECTORY_ARRAY_SIZE],
    bucket_page_ids: [U32; HTABLE_DIRECTORY_ARRAY_SIZE],
}

const _: () = assert!(std::mem::size_of::<HashTableDirectoryPage>() <= PAGE_USABLE_SIZE);

impl HashTableDirectoryPage {
    /// Stamps a fresh page as a directory: global depth zero, all local
    /// depths zero, all bucket slots empty.
    pub fn init(data: &mut [u8], page_id: PageId, max_depth: u32) -> Result<&mut Self> {
        ensure!(
            max_depth <= HTABLE_DIRECTORY_MAX_DEPTH,
            "directory max_depth {} exceeds limit {}",
            max_depth,
            HTABLE_DIRECTORY_MAX_DEPTH
        );

        PageHeader::new(PageType::HashDirectory, page_id).write_to(data)?;

        let page: &mut Self =
            parse_zerocopy_mut(&mut data[PAGE_HEADER_SIZE..], "HashTableDirectoryPage")?;
        page.max_depth = U32::new(max_depth);
        page.global_depth = U32::new(0);
        page.local_depths = [0u8; HTABLE_DIRECTORY_ARRAY_SIZE];
        page.bucket_page_ids = [U32::new(INVALID_PAGE_ID); HTABLE_DIRECTORY_ARRAY_SIZE];
        Ok(page)
    }

    pub fn from_page(data: &[u8]) -> Result<&Self> {
        let header = PageHeader::from_bytes(data)?;
        ensure!(
            header.page_type() == PageType::HashDirectory,
            "expected HashDirectory page, got {:?}",
            header.page_type()
        );
        parse_zerocopy(&data[PAGE_HEADER_SIZE..], "HashTableDirectoryPage")
    }

    pub fn from_page_mut(data: &mut [u8]) -> Result<&mut Self> {
        let header = PageHeader::from_bytes(data)?;
        ensure!(
            header.page_type() == PageType::HashDirectory,
            "expected HashDirectory page, got {:?}",
            header.page_type()
        );
        parse_zerocopy_mut(&mut data[PAGE_HEADER_SIZE..], "HashTableDirectoryPage")
    }

    /// Routes a hash to a directory slot using its low `global_depth` bits.
    pub fn hash_to_bucket_index(&self, hash: u32) -> u32 {
        hash & self.global_depth_mask()
    }

    /// Mask of the hash bits the directory currently discriminates on.
    pub fn global_depth_mask(&self) -> u32 {
        (1u32 << self.global_depth.get()) - 1
    }

    /// Mask of the hash bits the bucket at `bucket_idx` agrees on.
    pub fn local_depth_mask(&self, bucket_idx: u32) -> u32 {
        (1u32 << self.local_depth(bucket_idx)) - 1
    }

    pub fn bucket_page_id(&self, bucket_idx: u32) -> PageId {
        debug_assert!(bucket_idx < self.size());
        self.bucket_page_ids[bucket_idx as usize].get()
    }

    pub fn set_bucket_page_id(&mut self, bucket_idx: u32, page_id: PageId) {
        debug_assert!(bucket_idx < self.size());
        self.bucket_page_ids[bucket_idx as usize] = U32::new(page_id);
    }

    pub fn local_depth(&self, bucket_idx: u32) -> u32 {
        debug_assert!(bucket_idx < self.size());
        self.local_depths[bucket_idx as usize] as u32
    }

    pub fn set_local_depth(&mut self, bucket_idx: u32, local_depth: u8) {
        debug_assert!(bucket_idx < self.size());
        debug_assert!(local_depth as u32 <= self.global_depth.get());
        self.local_depths[bucket_idx as usize] = local_depth;
    }

    pub fn incr_local_depth(&mut self, bucket_idx: u32) {
        debug_assert!(self.local_depth(bucket_idx) < self.global_depth.get());
        self.local_depths[bucket_idx as usize] += 1;
    }

    pub fn decr_local_depth(&mut self, bucket_idx: u32) {
        debug_assert!(self.local_depth(bucket_idx) > 0);
        self.local_depths[bucket_idx as usize] -= 1;
    }

    /// The slot that shared this slot's bucket before its last split:
    /// `bucket_idx` with bit `ld - 1` flipped. Undefined at `ld == 0`.
    pub fn split_image_index(&self, bucket_idx: u32) -> u32 {
        let local_depth = self.local_depth(bucket_idx);
        debug_assert!(local_depth > 0, "split image undefined at local depth 0");
        bucket_idx ^ (1u32 << (local_depth - 1))
    }

    pub fn global_depth(&self) -> u32 {
        self.global_depth.get()
    }

    /// Doubles the live range: every new slot inherits its lower twin's
    /// bucket id and local depth. Requires `global_depth < max_depth`.
    pub fn incr_global_depth(&mut self) {
        let depth = self.global_depth.get();
        debug_assert!(depth < self.max_depth.get());
        if depth >= self.max_depth.get() {
            return;
        }

        let size = 1usize << depth;
        for i in 0..size {
            self.bucket_page_ids[size + i] = self.bucket_page_ids[i];
            self.local_depths[size + i] = self.local_depths[i];
        }
        self.global_depth = U32::new(depth + 1);
    }

    /// Halves the live range. Only legal when every live slot has
    /// `local_depth < global_depth`, i.e. [`Self::can_shrink`] holds.
    pub fn decr_global_depth(&mut self) {
        let depth = self.global_depth.get();
        debug_assert!(depth > 0);
        debug_assert!(self.can_shrink());
        if depth == 0 {
            return;
        }
        self.global_depth = U32::new(depth - 1);
    }

    /// True when no live slot uses the full global depth.
    pub fn can_shrink(&self) -> bool {
        if self.global_depth.get() == 0 {
            return false;
        }
        let size = self.size() as usize;
        self.local_depths[..size]
            .iter()
            .all(|&d| (d as u32) < self.global_depth.get())
    }

    pub fn size(&self) -> u32 {
        1 << self.global_depth.get()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth.get()
    }

    pub fn max_size(&self) -> u32 {
        1 << self.max_depth.get()
    }

    /// Asserts the directory's depth and pointer-coherence invariants.
    /// Violations are programmer errors and abort the process.
    pub fn verify_integrity(&self) {
        let global_depth = self.global_depth.get();
        assert!(
            global_depth <= self.max_depth.get(),
            "global depth {} exceeds max depth {}",
            global_depth,
            self.max_depth.get()
        );

        // bucket page id -> (local depth, number of referencing slots)
        let mut seen: hashbrown::HashMap<PageId, (u32, u32)> = hashbrown::HashMap::new();

        for i in 0..self.size() {
            let local_depth = self.local_depth(i);
            assert!(
                local_depth <= global_depth,
                "slot {}: local depth {} exceeds global depth {}",
                i,
                local_depth,
                global_depth
            );

            let page_id = self.bucket_page_id(i);
            if page_id == INVALID_PAGE_ID {
                continue;
            }

            let entry = seen.entry(page_id).or_insert((local_depth, 0));
            assert_eq!(
                entry.0, local_depth,
                "slots sharing bucket {} disagree on local depth",
                page_id
            );
            entry.1 += 1;
        }

        for (page_id, (local_depth, count)) in seen {
            let expected = 1u32 << (global_depth - local_depth);
            assert_eq!(
                count, expected,
                "bucket {} referenced by {} slots, expected {}",
                page_id, count, expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PAGE_SIZE;

    fn fresh_page(max_depth: u32) -> Vec<u8> {
        let mut data = vec![0u8; PAGE_SIZE];
        HashTableDirectoryPage::init(&mut data, 2, max_depth).unwrap();
        data
    }

    #[test]
    fn init_starts_at_global_depth_zero() {
        let data = fresh_page(3);
        let page = HashTableDirectoryPage::from_page(&data).unwrap();

        assert_eq!(page.global_depth(), 0);
        assert_eq!(page.size(), 1);
        assert_eq!(page.max_size(), 8);
        assert_eq!(page.local_depth(0), 0);
        assert_eq!(page.bucket_page_id(0), INVALID_PAGE_ID);
    }

    #[test]
    fn global_depth_mask_tracks_depth() {
        let mut data = fresh_page(3);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();
        page.set_bucket_page_id(0, 10);

        assert_eq!(page.global_depth_mask(), 0b0);
        page.incr_global_depth();
        assert_eq!(page.global_depth_mask(), 0b1);
        page.incr_global_depth();
        assert_eq!(page.global_depth_mask(), 0b11);

        assert_eq!(page.hash_to_bucket_index(0b1110), 0b10);
    }

    #[test]
    fn incr_global_depth_copies_lower_half() {
        let mut data = fresh_page(2);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();
        page.set_bucket_page_id(0, 10);

        page.incr_global_depth();

        assert_eq!(page.size(), 2);
        assert_eq!(page.bucket_page_id(1), 10);
        assert_eq!(page.local_depth(1), 0);
    }

    #[test]
    fn split_image_flips_top_local_bit() {
        let mut data = fresh_page(3);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();
        page.set_bucket_page_id(0, 10);
        page.incr_global_depth();
        page.incr_global_depth();

        page.set_local_depth(0b01, 2);
        assert_eq!(page.split_image_index(0b01), 0b11);

        page.set_local_depth(0b10, 1);
        assert_eq!(page.split_image_index(0b10), 0b11);
    }

    #[test]
    fn can_shrink_requires_all_locals_below_global() {
        let mut data = fresh_page(2);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();
        page.set_bucket_page_id(0, 10);

        assert!(!page.can_shrink()); // depth 0 can never shrink

        page.incr_global_depth();
        page.set_local_depth(0, 1);
        page.set_local_depth(1, 1);
        page.set_bucket_page_id(1, 11);
        assert!(!page.can_shrink());

        page.set_local_depth(0, 0);
        page.set_local_depth(1, 0);
        page.set_bucket_page_id(1, 10);
        assert!(page.can_shrink());

        page.decr_global_depth();
        assert_eq!(page.global_depth(), 0);
        assert_eq!(page.size(), 1);
    }

    #[test]
    fn local_depth_increments_and_decrements() {
        let mut data = fresh_page(2);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();
        page.set_bucket_page_id(0, 10);
        page.incr_global_depth();

        page.incr_local_depth(0);
        assert_eq!(page.local_depth(0), 1);

        page.decr_local_depth(0);
        assert_eq!(page.local_depth(0), 0);
    }

    #[test]
    fn local_depth_masks() {
        let mut data = fresh_page(3);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();
        page.set_bucket_page_id(0, 10);
        page.incr_global_depth();
        page.incr_global_depth();
        page.set_local_depth(1, 2);

        assert_eq!(page.local_depth_mask(0), 0b0);
        assert_eq!(page.local_depth_mask(1), 0b11);
    }

    #[test]
    fn verify_integrity_accepts_canonical_layout() {
        let mut data = fresh_page(2);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();

        // gd=2; bucket 10 at depth 1 covering slots {0, 2}; buckets 11/12
        // at depth 2 covering slots {1} and {3}
        page.set_bucket_page_id(0, 10);
        page.incr_global_depth();
        page.incr_global_depth();
        page.set_local_depth(0, 1);
        page.set_local_depth(2, 1);
        page.set_bucket_page_id(2, 10);
        page.set_local_depth(1, 2);
        page.set_bucket_page_id(1, 11);
        page.set_local_depth(3, 2);
        page.set_bucket_page_id(3, 12);

        page.verify_integrity();
    }

    #[test]
    #[should_panic(expected = "disagree on local depth")]
    fn verify_integrity_catches_depth_mismatch() {
        let mut data = fresh_page(2);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();

        page.set_bucket_page_id(0, 10);
        page.incr_global_depth();
        page.set_local_depth(0, 1);
        // slot 1 shares the bucket but claims a different depth
        page.set_bucket_page_id(1, 10);

        page.verify_integrity();
    }

    #[test]
    #[should_panic(expected = "referenced by")]
    fn verify_integrity_catches_wrong_fanout() {
        let mut data = fresh_page(2);
        let page = HashTableDirectoryPage::from_page_mut(&mut data).unwrap();

        page.set_bucket_page_id(0, 10);
        page.incr_global_depth();
        // both slots at depth 1 pointing at the same bucket: fanout should
        // be a single slot each
        page.set_local_depth(0, 1);
        page.set_local_depth(1, 1);
        page.set_bucket_page_id(1, 10);

        page.verify_integrity();
    }
}
