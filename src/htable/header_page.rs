//! # Hash Table Header Page
//!
//! The header page is the root of the index: a fixed array of directory
//! page ids indexed by the **high** bits of the 32-bit hash. Routing on
//! high bits at the top and low bits inside directories means a bucket
//! split (which reindexes on low bits) can never disturb header routing.
//!
//! ## Page Layout
//!
//! ```text
//! Offset  Size    Field
//! ------  ------  ---------------------------------------------
//! 0       16      PageHeader (type = HashHeader)
//! 16      4       max_depth
//! 20      2048    directory_page_ids[512]
//! ```
//!
//! Only the first `2^max_depth` slots are live; the array is physically
//! sized for the maximum depth so the layout does not depend on the
//! configured depth.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{HTABLE_HEADER_ARRAY_SIZE, HTABLE_HEADER_MAX_DEPTH};
use crate::storage::{
    parse_zerocopy, parse_zerocopy_mut, PageHeader, PageId, PageType, INVALID_PAGE_ID,
    PAGE_HEADER_SIZE, PAGE_USABLE_SIZE,
};

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HashTableHeaderPage {
    max_depth: U32,
    directory_page_ids: [U32; HTABLE_HEADER_ARRAY_SIZE],
}

const _: () = assert!(std::mem::size_of::<HashTableHeaderPage>() <= PAGE_USABLE_SIZE);

impl HashTableHeaderPage {
    /// Stamps a fresh page as a hash header and initializes every slot to
    /// "no directory".
    pub fn init(data: &mut [u8], page_id: PageId, max_depth: u32) -> Result<&mut Self> {
        ensure!(
            max_depth <= HTABLE_HEADER_MAX_DEPTH,
            "header max_depth {} exceeds limit {}",
            max_depth,
            HTABLE_HEADER_MAX_DEPTH
        );

        PageHeader::new(PageType::HashHeader, page_id).write_to(data)?;

        let page: &mut Self = parse_zerocopy_mut(&mut data[PAGE_HEADER_SIZE..], "HashTableHeaderPage")?;
        page.max_depth = U32::new(max_depth);
        page.directory_page_ids = [U32::new(INVALID_PAGE_ID); HTABLE_HEADER_ARRAY_SIZE];
        Ok(page)
    }

    pub fn from_page(data: &[u8]) -> Result<&Self> {
        let header = PageHeader::from_bytes(data)?;
        ensure!(
            header.page_type() == PageType::HashHeader,
            "expected HashHeader page, got {:?}",
            header.page_type()
        );
        parse_zerocopy(&data[PAGE_HEADER_SIZE..], "HashTableHeaderPage")
    }

    pub fn from_page_mut(data: &mut [u8]) -> Result<&mut Self> {
        let header = PageHeader::from_bytes(data)?;
        ensure!(
            header.page_type() == PageType::HashHeader,
            "expected HashHeader page, got {:?}",
            header.page_type()
        );
        parse_zerocopy_mut(&mut data[PAGE_HEADER_SIZE..], "HashTableHeaderPage")
    }

    /// Routes a hash to a header slot using its high `max_depth` bits.
    pub fn hash_to_directory_index(&self, hash: u32) -> u32 {
        let depth = self.max_depth.get();
        if depth == 0 {
            0
        } else {
            hash >> (32 - depth)
        }
    }

    pub fn directory_page_id(&self, directory_idx: u32) -> PageId {
        debug_assert!(directory_idx < self.max_size());
        self.directory_page_ids[directory_idx as usize].get()
    }

    pub fn set_directory_page_id(&mut self, directory_idx: u32, page_id: PageId) {
        debug_assert!(directory_idx < self.max_size());
        self.directory_page_ids[directory_idx as usize] = U32::new(page_id);
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth.get()
    }

    pub fn max_size(&self) -> u32 {
        1 << self.max_depth.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PAGE_SIZE;

    fn fresh_page(max_depth: u32) -> Vec<u8> {
        let mut data = vec![0u8; PAGE_SIZE];
        HashTableHeaderPage::init(&mut data, 1, max_depth).unwrap();
        data
    }

    #[test]
    fn init_fills_slots_with_invalid() {
        let data = fresh_page(2);
        let page = HashTableHeaderPage::from_page(&data).unwrap();

        assert_eq!(page.max_depth(), 2);
        assert_eq!(page.max_size(), 4);
        for i in 0..page.max_size() {
            assert_eq!(page.directory_page_id(i), INVALID_PAGE_ID);
        }
    }

    #[test]
    fn init_rejects_oversized_depth() {
        let mut data = vec![0u8; PAGE_SIZE];
        assert!(HashTableHeaderPage::init(&mut data, 1, HTABLE_HEADER_MAX_DEPTH + 1).is_err());
    }

    #[test]
    fn from_page_rejects_wrong_type() {
        let mut data = vec![0u8; PAGE_SIZE];
        PageHeader::new(PageType::HashBucket, 1)
            .write_to(&mut data)
            .unwrap();

        assert!(HashTableHeaderPage::from_page(&data).is_err());
    }

    #[test]
    fn routing_uses_high_bits() {
        let data = fresh_page(2);
        let page = HashTableHeaderPage::from_page(&data).unwrap();

        // top two bits select the slot
        assert_eq!(page.hash_to_directory_index(0x0000_0000), 0);
        assert_eq!(page.hash_to_directory_index(0x4000_0000), 1);
        assert_eq!(page.hash_to_directory_index(0x8000_0000), 2);
        assert_eq!(page.hash_to_directory_index(0xC000_0000), 3);
        assert_eq!(page.hash_to_directory_index(0xFFFF_FFFF), 3);
    }

    #[test]
    fn routing_with_depth_zero_is_slot_zero() {
        let data = fresh_page(0);
        let page = HashTableHeaderPage::from_page(&data).unwrap();

        assert_eq!(page.max_size(), 1);
        assert_eq!(page.hash_to_directory_index(0xFFFF_FFFF), 0);
        assert_eq!(page.hash_to_directory_index(0), 0);
    }

    #[test]
    fn slot_roundtrip() {
        let mut data = fresh_page(1);
        {
            let page = HashTableHeaderPage::from_page_mut(&mut data).unwrap();
            page.set_directory_page_id(0, 11);
            page.set_directory_page_id(1, 12);
        }

        let page = HashTableHeaderPage::from_page(&data).unwrap();
        assert_eq!(page.directory_page_id(0), 11);
        assert_eq!(page.directory_page_id(1), 12);
    }
}
