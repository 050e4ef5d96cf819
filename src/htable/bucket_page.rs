//! # Hash Table Bucket Page
//!
//! A bucket page stores a compact array of fixed-size `(K, V)` entries.
//! There are no tombstones: removal swaps the last entry into the hole, so
//! the array is dense at all times and `size` alone describes occupancy.
//!
//! ## Page Layout
//!
//! ```text
//! Offset  Size    Field
//! ------  ------  ---------------------------------------------
//! 0       16      PageHeader (type = HashBucket)
//! 16      4       size        (occupied entries)
//! 20      4       max_size    (configured capacity)
//! 24      N*E     entries     (E = size_of::<K>() + size_of::<V>())
//! ```
//!
//! Keys and values are written as their raw zerocopy bytes, key first.
//! Insertion order is preserved until a removal; swap-with-last makes the
//! order observable only through iteration.
//!
//! ## Views
//!
//! Like the storage layer's other page kinds, bucket pages are accessed
//! through borrowed views over guard bytes: [`HashTableBucketPage`] for
//! reads and [`HashTableBucketPageMut`] for mutation. Neither owns the
//! bytes; thread safety comes from the page latch held by the guard.

use std::marker::PhantomData;

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::keys::{EntryData, KeyComparator};
use crate::storage::{
    parse_zerocopy, parse_zerocopy_mut, PageHeader, PageId, PageType, PAGE_HEADER_SIZE, PAGE_SIZE,
};

pub const BUCKET_HEADER_SIZE: usize = 8;
pub const BUCKET_CONTENT_START: usize = PAGE_HEADER_SIZE + BUCKET_HEADER_SIZE;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct BucketHeader {
    size: U32,
    max_size: U32,
}

const _: () = assert!(std::mem::size_of::<BucketHeader>() == BUCKET_HEADER_SIZE);

/// Entry footprint for a key/value type pair.
pub const fn entry_size<K, V>() -> usize {
    std::mem::size_of::<K>() + std::mem::size_of::<V>()
}

/// Largest `max_size` a bucket page can physically hold for a key/value
/// type pair.
pub const fn bucket_array_capacity<K, V>() -> u32 {
    ((PAGE_SIZE - BUCKET_CONTENT_START) / entry_size::<K, V>()) as u32
}

/// Read-only view over a bucket page.
pub struct HashTableBucketPage<'a, K, V> {
    data: &'a [u8],
    _marker: PhantomData<(K, V)>,
}

/// Mutable view over a bucket page.
pub struct HashTableBucketPageMut<'a, K, V> {
    data: &'a mut [u8],
    _marker: PhantomData<(K, V)>,
}

fn check_page_type(data: &[u8]) -> Result<()> {
    let header = PageHeader::from_bytes(data)?;
    ensure!(
        header.page_type() == PageType::HashBucket,
        "expected HashBucket page, got {:?}",
        header.page_type()
    );
    Ok(())
}

impl<'a, K: EntryData, V: EntryData> HashTableBucketPage<'a, K, V> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        check_page_type(data)?;
        Ok(Self {
            data,
            _marker: PhantomData,
        })
    }

    fn header(&self) -> &BucketHeader {
        // parse cannot fail: the page length was validated in from_page
        parse_zerocopy(&self.data[PAGE_HEADER_SIZE..], "BucketHeader").unwrap()
    }

    pub fn size(&self) -> u32 {
        self.header().size.get()
    }

    pub fn max_size(&self) -> u32 {
        self.header().max_size.get()
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.max_size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn key_at(&self, index: u32) -> Result<K> {
        ensure!(
            index < self.size(),
            "entry index {} out of bounds (size={})",
            index,
            self.size()
        );
        let offset = BUCKET_CONTENT_START + index as usize * entry_size::<K, V>();
        K::read_from_bytes(&self.data[offset..offset + size_of::<K>()])
            .map_err(|e| eyre::eyre!("failed to read key at index {}: {:?}", index, e))
    }

    pub fn value_at(&self, index: u32) -> Result<V> {
        ensure!(
            index < self.size(),
            "entry index {} out of bounds (size={})",
            index,
            self.size()
        );
        let offset = BUCKET_CONTENT_START + index as usize * entry_size::<K, V>() + size_of::<K>();
        V::read_from_bytes(&self.data[offset..offset + size_of::<V>()])
            .map_err(|e| eyre::eyre!("failed to read value at index {}: {:?}", index, e))
    }

    pub fn entry_at(&self, index: u32) -> Result<(K, V)> {
        Ok((self.key_at(index)?, self.value_at(index)?))
    }

    /// Linear scan; first match wins.
    pub fn lookup<C: KeyComparator<K>>(&self, key: &K, cmp: &C) -> Result<Option<V>> {
        for i in 0..self.size() {
            if cmp.matches(&self.key_at(i)?, key) {
                return Ok(Some(self.value_at(i)?));
            }
        }
        Ok(None)
    }
}

impl<'a, K: EntryData, V: EntryData> HashTableBucketPageMut<'a, K, V> {
    /// Stamps a fresh page as an empty bucket with the given capacity.
    pub fn init(data: &'a mut [u8], page_id: PageId, max_size: u32) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        ensure!(max_size > 0, "bucket max_size must be positive");
        ensure!(
            max_size <= bucket_array_capacity::<K, V>(),
            "bucket max_size {} exceeds page capacity {}",
            max_size,
            bucket_array_capacity::<K, V>()
        );

        PageHeader::new(PageType::HashBucket, page_id).write_to(data)?;

        let header: &mut BucketHeader =
            parse_zerocopy_mut(&mut data[PAGE_HEADER_SIZE..], "BucketHeader")?;
        header.size = U32::new(0);
        header.max_size = U32::new(max_size);

        Ok(Self {
            data,
            _marker: PhantomData,
        })
    }

    pub fn from_page(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        check_page_type(data)?;
        Ok(Self {
            data,
            _marker: PhantomData,
        })
    }

    pub fn as_read(&self) -> HashTableBucketPage<'_, K, V> {
        HashTableBucketPage {
            data: self.data,
            _marker: PhantomData,
        }
    }

    pub fn size(&self) -> u32 {
        self.as_read().size()
    }

    pub fn max_size(&self) -> u32 {
        self.as_read().max_size()
    }

    pub fn is_full(&self) -> bool {
        self.as_read().is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.as_read().is_empty()
    }

    fn set_size(&mut self, size: u32) -> Result<()> {
        let header: &mut BucketHeader =
            parse_zerocopy_mut(&mut self.data[PAGE_HEADER_SIZE..], "BucketHeader")?;
        header.size = U32::new(size);
        Ok(())
    }

    /// Appends the entry. Rejects duplicates of the key and a full bucket.
    pub fn insert<C: KeyComparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> Result<bool> {
        if self.as_read().lookup(key, cmp)?.is_some() {
            return Ok(false);
        }
        let size = self.size();
        if size >= self.max_size() {
            return Ok(false);
        }

        let offset = BUCKET_CONTENT_START + size as usize * entry_size::<K, V>();
        self.data[offset..offset + size_of::<K>()].copy_from_slice(key.as_bytes());
        self.data[offset + size_of::<K>()..offset + entry_size::<K, V>()]
            .copy_from_slice(value.as_bytes());

        self.set_size(size + 1)?;
        Ok(true)
    }

    /// Removes the first entry matching `key` by swapping the last entry
    /// into its slot.
    pub fn remove<C: KeyComparator<K>>(&mut self, key: &K, cmp: &C) -> Result<bool> {
        let size = self.size();
        for i in 0..size {
            if cmp.matches(&self.as_read().key_at(i)?, key) {
                self.remove_at(i)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Removes the entry at `index`, compacting with swap-with-last.
    pub fn remove_at(&mut self, index: u32) -> Result<()> {
        let size = self.size();
        ensure!(
            index < size,
            "entry index {} out of bounds (size={})",
            index,
            size
        );

        let last = size - 1;
        if index != last {
            let entry = entry_size::<K, V>();
            let src = BUCKET_CONTENT_START + last as usize * entry;
            let dst = BUCKET_CONTENT_START + index as usize * entry;
            self.data.copy_within(src..src + entry, dst);
        }

        self.set_size(last)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.set_size(0)
    }
}
