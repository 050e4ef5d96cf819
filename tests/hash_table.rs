//! # Extendible Hash Table Scenario Tests
//!
//! Single-threaded end-to-end tests of the index: directory growth through
//! bucket splits, redistribution, merging back down, duplicate and missing
//! key handling, depth saturation, and durability across reopen.
//!
//! The fixtures use the identity hasher with tiny bucket and directory
//! limits so every structural transition is forced deterministically with
//! a handful of keys. After every mutation batch the full integrity check
//! runs, asserting the depth, coherence, fanout, and placement invariants.

use std::sync::Arc;

use diskhash::htable::{
    DefaultComparator, ExtendibleHashTable, HashTableDirectoryPage, HashTableHeaderPage,
    IdentityKeyHasher,
};
use diskhash::storage::{BufferPool, INVALID_PAGE_ID};
use tempfile::TempDir;

type TestTable = ExtendibleHashTable<u32, u64, DefaultComparator<u32>, IdentityKeyHasher>;

struct Fixture {
    table: TestTable,
    pool: Arc<BufferPool>,
    _dir: TempDir,
}

fn fixture(bucket_max_size: u32, directory_max_depth: u32, header_max_depth: u32) -> Fixture {
    let dir = TempDir::new().unwrap();
    let pool = BufferPool::create(dir.path().join("test.dhx"), 64).unwrap();
    let table = TestTable::create(
        Arc::clone(&pool),
        "scenario",
        DefaultComparator::new(),
        IdentityKeyHasher,
        header_max_depth,
        directory_max_depth,
        bucket_max_size,
    )
    .unwrap();

    Fixture {
        table,
        pool,
        _dir: dir,
    }
}

impl Fixture {
    fn get(&self, key: u32) -> Option<u64> {
        let mut values = Vec::new();
        if self.table.get_value(&key, &mut values, None).unwrap() {
            assert_eq!(values.len(), 1, "unique-key regime: at most one value");
            Some(values[0])
        } else {
            None
        }
    }

    /// Global depth of the directory wired at header slot 0.
    fn global_depth(&self) -> u32 {
        let header_guard = self
            .pool
            .fetch_page_read(self.table.header_page_id())
            .unwrap();
        let header = HashTableHeaderPage::from_page(header_guard.data()).unwrap();
        let directory_page_id = header.directory_page_id(0);
        assert_ne!(directory_page_id, INVALID_PAGE_ID);
        drop(header_guard);

        let guard = self.pool.fetch_page_read(directory_page_id).unwrap();
        HashTableDirectoryPage::from_page(guard.data())
            .unwrap()
            .global_depth()
    }
}

#[test]
fn empty_table_misses() {
    let f = fixture(2, 2, 0);

    assert_eq!(f.get(0), None);
    assert!(!f.table.remove(&0, None).unwrap());
    f.table.verify_integrity().unwrap();
}

#[test]
fn first_insert_builds_directory_and_bucket() {
    let f = fixture(2, 2, 0);

    assert!(f.table.insert(&0, &10, None).unwrap());
    assert_eq!(f.get(0), Some(10));
    assert_eq!(f.global_depth(), 0);
    f.table.verify_integrity().unwrap();
}

#[test]
fn split_grows_global_depth_and_redistributes() {
    let f = fixture(2, 2, 0);

    // both land in the singleton bucket, filling it
    assert!(f.table.insert(&0, &10, None).unwrap());
    assert!(f.table.insert(&1, &11, None).unwrap());
    assert_eq!(f.global_depth(), 0);

    // overflow: gd 0 -> 1, bit 0 separates {0} from {1}, then 2 joins 0
    assert!(f.table.insert(&2, &12, None).unwrap());
    assert_eq!(f.global_depth(), 1);

    assert_eq!(f.get(0), Some(10));
    assert_eq!(f.get(1), Some(11));
    assert_eq!(f.get(2), Some(12));
    f.table.verify_integrity().unwrap();

    // slot 0 bucket {0, 2} overflows again: gd 1 -> 2, bit 1 separates
    assert!(f.table.insert(&4, &14, None).unwrap());
    assert_eq!(f.global_depth(), 2);

    for (key, value) in [(0, 10), (1, 11), (2, 12), (4, 14)] {
        assert_eq!(f.get(key), Some(value));
    }
    f.table.verify_integrity().unwrap();
}

#[test]
fn insert_get_law_holds_until_removal() {
    let f = fixture(2, 9, 0);

    assert!(f.table.insert(&7, &70, None).unwrap());
    for _ in 0..3 {
        assert_eq!(f.get(7), Some(70));
    }

    assert!(f.table.remove(&7, None).unwrap());
    assert_eq!(f.get(7), None);
}

#[test]
fn duplicate_insert_is_rejected_and_state_unchanged() {
    let f = fixture(2, 2, 0);

    assert!(f.table.insert(&5, &50, None).unwrap());
    assert!(!f.table.insert(&5, &999, None).unwrap());

    assert_eq!(f.get(5), Some(50));
    f.table.verify_integrity().unwrap();
}

#[test]
fn duplicate_insert_into_full_bucket_does_not_split() {
    let f = fixture(2, 2, 0);

    assert!(f.table.insert(&0, &10, None).unwrap());
    assert!(f.table.insert(&1, &11, None).unwrap());
    assert_eq!(f.global_depth(), 0);

    // the bucket is full, but the duplicate must fail without splitting
    assert!(!f.table.insert(&0, &999, None).unwrap());
    assert_eq!(f.global_depth(), 0);
    assert_eq!(f.get(0), Some(10));
}

#[test]
fn remove_is_idempotent() {
    let f = fixture(2, 2, 0);

    f.table.insert(&3, &30, None).unwrap();

    assert!(f.table.remove(&3, None).unwrap());
    assert!(!f.table.remove(&3, None).unwrap());
    f.table.verify_integrity().unwrap();
}

#[test]
fn merge_and_shrink_reverse_a_split() {
    let f = fixture(2, 2, 0);

    // grow to gd=2 as in split_grows_global_depth_and_redistributes
    for (key, value) in [(0, 10), (1, 11), (2, 12), (4, 14)] {
        f.table.insert(&key, &(value as u64), None).unwrap();
    }
    assert_eq!(f.global_depth(), 2);

    // removing everything must collapse the directory back to depth zero
    for key in [0, 1, 2, 4] {
        assert!(f.table.remove(&key, None).unwrap());
        f.table.verify_integrity().unwrap();
    }

    assert_eq!(f.global_depth(), 0);
    for key in [0, 1, 2, 4] {
        assert_eq!(f.get(key), None);
    }
}

#[test]
fn partial_removal_shrinks_as_far_as_depths_allow() {
    let f = fixture(2, 2, 0);

    for key in [0u32, 1, 2, 4] {
        f.table.insert(&key, &(key as u64 * 10), None).unwrap();
    }
    assert_eq!(f.global_depth(), 2);

    // emptying the deep buckets lets their depths merge down
    assert!(f.table.remove(&0, None).unwrap());
    assert!(f.table.remove(&4, None).unwrap());
    f.table.verify_integrity().unwrap();

    assert_eq!(f.get(1), Some(10));
    assert_eq!(f.get(2), Some(20));
    assert!(f.global_depth() <= 2);
}

#[test]
fn pathological_one_sided_split_retries_until_separated() {
    // 0 and 8 agree on the low three bits; inserting 16 into the full
    // bucket forces four consecutive splits before bit 3 separates them
    let f = fixture(2, 9, 0);

    assert!(f.table.insert(&0, &1, None).unwrap());
    assert!(f.table.insert(&8, &2, None).unwrap());
    assert!(f.table.insert(&16, &3, None).unwrap());

    assert_eq!(f.global_depth(), 4);
    assert_eq!(f.get(0), Some(1));
    assert_eq!(f.get(8), Some(2));
    assert_eq!(f.get(16), Some(3));
    f.table.verify_integrity().unwrap();
}

#[test]
fn saturated_bucket_fails_insert_without_corruption() {
    // 0, 4, 8 agree on the low two bits: with directory_max_depth=2 no
    // split can separate them, so the third insert must fail cleanly
    let f = fixture(2, 2, 0);

    assert!(f.table.insert(&0, &10, None).unwrap());
    assert!(f.table.insert(&4, &40, None).unwrap());
    assert!(!f.table.insert(&8, &80, None).unwrap());

    assert_eq!(f.get(0), Some(10));
    assert_eq!(f.get(4), Some(40));
    assert_eq!(f.get(8), None);
    f.table.verify_integrity().unwrap();
}

#[test]
fn never_split_directory_fails_overflowing_insert() {
    // directory_max_depth == 0 means a full bucket can never split
    let f = fixture(2, 0, 0);

    assert!(f.table.insert(&1, &1, None).unwrap());
    assert!(f.table.insert(&2, &2, None).unwrap());
    assert!(!f.table.insert(&3, &3, None).unwrap());

    assert_eq!(f.global_depth(), 0);
    f.table.verify_integrity().unwrap();
}

#[test]
fn header_fanout_routes_by_high_bits() {
    // header_max_depth=1: the top hash bit picks the directory
    let f = fixture(2, 9, 1);

    assert!(f.table.insert(&0x0000_0001, &1, None).unwrap());
    assert!(f.table.insert(&0x8000_0001, &2, None).unwrap());

    assert_eq!(f.get(0x0000_0001), Some(1));
    assert_eq!(f.get(0x8000_0001), Some(2));

    // two distinct directories must be wired
    let header_guard = f
        .pool
        .fetch_page_read(f.table.header_page_id())
        .unwrap();
    let header = HashTableHeaderPage::from_page(header_guard.data()).unwrap();
    assert_ne!(header.directory_page_id(0), INVALID_PAGE_ID);
    assert_ne!(header.directory_page_id(1), INVALID_PAGE_ID);
    assert_ne!(header.directory_page_id(0), header.directory_page_id(1));
    drop(header_guard);

    f.table.verify_integrity().unwrap();
}

#[test]
fn grow_then_drain_large_batch() {
    let f = fixture(4, 9, 0);

    for key in 0u32..256 {
        assert!(f.table.insert(&key, &(key as u64 + 1000), None).unwrap());
    }
    f.table.verify_integrity().unwrap();

    for key in 0u32..256 {
        assert_eq!(f.get(key), Some(key as u64 + 1000));
    }

    for key in 0u32..256 {
        assert!(f.table.remove(&key, None).unwrap());
    }
    f.table.verify_integrity().unwrap();

    assert_eq!(f.global_depth(), 0);
    for key in 0u32..256 {
        assert_eq!(f.get(key), None);
    }
}

#[test]
fn index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("persist.dhx");

    {
        let pool = BufferPool::create(&path, 64).unwrap();
        let table = TestTable::create(
            Arc::clone(&pool),
            "persist",
            DefaultComparator::new(),
            IdentityKeyHasher,
            0,
            9,
            2,
        )
        .unwrap();

        for key in 0u32..32 {
            assert!(table.insert(&key, &(key as u64 * 3), None).unwrap());
        }
        pool.flush_all().unwrap();
    }

    let pool = BufferPool::open(&path, 64).unwrap();
    let table = TestTable::open(
        Arc::clone(&pool),
        "persist",
        DefaultComparator::new(),
        IdentityKeyHasher,
    )
    .unwrap();

    for key in 0u32..32 {
        let mut values = Vec::new();
        assert!(table.get_value(&key, &mut values, None).unwrap());
        assert_eq!(values, vec![key as u64 * 3]);
    }
    table.verify_integrity().unwrap();

    // the reopened index keeps growing with the persisted geometry
    assert!(table.insert(&1000, &42, None).unwrap());
    let mut values = Vec::new();
    assert!(table.get_value(&1000, &mut values, None).unwrap());
    assert_eq!(values, vec![42]);
}
