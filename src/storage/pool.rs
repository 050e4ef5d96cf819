//! # Buffer Pool with SIEVE Eviction
//!
//! This module implements the page cache the index runs on: a fixed set of
//! page frames, a page table mapping page ids to frames, pin counts that
//! keep in-use frames resident, and SIEVE second-chance eviction for the
//! rest.
//!
//! ## Why SIEVE Instead of LRU?
//!
//! LRU lets a single sweep over many buckets evict the header and directory
//! pages that every operation needs. SIEVE keeps a "visited" flag per frame
//! instead of strict recency ordering:
//!
//! - On access: set the visited flag
//! - On eviction: scan frames with a hand pointer
//!   - visited=true: clear the flag, move on (second chance)
//!   - visited=false: evict this frame
//!
//! Hot pages (header, directories) keep getting their second chance; cold
//! bucket pages leave quickly.
//!
//! ## Frame Anatomy
//!
//! ```text
//! Frame {
//!     buf: Arc<RwLock<PageBuf>>,   // 16KB buffer behind the page latch
//!     pin_count: AtomicU32,        // eviction barrier
//!     dirty: AtomicBool,           // needs write-back
//!     visited: AtomicBool,         // SIEVE second-chance flag
//! }
//! ```
//!
//! The `RwLock` doubles as the page latch: guards take it shared or
//! exclusive, and the pool takes it internally (uncontended, since only
//! unpinned frames are loaded or evicted) while moving bytes to and from
//! disk.
//!
//! ## Pin/Latch Protocol
//!
//! 1. `fetch_page_*` pins the frame under the pool mutex, then latches it
//!    after releasing the mutex (so latch waits never block the pool).
//! 2. Guards release latch-then-pin on drop; a pin count of zero therefore
//!    implies a free latch.
//! 3. Eviction and deletion only consider frames with a zero pin count,
//!    always under the pool mutex.
//!
//! ## Deadlock Discipline
//!
//! Lock order is `state` mutex → `disk` mutex, and neither is ever held
//! while waiting on a page latch. Callers' latch ordering (header →
//! directory → bucket, top-down) is the index driver's responsibility.
//!
//! ## Checksums
//!
//! Dirty frames are stamped with a CRC-32 over the page payload on
//! write-back; loads verify a nonzero stamp. This catches torn writes and
//! external corruption at the page granularity.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crc::{Crc, CRC_32_ISCSI};
use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use super::guard::{ReadPageGuard, WritePageGuard};
use super::{
    Freelist, HashFileHeader, IndexOptions, MmapStorage, PageHeader, PageId, INVALID_PAGE_ID,
    PAGE_HEADER_SIZE, PAGE_SIZE,
};
use crate::config::MIN_POOL_SIZE;

const CHECKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// One page worth of bytes, kept behind a frame's latch.
pub struct PageBuf(pub(crate) [u8; PAGE_SIZE]);

struct Frame {
    buf: Arc<RwLock<PageBuf>>,
    pin_count: AtomicU32,
    dirty: AtomicBool,
    visited: AtomicBool,
}

impl Frame {
    fn new() -> Self {
        Self {
            buf: Arc::new(RwLock::new(PageBuf([0u8; PAGE_SIZE]))),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            visited: AtomicBool::new(false),
        }
    }

    fn is_pinned(&self) -> bool {
        self.pin_count.load(Ordering::Acquire) > 0
    }

    fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::AcqRel);
    }

    fn unpin(&self) {
        let prev = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "unpin called on unpinned frame");
    }
}

struct PoolState {
    page_table: HashMap<PageId, usize>,
    frame_page: Vec<PageId>,
    free_frames: Vec<usize>,
    hand: usize,
}

impl PoolState {
    /// SIEVE second-chance scan. Returns an unpinned victim frame, or None
    /// when every occupied frame is pinned.
    fn evict(&mut self, frames: &[Frame]) -> Option<usize> {
        let len = frames.len();
        let mut steps = 0;

        // two full sweeps: one may only clear visited flags
        while steps < 2 * len {
            let idx = self.hand;
            self.hand = (self.hand + 1) % len;
            steps += 1;

            if self.frame_page[idx] == INVALID_PAGE_ID {
                continue;
            }

            let frame = &frames[idx];
            if frame.is_pinned() {
                continue;
            }

            if frame.visited.swap(false, Ordering::AcqRel) {
                continue;
            }

            return Some(idx);
        }

        None
    }
}

struct DiskState {
    storage: MmapStorage,
    freelist: Freelist,
}

impl DiskState {
    fn persist_freelist(&mut self) -> Result<()> {
        let head = self.freelist.head_page();
        let count = self.freelist.free_count();
        let page0 = self.storage.page_mut(0)?;
        HashFileHeader::from_bytes_mut(page0)?.set_freelist(head, count);
        Ok(())
    }
}

pub struct BufferPool {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    disk: Mutex<DiskState>,
}

impl BufferPool {
    /// Creates a fresh index file (page 0 = file header) and a pool of
    /// `capacity` frames over it.
    pub fn create<P: AsRef<std::path::Path>>(path: P, capacity: usize) -> Result<Arc<Self>> {
        ensure!(
            capacity >= MIN_POOL_SIZE,
            "pool capacity {} is below the minimum {}",
            capacity,
            MIN_POOL_SIZE
        );

        let mut storage = MmapStorage::create(path, 1)?;
        let page0 = storage.page_mut(0)?;
        page0.fill(0);
        page0[..super::FILE_HEADER_SIZE].copy_from_slice(zerocopy::IntoBytes::as_bytes(
            &HashFileHeader::new(),
        ));

        Ok(Arc::new(Self::with_storage(storage, Freelist::new(), capacity)))
    }

    /// Opens an existing index file, resuming the freelist persisted in the
    /// file header.
    pub fn open<P: AsRef<std::path::Path>>(path: P, capacity: usize) -> Result<Arc<Self>> {
        ensure!(
            capacity >= MIN_POOL_SIZE,
            "pool capacity {} is below the minimum {}",
            capacity,
            MIN_POOL_SIZE
        );

        let storage = MmapStorage::open(path)?;
        let freelist = {
            let header = HashFileHeader::from_bytes(storage.page(0)?)?;
            Freelist::with_head(header.freelist_head(), header.freelist_count())
        };

        Ok(Arc::new(Self::with_storage(storage, freelist, capacity)))
    }

    fn with_storage(storage: MmapStorage, freelist: Freelist, capacity: usize) -> Self {
        let frames: Vec<Frame> = (0..capacity).map(|_| Frame::new()).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(capacity),
                frame_page: vec![INVALID_PAGE_ID; capacity],
                free_frames: (0..capacity).rev().collect(),
                hand: 0,
            }),
            disk: Mutex::new(DiskState { storage, freelist }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    pub fn page_count(&self) -> u32 {
        self.disk.lock().storage.page_count()
    }

    /// Allocates a fresh page (freelist first, else file growth), claims a
    /// zeroed frame for it, and returns the id with an exclusive guard.
    pub fn new_page_guarded(self: &Arc<Self>) -> Result<(PageId, WritePageGuard)> {
        let page_id = {
            let mut disk = self.disk.lock();
            let DiskState { storage, freelist } = &mut *disk;
            let page_id = match freelist.allocate(storage)? {
                Some(id) => id,
                None => {
                    let id = storage.page_count();
                    storage.grow(id + 1)?;
                    id
                }
            };
            disk.persist_freelist()?;
            page_id
        };

        let frame_id = {
            let mut state = self.state.lock();
            let frame_id = match self.claim_frame(&mut state) {
                Ok(frame_id) => frame_id,
                Err(e) => {
                    // hand the just-allocated id back rather than leak it
                    let mut disk = self.disk.lock();
                    let DiskState { storage, freelist } = &mut *disk;
                    freelist.release(storage, page_id)?;
                    disk.persist_freelist()?;
                    return Err(e);
                }
            };

            self.frames[frame_id].buf.write().0.fill(0);
            state.page_table.insert(page_id, frame_id);
            state.frame_page[frame_id] = page_id;
            self.frames[frame_id].pin();
            self.frames[frame_id].visited.store(true, Ordering::Release);
            frame_id
        };

        let latch = self.frames[frame_id].buf.write_arc();
        Ok((
            page_id,
            WritePageGuard::new(Arc::clone(self), page_id, frame_id, latch),
        ))
    }

    pub fn fetch_page_read(self: &Arc<Self>, page_id: PageId) -> Result<ReadPageGuard> {
        let frame_id = self.pin_page(page_id)?;
        let latch = self.frames[frame_id].buf.read_arc();
        Ok(ReadPageGuard::new(Arc::clone(self), page_id, frame_id, latch))
    }

    pub fn fetch_page_write(self: &Arc<Self>, page_id: PageId) -> Result<WritePageGuard> {
        let frame_id = self.pin_page(page_id)?;
        let latch = self.frames[frame_id].buf.write_arc();
        Ok(WritePageGuard::new(Arc::clone(self), page_id, frame_id, latch))
    }

    /// Unmaps the page and returns it to the freelist. Refuses (Ok(false))
    /// while any guard still pins it.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        ensure!(page_id != INVALID_PAGE_ID, "cannot delete the file header page");

        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            if self.frames[frame_id].is_pinned() {
                return Ok(false);
            }
            state.page_table.remove(&page_id);
            state.frame_page[frame_id] = INVALID_PAGE_ID;
            self.frames[frame_id].dirty.store(false, Ordering::Release);
            state.free_frames.push(frame_id);
        }

        let mut disk = self.disk.lock();
        let DiskState { storage, freelist } = &mut *disk;
        freelist.release(storage, page_id)?;
        disk.persist_freelist()?;

        Ok(true)
    }

    /// Writes every dirty frame back (stamping checksums) and syncs the
    /// file. Returns the number of pages written.
    pub fn flush_all(&self) -> Result<usize> {
        let mut flushed = 0;

        for frame_id in 0..self.frames.len() {
            let page_id = {
                let state = self.state.lock();
                let page_id = state.frame_page[frame_id];
                if page_id == INVALID_PAGE_ID {
                    continue;
                }
                self.frames[frame_id].pin();
                page_id
            };

            let frame = &self.frames[frame_id];
            {
                let latch = frame.buf.read();
                if frame.dirty.swap(false, Ordering::AcqRel) {
                    let mut disk = self.disk.lock();
                    write_back(&mut disk.storage, page_id, &latch.0)?;
                    flushed += 1;
                }
            }
            frame.unpin();
        }

        self.disk.lock().storage.sync()?;
        Ok(flushed)
    }

    // ------------------------------------------------------------------
    // file header accessors used by the index handle
    // ------------------------------------------------------------------

    pub fn root_page(&self) -> Result<PageId> {
        let disk = self.disk.lock();
        Ok(HashFileHeader::from_bytes(disk.storage.page(0)?)?.root_page())
    }

    pub fn set_root_page(&self, page_id: PageId) -> Result<()> {
        let mut disk = self.disk.lock();
        HashFileHeader::from_bytes_mut(disk.storage.page_mut(0)?)?.set_root_page(page_id);
        Ok(())
    }

    pub fn index_options(&self) -> Result<IndexOptions> {
        let disk = self.disk.lock();
        Ok(HashFileHeader::from_bytes(disk.storage.page(0)?)?.options())
    }

    pub fn set_index_options(&self, options: IndexOptions) -> Result<()> {
        let mut disk = self.disk.lock();
        HashFileHeader::from_bytes_mut(disk.storage.page_mut(0)?)?.set_options(options);
        Ok(())
    }

    // ------------------------------------------------------------------
    // frame plumbing shared with the guards
    // ------------------------------------------------------------------

    pub(crate) fn unpin_frame(&self, frame_id: usize) {
        self.frames[frame_id].unpin();
    }

    pub(crate) fn mark_frame_dirty(&self, frame_id: usize) {
        self.frames[frame_id].dirty.store(true, Ordering::Release);
    }

    /// Maps `page_id` to a frame (loading it from disk on a miss) and pins
    /// it. The caller latches after this returns, outside the pool mutex.
    fn pin_page(&self, page_id: PageId) -> Result<usize> {
        ensure!(
            page_id != INVALID_PAGE_ID,
            "cannot fetch the invalid page id"
        );

        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id].pin();
            self.frames[frame_id].visited.store(true, Ordering::Release);
            return Ok(frame_id);
        }

        let frame_id = self.claim_frame(&mut state)?;

        let loaded = (|| -> Result<()> {
            let disk = self.disk.lock();
            let src = disk.storage.page(page_id)?;
            let mut latch = self.frames[frame_id].buf.write();
            latch.0.copy_from_slice(src);
            verify_loaded(&latch.0, page_id)
        })();
        if let Err(e) = loaded {
            state.free_frames.push(frame_id);
            return Err(e);
        }

        state.page_table.insert(page_id, frame_id);
        state.frame_page[frame_id] = page_id;
        self.frames[frame_id].pin();
        self.frames[frame_id].visited.store(true, Ordering::Release);

        Ok(frame_id)
    }

    /// Produces an unmapped frame: the free list first, then SIEVE
    /// eviction with write-back of a dirty victim.
    fn claim_frame(&self, state: &mut PoolState) -> Result<usize> {
        if let Some(frame_id) = state.free_frames.pop() {
            self.frames[frame_id].dirty.store(false, Ordering::Release);
            return Ok(frame_id);
        }

        let Some(victim) = state.evict(&self.frames) else {
            bail!(
                "buffer pool exhausted: all {} frames are pinned",
                self.frames.len()
            );
        };

        let victim_page = state.frame_page[victim];
        state.page_table.remove(&victim_page);
        state.frame_page[victim] = INVALID_PAGE_ID;

        if self.frames[victim].dirty.swap(false, Ordering::AcqRel) {
            let latch = self.frames[victim].buf.read();
            let mut disk = self.disk.lock();
            write_back(&mut disk.storage, victim_page, &latch.0)?;
        }

        Ok(victim)
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let _ = self.flush_all();
    }
}

/// Copies a frame to its disk page, stamping the payload checksum into the
/// on-disk header. The in-frame bytes are left untouched.
fn write_back(storage: &mut MmapStorage, page_id: PageId, bytes: &[u8; PAGE_SIZE]) -> Result<()> {
    let dst = storage.page_mut(page_id)?;
    dst.copy_from_slice(bytes);
    let checksum = CHECKSUM.checksum(&dst[PAGE_HEADER_SIZE..]);
    PageHeader::from_bytes_mut(dst)?.set_checksum(checksum);
    Ok(())
}

/// Structural + checksum validation of freshly loaded page bytes.
fn verify_loaded(bytes: &[u8; PAGE_SIZE], page_id: PageId) -> Result<()> {
    super::validate_page(bytes, page_id)?;

    let stored = PageHeader::from_bytes(bytes)?.checksum();
    if stored != 0 {
        let computed = CHECKSUM.checksum(&bytes[PAGE_HEADER_SIZE..]);
        ensure!(
            stored == computed,
            "checksum mismatch on page {}: stored {:08x}, computed {:08x}",
            page_id,
            stored,
            computed
        );
    }

    Ok(())
}
