//! # Page Guards
//!
//! Scoped pin+latch handles over buffer pool frames. A guard is the only
//! way index code touches page bytes: acquiring one pins the frame (so it
//! cannot be evicted) and latches its buffer (shared for reads, exclusive
//! for writes). Dropping the guard releases both, on every exit path.
//!
//! ## Drop Order
//!
//! The latch is released **before** the pin. The pool depends on this: a
//! frame with a zero pin count is guaranteed to have a free latch, which is
//! what makes eviction and page loading safe without extra handshakes.
//!
//! `ManuallyDrop` keeps the latch field always-valid (no `Option` to
//! unwrap on the hot path) while still letting `Drop` sequence the release
//! by hand.
//!
//! ## Ownership
//!
//! Guards own an `Arc` of the pool and an owned (`arc_lock`) latch guard,
//! so they have no lifetime tie to the pool borrow that created them. The
//! index driver stores them in locals, drops them early to release a level
//! during lock-coupling, and returns them from helper functions freely.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use super::pool::{BufferPool, PageBuf};
use super::PageId;

type ArcReadLatch = parking_lot::lock_api::ArcRwLockReadGuard<parking_lot::RawRwLock, PageBuf>;
type ArcWriteLatch = parking_lot::lock_api::ArcRwLockWriteGuard<parking_lot::RawRwLock, PageBuf>;

/// Shared (read) access to one pinned page.
pub struct ReadPageGuard {
    pool: Arc<BufferPool>,
    page_id: PageId,
    frame_id: usize,
    latch: ManuallyDrop<ArcReadLatch>,
}

impl ReadPageGuard {
    pub(crate) fn new(
        pool: Arc<BufferPool>,
        page_id: PageId,
        frame_id: usize,
        latch: ArcReadLatch,
    ) -> Self {
        Self {
            pool,
            page_id,
            frame_id,
            latch: ManuallyDrop::new(latch),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.latch.0
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // SAFETY: latch is dropped exactly once, here; the field is never
        // touched again after Drop runs.
        unsafe { ManuallyDrop::drop(&mut self.latch) };
        self.pool.unpin_frame(self.frame_id);
    }
}

/// Exclusive (write) access to one pinned page.
pub struct WritePageGuard {
    pool: Arc<BufferPool>,
    page_id: PageId,
    frame_id: usize,
    latch: ManuallyDrop<ArcWriteLatch>,
}

impl WritePageGuard {
    pub(crate) fn new(
        pool: Arc<BufferPool>,
        page_id: PageId,
        frame_id: usize,
        latch: ArcWriteLatch,
    ) -> Self {
        Self {
            pool,
            page_id,
            frame_id,
            latch: ManuallyDrop::new(latch),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.latch.0
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pool.mark_frame_dirty(self.frame_id);
        &mut self.latch.0
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        // SAFETY: latch is dropped exactly once, here; the field is never
        // touched again after Drop runs.
        unsafe { ManuallyDrop::drop(&mut self.latch) };
        self.pool.unpin_frame(self.frame_id);
    }
}
