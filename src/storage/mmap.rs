//! # Memory-Mapped Page File
//!
//! `MmapStorage` is the bottom of the storage stack: one index file mapped
//! into the address space, addressed in whole 16KB pages. It knows nothing
//! about page contents or caching; the buffer pool copies pages between
//! the mapping and its frames and decides when to sync.
//!
//! ## File Shape
//!
//! The file is page-granular from byte zero: page 0 holds the file header,
//! pages 1+ hold hash pages and freelist trunks. The length is always a
//! whole number of pages; `open` rejects anything else, since a torn tail
//! would silently shift every later page.
//!
//! ## Why the mutators take `&mut self`
//!
//! A grow replaces the mapping, and any slice into the old mapping would
//! dangle. Rather than track outstanding readers at runtime, `grow`
//! demands exclusive access: the borrow checker refuses to compile a
//! caller that still holds a `page()` slice. The buffer pool upholds this
//! trivially because it keeps the storage behind a mutex and never lets a
//! mapping slice escape a critical section — frames hold copies, not
//! views.
//!
//! ## Durability
//!
//! Writes land in the shared mapping and reach the file when the kernel
//! writes the pages back, or eagerly on `sync`. The pool calls `sync` from
//! `flush_all`; nothing here schedules I/O on its own.

use std::fs::{File, OpenOptions};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;

use super::PAGE_SIZE;

#[derive(Debug)]
pub struct MmapStorage {
    file: File,
    mmap: MmapMut,
    page_count: u32,
}

impl MmapStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("cannot open index file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat index file '{}'", path.display()))?
            .len();

        ensure!(
            file_size > 0,
            "index file '{}' is empty; create() makes a fresh index",
            path.display()
        );

        ensure!(
            file_size % PAGE_SIZE as u64 == 0,
            "index file '{}' is {} bytes, not a whole number of {}-byte pages",
            path.display(),
            file_size,
            PAGE_SIZE
        );

        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        // SAFETY: a shared mapping is only sound while no other party
        // mutates the file underneath it. The handle above is this
        // process's private read+write handle and index files are not
        // shared between processes; the mapping is owned by the returned
        // struct so it cannot outlive the file, and every access goes
        // through the page bounds checks below.
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("cannot map index file '{}'", path.display()))?
        };

        Ok(Self {
            file,
            mmap,
            page_count,
        })
    }

    pub fn create<P: AsRef<Path>>(path: P, initial_page_count: u32) -> Result<Self> {
        let path = path.as_ref();

        ensure!(
            initial_page_count > 0,
            "an index file needs at least the header page"
        );

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("cannot create index file '{}'", path.display()))?;

        let file_size = initial_page_count as u64 * PAGE_SIZE as u64;

        file.set_len(file_size)
            .wrap_err_with(|| format!("failed to size fresh index file to {} bytes", file_size))?;

        // SAFETY: the file was truncated and sized just above, so the
        // mapping covers exactly the pages this handle will address, and
        // nothing else has the file open. Lifetime and bounds discipline
        // are the same as in open().
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("cannot map index file '{}'", path.display()))?
        };

        Ok(Self {
            file,
            mmap,
            page_count: initial_page_count,
        })
    }

    pub fn page(&self, page_no: u32) -> Result<&[u8]> {
        ensure!(
            page_no < self.page_count,
            "page {} is beyond the end of the file ({} pages)",
            page_no,
            self.page_count
        );

        let offset = page_no as usize * PAGE_SIZE;
        Ok(&self.mmap[offset..offset + PAGE_SIZE])
    }

    pub fn page_mut(&mut self, page_no: u32) -> Result<&mut [u8]> {
        ensure!(
            page_no < self.page_count,
            "page {} is beyond the end of the file ({} pages)",
            page_no,
            self.page_count
        );

        let offset = page_no as usize * PAGE_SIZE;
        Ok(&mut self.mmap[offset..offset + PAGE_SIZE])
    }

    /// Extends the file to `new_page_count` pages and remaps it. A request
    /// that does not grow the file is a no-op.
    pub fn grow(&mut self, new_page_count: u32) -> Result<()> {
        if new_page_count <= self.page_count {
            return Ok(());
        }

        self.mmap
            .flush_async()
            .wrap_err("failed to kick off write-back before remapping")?;

        let new_size = new_page_count as u64 * PAGE_SIZE as u64;

        self.file
            .set_len(new_size)
            .wrap_err_with(|| format!("failed to extend index file to {} bytes", new_size))?;

        // SAFETY: the old mapping dies in this assignment and &mut self
        // proves no slice into it survives the call. The file already has
        // its new length, so the fresh mapping spans every page the
        // updated page_count admits.
        self.mmap = unsafe {
            MmapMut::map_mut(&self.file).wrap_err("cannot remap index file after growing it")?
        };

        self.page_count = new_page_count;

        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.mmap
            .flush()
            .wrap_err("failed to sync index file to disk")
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}
