use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Page ids are handed out by the buffer pool from a monotonic counter.
pub type PageId = i64;

/// Marks a frame that currently holds no page.
pub const INVALID_PAGE_ID: PageId = -1;

/// Size of a data page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// A frame slot in the buffer pool: the page image plus the metadata the
/// pool needs to manage it.
///
/// Metadata is only written while the pool latch is held; the fields are
/// atomics so guard holders can read them without taking that latch. The
/// image has its own reader/writer latch, held by page guards for their
/// lifetime and taken briefly by the pool when it moves the image to or
/// from disk.
pub struct Page {
    id: AtomicI64,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
    data: Arc<RwLock<Vec<u8>>>,
}

impl Page {
    pub(crate) fn new() -> Self {
        Page {
            id: AtomicI64::new(INVALID_PAGE_ID),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            data: Arc::new(RwLock::new(vec![0; PAGE_SIZE])),
        }
    }

    /// The page currently held by this frame, or INVALID_PAGE_ID.
    pub fn id(&self) -> PageId {
        self.id.load(Ordering::Relaxed)
    }

    /// Number of outstanding references preventing eviction.
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    /// Whether the in-memory image has diverged from disk.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    /// Acquire the shared content latch.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.data.read()
    }

    /// Acquire the exclusive content latch. Writing through it does not mark
    /// the page dirty; callers report modifications when they unpin.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write()
    }

    pub(crate) fn latch(&self) -> &Arc<RwLock<Vec<u8>>> {
        &self.data
    }

    pub(crate) fn set_id(&self, id: PageId) {
        self.id.store(id, Ordering::Relaxed);
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Relaxed);
    }

    pub(crate) fn set_pin_count(&self, count: u32) {
        self.pin_count.store(count, Ordering::Relaxed);
    }

    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn unpin(&self) -> u32 {
        self.pin_count.fetch_sub(1, Ordering::Relaxed) - 1
    }

    /// Reset the slot for reuse: no page, unpinned, clean, zeroed image.
    pub(crate) fn clear(&self) {
        self.id.store(INVALID_PAGE_ID, Ordering::Relaxed);
        self.pin_count.store(0, Ordering::Relaxed);
        self.is_dirty.store(false, Ordering::Relaxed);
        self.data.write().fill(0);
    }
}
