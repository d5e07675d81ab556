use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use log::debug;
use parking_lot::{
    ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::storage::buffer::bufferpool::BufferPoolManager;
use crate::storage::buffer::AccessType;
use crate::storage::page::{Page, PageId};

/// Scoped handle on a pinned page. Holding the guard keeps the page
/// resident; dropping it unpins the page with the dirty status observed
/// through the guard. Guards are movable but not copyable, and release
/// exactly once.
pub struct BasicPageGuard {
    bpm: Arc<BufferPoolManager>,
    page: Arc<Page>,
    page_id: PageId,
    is_dirty: bool,
}

impl BasicPageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page: Arc<Page>) -> Self {
        let page_id = page.id();
        BasicPageGuard { bpm, page, page_id, is_dirty: false }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Scoped shared access to the page image.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.page.read()
    }

    /// Scoped exclusive access to the page image; marks the guard dirty.
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.is_dirty = true;
        self.page.write()
    }

    /// Trade this guard for one holding the shared page latch.
    pub fn upgrade_read(self) -> ReadPageGuard {
        let data = self.page.latch().read_arc();
        ReadPageGuard { data, guard: self }
    }

    /// Trade this guard for one holding the exclusive page latch.
    pub fn upgrade_write(self) -> WritePageGuard {
        let data = self.page.latch().write_arc();
        WritePageGuard { data, guard: self }
    }
}

impl Drop for BasicPageGuard {
    fn drop(&mut self) {
        if !self.bpm.unpin_page(self.page_id, self.is_dirty, AccessType::Unknown) {
            debug!("guard dropped on page {} that is no longer pinned", self.page_id);
        }
    }
}

/// A page guard holding the shared page latch for its lifetime: the image
/// cannot change while the guard is alive. Dereferences to the page bytes.
pub struct ReadPageGuard {
    // Declared before the basic guard so the latch is released before the
    // page is unpinned.
    data: ArcRwLockReadGuard<RawRwLock, Vec<u8>>,
    guard: BasicPageGuard,
}

impl ReadPageGuard {
    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

/// A page guard holding the exclusive page latch for its lifetime.
/// Dereferences to the page bytes; the page is marked dirty on release.
pub struct WritePageGuard {
    data: ArcRwLockWriteGuard<RawRwLock, Vec<u8>>,
    guard: BasicPageGuard,
}

impl WritePageGuard {
    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        // An exclusive guard is assumed to have modified the image.
        self.guard.is_dirty = true;
    }
}
