use std::collections::{HashMap, VecDeque};
use std::sync::mpsc;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::buffer::guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};
use crate::storage::buffer::replacer::SyncLRUKReplacer;
use crate::storage::buffer::{AccessType, FrameId, Replacer};
use crate::storage::disk::scheduler::{DiskRequest, DiskScheduler};
use crate::storage::disk::{new_disk_manager, DiskManager};
use crate::storage::page::{Page, PageId, INVALID_PAGE_ID};

/// The buffer pool is responsible for moving physical pages back and forth
/// between main memory and disk. It allows a DBMS to support databases that
/// are larger than the amount of memory available to the system.
///
/// The buffer pool's operations are transparent to the rest of the system:
/// callers ask for a page by its unique identifier and do not know whether
/// it is already in memory or has to be fetched from disk.
struct BufferPool {
    pool_size: usize,
    /// Frame slots; the index into this array is the FrameId.
    pages: Vec<Arc<Page>>,
    /// Maps resident page ids to the frame holding them.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page; reused from the front, returned at the back.
    free_list: VecDeque<FrameId>,
    /// Replacer to find unpinned pages for replacement.
    replacer: Arc<dyn Replacer>,
    /// All page reads and writes go through the scheduler. The pool blocks
    /// on each completion while still holding its latch: this serializes
    /// I/O across the pool but keeps the page table consistent during
    /// victim replacement.
    scheduler: DiskScheduler,
    /// The next page id to be allocated.
    next_page_id: PageId,
}

impl BufferPool {
    fn new(disk: Box<dyn DiskManager>, pool_size: usize, replacer_k: usize) -> Result<Self> {
        let scheduler = DiskScheduler::new(disk)?;
        let mut pages = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            pages.push(Arc::new(Page::new()));
            // Initially, every frame is in the free list.
            free_list.push_back(i);
        }
        let replacer: Arc<dyn Replacer> = Arc::new(SyncLRUKReplacer::new(pool_size, replacer_k));
        Ok(BufferPool {
            pool_size,
            pages,
            page_table: HashMap::new(),
            free_list,
            replacer,
            scheduler,
            next_page_id: 0,
        })
    }

    /// Pick a replacement frame: the free list first, then the replacer.
    fn available_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }
        if let Some(frame_id) = self.replacer.evict() {
            debug!("evicting page {} from frame {}", self.pages[frame_id].id(), frame_id);
            return Ok(frame_id);
        }
        Err(Error::BufferPoolNoAvailableFrame)
    }

    /// Write the frame's current image out and wait for the completion. A
    /// failed write is fatal: the in-memory state would silently diverge
    /// from disk.
    fn write_back(&self, page: &Arc<Page>) {
        let page_id = page.id();
        let data = page.read().clone();
        let (tx, rx) = mpsc::channel();
        let scheduled = self.scheduler.schedule(DiskRequest::Write { page_id, data, done: tx });
        if scheduled.is_err() || !matches!(rx.recv(), Ok(Ok(()))) {
            panic!("page {} has not been written to disk", page_id);
        }
    }

    /// Read the page image from disk into the frame, waiting for the
    /// completion. A failed read is fatal for the same reason as a failed
    /// write-back.
    fn read_from_disk(&self, page: &Arc<Page>, page_id: PageId) {
        let (tx, rx) = mpsc::channel();
        let scheduled = self.scheduler.schedule(DiskRequest::Read { page_id, done: tx });
        if scheduled.is_err() {
            panic!("page {} has not been fetched from disk", page_id);
        }
        match rx.recv() {
            Ok(Ok(data)) => *page.write() = data,
            _ => panic!("page {} has not been fetched from disk", page_id),
        }
    }

    /// Create a new page in the buffer pool, returning the pinned frame and
    /// the freshly allocated page id, or an error if all frames are in use
    /// and none is evictable.
    fn new_page(&mut self) -> Result<(Arc<Page>, PageId)> {
        let frame_id = self.available_frame()?;
        let page = Arc::clone(&self.pages[frame_id]);
        if page.is_dirty() {
            self.write_back(&page);
        }
        let prev_page_id = page.id();

        let page_id = self.allocate_page();
        // Reset the frame for its new identity: zeroed image, clean, and
        // pinned by the caller.
        page.clear();
        page.set_id(page_id);
        page.set_pin_count(1);

        if prev_page_id != INVALID_PAGE_ID {
            self.page_table.remove(&prev_page_id);
        }
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, AccessType::Unknown);
        self.replacer.set_evictable(frame_id, false);

        Ok((page, page_id))
    }

    /// Fetch the requested page, reading it from disk if it is not
    /// resident. Fails with BufferPoolNoAvailableFrame when the page would
    /// have to be read but every frame is pinned.
    fn fetch_page(&mut self, page_id: PageId, access_type: AccessType) -> Result<Arc<Page>> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            // A hit pins the page like a miss does, so the frame cannot be
            // evicted out from under the returned reference.
            let page = Arc::clone(&self.pages[frame_id]);
            page.pin();
            self.replacer.record_access(frame_id, access_type);
            self.replacer.set_evictable(frame_id, false);
            return Ok(page);
        }

        let frame_id = self.available_frame()?;
        let page = Arc::clone(&self.pages[frame_id]);
        if page.is_dirty() {
            self.write_back(&page);
        }
        let prev_page_id = page.id();

        self.read_from_disk(&page, page_id);
        page.set_id(page_id);
        page.set_dirty(false);
        page.set_pin_count(1);

        if prev_page_id != INVALID_PAGE_ID {
            self.page_table.remove(&prev_page_id);
        }
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, access_type);
        self.replacer.set_evictable(frame_id, false);

        Ok(page)
    }

    /// Unpin the target page. Returns false if the page is not resident or
    /// its pin count is already zero.
    ///
    /// The dirty flag is sticky: once a caller reports the page modified it
    /// stays dirty until the image is flushed. When the pin count reaches
    /// zero the frame becomes evictable.
    fn unpin_page(&mut self, page_id: PageId, is_dirty: bool, _access_type: AccessType) -> bool {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };
        let page = &self.pages[frame_id];
        if is_dirty {
            page.set_dirty(true);
        }
        if page.pin_count() == 0 {
            return false;
        }
        if page.unpin() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Flush the target page to disk regardless of the dirty flag, then
    /// clear the flag. Returns false if the page is not resident.
    fn flush_page(&mut self, page_id: PageId) -> bool {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };
        let page = Arc::clone(&self.pages[frame_id]);
        self.write_back(&page);
        page.set_dirty(false);
        true
    }

    /// Flush every resident page. Walks the page table, so empty frames are
    /// skipped.
    fn flush_all_pages(&mut self) {
        for &frame_id in self.page_table.values() {
            let page = &self.pages[frame_id];
            self.write_back(page);
            page.set_dirty(false);
        }
    }

    /// Delete a page from the buffer pool. A page that is not resident is
    /// vacuously deleted; a pinned page cannot be deleted and returns
    /// false. On success the frame goes back to the free list.
    fn delete_page(&mut self, page_id: PageId) -> bool {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return true,
        };
        let page = &self.pages[frame_id];
        if page.pin_count() > 0 {
            return false;
        }

        self.replacer.remove(frame_id);
        page.clear();
        self.page_table.remove(&page_id);
        self.free_list.push_back(frame_id);
        self.deallocate_page(page_id);
        true
    }

    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    /// Reclamation hook for deleted page ids. The monotonic allocator does
    /// not reuse ids yet.
    fn deallocate_page(&mut self, _page_id: PageId) {}
}

/// Wraps the buffer pool in a single mutex for concurrent access, the
/// coarse latch serializing every metadata operation. Disk I/O completes
/// while the latch is held (see the scheduler field on BufferPool); all the
/// heavy lifting happens in the inner BufferPool.
pub struct BufferPoolManager {
    inner: Mutex<BufferPool>,
}

impl BufferPoolManager {
    pub fn new(disk: Box<dyn DiskManager>, pool_size: usize, replacer_k: usize) -> Result<Self> {
        let inner = BufferPool::new(disk, pool_size, replacer_k)?;
        Ok(BufferPoolManager { inner: Mutex::new(inner) })
    }

    /// Build a pool over the disk manager named by the configuration.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let disk = new_disk_manager(cfg.disk, &cfg.path)?;
        Self::new(disk, cfg.pool_size, cfg.replacer_k)
    }

    /// Number of frames managed by the pool.
    pub fn pool_size(&self) -> usize {
        self.inner.lock().pool_size
    }

    /// Create a new page, pinned for the caller.
    pub fn new_page(&self) -> Result<(Arc<Page>, PageId)> {
        self.inner.lock().new_page()
    }

    /// Fetch the requested page, pinned for the caller.
    pub fn fetch_page(&self, page_id: PageId, access_type: AccessType) -> Result<Arc<Page>> {
        self.inner.lock().fetch_page(page_id, access_type)
    }

    /// Unpin the target page, reporting whether the caller modified it.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool, access_type: AccessType) -> bool {
        self.inner.lock().unpin_page(page_id, is_dirty, access_type)
    }

    /// Flush the target page to disk regardless of the dirty flag.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        self.inner.lock().flush_page(page_id)
    }

    /// Flush every resident page to disk.
    pub fn flush_all_pages(&self) {
        self.inner.lock().flush_all_pages()
    }

    /// Delete a page from the buffer pool, freeing its frame.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        self.inner.lock().delete_page(page_id)
    }

    /// Fetch a page behind a guard that unpins it on drop.
    pub fn fetch_page_basic(self: &Arc<Self>, page_id: PageId) -> Result<BasicPageGuard> {
        let page = self.fetch_page(page_id, AccessType::Unknown)?;
        Ok(BasicPageGuard::new(Arc::clone(self), page))
    }

    /// Fetch a page behind a guard holding the shared page latch.
    pub fn fetch_page_read(self: &Arc<Self>, page_id: PageId) -> Result<ReadPageGuard> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_read())
    }

    /// Fetch a page behind a guard holding the exclusive page latch.
    pub fn fetch_page_write(self: &Arc<Self>, page_id: PageId) -> Result<WritePageGuard> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_write())
    }

    /// Create a new page behind a guard; the page id is available through
    /// the guard.
    pub fn new_page_guarded(self: &Arc<Self>) -> Result<BasicPageGuard> {
        let (page, _page_id) = self.new_page()?;
        Ok(BasicPageGuard::new(Arc::clone(self), page))
    }
}
