use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::page::{PageId, PAGE_SIZE};

pub mod file;
pub mod memory;
pub mod scheduler;

/// A disk manager moves fixed-size pages between memory and a storage
/// medium. Pages are opaque byte blocks addressed by page id; what the
/// bytes mean is the business of the layers above. Reading a page that was
/// never written yields a zeroed image. Writes are only guaranteed durable
/// after calling flush().
pub trait DiskManager: Send {
    /// Read the page image into `buf`, which must be PAGE_SIZE bytes.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Write the page image, overwriting any previous version.
    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()>;

    /// Flushes any buffered data to the underlying storage medium.
    fn flush(&mut self) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Memory,
    File,
}

pub fn new_disk_manager(typ: DiskType, path: &str) -> Result<Box<dyn DiskManager>> {
    match typ {
        DiskType::Memory => Ok(Box::new(memory::Memory::new())),
        DiskType::File => Ok(Box::new(file::FileDisk::open(path)?)),
    }
}

/// Byte offset of a page within a linear page file.
fn page_offset(page_id: PageId) -> Result<u64> {
    if page_id < 0 {
        return Err(Error::value(format!("invalid page id {}", page_id)));
    }
    Ok(u64::try_from(page_id)? * PAGE_SIZE as u64)
}
