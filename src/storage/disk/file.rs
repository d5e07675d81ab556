use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;
use crate::storage::disk::{page_offset, DiskManager};
use crate::storage::page::{PageId, PAGE_SIZE};

/// A file-backed disk manager. Pages live at `page_id * PAGE_SIZE` within a
/// single database file; reads past the end of the file zero-fill, so pages
/// can be written in any order.
pub struct FileDisk {
    file: File,
    path: PathBuf,
}

impl FileDisk {
    pub fn open(path: impl AsRef<Path>) -> Result<FileDisk> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;
        info!("opened database file {:?}", path);
        Ok(FileDisk { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiskManager for FileDisk {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let offset = page_offset(page_id)?;
        let len = self.file.metadata()?.len();
        if offset >= len {
            buf.fill(0);
            return Ok(());
        }
        let available = ((len - offset) as usize).min(PAGE_SIZE);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf[..available])?;
        buf[available..].fill(0);
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        let offset = page_offset(page_id)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
