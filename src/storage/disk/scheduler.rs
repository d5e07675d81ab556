use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{debug, error};

use crate::error::{Error, Result};
use crate::storage::disk::DiskManager;
use crate::storage::page::{PageId, PAGE_SIZE};

/// A request for the scheduler worker. The `done` channel is the one-shot
/// completion: reads hand the page image back through it, writes report
/// whether the image reached the disk manager.
pub enum DiskRequest {
    Read { page_id: PageId, done: Sender<Result<Vec<u8>>> },
    Write { page_id: PageId, data: Vec<u8>, done: Sender<Result<()>> },
}

/// Schedules page reads and writes on a dedicated worker thread that owns
/// the disk manager. Callers enqueue a request and block on its completion
/// channel; requests are served strictly in arrival order. Dropping the
/// scheduler closes the queue and joins the worker.
pub struct DiskScheduler {
    queue: Option<Sender<DiskRequest>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk: Box<dyn DiskManager>) -> Result<DiskScheduler> {
        let (tx, rx) = mpsc::channel();
        let worker =
            thread::Builder::new().name("pagebox-disk".into()).spawn(move || Self::run(disk, rx))?;
        Ok(DiskScheduler { queue: Some(tx), worker: Some(worker) })
    }

    /// Enqueue a request. Fails only if the worker has shut down.
    pub fn schedule(&self, request: DiskRequest) -> Result<()> {
        match &self.queue {
            Some(queue) => {
                queue.send(request)?;
                Ok(())
            }
            None => Err(Error::internal("disk scheduler is shut down")),
        }
    }

    fn run(mut disk: Box<dyn DiskManager>, queue: Receiver<DiskRequest>) {
        // An I/O failure is reported through the completion and must not
        // take the worker down with it; a closed completion channel means
        // the issuer gave up, which is not the worker's problem either.
        while let Ok(request) = queue.recv() {
            match request {
                DiskRequest::Read { page_id, done } => {
                    let mut buf = vec![0; PAGE_SIZE];
                    let result = disk.read_page(page_id, &mut buf).map(|_| buf);
                    if let Err(err) = &result {
                        error!("read of page {} failed: {}", page_id, err);
                    }
                    let _ = done.send(result);
                }
                DiskRequest::Write { page_id, data, done } => {
                    let result = disk.write_page(page_id, &data);
                    if let Err(err) = &result {
                        error!("write of page {} failed: {}", page_id, err);
                    }
                    let _ = done.send(result);
                }
            }
        }
        if let Err(err) = disk.flush() {
            error!("disk flush on shutdown failed: {}", err);
        }
        debug!("disk scheduler worker exiting");
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        drop(self.queue.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
