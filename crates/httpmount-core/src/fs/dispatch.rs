//! Worker pool that serves reads off the FUSE session thread.
//!
//! The session loop hands each read to `dispatch` and moves on, so the kernel
//! can keep several reads (including out-of-order read-ahead) in flight. A
//! fixed set of workers pulls jobs from a shared queue, runs the blocking
//! ranged GET and sends the reply itself.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::cancel::{CancelToken, InFlightReads};
use crate::error::ReadError;
use crate::remote_file::RemoteFile;

/// Completion callback for one read; called exactly once, from a worker thread.
pub type ReadReply = Box<dyn FnOnce(Result<Vec<u8>, ReadError>) + Send>;

struct ReadJob {
    request_id: u64,
    offset: u64,
    size: u32,
    cancel: CancelToken,
    reply: ReadReply,
}

pub struct ReadDispatcher {
    sender: Option<mpsc::Sender<ReadJob>>,
    workers: Vec<JoinHandle<()>>,
    in_flight: Arc<InFlightReads>,
}

impl ReadDispatcher {
    pub fn new(file: Arc<RemoteFile>, worker_threads: usize) -> Self {
        let (tx, rx) = mpsc::channel::<ReadJob>();
        let rx = Arc::new(Mutex::new(rx));
        let in_flight = Arc::new(InFlightReads::new());
        let workers = (0..worker_threads.max(1))
            .map(|_| {
                let file = Arc::clone(&file);
                let rx = Arc::clone(&rx);
                let in_flight = Arc::clone(&in_flight);
                std::thread::spawn(move || worker_loop(&file, &rx, &in_flight))
            })
            .collect();
        Self {
            sender: Some(tx),
            workers,
            in_flight,
        }
    }

    /// Queue a read. `reply` runs on a worker with the result; if the pool is
    /// already shut down it runs immediately with [`ReadError::Cancelled`].
    pub fn dispatch<F>(&self, request_id: u64, offset: u64, size: u32, reply: F)
    where
        F: FnOnce(Result<Vec<u8>, ReadError>) + Send + 'static,
    {
        let Some(sender) = &self.sender else {
            reply(Err(ReadError::Cancelled));
            return;
        };
        let job = ReadJob {
            request_id,
            offset,
            size,
            cancel: self.in_flight.register(request_id),
            reply: Box::new(reply),
        };
        if let Err(mpsc::SendError(job)) = sender.send(job) {
            self.in_flight.unregister(job.request_id);
            (job.reply)(Err(ReadError::Cancelled));
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Cancel everything in flight and stop the workers. Queued reads are
    /// answered with [`ReadError::Cancelled`].
    pub fn shutdown(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        let cancelled = self.in_flight.cancel_all();
        if cancelled > 0 {
            tracing::debug!(cancelled, "cancelled in-flight reads");
        }
        drop(sender);
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("read worker panicked");
            }
        }
    }
}

impl Drop for ReadDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(file: &RemoteFile, rx: &Mutex<mpsc::Receiver<ReadJob>>, in_flight: &InFlightReads) {
    loop {
        let next = rx.lock().unwrap_or_else(|e| e.into_inner()).recv();
        let Ok(job) = next else {
            break;
        };
        let result = if job.cancel.is_cancelled() {
            Err(ReadError::Cancelled)
        } else {
            file.read_range_cancellable(job.offset, job.size, Some(&job.cancel))
        };
        if let Err(e) = &result {
            tracing::warn!(offset = job.offset, size = job.size, error = %e, "read failed");
        }
        in_flight.unregister(job.request_id);
        (job.reply)(result);
    }
}
