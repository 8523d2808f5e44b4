//! Background executor for opportunistic version eviction

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Single-threaded FIFO executor for cleanup tasks
///
/// A lone worker consumes tasks in submission order, so cleanups of
/// the same resource never interleave and background I/O stays
/// bounded. Dropping the executor closes the queue, drains what was
/// submitted and joins the worker.
pub struct CleanupExecutor {
    sender: Option<Sender<Task>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CleanupExecutor {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded::<Task>();
        let worker = thread::Builder::new()
            .name("cache-cleanup".into())
            .spawn(move || {
                for task in receiver.iter() {
                    task();
                }
            })
            .expect("failed to spawn cache cleanup worker");

        Self {
            sender: Some(sender),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a task without blocking. Tasks run in submission order.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            // Send fails only once shutdown has closed the channel
            if sender.send(Box::new(task)).is_err() {
                tracing::warn!("cleanup task dropped, executor is shut down");
            }
        }
    }
}

impl Default for CleanupExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CleanupExecutor {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain queued tasks and exit
        self.sender.take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!("cache cleanup worker panicked");
            }
        }
    }
}
