// SPDX-License-Identifier: GPL-3.0-only
//! Single-threaded job executors
//!
//! An [`Executor`] owns a piece of state on a dedicated, named thread and
//! runs queued closures against it one at a time, in submission order. The
//! session uses one for the hardware backend and one for the presentation
//! surface, so neither ever needs its own locking.
//!
//! # Example
//!
//! ```ignore
//! let executor = Executor::spawn("camera-hardware", backend)?;
//!
//! // Fire and forget
//! executor.post(|backend| {
//!     if let Err(e) = backend.unbind() {
//!         warn!("Unbind failed: {}", e);
//!     }
//! });
//!
//! // Block until the job has run (never from the executor's own thread)
//! let bound = executor.call(|backend| backend.is_bound());
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Serial job runner owning `S` on its own thread
pub struct Executor<S: 'static> {
    /// Queue sender; taken on drop to close the queue
    sender: Option<mpsc::UnboundedSender<Job<S>>>,
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
    /// Name for logging
    name: String,
}

impl<S: Send + 'static> Executor<S> {
    /// Start the executor thread with `state`
    ///
    /// Jobs that panic are logged and dropped; the thread keeps serving the
    /// queue. The thread exits once every sender is gone and the queue is
    /// drained.
    pub fn spawn(name: &str, state: S) -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job<S>>();
        let name_clone = name.to_string();

        info!(name = %name, "Starting executor");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %name_clone, "Executor thread started");
                let mut state = state;

                while let Some(job) = receiver.blocking_recv() {
                    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| job(&mut state))) {
                        error!(
                            name = %name_clone,
                            panic = %panic_message(panic.as_ref()),
                            "Executor job panicked"
                        );
                    }
                }

                info!(name = %name_clone, "Executor thread exiting");
            })?;

        Ok(Self {
            thread_id: thread_handle.thread().id(),
            sender: Some(sender),
            thread_handle: Some(thread_handle),
            name: name.to_string(),
        })
    }

    /// Queue `job`; returns false when the executor has shut down
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        match &self.sender {
            Some(sender) => sender.send(Box::new(job)).is_ok(),
            None => false,
        }
    }

    /// Run `job` and wait for its result
    ///
    /// Returns `None` if the executor is gone, the job panicked, or the
    /// caller is the executor thread itself (waiting would deadlock).
    pub fn call<R, F>(&self, job: F) -> Option<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            warn!(name = %self.name, "Blocking call from the executor's own thread refused");
            return None;
        }

        let (reply, response) = oneshot::channel();
        let queued = self.post(move |state| {
            let _ = reply.send(job(state));
        });
        if !queued {
            return None;
        }
        response.blocking_recv().ok()
    }

    /// True when called from the executor thread
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: 'static> Drop for Executor<S> {
    fn drop(&mut self) {
        // Closing the queue lets the thread finish what is queued and exit
        self.sender.take();

        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            debug!(name = %self.name, "Executor dropped from its own thread; detaching");
            return;
        }
        if handle.join().is_err() {
            warn!(name = %self.name, "Executor thread panicked during shutdown");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
