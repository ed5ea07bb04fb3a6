//! Reactor handle.
//!
//! A reactor is a tokio current-thread runtime plus an unbounded MPSC queue
//! of boxed closures. The [`Root`](super::Root) owns the runtime and the
//! receiving end; everything else talks to it through this cheap, clonable
//! handle.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Unit of work queued on a reactor.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the reactor a component executes on.
#[derive(Clone)]
pub struct Reactor {
    name: Arc<str>,
    handle: Handle,
    queue: mpsc::UnboundedSender<Task>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl Reactor {
    pub(crate) fn new(
        name: &str,
        handle: Handle,
        queue: mpsc::UnboundedSender<Task>,
        stop_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            handle,
            queue,
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `task` for execution on the reactor thread.
    ///
    /// Never blocks. If the owning root is already gone the task is
    /// discarded without running.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.queue.send(Box::new(task)).is_err() {
            warn!(reactor = %self.name, "reactor is gone, discarding posted task");
        }
    }

    /// Ask the reactor to stop. Safe from any thread, idempotent.
    pub fn stop(&self) {
        if !self.stop_tx.send_replace(true) {
            debug!(reactor = %self.name, "stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Whether both handles point at the same reactor.
    pub fn same_as(&self, other: &Reactor) -> bool {
        self.queue.same_channel(&other.queue)
    }

    pub(crate) fn restart(&self) {
        self.stop_tx.send_replace(false);
    }

    pub(crate) fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Spawn a future onto the reactor's runtime. It only makes progress
    /// while the owning root is running.
    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("name", &self.name)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
