use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info_span};

use super::builder::{ReactorConfig, RootBuilder};
use super::reactor::{Reactor, Task};
use crate::component::{AsComponent, Component, Scope};
use crate::error::ReactorError;

/// The component that owns a reactor.
///
/// `run()` blocks the calling thread and processes posted work until
/// `stop()` is called from anywhere. A root may itself have a parent, but
/// only for teardown bookkeeping: its `context()` is always its own reactor.
pub struct Root {
    component: Component,
    queue: Mutex<mpsc::UnboundedReceiver<Task>>,
    runtime: Option<tokio::runtime::Runtime>,
}

impl Root {
    /// A parentless root with default settings.
    pub fn new() -> Result<Self, ReactorError> {
        RootBuilder::new().build()
    }

    pub fn builder() -> RootBuilder {
        RootBuilder::new()
    }

    pub(crate) fn from_config(
        config: ReactorConfig,
        parent: Option<&Component>,
    ) -> Result<Self, ReactorError> {
        let mut builder = tokio::runtime::Builder::new_current_thread();
        builder.enable_time();
        if let Some(ticks) = config.event_interval {
            builder.event_interval(ticks);
        }
        let runtime = builder.build().map_err(ReactorError::Runtime)?;

        // Root 自身が sender を持ち続けるので、キューが空でも run() は終わらない
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (stop_tx, _) = watch::channel(false);
        let reactor = Reactor::new(&config.name, runtime.handle().clone(), queue_tx, stop_tx);

        let component = Component::with_scope(parent, Scope::Owns(reactor));
        debug!(reactor = %config.name, component = %component.id(), "root created");

        Ok(Self {
            component,
            queue: Mutex::new(queue_rx),
            runtime: Some(runtime),
        })
    }

    /// This root's own reactor.
    pub fn context(&self) -> Reactor {
        self.component.context()
    }

    /// Queue `task` on this root's reactor.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.component.post(task);
    }

    /// Process posted work on the calling thread until [`stop`](Self::stop).
    ///
    /// Returns immediately if the root was stopped before and not
    /// [`restart`](Self::restart)ed since.
    pub fn run(&self) {
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        let reactor = self.context();
        let mut stopped = reactor.subscribe_stop();
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);

        let span = info_span!("reactor", name = %reactor.name());
        let _entered = span.enter();
        debug!("running");

        runtime.block_on(async {
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.wait_for(|stopped| *stopped) => break,
                    task = queue.recv() => match task {
                        Some(task) => task(),
                        None => break,
                    },
                }
            }
        });

        debug!("stopped");
    }

    /// Make `run()` return. Safe from any thread, idempotent.
    ///
    /// Tasks still queued stay queued; they run after a `restart()` and the
    /// next `run()`, or are discarded when the root is dropped.
    pub fn stop(&self) {
        self.context().stop();
    }

    /// Clear a previous `stop()` so the root can run again.
    pub fn restart(&self) {
        self.context().restart();
    }

    pub fn is_stopped(&self) -> bool {
        self.context().is_stopped()
    }
}

impl AsComponent for Root {
    fn as_component(&self) -> &Component {
        &self.component
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        // 子は reactor がまだ生きているうちに破棄する
        self.component.release_children();
        if let Some(runtime) = self.runtime.take() {
            // 非同期コンテキストからの drop でも panic しない
            runtime.shutdown_background();
        }
        debug!(component = %self.component.id(), "root dropped");
    }
}
