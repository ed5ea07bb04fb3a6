use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, warn};

use super::builder::{ReactorConfig, RootBuilder};
use super::reactor::Reactor;
use super::root::Root;
use crate::component::{AsComponent, Component, Dispatch};
use crate::error::ReactorError;

/// A root whose reactor runs on its own thread, wrapping one component.
///
/// The wrapped component, and everything below it, executes on the branch
/// thread. `run()` spawns the thread and returns at once; dropping the branch
/// stops the reactor and joins the thread before anything else is torn down.
///
/// # 状態遷移
/// Created → `run()` → Running → `stop()` + join → Joined
pub struct Branch<T: AsComponent> {
    // root より先に破棄される
    component: Arc<T>,
    worker: Mutex<Worker>,
    root: Arc<Root>,
    config: ReactorConfig,
}

enum Worker {
    Created,
    Running(JoinHandle<()>),
    Joined,
}

impl<T: AsComponent> Branch<T> {
    /// A parentless branch named `branch`.
    ///
    /// `make` builds the wrapped component; the component it receives is the
    /// branch itself, so use it as the wrapped component's parent.
    pub fn new<F>(make: F) -> Result<Self, ReactorError>
    where
        F: FnOnce(&Component) -> T,
    {
        RootBuilder::new().name("branch").build_branch(make)
    }

    /// A branch registered under `parent` for teardown bookkeeping.
    pub fn with_parent<P, F>(parent: &P, make: F) -> Result<Self, ReactorError>
    where
        P: AsComponent + ?Sized,
        F: FnOnce(&Component) -> T,
    {
        RootBuilder::new()
            .name("branch")
            .build_branch_with_parent(parent, make)
    }

    pub(crate) fn from_config<F>(
        config: ReactorConfig,
        parent: Option<&Component>,
        make: F,
    ) -> Result<Self, ReactorError>
    where
        F: FnOnce(&Component) -> T,
    {
        let root = Arc::new(Root::from_config(config.clone(), parent)?);
        let component = Arc::new(make(root.as_component()));

        Ok(Self {
            component,
            worker: Mutex::new(Worker::Created),
            root,
            config,
        })
    }

    fn lock_worker(&self) -> MutexGuard<'_, Worker> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The wrapped component.
    pub fn component(&self) -> &Arc<T> {
        &self.component
    }

    pub fn context(&self) -> Reactor {
        self.root.context()
    }

    /// Queue `method` against the wrapped component on the branch thread.
    pub fn post<F>(&self, method: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.component.post(method);
    }

    /// Start the branch thread. Calling it again is a no-op.
    pub fn run(&self) -> Result<(), ReactorError> {
        let mut worker = self.lock_worker();
        if !matches!(*worker, Worker::Created) {
            return Ok(());
        }

        let root = Arc::clone(&self.root);
        let mut builder = thread::Builder::new().name(self.config.name.clone());
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }
        let handle = builder
            .spawn(move || root.run())
            .map_err(|source| ReactorError::Spawn {
                name: self.config.name.clone(),
                source,
            })?;

        debug!(branch = %self.config.name, thread = ?handle.thread().id(), "branch started");
        *worker = Worker::Running(handle);
        Ok(())
    }

    /// Ask the branch reactor to stop. The thread is joined on
    /// [`join`](Self::join) or drop.
    pub fn stop(&self) {
        self.root.stop();
    }

    /// Stop the reactor and wait for the branch thread to finish.
    /// Afterwards `run()` does nothing.
    pub fn join(&self) {
        let previous = std::mem::replace(&mut *self.lock_worker(), Worker::Joined);
        let Worker::Running(handle) = previous else {
            return;
        };

        self.root.stop();
        if handle.thread().id() == thread::current().id() {
            // 自スレッドは join できない。run() の終了とともにスレッドも終わる
            warn!(branch = %self.config.name, "branch joined from its own thread, detaching");
            return;
        }
        if handle.join().is_err() {
            warn!(branch = %self.config.name, "branch thread panicked");
        }
        debug!(branch = %self.config.name, "branch joined");
    }

    /// Id of the branch thread while it is running.
    pub fn thread_id(&self) -> Option<ThreadId> {
        match &*self.lock_worker() {
            Worker::Running(handle) => Some(handle.thread().id()),
            Worker::Created | Worker::Joined => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock_worker(), Worker::Running(_))
    }
}

impl<T: AsComponent> AsComponent for Branch<T> {
    fn as_component(&self) -> &Component {
        self.root.as_component()
    }
}

impl<T: AsComponent> Drop for Branch<T> {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Barrier, mpsc};
    use std::time::Duration;

    use super::*;
    use crate::callback::{Callback, DeferredCallback};

    /// Reports the thread it runs on.
    struct Echo {
        on_thread: Callback<ThreadId>,
        component: Component,
    }

    impl Echo {
        fn new(parent: &Component, on_thread: Callback<ThreadId>) -> Self {
            Self {
                on_thread,
                component: Component::new(parent),
            }
        }

        fn report(&self, _: ()) {
            self.on_thread.call(thread::current().id()).unwrap();
        }
    }

    impl AsComponent for Echo {
        fn as_component(&self) -> &Component {
            &self.component
        }
    }

    fn channel_callback() -> (Callback<ThreadId>, mpsc::Receiver<ThreadId>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let callback = Callback::direct(move |id: ThreadId| {
            let _ = tx.lock().unwrap().send(id);
        });
        (callback, rx)
    }

    #[test]
    fn wrapped_component_resolves_to_branch_reactor() {
        let branch = Branch::new(|parent| Component::new(parent)).unwrap();

        assert!(branch.component().context().same_as(&branch.context()));
        assert_eq!(
            branch.component().parent_id(),
            Some(branch.as_component().id())
        );
    }

    #[test]
    fn run_is_idempotent() {
        let branch = Branch::new(|parent| Component::new(parent)).unwrap();
        assert!(branch.thread_id().is_none());

        branch.run().unwrap();
        let first = branch.thread_id();
        branch.run().unwrap();

        assert!(first.is_some());
        assert_eq!(branch.thread_id(), first);
        assert_ne!(first, Some(thread::current().id()));
    }

    #[test]
    fn deferred_callback_runs_on_branch_thread() {
        let (on_thread, rx) = channel_callback();
        let branch = Branch::new(|parent| Echo::new(parent, on_thread)).unwrap();
        let report = DeferredCallback::bind(branch.component(), Echo::report);

        branch.run().unwrap();
        report.call(()).unwrap();

        let seen = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(Some(seen), branch.thread_id());
        assert_ne!(seen, thread::current().id());
    }

    #[test]
    fn pass_through_post_targets_wrapped_component() {
        let (on_thread, rx) = channel_callback();
        let branch = Branch::new(|parent| Echo::new(parent, on_thread)).unwrap();

        branch.post(|echo| echo.report(()));
        branch.run().unwrap();

        let seen = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(Some(seen), branch.thread_id());
    }

    #[test]
    fn drop_joins_and_nothing_runs_afterwards() {
        let count = Arc::new(AtomicUsize::new(0));
        let branch = Branch::new(|parent| Component::new(parent)).unwrap();
        branch.run().unwrap();

        let reactor = branch.context();
        for _ in 0..100 {
            let count = Arc::clone(&count);
            reactor.post(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(branch);

        let after_join = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), after_join);

        let count_clone = Arc::clone(&count);
        reactor.post(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), after_join);
    }

    #[test]
    fn producers_posting_while_running_keep_order_without_overlap() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;

        let branch = Branch::new(|parent| Component::new(parent)).unwrap();
        branch.run().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(PRODUCERS));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let reactor = branch.context();
                let seen = Arc::clone(&seen);
                let in_flight = Arc::clone(&in_flight);
                let overlapped = Arc::clone(&overlapped);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for seq in 0..PER_PRODUCER {
                        let seen = Arc::clone(&seen);
                        let in_flight = Arc::clone(&in_flight);
                        let overlapped = Arc::clone(&overlapped);
                        reactor.post(move || {
                            if in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
                                overlapped.store(true, Ordering::SeqCst);
                            }
                            seen.lock().unwrap().push((producer, seq));
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        // 最後のタスクが走れば、それ以前の投稿はすべて処理済み
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        branch.context().post(move || {
            let _ = tx.lock().unwrap().send(());
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
        assert!(!overlapped.load(Ordering::SeqCst));
        for producer in 0..PRODUCERS {
            let order: Vec<_> = seen
                .iter()
                .filter(|(from, _)| *from == producer)
                .map(|(_, seq)| *seq)
                .collect();
            assert_eq!(order, (0..PER_PRODUCER).collect::<Vec<_>>());
        }
    }

    #[test]
    fn drop_without_run_is_a_no_op() {
        let branch = Branch::new(|parent| Component::new(parent)).unwrap();
        assert!(!branch.is_running());
        drop(branch);
    }

    #[test]
    fn join_is_terminal() {
        let branch = Branch::new(|parent| Component::new(parent)).unwrap();
        branch.run().unwrap();
        assert!(branch.is_running());

        branch.join();
        assert!(!branch.is_running());

        branch.run().unwrap();
        assert!(branch.thread_id().is_none());
    }

    #[test]
    fn adopted_branch_is_torn_down_with_its_parent() {
        let root = Root::new().unwrap();
        let branch = Branch::with_parent(&root, |parent| Component::new(parent)).unwrap();
        branch.run().unwrap();

        let branch = root.as_component().adopt(branch).unwrap();
        assert!(branch.upgrade().is_some_and(|branch| branch.is_running()));

        drop(root);
        assert!(branch.upgrade().is_none());
    }

    #[test]
    fn custom_thread_name_is_applied() {
        let (tx, rx) = mpsc::channel();
        let branch = RootBuilder::new()
            .name("io-worker")
            .build_branch(|parent| Component::new(parent))
            .unwrap();

        let tx = Mutex::new(tx);
        branch.context().post(move || {
            let name = thread::current().name().map(str::to_string);
            let _ = tx.lock().unwrap().send(name);
        });
        branch.run().unwrap();

        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(name.as_deref(), Some("io-worker"));
    }
}
