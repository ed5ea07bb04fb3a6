//! Posting calls to a component from any thread.

use std::sync::Arc;

use tracing::trace;

use super::node::AsComponent;

/// Marshals method calls onto the reactor that owns a component.
///
/// Calls are queued FIFO behind everything already posted to the same
/// reactor. The queued task only holds a `Weak` handle to the target: if the
/// target is gone by the time the task runs, the call is skipped.
pub trait Dispatch: AsComponent + Sized {
    /// Queue `method` to run against `self` on its reactor.
    fn post<F>(self: &Arc<Self>, method: F)
    where
        F: FnOnce(&Self) + Send + 'static;

    /// Queue `method(self, args)`. `args` is moved into the task right away,
    /// so later changes on the caller's side are never observed.
    fn post_with<A, M>(self: &Arc<Self>, method: M, args: A)
    where
        A: Send + 'static,
        M: FnOnce(&Self, A) + Send + 'static,
    {
        self.post(move |target| method(target, args));
    }
}

impl<T: AsComponent> Dispatch for T {
    fn post<F>(self: &Arc<Self>, method: F)
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        let id = self.as_component().id();
        let target = Arc::downgrade(self);
        self.as_component().post(move || match target.upgrade() {
            Some(target) => method(&target),
            None => trace!(component = %id, "target dropped before posted call ran"),
        });
    }
}
