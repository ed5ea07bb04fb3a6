use std::sync::Arc;

use tracing::trace;

use super::base::{Callback, Invoke};
use crate::component::AsComponent;
use crate::error::CallbackError;
use crate::runtime::Reactor;

/// Posts the call to the target component's reactor.
///
/// Arguments are moved into the queued task at call time, so they must be
/// owned (`Send + 'static`): borrowed data cannot cross into the task. The
/// call runs later on the target's thread, after everything already posted
/// to that reactor.
pub struct DeferredCallback<A> {
    reactor: Reactor,
    callable: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A: Send + 'static> DeferredCallback<A> {
    /// Bind `method` to `target`.
    ///
    /// The queued task holds a `Weak` handle; if `target` is gone when it
    /// runs, the call is skipped.
    pub fn bind<T, M>(target: &Arc<T>, method: M) -> Self
    where
        T: AsComponent,
        M: Fn(&T, A) + Send + Sync + 'static,
    {
        let id = target.as_component().id();
        let reactor = target.as_component().context();
        let target = Arc::downgrade(target);
        Self {
            reactor,
            callable: Arc::new(move |args| match target.upgrade() {
                Some(target) => method(&target, args),
                None => trace!(component = %id, "deferred callback target dropped"),
            }),
        }
    }

    /// Run `callable` on the reactor `target` executes on.
    pub fn new<P, F>(target: &P, callable: F) -> Self
    where
        P: AsComponent + ?Sized,
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            reactor: target.as_component().context(),
            callable: Arc::new(callable),
        }
    }

    pub fn call(&self, args: A) -> Result<(), CallbackError> {
        let callable = Arc::clone(&self.callable);
        self.reactor.post(move || callable(args));
        Ok(())
    }
}

impl<A> Clone for DeferredCallback<A> {
    fn clone(&self) -> Self {
        Self {
            reactor: self.reactor.clone(),
            callable: Arc::clone(&self.callable),
        }
    }
}

impl<A: Send + 'static> Invoke<A> for DeferredCallback<A> {
    fn invoke(&self, args: A) -> Result<(), CallbackError> {
        self.call(args)
    }
}

impl<A: Send + 'static> From<DeferredCallback<A>> for Callback<A> {
    fn from(callback: DeferredCallback<A>) -> Self {
        Callback::from_invoke(callback)
    }
}
