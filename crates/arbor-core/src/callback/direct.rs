use std::sync::Arc;

use super::base::{Callback, Invoke};
use crate::error::CallbackError;

type Callable<A> = dyn Fn(A) -> Result<(), CallbackError> + Send + Sync;

/// Runs the callable right away, on the caller's thread.
///
/// No marshaling happens: caller and callee must already agree that this is
/// safe, e.g. because they share a reactor.
pub struct DirectCallback<A> {
    callable: Arc<Callable<A>>,
}

impl<A: 'static> DirectCallback<A> {
    pub fn new<F>(callable: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            callable: Arc::new(move |args| {
                callable(args);
                Ok(())
            }),
        }
    }

    /// Bind `method` to `target`.
    ///
    /// Only a `Weak` handle is kept; once `target` is dropped the callback
    /// returns [`CallbackError::Expired`].
    pub fn bind<T, M>(target: &Arc<T>, method: M) -> Self
    where
        T: Send + Sync + 'static,
        M: Fn(&T, A) + Send + Sync + 'static,
    {
        let target = Arc::downgrade(target);
        Self {
            callable: Arc::new(move |args| {
                let target = target.upgrade().ok_or(CallbackError::Expired)?;
                method(&target, args);
                Ok(())
            }),
        }
    }

    pub fn call(&self, args: A) -> Result<(), CallbackError> {
        (self.callable)(args)
    }
}

impl<A> Clone for DirectCallback<A> {
    fn clone(&self) -> Self {
        Self {
            callable: Arc::clone(&self.callable),
        }
    }
}

impl<A> Invoke<A> for DirectCallback<A> {
    fn invoke(&self, args: A) -> Result<(), CallbackError> {
        (self.callable)(args)
    }
}

impl<A: 'static> From<DirectCallback<A>> for Callback<A> {
    fn from(callback: DirectCallback<A>) -> Self {
        Callback::from_invoke(callback)
    }
}
