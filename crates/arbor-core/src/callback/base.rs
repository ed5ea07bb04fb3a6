//! Callback - 呼び出し方を隠蔽したハンドル
//!
//! # 学習ポイント
//! - Object-safe trait (`Invoke<A>`)
//! - Type erasure パターン（DirectCallback / DeferredCallback / CallbackList → Callback）
//!
//! Producers store a `Callback<A>` and never need to know whether the call
//! runs in place or on another reactor.

use std::fmt;
use std::sync::Arc;

use super::direct::DirectCallback;
use crate::error::CallbackError;

/// Something that can be invoked with `A`.
///
/// Multiple arguments are passed as a tuple.
pub trait Invoke<A>: Send + Sync {
    fn invoke(&self, args: A) -> Result<(), CallbackError>;
}

/// Type-erased callback handle.
///
/// `Callback::default()` is a placeholder bound to nothing: calling it
/// returns [`CallbackError::Unbound`]. Every concrete callback converts into
/// this type with `into()`.
pub struct Callback<A> {
    inner: Option<Arc<dyn Invoke<A>>>,
}

impl<A> Callback<A> {
    /// A placeholder bound to nothing.
    pub fn new() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_invoke<I>(invoke: I) -> Self
    where
        I: Invoke<A> + 'static,
    {
        Self {
            inner: Some(Arc::new(invoke)),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.inner.is_some()
    }

    pub fn call(&self, args: A) -> Result<(), CallbackError> {
        match &self.inner {
            Some(invoke) => invoke.invoke(args),
            None => Err(CallbackError::Unbound),
        }
    }
}

impl<A: 'static> Callback<A> {
    /// Shorthand for a [`DirectCallback`] around `callable`.
    pub fn direct<F>(callable: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        DirectCallback::new(callable).into()
    }
}

impl<A> Default for Callback<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("bound", &self.is_bound())
            .finish()
    }
}
