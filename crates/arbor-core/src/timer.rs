//! Timer - 再始動できるワンショットタイマー
//!
//! # 学習ポイント
//! - キャンセルと満了の競合は世代番号で判定する
//! - コールバックはロックを外してから呼ぶ（コールバック内での再始動のため）
//! - 満了は他のタスクと同じく reactor のキューを通る

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::callback::Callback;
use crate::component::{AsComponent, Component};

/// One delayed notification on the owning component's reactor.
///
/// `start()` arms a wait for the current duration, cancelling any wait
/// already in flight. `on_expired` is called once per wait that actually
/// elapses, on the reactor thread, and never for a cancelled one. To react on
/// another thread, hand in a deferred callback.
///
/// `Timer` is a cheap handle; clones share the same alarm. The pending wait is
/// cancelled when the last handle is dropped.
#[derive(Clone)]
pub struct Timer {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    on_expired: Callback<Timer>,
    component: Component,
}

struct State {
    duration: Duration,
    generation: u64,
    pending: Option<AbortHandle>,
}

impl State {
    /// Invalidate whatever wait is in flight.
    fn disarm(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Timer {
    pub fn new<P, C>(parent: &P, duration: Duration, on_expired: C) -> Self
    where
        P: AsComponent + ?Sized,
        C: Into<Callback<Timer>>,
    {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    duration,
                    generation: 0,
                    pending: None,
                }),
                on_expired: on_expired.into(),
                component: Component::new(parent),
            }),
        }
    }

    /// Arm the timer, restarting it if it was already armed.
    pub fn start(&self) {
        let reactor = self.shared.component.context();
        let mut state = self.shared.lock_state();
        state.disarm();

        let generation = state.generation;
        let duration = state.duration;
        // 期限は start() の時点で決める。reactor が忙しくても遅れが積み重ならない
        let deadline = Instant::now() + duration;
        let timer = Arc::downgrade(&self.shared);
        let queue = reactor.clone();
        let wait = reactor.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // 満了はキュー経由で届ける。ハンドラの panic は run() から伝播する
            queue.post(move || {
                if let Some(shared) = timer.upgrade() {
                    Timer { shared }.expire(generation);
                }
            });
        });
        state.pending = Some(wait.abort_handle());

        trace!(component = %self.shared.component.id(), ?duration, "timer armed");
    }

    /// Cancel the pending wait, if any. `on_expired` will not be called for it.
    pub fn stop(&self) {
        let mut state = self.shared.lock_state();
        if state.pending.is_some() {
            trace!(component = %self.shared.component.id(), "timer cancelled");
        }
        state.disarm();
    }

    /// Duration of the next `start()`. A wait already armed keeps its own.
    pub fn set_duration(&self, duration: Duration) {
        self.shared.lock_state().duration = duration;
    }

    pub fn duration(&self) -> Duration {
        self.shared.lock_state().duration
    }

    pub fn is_armed(&self) -> bool {
        self.shared.lock_state().pending.is_some()
    }

    fn expire(&self, generation: u64) {
        {
            let mut state = self.shared.lock_state();
            if state.generation != generation {
                trace!(component = %self.shared.component.id(), "stale expiry suppressed");
                return;
            }
            state.pending = None;
        }

        if let Err(err) = self.shared.on_expired.call(self.clone()) {
            warn!(component = %self.shared.component.id(), %err, "timer expiry callback failed");
        }
    }
}

impl AsComponent for Timer {
    fn as_component(&self) -> &Component {
        &self.shared.component
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .disarm();
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("Timer")
            .field("component", &self.shared.component.id())
            .field("duration", &state.duration)
            .field("armed", &state.pending.is_some())
            .finish()
    }
}
