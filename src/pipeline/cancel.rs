//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Shared state behind a token and all of its clones.
#[derive(Default)]
struct TokenState {
    /// Polled once per input byte.
    cancelled: AtomicBool,
    /// Pairs with `signal` for blocking waits.
    lock: Mutex<()>,
    signal: Condvar,
    /// Tokens created with `child()`, cancelled along with this one.
    children: Mutex<Vec<Weak<TokenState>>>,
}

impl TokenState {
    fn cancel(&self) -> bool {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // Taking the lock orders this notify after any waiter's flag check.
        drop(lock(&self.lock));
        self.signal.notify_all();

        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }

        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A cloneable cancellation signal shared by a producer and its observers.
///
/// Cancelling is sticky and idempotent. Child tokens follow their parent
/// but can be cancelled on their own without affecting it.
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

impl CancelToken {
    /// Creates an uncancelled root token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Requests cancellation and wakes every waiter.
    ///
    /// Returns true if this call triggered the cancellation.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    /// Blocks until the token is cancelled.
    pub fn wait(&self) {
        let mut guard = lock(&self.state.lock);
        while !self.is_cancelled() {
            guard = self
                .state
                .signal
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the token is cancelled or `timeout` elapses.
    ///
    /// Returns true if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = lock(&self.state.lock);

        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .state
                .signal
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        true
    }

    /// Creates a token that is cancelled whenever this one is.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();

        let mut children = lock(&self.state.children);
        if self.is_cancelled() {
            drop(children);
            child.cancel();
        } else {
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.state));
        }

        child
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
