//! Counting semaphore bounding in-flight batches.
//!
//! Uses `Mutex + Condvar` from std. Permits are owned so they can move into
//! worker closures; dropping one (also while unwinding) returns it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

struct State {
    available: usize,
}

struct Inner {
    capacity: usize,
    state: Mutex<State>,
    cond: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A counting semaphore with a fixed number of permits.
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<Inner>,
}

/// RAII permit that releases itself on drop.
pub struct Permit {
    inner: Arc<Inner>,
}

impl Semaphore {
    /// Create a semaphore with `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: permits,
                state: Mutex::new(State {
                    available: permits,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Block until a permit is available, then take it.
    pub fn acquire(&self) -> Permit {
        let mut state = self.inner.lock();
        while state.available == 0 {
            state = self
                .inner
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.available -= 1;
        Permit {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Block until every permit has been returned.
    pub fn wait_idle(&self) {
        let mut state = self.inner.lock();
        while state.available < self.inner.capacity {
            state = self
                .inner
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Permits currently held
    pub fn in_use(&self) -> usize {
        self.inner.capacity - self.inner.lock().available
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.available += 1;
        // Wake both blocked producers and drain waiters
        self.inner.cond.notify_all();
    }
}
