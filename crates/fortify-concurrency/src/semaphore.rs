use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct SemState {
    available: usize,
    max_permits: usize,
    shutdown: bool,
    waiting: usize,
    next_ticket: u64,
    next_serving: u64,
}

/// Counting semaphore. `fair` enforces FIFO admission among
/// already-blocked waiters; the default is unfair, so a caller that
/// notices a free permit first gets it regardless of arrival order.
/// `Semaphore::binary` is the `(1, ...)` special case used as a mutual
/// exclusion gate.
pub struct Semaphore {
    name: String,
    fair: bool,
    state: Mutex<SemState>,
    condvar: Condvar,
}

impl Semaphore {
    pub fn new(name: impl Into<String>, max_permits: usize, fair: bool) -> Self {
        Self {
            name: name.into(),
            fair,
            state: Mutex::new(SemState {
                available: max_permits,
                max_permits,
                shutdown: false,
                waiting: 0,
                next_ticket: 0,
                next_serving: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn binary(name: impl Into<String>, fair: bool) -> Self {
        Self::new(name, 1, fair)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-blocking single attempt. When `fair`, this refuses to jump
    /// ahead of callers already parked in [`Self::try_acquire_timeout`].
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }
        if self.fair && state.waiting > 0 {
            return false;
        }
        if state.available > 0 {
            state.available -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks up to `timeout` for a permit, queueing fairly (FIFO ticket
    /// order) when configured. Returns `false` on timeout or shutdown.
    pub fn try_acquire_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting += 1;

        let deadline = Instant::now() + timeout;
        loop {
            if state.shutdown {
                state.waiting -= 1;
                return false;
            }
            let our_turn = !self.fair || ticket == state.next_serving;
            if our_turn && state.available > 0 {
                state.available -= 1;
                state.waiting -= 1;
                if self.fair {
                    state.next_serving += 1;
                }
                self.condvar.notify_all();
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                state.waiting -= 1;
                if self.fair && ticket == state.next_serving {
                    state.next_serving += 1;
                }
                return false;
            }
            self.condvar.wait_for(&mut state, deadline - now);
        }
    }

    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.available < state.max_permits {
            state.available += 1;
        }
        self.condvar.notify_all();
    }

    /// Marks the semaphore shut down; no acquire succeeds afterward.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.condvar.notify_all();
    }

    pub fn count_acquired(&self) -> usize {
        let state = self.state.lock();
        state.max_permits - state.available
    }

    pub fn count_available(&self) -> usize {
        self.state.lock().available
    }
}
