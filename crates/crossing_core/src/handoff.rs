//! # Handoff Queue
//!
//! Blocking single-value-at-a-time transfer between threads.
//!
//! ```text
//!   Producer ──send()──> [ Mutex<Vec<T>> ] ──receive()──> Consumer
//!                              │
//!                        Condvar (non-empty)
//! ```
//!
//! `send` never blocks. `receive` parks the caller on the condvar until a
//! value is pending, then takes the **most recently sent** value. Pending
//! values are extracted from the tail (LIFO), so when a consumer falls
//! behind it sees the newest state first.
//!
//! Each value is handed to exactly one receiver. With several receivers
//! parked, they race for every send.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::time::{Duration, Instant};

/// Thread-safe handoff queue with blocking receive.
pub struct HandoffQueue<T> {
    /// Pending values. Only touched while locked.
    pending: Mutex<Vec<T>>,
    /// Signalled on every send.
    not_empty: Condvar,
}

impl<T> HandoffQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            not_empty: Condvar::new(),
        }
    }

    /// Appends `value` and wakes one blocked receiver.
    pub fn send(&self, value: T) {
        let mut pending = self.pending.lock();
        pending.push(value);
        self.not_empty.notify_one();
    }

    /// Blocks until a value is pending, then removes and returns the most
    /// recently sent one.
    ///
    /// Blocks forever if nothing is ever sent.
    #[must_use]
    pub fn receive(&self) -> T {
        let mut pending = self.pending.lock();
        loop {
            if let Some(value) = pending.pop() {
                return value;
            }
            self.not_empty.wait(&mut pending);
        }
    }

    /// Like [`receive`](Self::receive), but gives up after `timeout`.
    ///
    /// A zero timeout still takes a value that is already pending. A timeout
    /// too large to express as a deadline waits without bound.
    #[must_use]
    pub fn receive_timeout(&self, timeout: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.receive());
        };
        let mut pending = self.pending.lock();
        loop {
            if let Some(value) = pending.pop() {
                return Some(value);
            }
            if self.not_empty.wait_until(&mut pending, deadline).timed_out() {
                return pending.pop();
            }
        }
    }

    /// Takes the most recently sent value without blocking.
    #[must_use]
    pub fn try_receive(&self) -> Option<T> {
        self.pending.lock().pop()
    }

    /// Number of values waiting to be received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Drops every pending value.
    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandoffQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffQueue")
            .field("pending", &self.len())
            .finish()
    }
}
