// src/sync.rs

//! Blocking synchronisation primitives used between the control loop and
//! task execution contexts.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Manual-reset binary signal.
///
/// Once set, every waiter is released and later waits return immediately
/// until `clear` is called.
#[derive(Debug, Default)]
pub struct Signal {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    pub fn set(&self) {
        let mut flag = self.lock();
        *flag = true;
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        *self.lock() = false;
    }

    /// Block until the signal is set.
    pub fn wait(&self) {
        let mut flag = self.lock();
        while !*flag {
            flag = self.cond.wait(flag).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the signal is set or `timeout` elapses.
    ///
    /// Returns whether the signal was observed set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut flag = self.lock();
        while !*flag {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(flag, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            flag = guard;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.flag.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
