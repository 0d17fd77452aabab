//! Bounded pool of reusable curl handles.
//!
//! libcurl keeps a connection cache per easy handle, so reusing handles reuses
//! keep-alive connections. The pool bounds how many handles exist at once (the
//! per-host connection limit, since a RemoteFile talks to one origin) and how
//! many stay idle, and drops handles that sat idle longer than the timeout.
//! The lock is only held to check a handle out or back in, never across a transfer.

use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use curl::easy::Easy2;

use super::exchange::Exchange;

struct IdleHandle {
    easy: Easy2<Exchange>,
    since: Instant,
}

struct PoolState {
    idle: Vec<IdleHandle>,
    checked_out: usize,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub checked_out: usize,
}

pub struct ConnectionPool {
    state: Mutex<PoolState>,
    returned: Condvar,
    max_idle: usize,
    max_open: usize,
    idle_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(max_idle: usize, max_open: usize, idle_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                checked_out: 0,
            }),
            returned: Condvar::new(),
            max_idle,
            max_open: max_open.max(1),
            idle_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // A panic while holding the lock leaves only counters behind; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check a handle out, waiting while `max_open` handles are busy.
    pub fn checkout(&self) -> PooledHandle<'_> {
        let mut state = self.lock();
        loop {
            let now = Instant::now();
            let before = state.idle.len();
            state
                .idle
                .retain(|h| now.duration_since(h.since) < self.idle_timeout);
            let expired = before - state.idle.len();
            if expired > 0 {
                tracing::debug!(expired, "dropped idle connections");
            }

            if let Some(h) = state.idle.pop() {
                state.checked_out += 1;
                return PooledHandle {
                    pool: self,
                    easy: ManuallyDrop::new(h.easy),
                };
            }
            if state.checked_out + state.idle.len() < self.max_open {
                state.checked_out += 1;
                return PooledHandle {
                    pool: self,
                    easy: ManuallyDrop::new(Easy2::new(Exchange::new())),
                };
            }
            state = self
                .returned
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn checkin(&self, easy: Easy2<Exchange>) {
        let mut state = self.lock();
        state.checked_out = state.checked_out.saturating_sub(1);
        if state.idle.len() < self.max_idle {
            state.idle.push(IdleHandle {
                easy,
                since: Instant::now(),
            });
        }
        drop(state);
        self.returned.notify_one();
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            idle: state.idle.len(),
            checked_out: state.checked_out,
        }
    }
}

/// A checked-out handle; returned to the pool on drop.
pub struct PooledHandle<'a> {
    pool: &'a ConnectionPool,
    easy: ManuallyDrop<Easy2<Exchange>>,
}

impl Deref for PooledHandle<'_> {
    type Target = Easy2<Exchange>;

    fn deref(&self) -> &Self::Target {
        &self.easy
    }
}

impl DerefMut for PooledHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.easy
    }
}

impl Drop for PooledHandle<'_> {
    fn drop(&mut self) {
        // SAFETY: `easy` is taken exactly once, here, and never touched again.
        let easy = unsafe { ManuallyDrop::take(&mut self.easy) };
        self.pool.checkin(easy);
    }
}
