//! In-process auto-reset event.
//!
//! Behaves like a Win32 auto-reset event: `set` leaves the event signaled until
//! exactly one waiter consumes it. Clones share the same event, so a test can
//! hand one clone to the receiver and keep another to play the writer.

use crate::{BufferReady, DataReady, SignalError, WaitOutcome};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
pub struct MemoryEvent {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<EventState>,
    cond: Condvar,
    raises: AtomicU64,
    waits: AtomicU64,
}

#[derive(Default)]
struct EventState {
    signaled: bool,
    closed: bool,
}

impl EventState {
    /// Consumes a pending signal, auto-reset style.
    fn take(&mut self) -> Result<Option<WaitOutcome>, SignalError> {
        if self.closed {
            return Err(SignalError::Closed);
        }
        if self.signaled {
            self.signaled = false;
            return Ok(Some(WaitOutcome::Signaled));
        }
        Ok(None)
    }
}

impl MemoryEvent {
    /// Creates an event, optionally already signaled.
    pub fn new(initial_state: bool) -> Self {
        let event = Self::default();
        event.inner.state.lock().signaled = initial_state;
        event
    }

    /// Signals the event and wakes one waiter.
    pub fn set(&self) -> Result<(), SignalError> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(SignalError::Closed);
        }
        state.signaled = true;
        self.inner.raises.fetch_add(1, Ordering::Relaxed);
        self.inner.cond.notify_one();
        Ok(())
    }

    /// Waits until the event is signaled or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<WaitOutcome, SignalError> {
        self.inner.waits.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now().checked_add(timeout);

        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = state.take()? {
                return Ok(outcome);
            }
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut state, deadline).timed_out() {
                        return Ok(state.take()?.unwrap_or(WaitOutcome::TimedOut));
                    }
                }
                None => self.inner.cond.wait(&mut state),
            }
        }
    }

    /// Invalidates the event for every clone; later operations fail with
    /// `SignalError::Closed` and blocked waiters wake up with that error.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.cond.notify_all();
    }

    pub fn is_signaled(&self) -> bool {
        self.inner.state.lock().signaled
    }

    /// Number of successful `set`/`raise` calls so far.
    pub fn raise_count(&self) -> u64 {
        self.inner.raises.load(Ordering::Relaxed)
    }

    /// Number of waits started so far.
    pub fn wait_count(&self) -> u64 {
        self.inner.waits.load(Ordering::Relaxed)
    }
}

impl BufferReady for MemoryEvent {
    fn raise(&self) -> Result<(), SignalError> {
        self.set()
    }
}

impl DataReady for MemoryEvent {
    fn wait(&self, timeout: Duration) -> Result<WaitOutcome, SignalError> {
        self.wait_timeout(timeout)
    }
}
