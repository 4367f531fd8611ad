//! Deterministic `DataReady` double.
//!
//! Replays a fixed sequence of outcomes, then times out forever. Timeouts at
//! the end of the script sleep for the requested duration so a receiver loop
//! polls at its real cadence instead of spinning.

use crate::{DataReady, SignalError, WaitOutcome};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Signal,
    /// Reported immediately, without sleeping.
    Timeout,
    Fail(SignalError),
}

#[derive(Clone, Default)]
pub struct ScriptedEvent {
    steps: Arc<Mutex<VecDeque<Step>>>,
    waits: Arc<AtomicU64>,
}

impl ScriptedEvent {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            waits: Arc::default(),
        }
    }

    /// A script that never signals.
    pub fn never() -> Self {
        Self::default()
    }

    /// Appends steps to the script.
    pub fn push(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn wait_count(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}

impl DataReady for ScriptedEvent {
    fn wait(&self, timeout: Duration) -> Result<WaitOutcome, SignalError> {
        self.waits.fetch_add(1, Ordering::Relaxed);

        // The lock is released before sleeping.
        let next = self.steps.lock().pop_front();
        match next {
            Some(Step::Signal) => Ok(WaitOutcome::Signaled),
            Some(Step::Timeout) => Ok(WaitOutcome::TimedOut),
            Some(Step::Fail(err)) => Err(err),
            None => {
                std::thread::sleep(timeout);
                Ok(WaitOutcome::TimedOut)
            }
        }
    }
}
