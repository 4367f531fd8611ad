use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a receiver.
///
/// ```text
/// Idle --start--> Running --stop request--> Draining --cycle done--> Stopped
///                    |                                                  ^
///                    +------------- signal failure / consumer gone -----+
/// ```
///
/// `Idle` only describes a [`Receiver`](crate::Receiver) that has not been
/// started. `Stopped` is terminal.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiverState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl ReceiverState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ReceiverState::Idle,
            1 => ReceiverState::Running,
            2 => ReceiverState::Draining,
            _ => ReceiverState::Stopped,
        }
    }
}

/// State shared between the loop thread (sole writer) and the handle.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: ReceiverState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub(crate) fn load(&self) -> ReceiverState {
        ReceiverState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn store(&self, state: ReceiverState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
