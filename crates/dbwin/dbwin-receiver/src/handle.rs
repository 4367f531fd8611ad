use crate::engine::ReceiverStats;
use crate::error::ReceiverError;
use crate::state::{ReceiverState, StateCell};
use crossbeam_channel::{Receiver as ChannelReceiver, Sender, TryRecvError};
use dbwin_events::DebugMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

type Outcome = Result<ReceiverStats, ReceiverError>;

/// Caller side of a started receiver.
///
/// Messages arrive on [`messages`](Self::messages) in the order writers
/// produced them. The channel disconnects once the loop has exited, so
/// iterating it ends after [`stop`](Self::stop) or a fatal signal failure.
///
/// The handle is `Sync`: `stop` may be called from several threads, and every
/// call after the first returns the recorded outcome. Dropping the handle
/// stops the receiver.
pub struct ReceiverHandle {
    messages: ChannelReceiver<DebugMessage>,
    state: Arc<StateCell>,
    control: Mutex<Control>,
}

struct Control {
    running: Option<Running>,
    outcome: Option<Outcome>,
}

struct Running {
    stop: Sender<()>,
    done: ChannelReceiver<()>,
    join: JoinHandle<Outcome>,
}

impl Running {
    /// Requests a stop and blocks until the loop thread has exited.
    fn shutdown(self) -> Outcome {
        // Capacity 1 and a single send: never blocks. Fails only when the loop
        // already exited on its own.
        let _ = self.stop.send(());
        // Either the completion message or a disconnect: both mean the loop is done.
        let _ = self.done.recv();
        self.join()
    }

    /// Collects the outcome if completion has already fired.
    fn try_finish(self) -> Result<Outcome, Self> {
        match self.done.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => Ok(self.join()),
            Err(TryRecvError::Empty) => Err(self),
        }
    }

    fn join(self) -> Outcome {
        self.join.join().unwrap_or(Err(ReceiverError::Panicked))
    }
}

impl Control {
    fn poll(&mut self) {
        if let Some(running) = self.running.take() {
            match running.try_finish() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(running) => self.running = Some(running),
            }
        }
    }
}

impl ReceiverHandle {
    pub(crate) fn new(
        messages: ChannelReceiver<DebugMessage>,
        stop: Sender<()>,
        done: ChannelReceiver<()>,
        join: JoinHandle<Outcome>,
        state: Arc<StateCell>,
    ) -> Self {
        Self {
            messages,
            state,
            control: Mutex::new(Control {
                running: Some(Running { stop, done, join }),
                outcome: None,
            }),
        }
    }

    /// Delivery channel of decoded messages.
    pub fn messages(&self) -> &ChannelReceiver<DebugMessage> {
        &self.messages
    }

    /// Blocking iterator over delivered messages; ends when the loop exits.
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, DebugMessage> {
        self.messages.iter()
    }

    pub fn state(&self) -> ReceiverState {
        self.state.load()
    }

    /// Stops the receiver and waits for its loop thread to exit.
    ///
    /// After this returns, no further message is sent on the delivery channel
    /// and the view and signal handles have been released. At most one
    /// decode/delivery cycle that was already in flight completes first.
    ///
    /// # Errors
    /// The signal or decode failure that ended the loop, if any.
    pub fn stop(&self) -> Result<ReceiverStats, ReceiverError> {
        let mut control = self.control.lock();
        if let Some(running) = control.running.take() {
            debug!("stopping receiver");
            control.outcome = Some(running.shutdown());
        }
        control.outcome.clone().unwrap_or(Err(ReceiverError::Panicked))
    }

    /// Failure that ended the loop, once the loop has exited.
    ///
    /// `None` while running, and after a clean stop.
    pub fn last_error(&self) -> Option<ReceiverError> {
        let mut control = self.control.lock();
        control.poll();
        match &control.outcome {
            Some(Err(err)) => Some(err.clone()),
            _ => None,
        }
    }

    /// `true` once the loop thread has exited, for any reason.
    pub fn is_finished(&self) -> bool {
        let mut control = self.control.lock();
        control.poll();
        control.outcome.is_some()
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
