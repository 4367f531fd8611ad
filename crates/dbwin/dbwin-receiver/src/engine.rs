//! Receiver engine for the system debug-output channel.
//!
//! Writers and the single reader share one fixed-size frame region and two
//! auto-reset signals. The engine owns the reader's half of that handshake on
//! a dedicated thread and republishes each frame as a [`DebugMessage`].
//!
//! # Protocol
//!
//! ```text
//!            writer                               receiver loop
//!   wait BufferReady ──────────────┐
//!   write frame into view          │        wait DataReady (poll_interval)
//!   set DataReady ─────────────────┼──────▶ copy view, decode frame
//!                                  │        deliver on channel (blocks)
//!   (next writer) ◀────────────────┴─────── raise BufferReady
//! ```
//!
//! BufferReady is raised exactly once per decoded frame, after decoding and
//! after the delivery attempt. Raising earlier would let the next writer
//! overwrite a frame that is still being read.
//!
//! # Cancellation
//!
//! A wait on DataReady cannot be interrupted, so it is bounded by
//! `poll_interval` and the stop request is polled whenever it times out and
//! after every signaled cycle. A delivery blocked on a slow consumer watches the
//! stop request too; if the stop wins, the frame is dropped but still
//! acknowledged.

use crate::config::ReceiverConfig;
use crate::error::ReceiverError;
use crate::handle::ReceiverHandle;
use crate::state::{ReceiverState, StateCell};
use crossbeam_channel::{Receiver as ChannelReceiver, Sender, TryRecvError, TrySendError, select};
use dbwin_events::{DebugMessage, HEADER_SIZE};
use dbwin_mmap::SharedView;
use dbwin_signal::{BufferReady, DataReady, WaitOutcome};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, trace, warn};

/// Counters reported when the loop exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Messages handed to the consumer.
    pub delivered: u64,
    /// Frames decoded and acknowledged but dropped because the receiver was
    /// stopping or the consumer had gone away.
    pub discarded: u64,
    /// Waits on DataReady that timed out.
    pub timeouts: u64,
}

/// An unstarted receiver (`Idle`).
///
/// Owns the shared view and both signal handles; they are released when the
/// loop thread exits. A receiver runs at most once: [`Receiver::start`]
/// consumes it.
pub struct Receiver<V, B, D> {
    view: V,
    buffer_ready: B,
    data_ready: D,
    config: ReceiverConfig,
    /// Private copy of the view, sized once so decoding never reads shared memory.
    scratch: Box<[u8]>,
}

impl<V, B, D> Receiver<V, B, D>
where
    V: SharedView + 'static,
    B: BufferReady + 'static,
    D: DataReady + 'static,
{
    /// Builds a receiver over already-acquired handles.
    ///
    /// # Errors
    /// `ReceiverError::ViewTooSmall` if the view cannot hold a frame header.
    pub fn new(
        view: V,
        buffer_ready: B,
        data_ready: D,
        config: ReceiverConfig,
    ) -> Result<Self, ReceiverError> {
        let capacity = view.capacity();
        if capacity < HEADER_SIZE {
            return Err(ReceiverError::ViewTooSmall { capacity });
        }

        Ok(Self {
            view,
            buffer_ready,
            data_ready,
            config,
            scratch: vec![0u8; capacity].into_boxed_slice(),
        })
    }

    /// Always `Idle`: a started receiver is observed through its handle.
    pub fn state(&self) -> ReceiverState {
        ReceiverState::Idle
    }

    /// Settings the loop will run with.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Spawns the loop thread and returns immediately.
    ///
    /// # Errors
    /// `ReceiverError::Spawn` if the OS refuses to create the thread. The
    /// handles are released in that case.
    pub fn start(self) -> Result<ReceiverHandle, ReceiverError> {
        let (message_tx, message_rx) = crossbeam_channel::bounded(self.config.channel_capacity);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let state = Arc::new(StateCell::new(ReceiverState::Running));

        let worker = Worker {
            receiver: self,
            messages: message_tx,
            stop: stop_rx,
            state: Arc::clone(&state),
            stats: ReceiverStats::default(),
        };
        let completion = Completion {
            done: done_tx,
            state: Arc::clone(&state),
        };

        let join = thread::Builder::new()
            .name("dbwin-receiver".into())
            .spawn(move || {
                // Locals drop in reverse: completion fires once the loop has
                // returned (or unwound), then the channel and handles close.
                let mut worker = worker;
                let _completion = completion;
                worker.run()
            })
            .map_err(|e| ReceiverError::Spawn(e.to_string()))?;

        Ok(ReceiverHandle::new(message_rx, stop_tx, done_rx, join, state))
    }
}

/// Signals completion exactly once when the loop thread lets go of it.
struct Completion {
    done: Sender<()>,
    state: Arc<StateCell>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.state.store(ReceiverState::Stopped);
        let _ = self.done.send(());
    }
}

/// How a delivery attempt ended.
enum Delivery {
    Sent,
    /// Stop request arrived while the consumer was not ready.
    Stopped,
    /// Consumer dropped the channel.
    Disconnected,
}

/// Loop-thread side of a started receiver.
struct Worker<V, B, D> {
    receiver: Receiver<V, B, D>,
    messages: Sender<DebugMessage>,
    stop: ChannelReceiver<()>,
    state: Arc<StateCell>,
    stats: ReceiverStats,
}

impl<V: SharedView, B: BufferReady, D: DataReady> Worker<V, B, D> {
    fn run(&mut self) -> Result<ReceiverStats, ReceiverError> {
        info!(
            capacity = self.receiver.scratch.len(),
            poll_interval_ms = self.receiver.config.poll_interval.as_millis() as u64,
            "receiver started"
        );

        let result = self.receive_loop();
        match &result {
            Ok(stats) => info!(
                delivered = stats.delivered,
                discarded = stats.discarded,
                timeouts = stats.timeouts,
                "receiver stopped"
            ),
            Err(err) => warn!(error = %err, "receiver loop failed"),
        }
        result
    }

    fn receive_loop(&mut self) -> Result<ReceiverStats, ReceiverError> {
        let poll_interval = self.receiver.config.poll_interval;

        loop {
            match self.receiver.data_ready.wait(poll_interval)? {
                WaitOutcome::TimedOut => {
                    self.stats.timeouts += 1;
                    trace!("data wait timed out");
                    if self.stop_requested() {
                        return Ok(self.stats);
                    }
                }
                WaitOutcome::Signaled => {
                    let message = self.read_frame()?;
                    let delivery = self.deliver(message);

                    // Acknowledge every decoded frame, including the last one.
                    self.receiver.buffer_ready.raise()?;

                    match delivery {
                        Delivery::Sent => {
                            if self.stop_requested() {
                                return Ok(self.stats);
                            }
                        }
                        Delivery::Stopped => return Ok(self.stats),
                        Delivery::Disconnected => {
                            debug!("consumer dropped the message channel");
                            return Ok(self.stats);
                        }
                    }
                }
            }
        }
    }

    /// Copies the view into scratch and decodes it.
    fn read_frame(&mut self) -> Result<DebugMessage, ReceiverError> {
        let receiver = &mut self.receiver;
        receiver.view.copy_to(&mut receiver.scratch);
        let message = DebugMessage::decode(&receiver.scratch)?;
        debug!(
            process_id = message.process_id,
            len = message.message.len(),
            "frame decoded"
        );
        Ok(message)
    }

    fn deliver(&mut self, message: DebugMessage) -> Delivery {
        // A consumer already waiting takes the message even if a stop is pending.
        let message = match self.messages.try_send(message) {
            Ok(()) => {
                self.stats.delivered += 1;
                return Delivery::Sent;
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.discarded += 1;
                return Delivery::Disconnected;
            }
            Err(TrySendError::Full(message)) => message,
        };

        select! {
            send(self.messages, message) -> res => match res {
                Ok(()) => {
                    self.stats.delivered += 1;
                    Delivery::Sent
                }
                Err(_) => {
                    self.stats.discarded += 1;
                    Delivery::Disconnected
                }
            },
            recv(self.stop) -> _ => {
                self.state.store(ReceiverState::Draining);
                self.stats.discarded += 1;
                debug!("stop requested while delivery was blocked; frame dropped");
                Delivery::Stopped
            },
        }
    }

    /// Non-blocking poll of the stop request. A dropped handle counts as a
    /// stop request.
    fn stop_requested(&self) -> bool {
        match self.stop.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                self.state.store(ReceiverState::Draining);
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbwin_mmap::SharedBuffer;
    use dbwin_signal::{MemoryEvent, ScriptedEvent, SignalError, Step};
    use std::time::Duration;

    const POLL: Duration = Duration::from_millis(10);

    fn config() -> ReceiverConfig {
        ReceiverConfig::default().with_poll_interval(POLL)
    }

    #[test]
    fn new_rejects_view_smaller_than_header() {
        let result = Receiver::new(
            SharedBuffer::new(3),
            MemoryEvent::default(),
            ScriptedEvent::never(),
            config(),
        );
        assert!(matches!(
            result,
            Err(ReceiverError::ViewTooSmall { capacity: 3 })
        ));
    }

    #[test]
    fn unstarted_receiver_is_idle() {
        let receiver = Receiver::new(
            SharedBuffer::new(16),
            MemoryEvent::default(),
            ScriptedEvent::never(),
            config(),
        )
        .unwrap();
        assert_eq!(receiver.state(), ReceiverState::Idle);
        assert_eq!(receiver.config().poll_interval, POLL);
    }

    #[test]
    fn header_only_view_delivers_empty_messages() {
        let view = SharedBuffer::new(HEADER_SIZE);
        view.write_bytes(&9u32.to_le_bytes());
        let buffer_ready = MemoryEvent::default();

        let handle = Receiver::new(
            view,
            buffer_ready.clone(),
            ScriptedEvent::new([Step::Signal]),
            config(),
        )
        .unwrap()
        .start()
        .unwrap();

        let msg = handle.messages().recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(msg, DebugMessage::new(9, ""));
        handle.stop().unwrap();
        assert_eq!(buffer_ready.raise_count(), 1);
    }

    #[test]
    fn raise_failure_is_fatal_after_delivery() {
        let view = SharedBuffer::new(64);
        view.write_frame(&DebugMessage::new(1, "last words")).unwrap();
        let buffer_ready = MemoryEvent::default();
        buffer_ready.close();

        let handle = Receiver::new(
            view,
            buffer_ready,
            ScriptedEvent::new([Step::Signal, Step::Signal]),
            config().with_channel_capacity(4),
        )
        .unwrap()
        .start()
        .unwrap();

        let received: Vec<_> = handle.messages().iter().collect();
        assert_eq!(received, vec![DebugMessage::new(1, "last words")]);
        assert_eq!(
            handle.stop(),
            Err(ReceiverError::Signal(SignalError::Closed))
        );
    }

    #[test]
    fn back_to_back_signals_still_observe_stop() {
        let data_ready = ScriptedEvent::new(std::iter::repeat_n(Step::Signal, 10_000));
        let view = SharedBuffer::new(64);
        view.write_frame(&DebugMessage::new(2, "busy")).unwrap();

        let handle = Receiver::new(view, MemoryEvent::default(), data_ready.clone(), config())
            .unwrap()
            .start()
            .unwrap();

        for _ in 0..3 {
            handle.messages().recv_timeout(Duration::from_secs(2)).unwrap();
        }
        let stats = handle.stop().unwrap();
        assert!(stats.delivered >= 3);
        assert!(data_ready.remaining() > 0, "loop ignored the stop request");
    }
}
