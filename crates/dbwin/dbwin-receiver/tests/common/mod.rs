//! Producer side of the debug-buffer handshake, for driving a receiver from tests.

#![allow(dead_code)]

use dbwin_events::DebugMessage;
use dbwin_signal::{MemoryEvent, WaitOutcome};
use std::time::Duration;

/// Plays the role of a process calling OutputDebugString.
pub struct DebugStringWriter<W> {
    pub buffer_ready: MemoryEvent,
    pub data_ready: MemoryEvent,
    pub write: W,
}

impl<W: FnMut(&DebugMessage)> DebugStringWriter<W> {
    /// Waits for the buffer, writes the frame, then signals data.
    ///
    /// Returns `false` if the reader did not free the buffer within `timeout`.
    pub fn send(&mut self, msg: &DebugMessage, timeout: Duration) -> bool {
        match self.buffer_ready.wait_timeout(timeout) {
            Ok(WaitOutcome::Signaled) => {}
            _ => return false,
        }
        (self.write)(msg);
        self.data_ready.set().is_ok()
    }
}

/// A buffer-ready event in the state a freshly created channel starts in.
pub fn buffer_free() -> MemoryEvent {
    MemoryEvent::new(true)
}
