//! Synchronization signals used by the debug-buffer protocol.
//!
//! Two capabilities coordinate the single reader with the writers:
//! - [`BufferReady`]: raised by the reader once it is done with the buffer.
//! - [`DataReady`]: waited on by the reader until a writer has filled the buffer.
//!
//! Handles release their underlying object on drop, so every exit path of the
//! owning scope closes them.

mod memory;
mod scripted;
#[cfg(windows)]
pub mod win32;

pub use memory::MemoryEvent;
pub use scripted::{ScriptedEvent, Step};

use std::time::Duration;

/// Result of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signaled,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    #[error("signal handle is closed")]
    Closed,

    #[error("signal was abandoned by its owner")]
    Abandoned,

    #[error("os error {code:#010x}: {message}")]
    Os { code: i32, message: String },
}

/// The "buffer is free" side of the handshake.
pub trait BufferReady: Send {
    /// Marks the shared buffer as consumed so the next writer may overwrite it.
    fn raise(&self) -> Result<(), SignalError>;
}

/// The "buffer has data" side of the handshake.
pub trait DataReady: Send {
    /// Blocks for at most `timeout`.
    ///
    /// An elapsed deadline is reported as `Ok(WaitOutcome::TimedOut)`, never as
    /// an error.
    fn wait(&self, timeout: Duration) -> Result<WaitOutcome, SignalError>;
}

impl<T: BufferReady + Sync> BufferReady for std::sync::Arc<T> {
    fn raise(&self) -> Result<(), SignalError> {
        (**self).raise()
    }
}

impl<T: DataReady + Sync> DataReady for std::sync::Arc<T> {
    fn wait(&self, timeout: Duration) -> Result<WaitOutcome, SignalError> {
        (**self).wait(timeout)
    }
}
