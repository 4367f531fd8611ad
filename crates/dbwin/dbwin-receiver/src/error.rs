use dbwin_events::DecodeError;
use dbwin_signal::SignalError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiverError {
    #[error("synchronization signal failed: {0}")]
    Signal(#[from] SignalError),

    #[error("failed to decode frame: {0}")]
    Decode(#[from] DecodeError),

    #[error("shared view of {capacity} bytes cannot hold a frame header")]
    ViewTooSmall { capacity: usize },

    #[error("failed to spawn receiver thread: {0}")]
    Spawn(String),

    #[error("receiver thread panicked")]
    Panicked,
}
