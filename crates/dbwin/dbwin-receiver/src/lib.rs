mod config;
mod engine;
mod error;
mod handle;
mod state;

pub use config::ReceiverConfig;
pub use engine::{Receiver, ReceiverStats};
pub use error::ReceiverError;
pub use handle::ReceiverHandle;
pub use state::ReceiverState;

pub use dbwin_events::DebugMessage;
