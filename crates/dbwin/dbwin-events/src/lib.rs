pub mod debug_message;
pub use debug_message::{DebugMessage, DecodeError, EncodeError};

/// Bytes taken by the little-endian process id at the front of every frame.
pub const HEADER_SIZE: usize = 4;

/// Capacity of the system debug buffer shared by every writer on the host.
pub const DBWIN_BUFFER_SIZE: usize = 4096;

/// Longest payload a full-size buffer can carry and still be NUL-terminated.
pub const MAX_MESSAGE_LEN: usize = DBWIN_BUFFER_SIZE - HEADER_SIZE - 1;

// Kernel object names used by OutputDebugString writers.
pub const DBWIN_BUFFER: &str = "DBWIN_BUFFER";
pub const DBWIN_BUFFER_READY: &str = "DBWIN_BUFFER_READY";
pub const DBWIN_DATA_READY: &str = "DBWIN_DATA_READY";
