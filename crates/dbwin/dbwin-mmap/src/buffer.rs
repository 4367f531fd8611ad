use crate::SharedView;
use dbwin_events::{DebugMessage, EncodeError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Heap-backed frame region shared between threads of one process.
///
/// Clones share storage. The writer side uses [`SharedBuffer::write_frame`] or
/// [`SharedBuffer::write_bytes`]; the receiver reads through [`SharedView`].
#[derive(Clone)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Box<[u8]>>>,
}

impl SharedBuffer {
    /// Allocates a zeroed region of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(vec![0u8; capacity].into_boxed_slice())),
        }
    }

    /// Writes `msg` as a frame at the start of the region.
    pub fn write_frame(&self, msg: &DebugMessage) -> Result<usize, EncodeError> {
        msg.encode_into(&mut self.bytes.lock())
    }

    /// Overwrites the start of the region with raw bytes, truncating to the
    /// capacity. Bytes past `raw.len()` keep their previous contents.
    pub fn write_bytes(&self, raw: &[u8]) -> usize {
        let mut bytes = self.bytes.lock();
        let n = raw.len().min(bytes.len());
        bytes[..n].copy_from_slice(&raw[..n]);
        n
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.lock().to_vec()
    }
}

impl SharedView for SharedBuffer {
    fn capacity(&self) -> usize {
        self.bytes.lock().len()
    }

    fn copy_to(&self, dst: &mut [u8]) {
        let bytes = self.bytes.lock();
        let n = bytes.len().min(dst.len());
        dst[..n].copy_from_slice(&bytes[..n]);
    }
}
