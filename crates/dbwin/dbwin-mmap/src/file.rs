use crate::{SharedView, copy_from_mapping};
use dbwin_events::{DebugMessage, EncodeError};
use memmap2::{Mmap, MmapMut};
use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};

/// Read-only view of a file-backed frame region.
pub struct MmapView {
    _file: File,
    mmap: Mmap,
}

/// Writable file-backed frame region; the producer side of a file-backed
/// channel.
pub struct MmapViewMut {
    _file: File,
    mmap: MmapMut,
}

impl MmapView {
    /// Open an existing file and map it read-only
    pub fn open_ro<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;

        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self { _file: file, mmap })
    }
}

impl SharedView for MmapView {
    fn capacity(&self) -> usize {
        self.mmap.len()
    }

    fn copy_to(&self, dst: &mut [u8]) {
        // SAFETY: the mapping covers `len()` bytes for the lifetime of `self`.
        unsafe { copy_from_mapping(self.mmap.as_ptr(), self.mmap.len(), dst) }
    }
}

impl MmapViewMut {
    /// Create a new file of `size_bytes` zeroed bytes and map it read-write
    pub fn create_rw<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Open an existing file and map it to read and write
    pub fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self { _file: file, mmap })
    }

    /// Writes `msg` as a frame at the start of the region.
    pub fn write_frame(&mut self, msg: &DebugMessage) -> Result<usize, EncodeError> {
        msg.encode_into(&mut self.mmap)
    }

    /// Overwrites the start of the region with raw bytes, truncating to the
    /// mapping length.
    pub fn write_bytes(&mut self, raw: &[u8]) -> usize {
        let n = raw.len().min(self.mmap.len());
        self.mmap[..n].copy_from_slice(&raw[..n]);
        n
    }

    /// Flushes outstanding writes to the backing file.
    pub fn flush(&self) -> io::Result<()> {
        self.mmap.flush()
    }
}

impl SharedView for MmapViewMut {
    fn capacity(&self) -> usize {
        self.mmap.len()
    }

    fn copy_to(&self, dst: &mut [u8]) {
        // SAFETY: the mapping covers `len()` bytes for the lifetime of `self`.
        unsafe { copy_from_mapping(self.mmap.as_ptr(), self.mmap.len(), dst) }
    }
}
