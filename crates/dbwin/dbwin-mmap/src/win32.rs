//! Page-file backed named mapping (`DBWIN_BUFFER`).

use crate::{SharedView, copy_from_mapping};
use windows::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::System::Memory::{
    CreateFileMappingW, FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile,
    OpenFileMappingW, PAGE_READWRITE, UnmapViewOfFile,
};
use windows::core::{Error, PCWSTR, Result};

/// Read-only view of a named file mapping.
pub struct FileMappingView {
    handle: HANDLE,
    view: MEMORY_MAPPED_VIEW_ADDRESS,
    size: usize,
}

// SAFETY: the mapping handle and view address are process-wide and may be
// used and released from any thread.
unsafe impl Send for FileMappingView {}

impl FileMappingView {
    /// Creates the named mapping (or opens it if it already exists) and maps
    /// `size` bytes read-only.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let name_wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();

        let (size_high, size_low) = size_dwords(size);

        unsafe {
            let handle = CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                None,
                PAGE_READWRITE,
                size_high,
                size_low,
                PCWSTR(name_wide.as_ptr()),
            )?;
            Self::map(handle, size)
        }
    }

    /// Opens an existing named mapping and maps `size` bytes read-only.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        let name_wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();

        unsafe {
            let handle = OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR(name_wide.as_ptr()))?;
            Self::map(handle, size)
        }
    }

    unsafe fn map(handle: HANDLE, size: usize) -> Result<Self> {
        unsafe {
            let view = MapViewOfFile(handle, FILE_MAP_READ, 0, 0, size);
            if view.Value.is_null() {
                let err = Error::from_win32();
                CloseHandle(handle)?;
                return Err(err);
            }
            Ok(Self { handle, view, size })
        }
    }
}

/// Splits a mapping size into the high and low dwords `CreateFileMappingW` takes.
fn size_dwords(size: usize) -> (u32, u32) {
    let size = size as u64;
    ((size >> 32) as u32, size as u32)
}

impl SharedView for FileMappingView {
    fn capacity(&self) -> usize {
        self.size
    }

    fn copy_to(&self, dst: &mut [u8]) {
        // SAFETY: `view` maps `size` readable bytes until drop.
        unsafe { copy_from_mapping(self.view.Value as *const u8, self.size, dst) }
    }
}

impl Drop for FileMappingView {
    fn drop(&mut self) {
        unsafe {
            let _ = UnmapViewOfFile(self.view);
            let _ = CloseHandle(self.handle);
        }
    }
}
