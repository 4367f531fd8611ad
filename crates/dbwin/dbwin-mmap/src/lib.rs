//! Fixed-capacity byte regions that hold one debug frame at a time.
//!
//! The receiver only ever needs to copy the whole region out after a writer
//! has signaled it, so [`SharedView`] exposes a bulk copy rather than a slice
//! borrow: the mapping is shared with other processes and is only stable
//! between the data-ready and buffer-ready signals.

mod buffer;
mod file;
#[cfg(windows)]
pub mod win32;

pub use buffer::SharedBuffer;
pub use file::{MmapView, MmapViewMut};

/// Read access to a shared frame region.
pub trait SharedView: Send {
    /// Size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Copies `min(capacity, dst.len())` bytes from the start of the region.
    fn copy_to(&self, dst: &mut [u8]);
}

impl<V: SharedView + ?Sized> SharedView for Box<V> {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn copy_to(&self, dst: &mut [u8]) {
        (**self).copy_to(dst)
    }
}

/// Copies out of a mapping that other processes may write to.
///
/// # Safety
/// `src` must be valid for reads of `len` bytes.
#[inline]
unsafe fn copy_from_mapping(src: *const u8, len: usize, dst: &mut [u8]) {
    let n = len.min(dst.len());
    // SAFETY: caller guarantees `src` covers `len` bytes; `n <= dst.len()`.
    unsafe { std::ptr::copy_nonoverlapping(src, dst.as_mut_ptr(), n) };
}
