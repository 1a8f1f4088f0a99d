//! Aligned buffers for direct I/O.
//!
//! With `O_DIRECT` the kernel transfers straight between the device and the
//! user buffer, so the buffer address must be aligned to the logical block
//! size of the device. [`AlignedBuffer`] over-allocates by `align` bytes and
//! exposes the first aligned window of the requested size.

use crate::error::{FileError, Result};
use crate::SECTOR_SIZE;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Heap buffer whose first byte is aligned to a multiple of 512 bytes
///
/// The buffer is meant to be allocated once per transfer and reused for
/// every read and write.
pub struct AlignedBuffer {
    storage: Vec<u8>,
    start: usize,
    len: usize,
    align: usize,
}

impl AlignedBuffer {
    /// Allocate a zeroed buffer of `size` bytes aligned to `align` bytes
    ///
    /// # Errors
    ///
    /// Returns [`FileError::InvalidArgument`] unless both `size` and
    /// `align` are multiples of 512, `align` is non-zero and `size + align`
    /// fits in `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use imgxfer_files::AlignedBuffer;
    ///
    /// let buf = AlignedBuffer::new(1024 * 1024, 4096).unwrap();
    /// assert_eq!(buf.len(), 1024 * 1024);
    /// assert_eq!(buf.as_ptr() as usize % 4096, 0);
    /// ```
    pub fn new(size: usize, align: usize) -> Result<Self> {
        if size % SECTOR_SIZE != 0 {
            return Err(FileError::invalid(format!(
                "size must be a multiple of {SECTOR_SIZE}: {size}"
            )));
        }
        if align == 0 || align % SECTOR_SIZE != 0 {
            return Err(FileError::invalid(format!(
                "align must be a multiple of {SECTOR_SIZE}: {align}"
            )));
        }

        let capacity = size.checked_add(align).ok_or_else(|| {
            FileError::invalid(format!("size {size} with align {align} is too large"))
        })?;

        // The storage is never resized, so its address is stable for the
        // lifetime of the buffer.
        let storage = vec![0u8; capacity];
        let remainder = storage.as_ptr() as usize % align;
        let start = if remainder == 0 { 0 } else { align - remainder };

        Ok(Self {
            storage,
            start,
            len: size,
            align,
        })
    }

    /// Alignment of the buffer address
    pub fn align(&self) -> usize {
        self.align
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.storage[self.start..self.start + self.len]
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.start..self.start + self.len]
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("align", &self.align)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Largest multiple of 512 representable in `usize`
    const MAX_SECTORS: usize = usize::MAX - usize::MAX % SECTOR_SIZE;

    #[test]
    fn test_bad_size() {
        assert!(matches!(
            AlignedBuffer::new(100, 4096),
            Err(FileError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bad_align() {
        assert!(matches!(
            AlignedBuffer::new(1024, 100),
            Err(FileError::InvalidArgument(_))
        ));
        assert!(matches!(
            AlignedBuffer::new(1024, 0),
            Err(FileError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_size_overflow() {
        assert!(matches!(
            AlignedBuffer::new(MAX_SECTORS, 512),
            Err(FileError::InvalidArgument(_))
        ));
        assert!(matches!(
            AlignedBuffer::new(512, MAX_SECTORS),
            Err(FileError::InvalidArgument(_))
        ));
    }

    proptest! {
        /// Sizes whose allocation would overflow are rejected, not wrapped
        #[test]
        fn overflowing_sizes_rejected(size_back in 0usize..1 << 20, extra in 0usize..64) {
            let size = MAX_SECTORS - size_back * SECTOR_SIZE;
            let align = (size_back + 1 + extra) * SECTOR_SIZE;
            prop_assert!(matches!(
                AlignedBuffer::new(size, align),
                Err(FileError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_alignment() {
        for align in [512, 1024, 1536, 4096, 65536] {
            let buf = AlignedBuffer::new(8192, align).unwrap();
            assert_eq!(buf.len(), 8192);
            assert_eq!(buf.as_ptr() as usize % align, 0);
            assert_eq!(buf.align(), align);
        }
    }

    #[test]
    fn test_empty() {
        let buf = AlignedBuffer::new(0, 512).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_prefix_keeps_alignment() {
        let mut buf = AlignedBuffer::new(4096, 4096).unwrap();
        buf[..16].copy_from_slice(b"testing 1 2 3...");

        let prefix = &buf[..512];
        assert_eq!(prefix.as_ptr() as usize % 4096, 0);
        assert_eq!(&prefix[..16], b"testing 1 2 3...");
    }
}
