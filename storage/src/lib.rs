//! FAT32 engine operating directly on raw disk images.
#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use thiserror::Error;

pub mod dev;
pub mod fs;
pub mod session;
pub mod vfs;

#[cfg(test)]
pub(crate) mod testing;

pub use session::VolumeSession;

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
/// An error that can occur when performing block device operations.
pub enum BlockDeviceError {
    #[error("I/O error")]
    Io,
    #[error("Out of bounds")]
    OutOfBounds,
    #[error("Unsupported operation")]
    Unsupported,
}

/// A trait for byte-addressed backing stores.
///
/// The FAT engine only ever transfers whole sectors, but the sector size is only
/// known once the boot sector has been parsed, so devices are addressed in bytes.
pub trait BlockDevice {
    /// Read `dst.len()` bytes starting at byte `offset`.
    ///
    /// ## Errors
    ///
    /// This function returns an error if the read operation failed
    /// or could not be completed in full.
    fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), BlockDeviceError>;
    /// Write all of `src` starting at byte `offset`.
    ///
    /// ## Errors
    ///
    /// This function returns an error if the write operation failed
    /// or could not be completed in full.
    fn write(&mut self, src: &[u8], offset: u64) -> Result<(), BlockDeviceError>;
    /// Total size of the device in bytes.
    fn len(&mut self) -> Result<u64, BlockDeviceError>;

    /// Flush any buffered writes to the underlying medium.
    fn flush(&mut self) -> Result<(), BlockDeviceError> {
        Ok(())
    }

    #[inline]
    fn is_empty(&mut self) -> Result<bool, BlockDeviceError> {
        self.len().map(|len| len == 0)
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    #[inline]
    fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), BlockDeviceError> {
        (**self).read(dst, offset)
    }

    #[inline]
    fn write(&mut self, src: &[u8], offset: u64) -> Result<(), BlockDeviceError> {
        (**self).write(src, offset)
    }

    #[inline]
    fn len(&mut self) -> Result<u64, BlockDeviceError> {
        (**self).len()
    }

    #[inline]
    fn flush(&mut self) -> Result<(), BlockDeviceError> {
        (**self).flush()
    }
}
