//! Concrete backing stores for a FAT volume.
use crate::{BlockDevice, BlockDeviceError};
use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

#[derive(Debug)]
/// A disk image file opened for reading and writing.
pub struct ImageFile {
    file: File,
}

impl ImageFile {
    /// Opens an existing image file in read/write mode.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    #[must_use]
    #[inline]
    pub const fn from_file(file: File) -> Self {
        Self { file }
    }
}

impl BlockDevice for ImageFile {
    fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), BlockDeviceError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|_| BlockDeviceError::Io)?;
        self.file.read_exact(dst).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => BlockDeviceError::OutOfBounds,
            _ => BlockDeviceError::Io,
        })
    }

    fn write(&mut self, src: &[u8], offset: u64) -> Result<(), BlockDeviceError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|_| BlockDeviceError::Io)?;
        self.file.write_all(src).map_err(|_| BlockDeviceError::Io)
    }

    fn len(&mut self) -> Result<u64, BlockDeviceError> {
        self.file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|_| BlockDeviceError::Io)
    }

    fn flush(&mut self) -> Result<(), BlockDeviceError> {
        self.file.sync_all().map_err(|_| BlockDeviceError::Io)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// A volume held entirely in memory.
///
/// Writes past the end fail instead of growing the buffer, like a real disk.
pub struct MemDevice {
    data: Vec<u8>,
}

impl MemDevice {
    #[must_use]
    #[inline]
    /// Creates a zero-filled device of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    #[must_use]
    #[inline]
    pub const fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[must_use]
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    fn range(&self, offset: u64, len: usize) -> Result<core::ops::Range<usize>, BlockDeviceError> {
        let start = usize::try_from(offset).map_err(|_| BlockDeviceError::OutOfBounds)?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(BlockDeviceError::OutOfBounds)?;
        Ok(start..end)
    }
}

impl BlockDevice for MemDevice {
    fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), BlockDeviceError> {
        let range = self.range(offset, dst.len())?;
        dst.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, src: &[u8], offset: u64) -> Result<(), BlockDeviceError> {
        let range = self.range(offset, src.len())?;
        self.data[range].copy_from_slice(src);
        Ok(())
    }

    #[inline]
    fn len(&mut self) -> Result<u64, BlockDeviceError> {
        Ok(self.data.len() as u64)
    }
}
