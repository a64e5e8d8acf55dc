//! Whole-sector transfers against the backing device.
use crate::{
    BlockDevice,
    fs::{FileError, FileResult},
};

pub struct SectorIo<D: BlockDevice> {
    device: D,
    bytes_per_sector: u32,
}

impl<D: BlockDevice> SectorIo<D> {
    #[must_use]
    #[inline]
    pub const fn new(device: D, bytes_per_sector: u32) -> Self {
        Self {
            device,
            bytes_per_sector,
        }
    }

    #[must_use]
    #[inline]
    pub const fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    #[inline]
    fn check_len(&self, len: usize) -> FileResult<()> {
        if len == self.bytes_per_sector as usize {
            Ok(())
        } else {
            Err(FileError::Io)
        }
    }

    /// Reads the sector at absolute index `sector` into `buf`.
    ///
    /// `buf` must be exactly one sector long.
    pub fn read_sector(&mut self, sector: u32, buf: &mut [u8]) -> FileResult<()> {
        self.check_len(buf.len())?;
        let offset = u64::from(sector) * u64::from(self.bytes_per_sector);
        self.device.read(buf, offset)?;
        Ok(())
    }

    /// Writes `buf` to the sector at absolute index `sector`.
    ///
    /// `buf` must be exactly one sector long.
    pub fn write_sector(&mut self, sector: u32, buf: &[u8]) -> FileResult<()> {
        self.check_len(buf.len())?;
        let offset = u64::from(sector) * u64::from(self.bytes_per_sector);
        self.device.write(buf, offset)?;
        Ok(())
    }

    pub fn into_device(mut self) -> FileResult<D> {
        self.device.flush()?;
        Ok(self.device)
    }
}
