use crate::BlockDeviceError;
use thiserror::Error;

pub mod fat;

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum FileError {
    #[error("No such file or directory")]
    NotFound,
    #[error("Name already exists")]
    AlreadyExists,
    #[error("Not a directory")]
    NotADirectory,
    #[error("Is a directory")]
    IsADirectory,
    #[error("Directory not empty")]
    NotEmpty,
    #[error("No space left on volume")]
    NoSpace,
    #[error("Invalid mode (expected -r, -w, -rw or -wr)")]
    InvalidMode,
    #[error("Too many open files")]
    TooManyOpenFiles,
    #[error("File already opened")]
    AlreadyOpen,
    #[error("File not opened")]
    NotOpened,
    #[error("File not opened for reading")]
    NotOpenedForReading,
    #[error("File not opened for writing")]
    NotOpenedForWriting,
    #[error("Offset larger than file size")]
    OffsetOutOfRange,
    #[error("Invalid cluster chain")]
    InvalidChain,
    #[error("I/O error")]
    Io,
    #[error("Path too long")]
    PathTooLong,
    #[error("Invalid file name")]
    InvalidName,
    #[error("Invalid boot sector")]
    InvalidBootSector,
    #[error("Invalid parameter")]
    InvalidParameter,
}

impl From<BlockDeviceError> for FileError {
    fn from(error: BlockDeviceError) -> Self {
        match error {
            BlockDeviceError::Io | BlockDeviceError::OutOfBounds | BlockDeviceError::Unsupported => {
                Self::Io
            }
        }
    }
}

pub type FileResult<T> = Result<T, FileError>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FileType {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FileMetadata {
    size: u32,
    file_type: FileType,
}

impl FileMetadata {
    #[must_use]
    #[inline]
    pub const fn new(size: u32, file_type: FileType) -> Self {
        Self { size, file_type }
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    #[inline]
    pub const fn file_type(&self) -> FileType {
        self.file_type
    }

    #[must_use]
    #[inline]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_errors_surface_as_io() {
        assert_eq!(FileError::from(BlockDeviceError::Io), FileError::Io);
        assert_eq!(FileError::from(BlockDeviceError::OutOfBounds), FileError::Io);
        assert_eq!(FileError::from(BlockDeviceError::Unsupported), FileError::Io);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(FileError::NotOpened.to_string(), "File not opened");
        assert_eq!(
            FileError::OffsetOutOfRange.to_string(),
            "Offset larger than file size"
        );
    }
}
