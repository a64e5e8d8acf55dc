//! Table of the files opened in a session.
use crate::fs::{
    FileError, FileResult,
    fat::{
        Cluster,
        dirent::{Attributes, EntryLocation, ShortName},
    },
};
use hashbrown::HashMap;

/// Maximum number of files open at the same time.
pub const MAX_OPEN_FILES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    /// Parses a command-line mode flag: `-r`, `-w`, `-rw` or `-wr`.
    pub fn from_flag(flag: &str) -> FileResult<Self> {
        match flag {
            "-r" => Ok(Self::Read),
            "-w" => Ok(Self::Write),
            "-rw" | "-wr" => Ok(Self::ReadWrite),
            _ => Err(FileError::InvalidMode),
        }
    }

    #[must_use]
    #[inline]
    pub const fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[must_use]
    #[inline]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::ReadWrite => "rw",
        }
    }
}

impl core::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// State of one open file.
pub struct OpenFile {
    name: ShortName,
    cluster: Cluster,
    size: u32,
    attributes: Attributes,
    mode: AccessMode,
    offset: u32,
    location: EntryLocation,
    path: String,
}

impl OpenFile {
    #[must_use]
    pub const fn new(
        name: ShortName,
        cluster: Cluster,
        size: u32,
        attributes: Attributes,
        mode: AccessMode,
        location: EntryLocation,
        path: String,
    ) -> Self {
        Self {
            name,
            cluster,
            size,
            attributes,
            mode,
            offset: 0,
            location,
            path,
        }
    }

    #[must_use]
    #[inline]
    pub const fn name(&self) -> &ShortName {
        &self.name
    }

    #[must_use]
    #[inline]
    /// First cluster of the data, [`Cluster::NONE`] while the file is empty.
    pub const fn cluster(&self) -> Cluster {
        self.cluster
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    #[inline]
    pub const fn attributes(&self) -> Attributes {
        self.attributes
    }

    #[must_use]
    #[inline]
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }

    #[must_use]
    #[inline]
    /// Current byte position.
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    #[must_use]
    #[inline]
    /// Where the backing directory entry lives.
    pub const fn location(&self) -> EntryLocation {
        self.location
    }

    #[must_use]
    #[inline]
    /// Absolute path of the file at the time it was opened.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Moves the cursor. Positions past the end of the file are refused.
    pub const fn seek(&mut self, offset: u32) -> FileResult<()> {
        if offset > self.size {
            return Err(FileError::OffsetOutOfRange);
        }
        self.offset = offset;
        Ok(())
    }

    #[inline]
    pub(crate) const fn advance(&mut self, count: u32) {
        self.offset += count;
    }

    #[inline]
    pub(crate) const fn set_cluster(&mut self, cluster: Cluster) {
        self.cluster = cluster;
    }

    #[inline]
    pub(crate) const fn set_size(&mut self, size: u32) {
        self.size = size;
    }
}

/// Fixed-capacity table of open files, indexed by name.
///
/// Slots keep their index for as long as the file stays open, which is the
/// number `lsof` reports.
pub struct OpenFiles {
    slots: [Option<OpenFile>; MAX_OPEN_FILES],
    by_name: HashMap<ShortName, usize>,
}

impl Default for OpenFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenFiles {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
            by_name: HashMap::with_capacity(MAX_OPEN_FILES),
        }
    }

    #[must_use]
    #[inline]
    pub fn is_open(&self, name: &ShortName) -> bool {
        self.by_name.contains_key(name)
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == MAX_OPEN_FILES
    }

    /// Registers `file` in the lowest free slot and returns the slot index.
    pub fn insert(&mut self, file: OpenFile) -> FileResult<usize> {
        if self.is_open(file.name()) {
            return Err(FileError::AlreadyOpen);
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FileError::TooManyOpenFiles)?;

        self.by_name.insert(*file.name(), index);
        self.slots[index] = Some(file);
        Ok(index)
    }

    pub fn remove(&mut self, name: &ShortName) -> FileResult<OpenFile> {
        let index = self.by_name.remove(name).ok_or(FileError::NotOpened)?;
        self.slots[index].take().ok_or(FileError::NotOpened)
    }

    pub fn get(&self, name: &ShortName) -> FileResult<&OpenFile> {
        let index = *self.by_name.get(name).ok_or(FileError::NotOpened)?;
        self.slots[index].as_ref().ok_or(FileError::NotOpened)
    }

    pub fn get_mut(&mut self, name: &ShortName) -> FileResult<&mut OpenFile> {
        let index = *self.by_name.get(name).ok_or(FileError::NotOpened)?;
        self.slots[index].as_mut().ok_or(FileError::NotOpened)
    }

    /// Open files with their slot index, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &OpenFile)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|file| (index, file)))
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.slots = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_file(name: &str, mode: AccessMode) -> OpenFile {
        OpenFile::new(
            ShortName::parse(name).unwrap(),
            Cluster::NONE,
            100,
            Attributes::default(),
            mode,
            EntryLocation {
                sector: 0,
                offset: 0,
            },
            format!("/{name}"),
        )
    }

    #[test]
    fn test_mode_flags() {
        assert_eq!(AccessMode::from_flag("-r"), Ok(AccessMode::Read));
        assert_eq!(AccessMode::from_flag("-w"), Ok(AccessMode::Write));
        assert_eq!(AccessMode::from_flag("-rw"), Ok(AccessMode::ReadWrite));
        assert_eq!(AccessMode::from_flag("-wr"), Ok(AccessMode::ReadWrite));
        for bad in ["r", "-x", "-rwx", ""] {
            assert_eq!(AccessMode::from_flag(bad), Err(FileError::InvalidMode));
        }
        assert!(AccessMode::ReadWrite.can_read() && AccessMode::ReadWrite.can_write());
        assert!(!AccessMode::Write.can_read());
        assert!(!AccessMode::Read.can_write());
        assert_eq!(AccessMode::ReadWrite.to_string(), "rw");
    }

    #[test]
    fn test_open_exclusivity() {
        let mut files = OpenFiles::new();
        assert_eq!(files.insert(open_file("a", AccessMode::Read)), Ok(0));
        assert_eq!(
            files.insert(open_file("A", AccessMode::Write)),
            Err(FileError::AlreadyOpen)
        );
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_capacity_and_slot_reuse() {
        let mut files = OpenFiles::new();
        for i in 0..MAX_OPEN_FILES {
            assert_eq!(files.insert(open_file(&format!("f{i}"), AccessMode::Read)), Ok(i));
        }
        assert!(files.is_full());
        assert_eq!(
            files.insert(open_file("extra", AccessMode::Read)),
            Err(FileError::TooManyOpenFiles)
        );

        let name = ShortName::parse("f3").unwrap();
        assert_eq!(files.remove(&name).unwrap().path(), "/f3");
        assert_eq!(files.remove(&name), Err(FileError::NotOpened));
        assert_eq!(files.insert(open_file("extra", AccessMode::Read)), Ok(3));

        let order = files.iter().map(|(i, _)| i).collect::<Vec<_>>();
        assert_eq!(order, (0..MAX_OPEN_FILES).collect::<Vec<_>>());

        files.clear();
        assert!(files.is_empty());
        assert_eq!(files.iter().count(), 0);
    }

    #[test]
    fn test_seek_bounds() {
        let mut file = open_file("s", AccessMode::Read);
        assert_eq!(file.seek(100), Ok(()));
        assert_eq!(file.offset(), 100);
        assert_eq!(file.seek(101), Err(FileError::OffsetOutOfRange));
        assert_eq!(file.offset(), 100);
    }
}
