//! On-disk directory entry codec.
//!
//! Only the 8.3 short entries are decoded. Long-name entries are recognised by
//! their attribute byte and otherwise left alone.
use super::Cluster;
use crate::fs::{FileError, FileResult};

/// Size of one directory record.
pub const ENTRY_SIZE: usize = 32;
/// Length of a short name, without any separator.
pub const MAX_NAME_LEN: usize = 11;

mod offset {
    pub const NAME: usize = 0;
    pub const ATTRIBUTES: usize = 11;
    pub const CLUSTER_HIGH: usize = 20;
    pub const CLUSTER_LOW: usize = 26;
    pub const SIZE: usize = 28;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Attributes(u8);

impl Attributes {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    pub const LONG_NAME: u8 = Self::READ_ONLY | Self::HIDDEN | Self::SYSTEM | Self::VOLUME_ID;
    pub const LONG_NAME_MASK: u8 = Self::LONG_NAME | Self::DIRECTORY | Self::ARCHIVE;

    #[must_use]
    #[inline]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    #[must_use]
    #[inline]
    pub const fn is_long_name(self) -> bool {
        self.0 & Self::LONG_NAME_MASK == Self::LONG_NAME
    }

    #[must_use]
    #[inline]
    pub const fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }

    #[must_use]
    #[inline]
    /// Returns true for the volume label, which is not a file.
    pub const fn is_volume_label(self) -> bool {
        !self.is_long_name() && self.contains(Self::VOLUME_ID)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
/// A normalised short name: uppercase ASCII, right-padded with spaces.
pub struct ShortName([u8; MAX_NAME_LEN]);

impl ShortName {
    pub const DOT: Self = Self(*b".          ");
    pub const DOTDOT: Self = Self(*b"..         ");

    /// Validates a user supplied name and normalises it.
    ///
    /// Names are 1 to 11 printable ASCII characters without `/`. `.` and `..`
    /// are reserved for the directory links.
    pub fn parse(name: &str) -> FileResult<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty()
            || bytes.len() > MAX_NAME_LEN
            || !bytes.iter().all(|&b| b.is_ascii_graphic() && b != b'/')
            || name == "."
            || name == ".."
        {
            return Err(FileError::InvalidName);
        }

        let mut raw = [b' '; MAX_NAME_LEN];
        for (dst, src) in raw.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self(raw))
    }

    #[must_use]
    #[inline]
    pub const fn from_raw(raw: [u8; MAX_NAME_LEN]) -> Self {
        Self(raw)
    }

    #[must_use]
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; MAX_NAME_LEN] {
        &self.0
    }

    #[must_use]
    /// Returns the name without its padding.
    pub fn trimmed(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != b' ')
            .map_or(0, |last| last + 1);
        &self.0[..end]
    }

    #[must_use]
    #[inline]
    /// Case-insensitive comparison of the padded names.
    pub fn matches(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    #[must_use]
    #[inline]
    pub fn is_dot_link(&self) -> bool {
        *self == Self::DOT || *self == Self::DOTDOT
    }
}

impl core::fmt::Display for ShortName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.trimmed()))
    }
}

impl core::fmt::Debug for ShortName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ShortName({self})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The decoded fields of a short directory entry.
pub struct DirEntry {
    name: ShortName,
    attributes: Attributes,
    cluster: Cluster,
    size: u32,
}

impl DirEntry {
    /// Name byte of a deleted entry.
    pub const DELETED_ENTRY: u8 = 0xE5;
    /// Name byte marking the end of the populated entries.
    pub const END_OF_ENTRIES: u8 = 0x00;

    #[must_use]
    #[inline]
    pub const fn new(name: ShortName, attributes: Attributes, cluster: Cluster, size: u32) -> Self {
        Self {
            name,
            attributes,
            cluster,
            size,
        }
    }

    #[must_use]
    /// Decodes the modelled fields of a 32-byte record.
    pub fn decode(raw: &[u8]) -> Self {
        let mut name = [0; MAX_NAME_LEN];
        name.copy_from_slice(&raw[offset::NAME..offset::NAME + MAX_NAME_LEN]);
        let high = u16::from_le_bytes([raw[offset::CLUSTER_HIGH], raw[offset::CLUSTER_HIGH + 1]]);
        let low = u16::from_le_bytes([raw[offset::CLUSTER_LOW], raw[offset::CLUSTER_LOW + 1]]);
        let size = u32::from_le_bytes([
            raw[offset::SIZE],
            raw[offset::SIZE + 1],
            raw[offset::SIZE + 2],
            raw[offset::SIZE + 3],
        ]);

        Self {
            name: ShortName::from_raw(name),
            attributes: Attributes::new(raw[offset::ATTRIBUTES]),
            cluster: Cluster::new((u32::from(high) << 16) | u32::from(low)),
            size,
        }
    }

    /// Writes the modelled fields into a 32-byte record.
    ///
    /// Timestamps and the other bytes already in `raw` are kept.
    pub fn encode_into(&self, raw: &mut [u8]) {
        let cluster = self.cluster.value();
        raw[offset::NAME..offset::NAME + MAX_NAME_LEN].copy_from_slice(self.name.as_bytes());
        raw[offset::ATTRIBUTES] = self.attributes.bits();
        raw[offset::CLUSTER_HIGH..offset::CLUSTER_HIGH + 2]
            .copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        raw[offset::CLUSTER_LOW..offset::CLUSTER_LOW + 2]
            .copy_from_slice(&((cluster & 0xFFFF) as u16).to_le_bytes());
        raw[offset::SIZE..offset::SIZE + 4].copy_from_slice(&self.size.to_le_bytes());
    }

    #[must_use]
    #[inline]
    pub const fn name(&self) -> &ShortName {
        &self.name
    }

    #[inline]
    pub const fn set_name(&mut self, name: ShortName) {
        self.name = name;
    }

    #[must_use]
    #[inline]
    pub const fn attributes(&self) -> Attributes {
        self.attributes
    }

    #[must_use]
    #[inline]
    pub const fn cluster(&self) -> Cluster {
        self.cluster
    }

    #[inline]
    pub const fn set_cluster(&mut self, cluster: Cluster) {
        self.cluster = cluster;
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub const fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    #[must_use]
    #[inline]
    pub const fn is_dir(&self) -> bool {
        self.attributes.is_directory()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What a 32-byte directory slot holds.
pub enum Slot {
    /// No entry here or after.
    End,
    /// A deleted entry, free for reuse.
    Deleted,
    /// A long-name fragment.
    LongName,
    /// A short entry in use.
    Used(DirEntry),
}

impl Slot {
    #[must_use]
    pub fn classify(raw: &[u8]) -> Self {
        match raw[offset::NAME] {
            DirEntry::END_OF_ENTRIES => Self::End,
            DirEntry::DELETED_ENTRY => Self::Deleted,
            _ if Attributes::new(raw[offset::ATTRIBUTES]).is_long_name() => Self::LongName,
            _ => Self::Used(DirEntry::decode(raw)),
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::End | Self::Deleted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a directory entry lives on disk.
pub struct EntryLocation {
    /// Absolute sector number.
    pub sector: u32,
    /// Byte offset of the record within the sector.
    pub offset: usize,
}
