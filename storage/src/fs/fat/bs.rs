//! Boot sector decoding and the volume geometry derived from it.
use crate::fs::{FileError, FileResult};

/// Size of the boot sector read at mount time.
pub const BOOT_SECTOR_SIZE: usize = 512;
/// Boot sector signature found at offset 510.
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

mod offset {
    pub const BYTES_PER_SECTOR: usize = 11;
    pub const SECTORS_PER_CLUSTER: usize = 13;
    pub const RESERVED_SECTORS: usize = 14;
    pub const FAT_COUNT: usize = 16;
    pub const TOTAL_SECTORS_16: usize = 19;
    pub const TOTAL_SECTORS_32: usize = 32;
    pub const FAT_SIZE_32: usize = 36;
    pub const ROOT_CLUSTER: usize = 44;
    pub const SIGNATURE: usize = 510;
}

#[inline]
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The BIOS Parameter Block fields the engine relies on.
pub struct BootParams {
    /// Bytes per sector.
    ///
    /// This field is either 512, 1024, 2048, or 4096.
    bytes_per_sector: u16,
    /// Sectors per cluster.
    sectors_per_cluster: u8,
    /// Reserved sectors, including the boot sector itself.
    reserved_sectors: u16,
    /// Number of FATs.
    fat_count: u8,
    /// Total sectors in the file system.
    ///
    /// If the total number of sectors exceeds `u16::MAX`, this field is set to 0
    /// and one should use `total_sectors_large` instead.
    total_sectors: u16,
    /// Total sectors in the file system, when `total_sectors` is 0.
    total_sectors_large: u32,
    /// Sectors per FAT.
    sectors_per_fat: u32,
    /// Cluster number of the root directory.
    root_cluster: u32,
}

impl BootParams {
    #[must_use]
    #[inline]
    /// Creates a FAT32 parameter block with the usual defaults.
    pub const fn new() -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 32,
            fat_count: 2,
            total_sectors: 0,
            total_sectors_large: 0,
            sectors_per_fat: 0,
            root_cluster: 2,
        }
    }

    #[must_use]
    /// Decodes the parameter block from a raw boot sector.
    pub fn decode(sector: &[u8; BOOT_SECTOR_SIZE]) -> Self {
        Self {
            bytes_per_sector: read_u16(sector, offset::BYTES_PER_SECTOR),
            sectors_per_cluster: sector[offset::SECTORS_PER_CLUSTER],
            reserved_sectors: read_u16(sector, offset::RESERVED_SECTORS),
            fat_count: sector[offset::FAT_COUNT],
            total_sectors: read_u16(sector, offset::TOTAL_SECTORS_16),
            total_sectors_large: read_u32(sector, offset::TOTAL_SECTORS_32),
            sectors_per_fat: read_u32(sector, offset::FAT_SIZE_32),
            root_cluster: read_u32(sector, offset::ROOT_CLUSTER),
        }
    }

    /// Encodes the parameter block into a raw boot sector, including the signature.
    ///
    /// Bytes that are not part of the parameter block are left untouched.
    pub fn encode(&self, sector: &mut [u8; BOOT_SECTOR_SIZE]) {
        sector[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        sector[offset::BYTES_PER_SECTOR..offset::BYTES_PER_SECTOR + 2]
            .copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        sector[offset::SECTORS_PER_CLUSTER] = self.sectors_per_cluster;
        sector[offset::RESERVED_SECTORS..offset::RESERVED_SECTORS + 2]
            .copy_from_slice(&self.reserved_sectors.to_le_bytes());
        sector[offset::FAT_COUNT] = self.fat_count;
        sector[offset::TOTAL_SECTORS_16..offset::TOTAL_SECTORS_16 + 2]
            .copy_from_slice(&self.total_sectors.to_le_bytes());
        sector[offset::TOTAL_SECTORS_32..offset::TOTAL_SECTORS_32 + 4]
            .copy_from_slice(&self.total_sectors_large.to_le_bytes());
        sector[offset::FAT_SIZE_32..offset::FAT_SIZE_32 + 4]
            .copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        sector[offset::ROOT_CLUSTER..offset::ROOT_CLUSTER + 4]
            .copy_from_slice(&self.root_cluster.to_le_bytes());
        sector[offset::SIGNATURE..offset::SIGNATURE + 2].copy_from_slice(&BOOT_SIGNATURE);
    }

    #[must_use]
    #[inline]
    pub const fn with_bytes_per_sector(mut self, bytes_per_sector: u16) -> Self {
        self.bytes_per_sector = bytes_per_sector;
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_sectors_per_cluster(mut self, sectors_per_cluster: u8) -> Self {
        self.sectors_per_cluster = sectors_per_cluster;
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_reserved_sectors(mut self, reserved_sectors: u16) -> Self {
        self.reserved_sectors = reserved_sectors;
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_fat_count(mut self, fat_count: u8) -> Self {
        self.fat_count = fat_count;
        self
    }

    #[must_use]
    #[inline]
    /// Sets the total sector count, choosing the 16-bit field when it fits.
    pub fn with_total_sectors(mut self, total_sectors: u32) -> Self {
        if let Ok(small) = u16::try_from(total_sectors) {
            self.total_sectors = small;
            self.total_sectors_large = 0;
        } else {
            self.total_sectors = 0;
            self.total_sectors_large = total_sectors;
        }
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_sectors_per_fat(mut self, sectors_per_fat: u32) -> Self {
        self.sectors_per_fat = sectors_per_fat;
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_root_cluster(mut self, root_cluster: u32) -> Self {
        self.root_cluster = root_cluster;
        self
    }

    #[must_use]
    #[inline]
    /// Returns the number of sectors in the file system.
    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_large != 0 {
            self.total_sectors_large
        } else {
            u32::from(self.total_sectors)
        }
    }
}

impl Default for BootParams {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Layout constants of a mounted volume.
pub struct Geometry {
    bytes_per_sector: u32,
    sectors_per_cluster: u32,
    reserved_sectors: u32,
    fat_count: u32,
    sectors_per_fat: u32,
    root_cluster: u32,
    total_sectors: u32,
    total_clusters: u32,
    first_fat_sector: u32,
    first_data_sector: u32,
    image_size: u64,
}

impl Geometry {
    /// Validates a raw boot sector and derives the layout from it.
    pub fn from_boot_sector(sector: &[u8; BOOT_SECTOR_SIZE], image_size: u64) -> FileResult<Self> {
        if sector[offset::SIGNATURE..offset::SIGNATURE + 2] != BOOT_SIGNATURE {
            return Err(FileError::InvalidBootSector);
        }
        Self::from_params(&BootParams::decode(sector), image_size)
    }

    pub fn from_params(params: &BootParams, image_size: u64) -> FileResult<Self> {
        let bytes_per_sector = u32::from(params.bytes_per_sector);
        let sectors_per_cluster = u32::from(params.sectors_per_cluster);

        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096)
            || !sectors_per_cluster.is_power_of_two()
            || params.fat_count == 0
            || params.sectors_per_fat == 0
        {
            return Err(FileError::InvalidBootSector);
        }

        let reserved_sectors = u32::from(params.reserved_sectors);
        let fat_count = u32::from(params.fat_count);
        let first_data_sector = fat_count
            .checked_mul(params.sectors_per_fat)
            .and_then(|fats| fats.checked_add(reserved_sectors))
            .ok_or(FileError::InvalidBootSector)?;

        let total_sectors = params.total_sectors();
        if total_sectors <= first_data_sector {
            return Err(FileError::InvalidBootSector);
        }
        let total_clusters = (total_sectors - first_data_sector) / sectors_per_cluster;

        let root_cluster = params.root_cluster;
        if root_cluster < 2 || root_cluster >= total_clusters.saturating_add(2) {
            return Err(FileError::InvalidBootSector);
        }

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            fat_count,
            sectors_per_fat: params.sectors_per_fat,
            root_cluster,
            total_sectors,
            total_clusters,
            first_fat_sector: reserved_sectors,
            first_data_sector,
            image_size,
        })
    }

    #[must_use]
    #[inline]
    pub const fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    #[must_use]
    #[inline]
    pub const fn sectors_per_cluster(&self) -> u32 {
        self.sectors_per_cluster
    }

    #[must_use]
    #[inline]
    pub const fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    #[must_use]
    #[inline]
    pub const fn reserved_sectors(&self) -> u32 {
        self.reserved_sectors
    }

    #[must_use]
    #[inline]
    pub const fn fat_count(&self) -> u32 {
        self.fat_count
    }

    #[must_use]
    #[inline]
    pub const fn sectors_per_fat(&self) -> u32 {
        self.sectors_per_fat
    }

    #[must_use]
    #[inline]
    pub const fn root_cluster(&self) -> u32 {
        self.root_cluster
    }

    #[must_use]
    #[inline]
    pub const fn total_sectors(&self) -> u32 {
        self.total_sectors
    }

    #[must_use]
    #[inline]
    /// Number of clusters in the data region.
    pub const fn total_clusters(&self) -> u32 {
        self.total_clusters
    }

    #[must_use]
    #[inline]
    pub const fn first_fat_sector(&self) -> u32 {
        self.first_fat_sector
    }

    #[must_use]
    #[inline]
    pub const fn first_data_sector(&self) -> u32 {
        self.first_data_sector
    }

    #[must_use]
    #[inline]
    /// Size of the backing image in bytes.
    pub const fn image_size(&self) -> u64 {
        self.image_size
    }

    #[must_use]
    #[inline]
    /// Number of 4-byte slots in one FAT copy.
    pub const fn fat_entries(&self) -> u32 {
        self.sectors_per_fat * (self.bytes_per_sector / 4)
    }

    #[must_use]
    #[inline]
    /// Exclusive upper bound of addressable cluster numbers.
    ///
    /// Bounded both by the data region and by the number of FAT slots.
    pub const fn cluster_limit(&self) -> u32 {
        let data = self.total_clusters + 2;
        let slots = self.fat_entries();
        if data < slots { data } else { slots }
    }

    #[must_use]
    #[inline]
    /// Returns true if `cluster` addresses the data region.
    pub const fn is_data_cluster(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster < self.cluster_limit()
    }

    #[must_use]
    #[inline]
    /// Returns the first sector of a data cluster.
    pub const fn cluster_to_sector(&self, cluster: u32) -> u32 {
        (cluster - 2) * self.sectors_per_cluster + self.first_data_sector
    }

    #[must_use]
    #[inline]
    /// Number of clusters needed to hold `size` bytes.
    pub const fn clusters_for(&self, size: u32) -> u32 {
        size.div_ceil(self.bytes_per_cluster())
    }
}
