//! File Allocation Table (FAT32) engine.
//!
//! All state lives in a [`Volume`]: the sector I/O layer and the geometry parsed
//! from the boot sector. FAT access, chain allocation, directory indexing and the
//! data stream are split across submodules as separate `impl` blocks.
use crate::BlockDevice;
use bs::Geometry;
use sector::SectorIo;

pub mod bs;
pub mod dir;
pub mod dirent;
#[expect(clippy::module_inception, reason = "FS is named after this table")]
pub mod fat;
pub mod file;
pub mod sector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cluster(u32);

impl Cluster {
    /// Marker used by directory entries that own no chain.
    pub const NONE: Self = Self(0);
    /// First cluster number that maps to the data region.
    pub const FIRST_DATA: u32 = 2;
    /// Largest value that can still be a link to another cluster.
    pub const MAX_LINK: u32 = 0x0FFF_FFF6;

    #[must_use]
    #[inline]
    pub const fn new(cluster: u32) -> Self {
        Self(cluster)
    }

    #[must_use]
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[must_use]
    #[inline]
    /// Returns true if the entry owns no chain (cluster 0).
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    #[inline]
    /// Returns true if the value can be a link in a FAT32 chain.
    pub const fn is_valid(&self) -> bool {
        self.0 >= Self::FIRST_DATA && self.0 <= Self::MAX_LINK
    }
}

impl core::fmt::Display for Cluster {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mounted FAT32 volume.
pub struct Volume<D: BlockDevice> {
    io: SectorIo<D>,
    geometry: Geometry,
}

impl<D: BlockDevice> Volume<D> {
    /// Reads the boot sector and derives the volume geometry.
    ///
    /// Nothing is kept if the boot sector cannot be read or is not a usable FAT32 one.
    pub fn mount(mut device: D) -> crate::fs::FileResult<Self> {
        let mut boot = [0u8; bs::BOOT_SECTOR_SIZE];
        device.read(&mut boot, 0)?;
        let image_size = device.len()?;
        let geometry = Geometry::from_boot_sector(&boot, image_size)?;

        log::info!(
            "mounted FAT32 volume: {} bytes/sector, {} sectors/cluster, {} clusters",
            geometry.bytes_per_sector(),
            geometry.sectors_per_cluster(),
            geometry.total_clusters()
        );

        Ok(Self {
            io: SectorIo::new(device, geometry.bytes_per_sector()),
            geometry,
        })
    }

    #[must_use]
    #[inline]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    #[inline]
    /// Returns a zeroed buffer of one sector.
    pub(crate) fn sector_buffer(&self) -> Vec<u8> {
        vec![0; self.geometry.bytes_per_sector() as usize]
    }

    #[inline]
    /// Flushes and gives back the backing device.
    pub fn into_device(self) -> crate::fs::FileResult<D> {
        self.io.into_device()
    }
}
