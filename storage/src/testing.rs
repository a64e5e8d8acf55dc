//! Builds small, freshly formatted FAT32 images in memory.
use crate::{
    dev::MemDevice,
    fs::fat::{
        Volume,
        bs::{BOOT_SECTOR_SIZE, BootParams},
    },
    session::VolumeSession,
};

pub const RESERVED_SECTORS: u32 = 32;
pub const ROOT_CLUSTER: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct ImageBuilder {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    fat_count: u8,
    total_sectors: u32,
}

impl ImageBuilder {
    /// 2 MiB image with 512-byte sectors and one sector per cluster.
    pub const fn new() -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            fat_count: 2,
            total_sectors: 4096,
        }
    }

    pub const fn bytes_per_sector(mut self, bytes_per_sector: u16) -> Self {
        self.bytes_per_sector = bytes_per_sector;
        self
    }

    pub const fn sectors_per_cluster(mut self, sectors_per_cluster: u8) -> Self {
        self.sectors_per_cluster = sectors_per_cluster;
        self
    }

    pub const fn fat_count(mut self, fat_count: u8) -> Self {
        self.fat_count = fat_count;
        self
    }

    pub const fn total_sectors(mut self, total_sectors: u32) -> Self {
        self.total_sectors = total_sectors;
        self
    }

    pub fn sectors_per_fat(&self) -> u32 {
        let slots = self.total_sectors / u32::from(self.sectors_per_cluster) + 2;
        (slots * 4).div_ceil(u32::from(self.bytes_per_sector))
    }

    /// Lays out the boot sector, every FAT copy and an empty root directory.
    pub fn build(&self) -> MemDevice {
        let bytes_per_sector = u32::from(self.bytes_per_sector);
        let sectors_per_fat = self.sectors_per_fat();
        let params = BootParams::new()
            .with_bytes_per_sector(self.bytes_per_sector)
            .with_sectors_per_cluster(self.sectors_per_cluster)
            .with_reserved_sectors(RESERVED_SECTORS as u16)
            .with_fat_count(self.fat_count)
            .with_sectors_per_fat(sectors_per_fat)
            .with_total_sectors(self.total_sectors)
            .with_root_cluster(ROOT_CLUSTER);

        let mut data = vec![0u8; (self.total_sectors * bytes_per_sector) as usize];
        let mut boot = [0u8; BOOT_SECTOR_SIZE];
        params.encode(&mut boot);
        data[..BOOT_SECTOR_SIZE].copy_from_slice(&boot);

        for copy in 0..u32::from(self.fat_count) {
            let base = ((RESERVED_SECTORS + copy * sectors_per_fat) * bytes_per_sector) as usize;
            // Media descriptor, reserved entry, end of the root directory chain.
            for (slot, value) in [0x0FFF_FFF8u32, 0x0FFF_FFFF, 0x0FFF_FFFF].iter().enumerate() {
                data[base + slot * 4..base + slot * 4 + 4].copy_from_slice(&value.to_le_bytes());
            }
        }

        MemDevice::from_vec(data)
    }

    pub fn mount(&self) -> Volume<MemDevice> {
        Volume::mount(self.build()).unwrap()
    }

    pub fn session(&self) -> VolumeSession<MemDevice> {
        VolumeSession::from_device(self.build(), "test.img").unwrap()
    }
}

/// Reads the raw 32-bit FAT slot of `cluster` in FAT copy `copy`.
pub fn raw_fat_slot(image: &[u8], builder: &ImageBuilder, copy: u32, cluster: u32) -> u32 {
    let bytes_per_sector = u32::from(builder.bytes_per_sector);
    let fat_start = (RESERVED_SECTORS + copy * builder.sectors_per_fat()) * bytes_per_sector;
    let at = (fat_start + cluster * 4) as usize;
    u32::from_le_bytes([image[at], image[at + 1], image[at + 2], image[at + 3]])
}
