use super::{Cluster, Volume};
use crate::{
    BlockDevice,
    fs::{FileError, FileResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// FAT32 table entry
pub enum FatEntry {
    /// Free cluster
    Free,
    /// Used cluster, pointing to the next cluster in the chain
    Next(Cluster),
    /// Last cluster in the chain
    EndOfChain,
    /// Bad cluster
    Bad,
    /// Reserved cluster
    Reserved,
}

impl FatEntry {
    const MASK: u32 = 0x0FFF_FFFF;
    const BAD: u32 = 0x0FFF_FFF7;
    const END_OF_CHAIN: u32 = 0x0FFF_FFFF;

    #[must_use]
    /// Decodes the 28 significant bits of a raw slot.
    pub const fn from_raw(raw: u32) -> Self {
        match raw & Self::MASK {
            0 => Self::Free,
            1 => Self::Reserved,
            Self::BAD => Self::Bad,
            0x0FFF_FFF8..=0x0FFF_FFFF => Self::EndOfChain,
            val => Self::Next(Cluster::new(val)),
        }
    }

    #[must_use]
    /// Encodes the entry into its 28-bit value.
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Free => 0,
            Self::Reserved => 1,
            Self::Next(next) => next.value() & Self::MASK,
            Self::Bad => Self::BAD,
            Self::EndOfChain => Self::END_OF_CHAIN,
        }
    }
}

/// Reads the entry stored at byte `offset` of a FAT sector.
pub(crate) fn read_fat_entry(sector: &[u8], offset: usize) -> FatEntry {
    let raw = u32::from_le_bytes([
        sector[offset],
        sector[offset + 1],
        sector[offset + 2],
        sector[offset + 3],
    ]);
    FatEntry::from_raw(raw)
}

/// Writes `entry` at byte `offset` of a FAT sector.
///
/// The 4 high bits of the slot are reserved and kept as they were.
pub(crate) fn write_fat_entry(sector: &mut [u8], offset: usize, entry: FatEntry) {
    let old = u32::from_le_bytes([
        sector[offset],
        sector[offset + 1],
        sector[offset + 2],
        sector[offset + 3],
    ]);
    let value = (old & !FatEntry::MASK) | entry.to_raw();
    sector[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Collection of FAT entries
///
/// Allocation and chain handling are provided on top of `get` and `set`, so any
/// backing store (the on-disk table, an in-memory copy) gets them for free.
pub trait FatEntries {
    #[must_use]
    /// Exclusive upper bound of the cluster numbers the table addresses.
    fn cluster_limit(&self) -> u32;

    /// Returns the entry value for the given cluster
    fn get(&mut self, cluster: Cluster) -> FileResult<FatEntry>;

    /// Sets the entry value for the given cluster
    fn set(&mut self, cluster: Cluster, entry: FatEntry) -> FileResult<()>;

    #[must_use]
    /// Returns an iterator over all clusters in a chain starting from the given cluster
    fn chain_iter(&mut self, start: Cluster) -> FatChainIter<'_, Self>
    where
        Self: Sized,
    {
        FatChainIter {
            budget: self.cluster_limit(),
            fat: self,
            next: Some(start),
        }
    }

    /// Allocates a new cluster and returns its number
    ///
    /// The cluster is marked as the end of a chain.
    fn alloc_cluster(&mut self) -> FileResult<Cluster> {
        for value in Cluster::FIRST_DATA..self.cluster_limit() {
            let cluster = Cluster::new(value);
            if self.get(cluster)? == FatEntry::Free {
                self.set(cluster, FatEntry::EndOfChain)?;
                log::debug!("allocated cluster {cluster}");
                return Ok(cluster);
            }
        }
        Err(FileError::NoSpace)
    }

    /// Allocates a chain of clusters and returns the first cluster number
    ///
    /// On failure, the clusters already taken are released.
    fn alloc_cluster_chain(&mut self, count: u32) -> FileResult<Cluster> {
        if count == 0 {
            return Err(FileError::InvalidParameter);
        }

        let head = self.alloc_cluster()?;
        let mut tail = head;
        for _ in 1..count {
            let linked = self
                .alloc_cluster()
                .and_then(|next| self.set(tail, FatEntry::Next(next)).map(|()| next));
            match linked {
                Ok(next) => tail = next,
                Err(err) => {
                    self.free_cluster_chain(head);
                    return Err(err);
                }
            }
        }
        Ok(head)
    }

    /// Frees a chain of clusters starting from the given cluster
    ///
    /// This is best effort: a failing access stops the walk and is logged.
    /// Returns the number of clusters released.
    fn free_cluster_chain(&mut self, start: Cluster) -> u32 {
        let mut current = start;
        let mut freed = 0;

        while current.is_valid() && freed < self.cluster_limit() {
            let next = match self.get(current) {
                Ok(FatEntry::Free) => break,
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("stopped freeing chain {start} at cluster {current}: {err}");
                    break;
                }
            };
            if let Err(err) = self.set(current, FatEntry::Free) {
                log::warn!("could not free cluster {current} of chain {start}: {err}");
                break;
            }
            freed += 1;

            match next {
                FatEntry::Next(link) if link != current => current = link,
                _ => break,
            }
        }

        log::debug!("freed {freed} cluster(s) from chain {start}");
        freed
    }

    /// Returns the number of clusters in a chain
    fn chain_len(&mut self, start: Cluster) -> FileResult<u32>
    where
        Self: Sized,
    {
        let mut len = 0;
        for cluster in self.chain_iter(start) {
            cluster?;
            len += 1;
        }
        Ok(len)
    }

    /// Returns the last cluster of a chain
    fn chain_tail(&mut self, start: Cluster) -> FileResult<Cluster>
    where
        Self: Sized,
    {
        let mut tail = start;
        for cluster in self.chain_iter(start) {
            tail = cluster?;
        }
        Ok(tail)
    }

    /// Grows the chain at `start` so it can hold `new_size` bytes.
    ///
    /// An empty chain (`start` is [`Cluster::NONE`]) gets a head cluster, which
    /// is written back through `start`. Nothing happens when the chain is
    /// already long enough. If allocation fails midway the clusters added so
    /// far stay linked.
    fn extend_chain(
        &mut self,
        start: &mut Cluster,
        old_size: u32,
        new_size: u32,
        bytes_per_cluster: u32,
    ) -> FileResult<()>
    where
        Self: Sized,
    {
        let needed = new_size.div_ceil(bytes_per_cluster);
        if needed <= old_size.div_ceil(bytes_per_cluster) && !(start.is_none() && needed > 0) {
            return Ok(());
        }

        let (mut tail, mut len) = if start.is_none() {
            let head = self.alloc_cluster()?;
            *start = head;
            (head, 1)
        } else {
            let mut tail = *start;
            let mut len = 0;
            for cluster in self.chain_iter(*start) {
                tail = cluster?;
                len += 1;
            }
            (tail, len)
        };

        while len < needed {
            let next = self.alloc_cluster()?;
            self.set(tail, FatEntry::Next(next))?;
            tail = next;
            len += 1;
        }

        log::debug!("chain {start} extended to {len} cluster(s)");
        Ok(())
    }
}

/// Iterator over a chain of clusters
///
/// Yields `Err(InvalidChain)` and stops when a link is not a valid cluster, or
/// when the chain is longer than the table itself (a loop).
pub struct FatChainIter<'a, T: FatEntries> {
    fat: &'a mut T,
    next: Option<Cluster>,
    budget: u32,
}

impl<T: FatEntries> Iterator for FatChainIter<'_, T> {
    type Item = FileResult<Cluster>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;

        if self.budget == 0 {
            return Some(Err(FileError::InvalidChain));
        }
        self.budget -= 1;

        match self.fat.get(current) {
            Ok(FatEntry::Next(next)) => self.next = Some(next),
            Ok(FatEntry::EndOfChain) => {}
            Ok(_) => return Some(Err(FileError::InvalidChain)),
            Err(err) => return Some(Err(err)),
        }

        Some(Ok(current))
    }
}

impl<D: BlockDevice> Volume<D> {
    /// Returns the sector of the first FAT holding `cluster` and the byte offset within it.
    fn fat_position(&self, cluster: Cluster) -> (u32, usize) {
        let bytes_per_sector = self.geometry.bytes_per_sector();
        let byte = cluster.value() * 4;
        (byte / bytes_per_sector, (byte % bytes_per_sector) as usize)
    }

    pub(super) fn check_cluster(&self, cluster: Cluster) -> FileResult<()> {
        if self.geometry.is_data_cluster(cluster.value()) {
            Ok(())
        } else {
            Err(FileError::InvalidChain)
        }
    }
}

impl<D: BlockDevice> FatEntries for Volume<D> {
    fn cluster_limit(&self) -> u32 {
        self.geometry.cluster_limit()
    }

    fn get(&mut self, cluster: Cluster) -> FileResult<FatEntry> {
        self.check_cluster(cluster)?;
        let (index, offset) = self.fat_position(cluster);

        let mut sector = self.sector_buffer();
        self.io
            .read_sector(self.geometry.first_fat_sector() + index, &mut sector)?;
        Ok(read_fat_entry(&sector, offset))
    }

    fn set(&mut self, cluster: Cluster, entry: FatEntry) -> FileResult<()> {
        self.check_cluster(cluster)?;
        let (index, offset) = self.fat_position(cluster);

        let mut sector = self.sector_buffer();
        self.io
            .read_sector(self.geometry.first_fat_sector() + index, &mut sector)?;
        write_fat_entry(&mut sector, offset, entry);

        // Primary copy first, then every mirror in order.
        for copy in 0..self.geometry.fat_count() {
            let target =
                self.geometry.first_fat_sector() + copy * self.geometry.sectors_per_fat() + index;
            self.io.write_sector(target, &sector)?;
        }
        Ok(())
    }
}
