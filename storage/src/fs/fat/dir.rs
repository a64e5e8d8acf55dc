//! Directory index: search, insertion and deletion of entries in a directory chain.
use super::{
    Cluster, Volume,
    dirent::{Attributes, DirEntry, ENTRY_SIZE, EntryLocation, ShortName, Slot},
    fat::{FatEntries, FatEntry},
};
use crate::{
    BlockDevice,
    fs::{FileError, FileResult},
};
use core::ops::ControlFlow;

impl<D: BlockDevice> Volume<D> {
    /// Visits every slot of the directory starting at `dir`, in on-disk order.
    ///
    /// The walk ends when `visit` breaks or when the chain ends.
    fn scan_directory<B>(
        &mut self,
        dir: Cluster,
        mut visit: impl FnMut(Slot, EntryLocation) -> ControlFlow<B>,
    ) -> FileResult<ControlFlow<B>> {
        let mut sector = self.sector_buffer();
        let mut cluster = dir;
        let mut budget = self.cluster_limit();

        loop {
            self.check_cluster(cluster)?;
            let first = self.geometry.cluster_to_sector(cluster.value());

            for index in first..first + self.geometry.sectors_per_cluster() {
                self.io.read_sector(index, &mut sector)?;
                for (slot, raw) in sector.chunks_exact(ENTRY_SIZE).enumerate() {
                    let location = EntryLocation {
                        sector: index,
                        offset: slot * ENTRY_SIZE,
                    };
                    if let ControlFlow::Break(value) = visit(Slot::classify(raw), location) {
                        return Ok(ControlFlow::Break(value));
                    }
                }
            }

            budget -= 1;
            match self.get(cluster)? {
                FatEntry::Next(next) if budget > 0 => cluster = next,
                FatEntry::EndOfChain => return Ok(ControlFlow::Continue(())),
                _ => return Err(FileError::InvalidChain),
            }
        }
    }

    /// Looks up `name` in the directory, ignoring case.
    ///
    /// Only files and directories match: the volume label is not addressable.
    pub fn find(&mut self, dir: Cluster, name: &ShortName) -> FileResult<(DirEntry, EntryLocation)> {
        let found = self.scan_directory(dir, |slot, location| match slot {
            Slot::End => ControlFlow::Break(None),
            Slot::Used(entry)
                if !entry.attributes().is_volume_label() && entry.name().matches(name) =>
            {
                ControlFlow::Break(Some((entry, location)))
            }
            _ => ControlFlow::Continue(()),
        })?;

        match found {
            ControlFlow::Break(Some(hit)) => Ok(hit),
            _ => Err(FileError::NotFound),
        }
    }

    pub fn exists(&mut self, dir: Cluster, name: &ShortName) -> FileResult<bool> {
        match self.find(dir, name) {
            Ok(_) => Ok(true),
            Err(FileError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Lists the entries in use, skipping long-name fragments and the volume label.
    pub fn list(&mut self, dir: Cluster) -> FileResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let _ = self.scan_directory(dir, |slot, _| match slot {
            Slot::End => ControlFlow::Break(()),
            Slot::Used(entry) if !entry.attributes().is_volume_label() => {
                entries.push(entry);
                ControlFlow::Continue(())
            }
            _ => ControlFlow::Continue(()),
        })?;
        Ok(entries)
    }

    /// Returns true if the directory holds nothing but its `.` and `..` links.
    pub fn is_empty(&mut self, dir: Cluster) -> FileResult<bool> {
        let mut live = 0usize;
        let _ = self.scan_directory(dir, |slot, _| match slot {
            Slot::End => ControlFlow::Break(()),
            Slot::Used(_) => {
                live += 1;
                ControlFlow::Continue(())
            }
            _ => ControlFlow::Continue(()),
        })?;
        Ok(live <= 2)
    }

    /// Writes `entry` into the first free slot of the directory.
    ///
    /// When every slot is taken the directory grows by one zeroed cluster and
    /// the entry lands at its start.
    pub fn insert(&mut self, dir: Cluster, entry: &DirEntry) -> FileResult<EntryLocation> {
        let free = self.scan_directory(dir, |slot, location| {
            if slot.is_free() {
                ControlFlow::Break(location)
            } else {
                ControlFlow::Continue(())
            }
        })?;

        let location = match free {
            ControlFlow::Break(location) => location,
            ControlFlow::Continue(()) => self.grow_directory(dir)?,
        };

        self.write_slot(location, |raw| {
            raw.fill(0);
            entry.encode_into(raw);
        })?;
        Ok(location)
    }

    /// Decodes the entry stored at `location`.
    pub fn entry_at(&mut self, location: EntryLocation) -> FileResult<DirEntry> {
        let mut sector = self.sector_buffer();
        self.io.read_sector(location.sector, &mut sector)?;
        Ok(DirEntry::decode(
            &sector[location.offset..location.offset + ENTRY_SIZE],
        ))
    }

    /// Rewrites the entry stored at `location`, keeping the bytes it does not model.
    pub fn update_entry(&mut self, location: EntryLocation, entry: &DirEntry) -> FileResult<()> {
        self.write_slot(location, |raw| entry.encode_into(raw))
    }

    /// Flags the entry at `location` as deleted. Slots are never compacted.
    pub fn mark_deleted(&mut self, location: EntryLocation) -> FileResult<()> {
        self.write_slot(location, |raw| raw[0] = DirEntry::DELETED_ENTRY)
    }

    /// Allocates a directory cluster holding the `.` and `..` links.
    ///
    /// `parent` is the cluster the `..` entry points to.
    pub fn create_directory(&mut self, parent: Cluster) -> FileResult<Cluster> {
        let cluster = self.alloc_cluster()?;

        let written = self.zero_cluster(cluster).and_then(|()| {
            let first = self.geometry.cluster_to_sector(cluster.value());
            let directory = Attributes::new(Attributes::DIRECTORY);
            let dot = DirEntry::new(ShortName::DOT, directory, cluster, 0);
            let dotdot = DirEntry::new(ShortName::DOTDOT, directory, parent, 0);

            self.write_slot(EntryLocation { sector: first, offset: 0 }, |raw| {
                dot.encode_into(raw);
            })?;
            self.write_slot(
                EntryLocation {
                    sector: first,
                    offset: ENTRY_SIZE,
                },
                |raw| dotdot.encode_into(raw),
            )
        });

        if let Err(err) = written {
            self.free_cluster_chain(cluster);
            return Err(err);
        }
        Ok(cluster)
    }

    /// Appends a zeroed cluster to the directory and returns its first slot.
    fn grow_directory(&mut self, dir: Cluster) -> FileResult<EntryLocation> {
        let tail = self.chain_tail(dir)?;
        let cluster = self.alloc_cluster()?;

        let linked = self
            .zero_cluster(cluster)
            .and_then(|()| self.set(tail, FatEntry::Next(cluster)));
        if let Err(err) = linked {
            self.free_cluster_chain(cluster);
            return Err(err);
        }

        log::debug!("directory {dir} grew by cluster {cluster}");
        Ok(EntryLocation {
            sector: self.geometry.cluster_to_sector(cluster.value()),
            offset: 0,
        })
    }

    fn zero_cluster(&mut self, cluster: Cluster) -> FileResult<()> {
        let zeroes = self.sector_buffer();
        let first = self.geometry.cluster_to_sector(cluster.value());
        for index in first..first + self.geometry.sectors_per_cluster() {
            self.io.write_sector(index, &zeroes)?;
        }
        Ok(())
    }

    /// Read-modify-write of a single 32-byte record.
    fn write_slot(&mut self, location: EntryLocation, edit: impl FnOnce(&mut [u8])) -> FileResult<()> {
        let mut sector = self.sector_buffer();
        self.io.read_sector(location.sector, &mut sector)?;
        edit(&mut sector[location.offset..location.offset + ENTRY_SIZE]);
        self.io.write_sector(location.sector, &sector)
    }
}
