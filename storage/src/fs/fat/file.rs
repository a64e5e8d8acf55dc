//! Byte ranges of a file's data stream, addressed through its cluster chain.
use super::{
    Cluster, Volume,
    fat::{FatEntries, FatEntry},
};
use crate::{
    BlockDevice,
    fs::{FileError, FileResult},
};

/// Outcome of stepping to the next cluster of a chain.
enum Step {
    Next(Cluster),
    End,
}

impl<D: BlockDevice> Volume<D> {
    fn step(&mut self, cluster: Cluster) -> FileResult<Step> {
        match self.get(cluster)? {
            FatEntry::Next(next) => Ok(Step::Next(next)),
            FatEntry::EndOfChain => Ok(Step::End),
            FatEntry::Free | FatEntry::Bad | FatEntry::Reserved => Err(FileError::InvalidChain),
        }
    }

    /// Skips whole clusters until `offset` falls in the returned cluster.
    ///
    /// Returns the cluster and the offset left within it, or `None` if the chain
    /// ends first.
    fn seek_chain(&mut self, head: Cluster, offset: u32) -> FileResult<Option<(Cluster, u32)>> {
        let bytes_per_cluster = self.geometry.bytes_per_cluster();
        let mut cluster = head;
        let mut remaining = offset;

        while remaining >= bytes_per_cluster {
            match self.step(cluster)? {
                Step::Next(next) => cluster = next,
                Step::End => return Ok(None),
            }
            remaining -= bytes_per_cluster;
        }
        Ok(Some((cluster, remaining)))
    }

    /// Reads up to `buf.len()` bytes starting `offset` bytes into the chain at `head`.
    ///
    /// Fewer bytes are returned only when the chain ends first. Sizes recorded in
    /// directory entries are not consulted.
    pub fn read_range(&mut self, head: Cluster, offset: u32, buf: &mut [u8]) -> FileResult<usize> {
        if buf.is_empty() || head.is_none() {
            return Ok(0);
        }
        self.check_cluster(head)?;

        let Some((mut cluster, mut within)) = self.seek_chain(head, offset)? else {
            return Ok(0);
        };

        let bytes_per_sector = self.geometry.bytes_per_sector();
        let bytes_per_cluster = self.geometry.bytes_per_cluster();
        let mut sector = self.sector_buffer();
        let mut done = 0;

        loop {
            self.check_cluster(cluster)?;
            let base = self.geometry.cluster_to_sector(cluster.value());

            while within < bytes_per_cluster && done < buf.len() {
                let start = (within % bytes_per_sector) as usize;
                let count = (bytes_per_sector as usize - start).min(buf.len() - done);

                self.io
                    .read_sector(base + within / bytes_per_sector, &mut sector)?;
                buf[done..done + count].copy_from_slice(&sector[start..start + count]);

                done += count;
                within += count as u32;
            }

            if done == buf.len() {
                return Ok(done);
            }
            match self.step(cluster)? {
                Step::Next(next) => {
                    cluster = next;
                    within = 0;
                }
                Step::End => return Ok(done),
            }
        }
    }

    /// Writes `bytes` starting `offset` bytes into the chain at `head`.
    ///
    /// The chain must already be long enough; partial sectors are merged with
    /// what is on disk.
    pub fn write_range(&mut self, head: Cluster, offset: u32, bytes: &[u8]) -> FileResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.check_cluster(head)?;

        let Some((mut cluster, mut within)) = self.seek_chain(head, offset)? else {
            return Err(FileError::InvalidChain);
        };

        let bytes_per_sector = self.geometry.bytes_per_sector();
        let bytes_per_cluster = self.geometry.bytes_per_cluster();
        let mut sector = self.sector_buffer();
        let mut done = 0;

        loop {
            self.check_cluster(cluster)?;
            let base = self.geometry.cluster_to_sector(cluster.value());

            while within < bytes_per_cluster && done < bytes.len() {
                let index = base + within / bytes_per_sector;
                let start = (within % bytes_per_sector) as usize;
                let count = (bytes_per_sector as usize - start).min(bytes.len() - done);

                if count < sector.len() {
                    self.io.read_sector(index, &mut sector)?;
                }
                sector[start..start + count].copy_from_slice(&bytes[done..done + count]);
                self.io.write_sector(index, &sector)?;

                done += count;
                within += count as u32;
            }

            if done == bytes.len() {
                return Ok(());
            }
            match self.step(cluster)? {
                Step::Next(next) => {
                    cluster = next;
                    within = 0;
                }
                Step::End => return Err(FileError::InvalidChain),
            }
        }
    }
}
