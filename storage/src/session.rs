//! A mounted image together with the shell state around it.
//!
//! The session owns the volume, the current directory and the table of open
//! files. Nothing is global, so several sessions can live side by side.
use crate::{
    BlockDevice,
    dev::ImageFile,
    fs::{
        FileError, FileMetadata, FileResult, FileType,
        fat::{
            Cluster, Volume,
            dirent::{Attributes, DirEntry, ShortName},
            fat::FatEntries,
        },
    },
    vfs::{AccessMode, OpenFile, OpenFiles},
};
use std::path::Path;

/// Longest display path kept for the working directory and open files.
pub const MAX_PATH_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One line of a directory listing.
pub struct Listing {
    name: String,
    metadata: FileMetadata,
}

impl Listing {
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub const fn metadata(&self) -> FileMetadata {
        self.metadata
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Summary of the mounted volume layout.
pub struct VolumeInfo {
    pub root_cluster: u32,
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub total_clusters: u32,
    pub fat_entries: u32,
    pub image_size: u64,
}

impl core::fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "position of root cluster: {}", self.root_cluster)?;
        writeln!(f, "bytes per sector: {}", self.bytes_per_sector)?;
        writeln!(f, "sectors per cluster: {}", self.sectors_per_cluster)?;
        writeln!(f, "total # of clusters in data region: {}", self.total_clusters)?;
        writeln!(f, "# of entries in one FAT: {}", self.fat_entries)?;
        write!(f, "size of image (in bytes): {}", self.image_size)
    }
}

pub struct VolumeSession<D: BlockDevice> {
    volume: Volume<D>,
    cwd: Cluster,
    cwd_path: String,
    files: OpenFiles,
    image_name: String,
}

impl VolumeSession<ImageFile> {
    /// Opens the image at `path` read/write and mounts it.
    pub fn mount(path: impl AsRef<Path>) -> FileResult<Self> {
        let path = path.as_ref();
        let device = ImageFile::open(path).map_err(|err| {
            log::error!("cannot open image {}: {err}", path.display());
            FileError::Io
        })?;
        Self::from_device(device, path.display().to_string())
    }
}

impl<D: BlockDevice> VolumeSession<D> {
    /// Mounts the volume stored on `device`. The working directory starts at the root.
    pub fn from_device(device: D, image_name: impl Into<String>) -> FileResult<Self> {
        let volume = Volume::mount(device)?;
        let root = Cluster::new(volume.geometry().root_cluster());

        Ok(Self {
            volume,
            cwd: root,
            cwd_path: String::from("/"),
            files: OpenFiles::new(),
            image_name: image_name.into(),
        })
    }

    /// Closes every open file and gives the device back.
    pub fn unmount(mut self) -> FileResult<D> {
        if !self.files.is_empty() {
            log::debug!("closing {} open file(s) on unmount", self.files.len());
        }
        self.files.clear();
        log::info!("unmounted {}", self.image_name);
        self.volume.into_device()
    }

    #[must_use]
    #[inline]
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    #[must_use]
    #[inline]
    /// Display path of the working directory, `/` at the root.
    pub fn pwd(&self) -> &str {
        &self.cwd_path
    }

    #[must_use]
    #[inline]
    pub const fn cwd(&self) -> Cluster {
        self.cwd
    }

    #[must_use]
    #[inline]
    pub const fn volume(&self) -> &Volume<D> {
        &self.volume
    }

    #[inline]
    fn root(&self) -> Cluster {
        Cluster::new(self.volume.geometry().root_cluster())
    }

    /// Directory links store 0 for the root.
    fn directory_cluster(&self, cluster: Cluster) -> Cluster {
        if cluster.is_none() {
            self.root()
        } else {
            cluster
        }
    }

    #[must_use]
    pub fn info(&self) -> VolumeInfo {
        let geometry = self.volume.geometry();
        VolumeInfo {
            root_cluster: geometry.root_cluster(),
            bytes_per_sector: geometry.bytes_per_sector(),
            sectors_per_cluster: geometry.sectors_per_cluster(),
            total_clusters: geometry.total_clusters(),
            fat_entries: geometry.fat_entries(),
            image_size: geometry.image_size(),
        }
    }

    /// Changes the working directory to `name`, `.` or `..`.
    pub fn cd(&mut self, name: &str) -> FileResult<()> {
        match name {
            "." => Ok(()),
            ".." => {
                if self.cwd == self.root() {
                    return Ok(());
                }
                let (parent, _) = self.volume.find(self.cwd, &ShortName::DOTDOT)?;
                self.cwd = self.directory_cluster(parent.cluster());
                match self.cwd_path.rfind('/') {
                    Some(0) | None => self.cwd_path.truncate(1),
                    Some(slash) => self.cwd_path.truncate(slash),
                }
                Ok(())
            }
            _ => {
                let short = ShortName::parse(name)?;
                let (entry, _) = self.volume.find(self.cwd, &short)?;
                if !entry.is_dir() {
                    return Err(FileError::NotADirectory);
                }

                let path = if self.cwd_path == "/" {
                    format!("/{}", entry.name())
                } else {
                    format!("{}/{}", self.cwd_path, entry.name())
                };
                if path.len() > MAX_PATH_LEN {
                    return Err(FileError::PathTooLong);
                }

                self.cwd = self.directory_cluster(entry.cluster());
                self.cwd_path = path;
                Ok(())
            }
        }
    }

    /// Lists the working directory in on-disk order, `.` and `..` included.
    pub fn ls(&mut self) -> FileResult<Vec<Listing>> {
        let entries = self.volume.list(self.cwd)?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let file_type = if entry.is_dir() {
                    FileType::Directory
                } else {
                    FileType::File
                };
                Listing {
                    name: entry.name().to_string(),
                    metadata: FileMetadata::new(entry.size(), file_type),
                }
            })
            .collect())
    }

    pub fn mkdir(&mut self, name: &str) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        if self.volume.exists(self.cwd, &short)? {
            return Err(FileError::AlreadyExists);
        }

        let cluster = self.volume.create_directory(self.cwd)?;
        let entry = DirEntry::new(
            short,
            Attributes::new(Attributes::DIRECTORY),
            cluster,
            0,
        );
        if let Err(err) = self.volume.insert(self.cwd, &entry) {
            self.volume.free_cluster_chain(cluster);
            return Err(err);
        }

        log::debug!("created directory {short} at cluster {cluster}");
        Ok(())
    }

    /// Creates an empty file in the working directory.
    pub fn creat(&mut self, name: &str) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        if self.volume.exists(self.cwd, &short)? {
            return Err(FileError::AlreadyExists);
        }

        let entry = DirEntry::new(short, Attributes::default(), Cluster::NONE, 0);
        self.volume.insert(self.cwd, &entry)?;
        Ok(())
    }

    /// Opens a file of the working directory with a mode flag (`-r`, `-w`, `-rw`, `-wr`).
    pub fn open(&mut self, name: &str, flag: &str) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        let (entry, location) = self.volume.find(self.cwd, &short)?;
        if entry.is_dir() {
            return Err(FileError::IsADirectory);
        }
        if self.files.is_open(&short) {
            return Err(FileError::AlreadyOpen);
        }
        let mode = AccessMode::from_flag(flag)?;
        if self.files.is_full() {
            return Err(FileError::TooManyOpenFiles);
        }

        let display = entry.name().to_string();
        let path = if self.cwd_path == "/" {
            format!("/{display}")
        } else {
            format!("{}/{display}", self.cwd_path)
        };
        let path = if path.len() < MAX_PATH_LEN {
            path
        } else {
            log::warn!("path of {display} too long, recording it as /{display}");
            format!("/{display}")
        };

        let file = OpenFile::new(
            short,
            entry.cluster(),
            entry.size(),
            entry.attributes(),
            mode,
            location,
            path,
        );
        let slot = self.files.insert(file)?;
        log::debug!("opened {short} ({mode}) in slot {slot}");
        Ok(())
    }

    pub fn close(&mut self, name: &str) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        self.files.remove(&short)?;
        log::debug!("closed {short}");
        Ok(())
    }

    /// Open files with their slot index, in slot order.
    pub fn lsof(&self) -> impl Iterator<Item = (usize, &OpenFile)> {
        self.files.iter()
    }

    /// Size in bytes of a file of the working directory.
    pub fn size(&mut self, name: &str) -> FileResult<u32> {
        let short = ShortName::parse(name)?;
        let (entry, _) = self.volume.find(self.cwd, &short)?;
        if entry.is_dir() {
            return Err(FileError::IsADirectory);
        }
        Ok(entry.size())
    }

    pub fn lseek(&mut self, name: &str, offset: u32) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        self.files.get_mut(&short)?.seek(offset)
    }

    /// Reads up to `len` bytes at the cursor of an open file.
    ///
    /// The count is clamped to what is left before the end of the file.
    pub fn read(&mut self, name: &str, len: u32) -> FileResult<Vec<u8>> {
        let short = ShortName::parse(name)?;
        let file = self.files.get(&short)?;
        if !file.mode().can_read() {
            return Err(FileError::NotOpenedForReading);
        }

        let count = len.min(file.size() - file.offset());
        let mut buf = vec![0; count as usize];
        let read = self
            .volume
            .read_range(file.cluster(), file.offset(), &mut buf)?;
        if read != buf.len() {
            return Err(FileError::InvalidChain);
        }

        self.files.get_mut(&short)?.advance(count);
        Ok(buf)
    }

    /// Writes `bytes` at the cursor of an open file, growing it as needed.
    ///
    /// The directory entry is updated when the file grows.
    pub fn write(&mut self, name: &str, bytes: &[u8]) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        let file = self.files.get(&short)?;
        if !file.mode().can_write() {
            return Err(FileError::NotOpenedForWriting);
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let offset = file.offset();
        let size = file.size();
        let location = file.location();
        let mut cluster = file.cluster();
        let end = u32::try_from(bytes.len())
            .ok()
            .and_then(|len| offset.checked_add(len))
            .ok_or(FileError::NoSpace)?;

        if end > size {
            let head = cluster;
            let bytes_per_cluster = self.volume.geometry().bytes_per_cluster();
            let extended = self
                .volume
                .extend_chain(&mut cluster, size, end, bytes_per_cluster);

            // A fresh chain must be reachable from the entry, even if growth stopped early.
            if cluster != head {
                self.files.get_mut(&short)?.set_cluster(cluster);
                let mut entry = self.volume.entry_at(location)?;
                entry.set_cluster(cluster);
                self.volume.update_entry(location, &entry)?;
            }
            extended?;
        }

        self.volume.write_range(cluster, offset, bytes)?;

        let file = self.files.get_mut(&short)?;
        file.advance(end - offset);
        if end > size {
            file.set_size(end);
            let mut entry = self.volume.entry_at(location)?;
            entry.set_size(end);
            self.volume.update_entry(location, &entry)?;
        }
        Ok(())
    }

    /// Renames an entry of the working directory. Its data is untouched.
    pub fn rename(&mut self, old: &str, new: &str) -> FileResult<()> {
        let old_short = ShortName::parse(old)?;
        if self.files.is_open(&old_short) {
            return Err(FileError::AlreadyOpen);
        }
        let new_short = ShortName::parse(new)?;

        let (mut entry, location) = self.volume.find(self.cwd, &old_short)?;
        if self.volume.exists(self.cwd, &new_short)? {
            return Err(FileError::AlreadyExists);
        }

        entry.set_name(new_short);
        self.volume.update_entry(location, &entry)
    }

    /// Deletes a file of the working directory and releases its clusters.
    pub fn rm(&mut self, name: &str) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        if self.files.is_open(&short) {
            return Err(FileError::AlreadyOpen);
        }
        let (entry, location) = self.volume.find(self.cwd, &short)?;
        if entry.is_dir() {
            return Err(FileError::IsADirectory);
        }

        self.volume.free_cluster_chain(entry.cluster());
        self.volume.mark_deleted(location)
    }

    /// Deletes an empty directory of the working directory.
    pub fn rmdir(&mut self, name: &str) -> FileResult<()> {
        let short = ShortName::parse(name)?;
        let (entry, location) = self.volume.find(self.cwd, &short)?;
        if !entry.is_dir() {
            return Err(FileError::NotADirectory);
        }

        let cluster = entry.cluster();
        if cluster.is_valid() && !self.volume.is_empty(cluster)? {
            return Err(FileError::NotEmpty);
        }
        if cluster.is_valid() && cluster != self.root() {
            self.volume.free_cluster_chain(cluster);
        }
        self.volume.mark_deleted(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ImageBuilder;

    fn names(session: &mut VolumeSession<impl BlockDevice>) -> Vec<String> {
        session
            .ls()
            .unwrap()
            .iter()
            .map(|listing| listing.name().to_owned())
            .collect()
    }

    fn free_clusters(session: &mut VolumeSession<impl BlockDevice>) -> usize {
        let limit = session.volume.cluster_limit();
        (2..limit)
            .filter(|&c| {
                session.volume.get(Cluster::new(c)).unwrap()
                    == crate::fs::fat::fat::FatEntry::Free
            })
            .count()
    }

    #[test]
    fn test_info() {
        let session = ImageBuilder::new().session();
        let info = session.info();
        assert_eq!(info.root_cluster, 2);
        assert_eq!(info.bytes_per_sector, 512);
        assert_eq!(info.sectors_per_cluster, 1);
        assert_eq!(info.fat_entries, 33 * 128);
        assert_eq!(info.image_size, 4096 * 512);
        assert!(info.to_string().starts_with("position of root cluster: 2\n"));
        assert_eq!(session.pwd(), "/");
        assert_eq!(session.image_name(), "test.img");
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut session = ImageBuilder::new().session();
        session.creat("notes").unwrap();
        session.open("notes", "-rw").unwrap();
        session.write("notes", b"hello world").unwrap();

        session.lseek("notes", 0).unwrap();
        assert_eq!(session.read("notes", 100).unwrap(), b"hello world");
        assert_eq!(session.size("notes"), Ok(11));

        session.lseek("notes", 6).unwrap();
        assert_eq!(session.read("notes", 3).unwrap(), b"wor");
        assert_eq!(session.read("notes", 100).unwrap(), b"ld");
        assert!(session.read("notes", 100).unwrap().is_empty());
    }

    #[test]
    fn test_first_write_persists_cluster() {
        let mut session = ImageBuilder::new().session();
        session.creat("data").unwrap();
        session.open("data", "-w").unwrap();
        session.write("data", &[0x42; 600]).unwrap();
        session.close("data").unwrap();

        session.open("data", "-r").unwrap();
        let back = session.read("data", 600).unwrap();
        assert_eq!(back, vec![0x42; 600]);

        let file = session.lsof().next().unwrap().1.clone();
        assert_eq!(session.volume.chain_len(file.cluster()), Ok(2));
    }

    #[test]
    fn test_overwrite_inside_file_keeps_size() {
        let mut session = ImageBuilder::new().session();
        session.creat("f").unwrap();
        session.open("f", "-rw").unwrap();
        session.write("f", b"0123456789").unwrap();
        session.lseek("f", 2).unwrap();
        session.write("f", b"ab").unwrap();
        assert_eq!(session.size("f"), Ok(10));

        session.lseek("f", 0).unwrap();
        assert_eq!(session.read("f", 10).unwrap(), b"01ab456789");
    }

    #[test]
    fn test_mode_enforced() {
        let mut session = ImageBuilder::new().session();
        session.creat("ro").unwrap();
        session.creat("wo").unwrap();
        session.open("ro", "-r").unwrap();
        session.open("wo", "-w").unwrap();

        assert_eq!(session.write("ro", b"x"), Err(FileError::NotOpenedForWriting));
        assert_eq!(session.read("wo", 1), Err(FileError::NotOpenedForReading));
        assert_eq!(session.read("other", 1), Err(FileError::NotOpened));
        assert_eq!(session.close("other"), Err(FileError::NotOpened));
    }

    #[test]
    fn test_open_checks_in_order() {
        let mut session = ImageBuilder::new().session();
        session.mkdir("dir").unwrap();
        session.creat("file").unwrap();

        assert_eq!(session.open("missing", "-x"), Err(FileError::NotFound));
        assert_eq!(session.open("dir", "-x"), Err(FileError::IsADirectory));
        assert_eq!(session.open("file", "-x"), Err(FileError::InvalidMode));
        session.open("file", "-r").unwrap();
        assert_eq!(session.open("FILE", "-x"), Err(FileError::AlreadyOpen));
    }

    #[test]
    fn test_open_table_capacity() {
        let mut session = ImageBuilder::new().session();
        for i in 0..=crate::vfs::MAX_OPEN_FILES {
            session.creat(&format!("f{i}")).unwrap();
        }
        for i in 0..crate::vfs::MAX_OPEN_FILES {
            session.open(&format!("f{i}"), "-r").unwrap();
        }
        assert_eq!(session.open("f10", "-r"), Err(FileError::TooManyOpenFiles));

        session.close("f4").unwrap();
        session.open("f10", "-r").unwrap();
        let (slot, file) = session.lsof().nth(4).unwrap();
        assert_eq!((slot, file.path()), (4, "/F10"));
    }

    #[test]
    fn test_lseek_bounds() {
        let mut session = ImageBuilder::new().session();
        session.creat("s").unwrap();
        session.open("s", "-rw").unwrap();
        session.write("s", b"abc").unwrap();

        assert_eq!(session.lseek("s", 3), Ok(()));
        assert_eq!(session.lseek("s", 4), Err(FileError::OffsetOutOfRange));
        assert_eq!(session.lsof().next().unwrap().1.offset(), 3);
    }

    #[test]
    fn test_name_collisions_ignore_case() {
        let mut session = ImageBuilder::new().session();
        session.creat("Report").unwrap();
        assert_eq!(session.creat("REPORT"), Err(FileError::AlreadyExists));
        assert_eq!(session.mkdir("report"), Err(FileError::AlreadyExists));
        assert_eq!(session.creat("."), Err(FileError::InvalidName));
        assert_eq!(session.creat("twelve_chars"), Err(FileError::InvalidName));
        assert_eq!(names(&mut session), ["REPORT"]);
    }

    #[test]
    fn test_cd_and_paths() {
        let mut session = ImageBuilder::new().session();
        session.mkdir("a").unwrap();
        session.cd("a").unwrap();
        session.mkdir("b").unwrap();
        session.cd("b").unwrap();
        assert_eq!(session.pwd(), "/A/B");
        assert_eq!(names(&mut session), [".", ".."]);

        session.cd(".").unwrap();
        assert_eq!(session.pwd(), "/A/B");
        session.cd("..").unwrap();
        assert_eq!(session.pwd(), "/A");
        assert_eq!(names(&mut session), [".", "..", "B"]);
        session.cd("..").unwrap();
        assert_eq!(session.pwd(), "/");
        assert_eq!(session.cwd(), Cluster::new(2));
        session.cd("..").unwrap();
        assert_eq!(session.pwd(), "/");

        session.creat("plain").unwrap();
        assert_eq!(session.cd("plain"), Err(FileError::NotADirectory));
        assert_eq!(session.cd("nowhere"), Err(FileError::NotFound));
    }

    #[test]
    fn test_open_records_full_path() {
        let mut session = ImageBuilder::new().session();
        session.mkdir("docs").unwrap();
        session.cd("docs").unwrap();
        session.creat("todo").unwrap();
        session.open("todo", "-wr").unwrap();

        let (slot, file) = session.lsof().next().unwrap();
        assert_eq!(slot, 0);
        assert_eq!(file.path(), "/DOCS/TODO");
        assert_eq!(file.mode(), AccessMode::ReadWrite);
    }

    #[test]
    fn test_rm_releases_clusters() {
        let mut session = ImageBuilder::new().session();
        let before = free_clusters(&mut session);

        session.creat("big").unwrap();
        session.open("big", "-w").unwrap();
        session.write("big", &[7; 3000]).unwrap();
        assert_eq!(free_clusters(&mut session), before - 6);

        assert_eq!(session.rm("big"), Err(FileError::AlreadyOpen));
        session.close("big").unwrap();
        session.rm("big").unwrap();
        assert_eq!(free_clusters(&mut session), before);
        assert_eq!(session.size("big"), Err(FileError::NotFound));
    }

    #[test]
    fn test_rm_and_rmdir_type_checks() {
        let mut session = ImageBuilder::new().session();
        session.mkdir("d").unwrap();
        session.creat("f").unwrap();

        assert_eq!(session.rm("d"), Err(FileError::IsADirectory));
        assert_eq!(session.rmdir("f"), Err(FileError::NotADirectory));
        assert_eq!(session.rmdir(".."), Err(FileError::InvalidName));
        assert_eq!(session.rm("ghost"), Err(FileError::NotFound));
        assert_eq!(session.size("d"), Err(FileError::IsADirectory));
    }

    #[test]
    fn test_rmdir_requires_empty() {
        let mut session = ImageBuilder::new().session();
        let before = free_clusters(&mut session);

        session.mkdir("box").unwrap();
        session.cd("box").unwrap();
        session.creat("item").unwrap();
        session.cd("..").unwrap();
        assert_eq!(session.rmdir("box"), Err(FileError::NotEmpty));

        session.cd("box").unwrap();
        session.rm("item").unwrap();
        session.cd("..").unwrap();
        session.rmdir("box").unwrap();

        assert_eq!(names(&mut session), Vec::<String>::new());
        assert_eq!(free_clusters(&mut session), before);
    }

    #[test]
    fn test_rename_keeps_content() {
        let mut session = ImageBuilder::new().session();
        session.creat("old").unwrap();
        session.creat("taken").unwrap();
        session.open("old", "-w").unwrap();
        session.write("old", b"payload").unwrap();

        assert_eq!(session.rename("old", "new"), Err(FileError::AlreadyOpen));
        session.close("old").unwrap();
        assert_eq!(session.rename("old", "TAKEN"), Err(FileError::AlreadyExists));
        assert_eq!(session.rename("missing", "x"), Err(FileError::NotFound));
        assert_eq!(session.rename(".", "x"), Err(FileError::InvalidName));

        session.rename("old", "new").unwrap();
        assert_eq!(session.size("old"), Err(FileError::NotFound));
        session.open("new", "-r").unwrap();
        assert_eq!(session.read("new", 7).unwrap(), b"payload");
    }

    #[test]
    fn test_deleted_slot_reused_by_creat() {
        let mut session = ImageBuilder::new().session();
        for name in ["a", "b", "c"] {
            session.creat(name).unwrap();
        }
        session.rm("b").unwrap();
        session.creat("d").unwrap();
        assert_eq!(names(&mut session), ["A", "D", "C"]);
    }

    #[test]
    fn test_directory_grows_at_seventeenth_entry() {
        let mut session = ImageBuilder::new().session();
        let root = session.cwd();
        for i in 0..16 {
            session.creat(&format!("n{i}")).unwrap();
        }
        assert_eq!(session.volume.chain_len(root), Ok(1));

        session.creat("n16").unwrap();
        assert_eq!(session.volume.chain_len(root), Ok(2));
        assert_eq!(names(&mut session).len(), 17);
        assert_eq!(session.size("n16"), Ok(0));
    }

    #[test]
    fn test_large_sectors() {
        let mut session = ImageBuilder::new()
            .bytes_per_sector(4096)
            .total_sectors(1024)
            .session();
        session.creat("wide").unwrap();
        session.open("wide", "-rw").unwrap();
        let data = (0..10_000).map(|i| (i % 256) as u8).collect::<Vec<_>>();
        session.write("wide", &data).unwrap();
        session.lseek("wide", 4000).unwrap();
        assert_eq!(session.read("wide", 200).unwrap(), data[4000..4200]);
    }

    #[test]
    fn test_no_space_keeps_partial_growth_reachable() {
        let mut session = ImageBuilder::new().total_sectors(160).session();
        session.creat("fill").unwrap();
        session.open("fill", "-w").unwrap();

        assert_eq!(
            session.write("fill", &vec![1; 512 * 200]),
            Err(FileError::NoSpace)
        );
        assert_eq!(session.size("fill"), Ok(0));
        assert_eq!(free_clusters(&mut session), 0);

        session.close("fill").unwrap();
        session.rm("fill").unwrap();
        assert!(free_clusters(&mut session) > 0);
    }

    #[test]
    fn test_volume_label_is_not_addressable() {
        let mut session = ImageBuilder::new().session();
        let root = session.cwd();
        let label = DirEntry::new(
            ShortName::parse("mydisk").unwrap(),
            Attributes::new(Attributes::VOLUME_ID),
            Cluster::NONE,
            0,
        );
        let label_at = session.volume.insert(root, &label).unwrap();

        assert_eq!(names(&mut session), Vec::<String>::new());
        assert_eq!(session.size("mydisk"), Err(FileError::NotFound));
        assert_eq!(session.open("mydisk", "-w"), Err(FileError::NotFound));
        assert_eq!(session.rm("mydisk"), Err(FileError::NotFound));
        assert_eq!(session.rename("mydisk", "other"), Err(FileError::NotFound));

        session.creat("mydisk").unwrap();
        assert_eq!(session.size("mydisk"), Ok(0));
        assert_eq!(names(&mut session), ["MYDISK"]);
        session.rm("mydisk").unwrap();
        assert_eq!(session.volume.entry_at(label_at), Ok(label));
    }

    #[test]
    fn test_unmount_returns_device() {
        let mut session = ImageBuilder::new().session();
        session.creat("keep").unwrap();
        session.open("keep", "-w").unwrap();
        session.write("keep", b"persist").unwrap();

        let device = session.unmount().unwrap();
        let mut again = VolumeSession::from_device(device, "again.img").unwrap();
        assert_eq!(again.size("keep"), Ok(7));
        assert_eq!(again.lsof().count(), 0);
    }
}
