use tracing::{debug, trace};

use crate::dirent::{self, ReadDir};
use crate::file::File;
use crate::storage::{ChunkedStorage, MemoryStorage, ReadAt, Storage};
use crate::types::*;
use crate::walkdir::WalkDir;
use crate::{Error, Result};

/// The main entry point for reading BlobFS images.
///
/// `BlobFS` resolves paths, lists directories and opens files of a blob
/// reached through a [`Storage`] backend. It holds no state besides the
/// backend, so any number of files and directory listings may be open at
/// the same time.
///
/// # Example
///
/// ```
/// use blobfs_rs::{BlobFS, builder::Node};
///
/// let blob = blobfs_rs::builder::compile(&Node::dir([("hello.txt", Node::file("hi"))]))?;
/// let fs = BlobFS::from_memory(blob)?;
///
/// let mut file = fs.open("/hello.txt")?;
/// let mut buf = [0u8; 16];
/// assert_eq!(file.read(&mut buf)?, 2);
/// assert_eq!(&buf[..2], b"hi");
/// # Ok::<(), blobfs_rs::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct BlobFS<S> {
    storage: S,
}

impl<B: AsRef<[u8]>> BlobFS<MemoryStorage<B>> {
    /// Opens a blob that is fully resident in memory.
    pub fn from_memory(blob: B) -> Result<Self> {
        Self::new(MemoryStorage::new(blob))
    }
}

impl<R: ReadAt> BlobFS<ChunkedStorage<R>> {
    /// Opens a blob of `blob_len` bytes read through `reader`, at most
    /// `chunk_size` bytes at a time.
    pub fn from_reader(reader: R, blob_len: u64, chunk_size: usize) -> Result<Self> {
        Self::new(ChunkedStorage::new(reader, blob_len, chunk_size)?)
    }
}

impl<S: Storage> BlobFS<S> {
    /// Creates a `BlobFS` on top of `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedBlob`] if the blob cannot hold the root record.
    pub fn new(storage: S) -> Result<Self> {
        let fs = Self { storage };
        let root = fs.stat(ROOT_INODE)?;
        debug!(
            blob_size = fs.storage.len(),
            root_size = root.size,
            root_is_dir = root.is_dir(),
            "opened blob"
        );
        Ok(fs)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Returns the record of the root inode.
    pub fn root(&self) -> Result<InodeData> {
        self.stat(ROOT_INODE)
    }

    /// Returns the record stored at `inode`.
    pub fn stat(&self, inode: InodeRef) -> Result<InodeData> {
        let raw = self.storage.fetch(inode, INODE_DATA_SIZE as u32)?;
        InodeData::decode(&raw)
    }

    /// Resolves `path` and returns both the inode and its record.
    pub fn stat_path(&self, path: &str) -> Result<(InodeRef, InodeData)> {
        let inode = self.resolve_path(path)?;
        Ok((inode, self.stat(inode)?))
    }

    /// Resolves an absolute path to an inode.
    ///
    /// Empty segments are ignored, so `/a//b/` and `/a/b` are the same path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for relative paths and missing entries, or
    /// whatever error the lookup of a segment produced.
    pub fn resolve_path(&self, path: &str) -> Result<InodeRef> {
        if !path.starts_with('/') {
            return Err(Error::NotFound(format!("{:?} is not an absolute path", path)));
        }

        let mut inode = ROOT_INODE;
        for part in path.split('/').filter(|part| !part.is_empty()) {
            inode = self.lookup_child(inode, part).map_err(|err| match err {
                Error::NotFound(_) => Error::NotFound(path.to_string()),
                err => err,
            })?;
        }
        trace!(path, inode, "resolved path");
        Ok(inode)
    }

    /// Looks up `name` among the entries of the directory `parent`.
    pub fn lookup_child(&self, parent: InodeRef, name: impl AsRef<[u8]>) -> Result<InodeRef> {
        let name = name.as_ref();
        let dir = self.stat(parent)?;
        if !dir.is_dir() {
            return Err(Error::NotADirectory(format!("inode {:#x}", parent)));
        }
        if dir.is_compressed() {
            return Err(Error::Unsupported("compressed directory index".to_string()));
        }

        dirent::find_child(self, &dir, name)?.ok_or_else(|| {
            Error::NotFound(format!(
                "{} in directory {:#x}",
                String::from_utf8_lossy(name),
                parent
            ))
        })
    }

    /// Opens the regular file at `inode` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IsADirectory`] for directories and
    /// [`Error::Unsupported`] for compressed content.
    pub fn open_file(&self, inode: InodeRef) -> Result<File<'_, S>> {
        let data = self.stat(inode)?;
        if data.is_dir() {
            return Err(Error::IsADirectory(format!("inode {:#x}", inode)));
        }
        if data.is_compressed() {
            return Err(Error::Unsupported("compressed file content".to_string()));
        }
        debug!(inode, size = data.size, "opened file");
        Ok(File::new(self, inode, data))
    }

    /// Opens the file at `path` for reading.
    pub fn open(&self, path: &str) -> Result<File<'_, S>> {
        self.open_file(self.resolve_path(path)?)
    }

    /// Opens the directory at `inode` for listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotADirectory`] for regular files and
    /// [`Error::Unsupported`] for directories flagged as compressed.
    pub fn open_dir(&self, inode: InodeRef) -> Result<ReadDir<'_, S>> {
        self.open_dir_at(inode, String::new())
    }

    /// Opens the directory at `path` for listing.
    ///
    /// Entries yielded by the returned iterator carry full paths.
    pub fn read_dir(&self, path: &str) -> Result<ReadDir<'_, S>> {
        let inode = self.resolve_path(path)?;
        self.open_dir_at(inode, normalize(path))
    }

    /// Recursively walks the directory tree below `root`.
    pub fn walk_dir(&self, root: &str) -> Result<WalkDir<'_, S>> {
        Ok(WalkDir::new(self, self.read_dir(root)?))
    }

    pub(crate) fn open_dir_at(&self, inode: InodeRef, path: String) -> Result<ReadDir<'_, S>> {
        let data = self.stat(inode)?;
        if !data.is_dir() {
            return Err(Error::NotADirectory(format!("inode {:#x}", inode)));
        }
        if data.is_compressed() {
            return Err(Error::Unsupported("compressed directory index".to_string()));
        }
        debug!(inode, entries = data.size, "opened directory");
        Ok(ReadDir::new(self, inode, data, path))
    }

    /// Reads entry `index` of `dir` and returns it with the inode of its
    /// embedded record.
    pub(crate) fn read_dirent(&self, dir: &InodeData, index: u32) -> Result<(Dirent, InodeRef)> {
        let entry_offset = dir.data_offset as u64 + index as u64 * DIRENT_SIZE as u64;
        let entry_offset = Offset::try_from(entry_offset).map_err(|_| {
            Error::MalformedBlob(format!(
                "entry {} of directory at {:#x} is outside the addressable range",
                index, dir.data_offset
            ))
        })?;
        let raw = self.storage.fetch(entry_offset, DIRENT_SIZE as u32)?;
        let dirent = Dirent::decode(&raw)?;
        let inode = entry_offset
            .checked_add(DIRENT_INODE_OFFSET)
            .ok_or_else(|| Error::MalformedBlob("entry inode offset overflow".to_string()))?;
        Ok((dirent, inode))
    }
}

fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for part in path.split('/').filter(|part| !part.is_empty()) {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalizes_listing_paths() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("//"), "/");
        assert_eq!(normalize("/a//b/"), "/a/b");
    }
}
