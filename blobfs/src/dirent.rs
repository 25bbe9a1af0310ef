use std::{borrow::Cow, cmp, hint};

use crate::storage::Storage;
use crate::types::{Dirent, InodeData, InodeRef};
use crate::{BlobFS, Error, Result};

/// Binary search for `name` among the entries of `dir`.
///
/// Entries are stored sorted by name, compared byte-wise.
pub(crate) fn find_child<S: Storage>(
    fs: &BlobFS<S>,
    dir: &InodeData,
    name: &[u8],
) -> Result<Option<InodeRef>> {
    let n = dir.size;
    if n == 0 {
        return Ok(None);
    }

    let mut size = n;
    let mut base = 0u32;
    while size > 1 {
        let half = size / 2;
        let mid = base + half;

        let cmp = {
            let (dirent, _) = fs.read_dirent(dir, mid)?;
            let entry_name = fs.storage().fetch_str(dirent.name_offset)?;
            entry_name.as_ref().cmp(name)
        };
        base = hint::select_unpredictable(cmp == cmp::Ordering::Greater, base, mid);

        size -= half;
    }

    let (dirent, inode) = fs.read_dirent(dir, base)?;
    let entry_name = fs.storage().fetch_str(dirent.name_offset)?;
    if entry_name.as_ref() != name {
        return Ok(None);
    }

    Ok(Some(inode))
}

pub(crate) fn lossy_name(name: Cow<'_, [u8]>) -> Cow<'_, str> {
    match name {
        Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes),
        Cow::Owned(bytes) => match String::from_utf8(bytes) {
            Ok(name) => Cow::Owned(name),
            Err(err) => Cow::Owned(String::from_utf8_lossy(err.as_bytes()).into_owned()),
        },
    }
}

/// An open directory listing.
///
/// Entries come back in stored order, which is sorted by name. Besides the
/// cursor-style [`readdir`](Self::readdir) API, `ReadDir` is an iterator over
/// owned [`DirEntry`] values.
#[derive(Debug)]
pub struct ReadDir<'a, S> {
    fs: &'a BlobFS<S>,
    inode: InodeRef,
    data: InodeData,
    position: u32,
    dir: String,
}

impl<'a, S: Storage> ReadDir<'a, S> {
    pub(crate) fn new(fs: &'a BlobFS<S>, inode: InodeRef, data: InodeData, dir: String) -> Self {
        Self {
            fs,
            inode,
            data,
            position: 0,
            dir,
        }
    }

    /// Returns the inode and record this listing was opened on.
    pub fn stat(&self) -> (InodeRef, InodeData) {
        (self.inode, self.data)
    }

    /// Returns the number of entries in the directory.
    pub fn size(&self) -> u32 {
        self.data.size
    }

    /// Returns the index of the next entry.
    pub fn tell(&self) -> u32 {
        self.position
    }

    /// Moves to entry `position`; `size()` is the end of the listing.
    pub fn seek(&mut self, position: u32) -> Result<()> {
        if position > self.data.size {
            return Err(Error::InvalidArgument(format!(
                "entry {} past end of directory with {} entries",
                position, self.data.size
            )));
        }
        self.position = position;
        Ok(())
    }

    /// Reads the next entry and returns it with the inode of its embedded
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] once every entry has been read.
    pub fn readdir(&mut self) -> Result<(Dirent, InodeRef)> {
        if self.position >= self.data.size {
            return Err(Error::NotFound("end of directory".to_string()));
        }
        let entry = self.fs.read_dirent(&self.data, self.position)?;
        self.position += 1;
        Ok(entry)
    }

    /// Like [`readdir`](Self::readdir), also returning the entry name.
    ///
    /// The cursor only moves once both the entry and its name were read.
    pub fn readdir_name(&mut self) -> Result<(Dirent, InodeRef, Cow<'a, str>)> {
        if self.position >= self.data.size {
            return Err(Error::NotFound("end of directory".to_string()));
        }
        let fs: &'a BlobFS<S> = self.fs;
        let (dirent, inode) = fs.read_dirent(&self.data, self.position)?;
        let name = fs.storage().fetch_str(dirent.name_offset)?;
        self.position += 1;
        Ok((dirent, inode, lossy_name(name)))
    }

    fn next_entry(&mut self) -> Result<DirEntry> {
        let (dirent, inode, name) = self.readdir_name()?;
        Ok(DirEntry {
            dir: self.dir.clone(),
            inode,
            data: dirent.inode,
            file_name: name.into_owned(),
        })
    }
}

impl<S: Storage> Iterator for ReadDir<'_, S> {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.data.size {
            return None;
        }
        let entry = self.next_entry();
        if entry.is_err() {
            // stop after the first error
            self.position = self.data.size;
        }
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.data.size.saturating_sub(self.position) as usize;
        (0, Some(remaining))
    }
}

/// A directory entry within a BlobFS image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    dir: String,
    inode: InodeRef,
    data: InodeData,
    file_name: String,
}

impl DirEntry {
    /// Returns the file name of this entry.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the full path of this entry.
    ///
    /// Listings opened by inode rather than by path only know the bare name.
    pub fn path(&self) -> String {
        match self.dir.as_str() {
            "" => self.file_name.clone(),
            "/" => format!("/{}", self.file_name),
            dir => format!("{}/{}", dir, self.file_name),
        }
    }

    /// Returns the inode of this entry.
    pub fn inode(&self) -> InodeRef {
        self.inode
    }

    /// Returns the record embedded in this entry.
    pub fn data(&self) -> InodeData {
        self.data
    }

    pub fn is_dir(&self) -> bool {
        self.data.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.data.is_file()
    }
}
