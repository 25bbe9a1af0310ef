use std::io::{self, SeekFrom};

use crate::storage::Storage;
use crate::types::{InodeData, InodeRef};
use crate::{BlobFS, Error, Result};

/// A handle to a file within a BlobFS image.
///
/// `File` keeps its own cursor, so several handles to the same file can be
/// read independently. Besides [`read`](Self::read) and
/// [`pread`](Self::pread) it implements [`std::io::Read`] and
/// [`std::io::Seek`].
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use blobfs_rs::{BlobFS, builder::Node};
///
/// let blob = blobfs_rs::builder::compile(&Node::dir([("motd", Node::file("hello"))]))?;
/// let fs = BlobFS::from_memory(blob)?;
///
/// let mut content = String::new();
/// fs.open("/motd")?.read_to_string(&mut content)?;
/// assert_eq!(content, "hello");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct File<'a, S> {
    fs: &'a BlobFS<S>,
    inode: InodeRef,
    data: InodeData,
    position: u32,
}

impl<'a, S: Storage> File<'a, S> {
    pub(crate) fn new(fs: &'a BlobFS<S>, inode: InodeRef, data: InodeData) -> Self {
        Self {
            fs,
            inode,
            data,
            position: 0,
        }
    }

    /// Returns the inode and record this file was opened on.
    pub fn stat(&self) -> (InodeRef, InodeData) {
        (self.inode, self.data)
    }

    /// Returns the size of the file in bytes.
    pub fn size(&self) -> u32 {
        self.data.size
    }

    pub fn tell(&self) -> u32 {
        self.position
    }

    /// Moves the cursor to `position`.
    ///
    /// The end of the file is a valid position; anything past it is rejected
    /// with [`Error::InvalidArgument`].
    pub fn seek(&mut self, position: u32) -> Result<()> {
        if position > self.data.size {
            return Err(Error::InvalidArgument(format!(
                "position {} past end of file of {} bytes",
                position, self.data.size
            )));
        }
        self.position = position;
        Ok(())
    }

    /// Reads from the cursor and advances it by the number of bytes read.
    ///
    /// On error the cursor does not move.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.pread(buf, self.position)?;
        self.position += n as u32;
        Ok(n)
    }

    /// Reads up to `buf.len()` bytes starting at `position`.
    ///
    /// Returns 0 at or past the end of the file; a read straddling the end is
    /// truncated to the bytes that remain.
    pub fn pread(&self, buf: &mut [u8], position: u32) -> Result<usize> {
        if position >= self.data.size || buf.is_empty() {
            return Ok(0);
        }

        let remaining = (self.data.size - position) as usize;
        let n = buf.len().min(remaining);
        let offset = self.data.data_offset.checked_add(position).ok_or_else(|| {
            Error::MalformedBlob(format!(
                "file content at {:#x} overflows the addressable range",
                self.data.data_offset
            ))
        })?;
        self.fs.storage().fetch_into(offset, &mut buf[..n])?;
        Ok(n)
    }
}

impl<S: Storage> io::Read for File<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(self, buf).map_err(Into::into)
    }
}

impl<S: Storage> io::Seek for File<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.data.size) + i128::from(delta),
        };
        let position = u32::try_from(target).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid seek to {}", target),
            )
        })?;
        File::seek(self, position)?;
        Ok(position as u64)
    }
}
