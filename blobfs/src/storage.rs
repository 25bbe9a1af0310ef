//! Access to the raw bytes of a blob.
//!
//! Everything above this module addresses the blob only through [`Storage`].
//! Two backends exist: [`MemoryStorage`] for blobs that are fully resident
//! (a static array, a `Vec<u8>` or a memory map), and [`ChunkedStorage`] for
//! blobs that live behind a narrow read window such as external flash.

use std::borrow::Cow;
use std::fs::File;
#[cfg(target_family = "unix")]
use std::os::unix::fs::FileExt;
#[cfg(target_family = "windows")]
use std::os::windows::fs::FileExt;
use std::{io, sync::Arc};

use tracing::trace;

use crate::types::Offset;
use crate::{Error, Result};

mod sealed {
    pub trait Sealed {}
}

/// Byte access to a blob.
///
/// Implemented by [`MemoryStorage`] and [`ChunkedStorage`] only.
pub trait Storage: sealed::Sealed {
    /// Total size of the blob in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `len` bytes starting at `offset`.
    fn fetch(&self, offset: Offset, len: u32) -> Result<Cow<'_, [u8]>>;

    /// Fills `buf` with the bytes starting at `offset`.
    fn fetch_into(&self, offset: Offset, buf: &mut [u8]) -> Result<()> {
        let len = u32::try_from(buf.len()).map_err(|_| {
            Error::InvalidArgument(format!("fetch of {} bytes exceeds blob range", buf.len()))
        })?;
        let data = self.fetch(offset, len)?;
        buf.copy_from_slice(&data);
        Ok(())
    }

    /// Returns the NUL-terminated string starting at `offset`, without the
    /// terminator.
    ///
    /// The string is released when the returned value is dropped.
    fn fetch_str(&self, offset: Offset) -> Result<Cow<'_, [u8]>>;
}

fn check_range(blob_len: u64, offset: Offset, len: u64) -> Result<()> {
    let end = offset as u64 + len;
    if end > blob_len {
        return Err(Error::MalformedBlob(format!(
            "range {:#x}..{:#x} exceeds blob size {:#x}",
            offset, end, blob_len
        )));
    }
    Ok(())
}

fn unterminated(offset: Offset) -> Error {
    Error::MalformedBlob(format!("string at {:#x} is not NUL-terminated", offset))
}

/// A blob that is fully resident in memory.
///
/// Fetches are zero-copy views into the blob.
#[derive(Debug, Clone)]
pub struct MemoryStorage<B> {
    blob: B,
}

impl<B: AsRef<[u8]>> MemoryStorage<B> {
    pub fn new(blob: B) -> Self {
        Self { blob }
    }

    pub fn into_inner(self) -> B {
        self.blob
    }
}

impl<B: AsRef<[u8]>> sealed::Sealed for MemoryStorage<B> {}

impl<B: AsRef<[u8]>> Storage for MemoryStorage<B> {
    fn len(&self) -> u64 {
        self.blob.as_ref().len() as u64
    }

    fn fetch(&self, offset: Offset, len: u32) -> Result<Cow<'_, [u8]>> {
        check_range(self.len(), offset, len as u64)?;
        let start = offset as usize;
        Ok(Cow::Borrowed(&self.blob.as_ref()[start..start + len as usize]))
    }

    fn fetch_str(&self, offset: Offset) -> Result<Cow<'_, [u8]>> {
        check_range(self.len(), offset, 0)?;
        let tail = &self.blob.as_ref()[offset as usize..];
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| unterminated(offset))?;
        Ok(Cow::Borrowed(&tail[..end]))
    }
}

/// Positional reads from the medium behind a [`ChunkedStorage`].
pub trait ReadAt {
    /// Reads up to `buf.len()` bytes at `offset`, returning how many were read.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

impl ReadAt for File {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        read_file_at(self, buf, offset)
    }
}

#[cfg(target_family = "unix")]
fn read_file_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    FileExt::read_at(file, buf, offset)
}

#[cfg(target_family = "windows")]
fn read_file_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    FileExt::seek_read(file, buf, offset)
}

#[cfg(not(any(target_family = "unix", target_family = "windows")))]
fn read_file_at(_file: &File, _buf: &mut [u8], _offset: u64) -> io::Result<usize> {
    Err(io::Error::other("positional file reads are unsupported on this target"))
}

/// A blob read through a bounded window from a [`ReadAt`] source.
///
/// Every fetch copies: no single request to the source exceeds `chunk_size`
/// bytes. Source errors are returned as [`Error::Backend`] without retrying.
#[derive(Debug)]
pub struct ChunkedStorage<R> {
    reader: R,
    blob_len: u64,
    chunk_size: usize,
}

impl<R: ReadAt> ChunkedStorage<R> {
    pub fn new(reader: R, blob_len: u64, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk size must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            reader,
            blob_len,
            chunk_size,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_window(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            let read = self
                .reader
                .read_at(offset + filled as u64, &mut buf[filled..])
                .map_err(Error::Backend)?;
            if read == 0 {
                return Err(Error::Backend(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "unexpected EOF while reading blob chunk",
                )));
            }
            filled += read;
        }
        Ok(())
    }
}

impl ChunkedStorage<File> {
    /// Opens a blob stored in a host file.
    pub fn open_file(file: File, chunk_size: usize) -> Result<Self> {
        let blob_len = file.metadata().map_err(Error::Backend)?.len();
        Self::new(file, blob_len, chunk_size)
    }
}

impl<R: ReadAt> sealed::Sealed for ChunkedStorage<R> {}

impl<R: ReadAt> Storage for ChunkedStorage<R> {
    fn len(&self) -> u64 {
        self.blob_len
    }

    fn fetch(&self, offset: Offset, len: u32) -> Result<Cow<'_, [u8]>> {
        check_range(self.blob_len, offset, len as u64)?;
        let mut buf = vec![0u8; len as usize];
        self.fetch_into(offset, &mut buf)?;
        Ok(Cow::Owned(buf))
    }

    fn fetch_into(&self, offset: Offset, buf: &mut [u8]) -> Result<()> {
        check_range(self.blob_len, offset, buf.len() as u64)?;
        trace!(offset, len = buf.len(), "fetching chunked range");
        let mut pos = offset as u64;
        for window in buf.chunks_mut(self.chunk_size) {
            self.read_window(pos, window)?;
            pos += window.len() as u64;
        }
        Ok(())
    }

    fn fetch_str(&self, offset: Offset) -> Result<Cow<'_, [u8]>> {
        check_range(self.blob_len, offset, 0)?;
        let mut out = Vec::new();
        let mut pos = offset as u64;
        let mut window = vec![0u8; (self.blob_len - pos).min(self.chunk_size as u64) as usize];
        while pos < self.blob_len {
            let n = (self.blob_len - pos).min(self.chunk_size as u64) as usize;
            self.read_window(pos, &mut window[..n])?;
            if let Some(end) = window[..n].iter().position(|&b| b == 0) {
                out.extend_from_slice(&window[..end]);
                trace!(offset, len = out.len(), "fetched chunked string");
                return Ok(Cow::Owned(out));
            }
            out.extend_from_slice(&window[..n]);
            pos += n as u64;
        }
        Err(unterminated(offset))
    }
}
