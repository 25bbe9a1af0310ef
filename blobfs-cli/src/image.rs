use std::fs::File;

use anyhow::{Context, Result};
use blobfs_rs::{BlobFS, ChunkedStorage, MemoryStorage};
use memmap2::Mmap;
use tracing::debug;

pub type MappedFS = BlobFS<MemoryStorage<Mmap>>;
pub type ChunkedFS = BlobFS<ChunkedStorage<File>>;

pub fn open_mapped(path: &str) -> Result<MappedFS> {
    let file = File::open(path).with_context(|| format!("failed to open image: {}", path))?;
    let file = unsafe { Mmap::map(&file) }?;
    debug!(path, size = file.len(), "mapped image");
    BlobFS::from_memory(file).with_context(|| format!("invalid image: {}", path))
}

pub fn open_chunked(path: &str, chunk_size: usize) -> Result<ChunkedFS> {
    let file = File::open(path).with_context(|| format!("failed to open image: {}", path))?;
    let storage = ChunkedStorage::open_file(file, chunk_size)?;
    debug!(path, chunk_size, "reading image in windows");
    BlobFS::new(storage).with_context(|| format!("invalid image: {}", path))
}
