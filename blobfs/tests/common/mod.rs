#![allow(dead_code)]

use std::io;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use blobfs_rs::builder::{self, Node};
use blobfs_rs::{BlobFS, ChunkedStorage, MemoryStorage, ReadAt};

/// The blob for a root directory holding `hello.txt` = "hi", laid out by hand.
pub fn hello_blob() -> Vec<u8> {
    let mut blob = Vec::new();
    blob.extend_from_slice(&inode(1, 21, 1));
    blob.extend_from_slice(b"hello.txt\0");
    blob.extend_from_slice(b"hi");
    blob.extend_from_slice(&dirent(9, inode(2, 19, 0)));
    assert_eq!(blob.len(), 34);
    blob
}

pub fn inode(size: u32, data_offset: u32, flags: u8) -> [u8; 9] {
    let mut raw = [0u8; 9];
    raw[..4].copy_from_slice(&size.to_be_bytes());
    raw[4..8].copy_from_slice(&data_offset.to_be_bytes());
    raw[8] = flags;
    raw
}

pub fn dirent(name_offset: u32, inode: [u8; 9]) -> Vec<u8> {
    let mut raw = name_offset.to_be_bytes().to_vec();
    raw.extend_from_slice(&inode);
    raw
}

pub fn sample_tree() -> Node {
    Node::dir([
        ("a", Node::dir(Vec::<(String, Node)>::new())),
        (
            "docs",
            Node::dir([
                ("guide", Node::dir([("intro.txt", Node::file("intro"))])),
                ("readme.md", Node::file("read me")),
            ]),
        ),
        ("hello.txt", Node::file("hi")),
        ("zeta", Node::file("z")),
    ])
}

pub fn sample_blob() -> Vec<u8> {
    builder::compile(&sample_tree()).expect("compile sample tree")
}

/// A directory with `n` files named `f000`, `f001`, ... each holding its own name.
pub fn wide_blob(n: usize) -> Vec<u8> {
    let children = (0..n).map(|i| {
        let name = format!("f{:03}", i);
        let content = name.clone().into_bytes();
        (name, Node::File(content))
    });
    builder::compile(&Node::dir([("wide", Node::dir(children))])).expect("compile wide tree")
}

/// In-memory medium that records how it is read and can fail on demand.
#[derive(Clone, Debug)]
pub struct FakeReader {
    data: Arc<[u8]>,
    reads: Arc<AtomicUsize>,
    largest_read: Arc<AtomicUsize>,
    fail: Option<Range<u64>>,
}

impl FakeReader {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: Arc::from(data),
            reads: Arc::new(AtomicUsize::new(0)),
            largest_read: Arc::new(AtomicUsize::new(0)),
            fail: None,
        }
    }

    /// Fails every read that touches `range`.
    pub fn failing(mut self, range: Range<u64>) -> Self {
        self.fail = Some(range);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn largest_read(&self) -> usize {
        self.largest_read.load(Ordering::SeqCst)
    }
}

impl ReadAt for FakeReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.largest_read.fetch_max(buf.len(), Ordering::SeqCst);
        if let Some(fail) = &self.fail {
            let end = offset + buf.len() as u64;
            if offset < fail.end && fail.start < end {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "flash read timed out"));
            }
        }
        let offset = offset as usize;
        let end = (offset + buf.len()).min(self.data.len());
        let n = end.saturating_sub(offset);
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        Ok(n)
    }
}

pub fn memory_fs(blob: Vec<u8>) -> BlobFS<MemoryStorage<Vec<u8>>> {
    BlobFS::from_memory(blob).expect("open memory blob")
}

pub fn chunked_fs(blob: &[u8], chunk_size: usize) -> BlobFS<ChunkedStorage<FakeReader>> {
    BlobFS::from_reader(FakeReader::new(blob), blob.len() as u64, chunk_size)
        .expect("open chunked blob")
}
