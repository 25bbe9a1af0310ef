//! Writing BlobFS images.
//!
//! The root record is reserved at offset 0 and filled in last. Every other
//! piece of data (file contents, NUL-terminated names and directory entry
//! tables) is appended once and shared by everything that stores the same
//! bytes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::{fs, io};

use tracing::{debug, trace};

use crate::types::*;
use crate::{Error, Result};

/// A file or directory to be written into a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(Vec<u8>),
    /// Children keyed by name. `BTreeMap` keeps them in byte-wise order, which
    /// is the order the reader binary-searches in.
    Dir(BTreeMap<String, Node>),
}

impl Node {
    pub fn file(content: impl Into<Vec<u8>>) -> Self {
        Self::File(content.into())
    }

    pub fn dir<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, Node)>,
        K: Into<String>,
    {
        Self::Dir(
            children
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }

    /// Reads a host file or directory tree into memory.
    ///
    /// Symlinks are followed. File names must be valid UTF-8, and anything
    /// that is neither a regular file nor a directory is rejected.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;
        if meta.is_file() {
            return Ok(Self::File(fs::read(path)?));
        }
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported file type: {}", path.display()),
            ));
        }

        let mut children = BTreeMap::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().into_string().map_err(|name| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name is not valid UTF-8: {:?}", name),
                )
            })?;
            children.insert(name, Self::from_path(entry.path())?);
        }
        Ok(Self::Dir(children))
    }
}

/// Serializes a [`Node`] tree into a blob.
#[derive(Debug, Default)]
pub struct BlobBuilder {
    blob: Vec<u8>,
    cache: HashMap<Vec<u8>, Offset>,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(mut self, root: &Node) -> Result<Vec<u8>> {
        self.blob.clear();
        self.cache.clear();
        self.blob.resize(INODE_DATA_SIZE, 0);

        let root = self.create_entry(root)?;
        let mut record = Vec::with_capacity(INODE_DATA_SIZE);
        root.encode_into(&mut record)?;
        self.blob[..INODE_DATA_SIZE].copy_from_slice(&record);

        debug!(
            size = self.blob.len(),
            shared = self.cache.len(),
            "built blob"
        );
        Ok(self.blob)
    }

    fn store_data(&mut self, data: &[u8]) -> Result<Offset> {
        if let Some(&offset) = self.cache.get(data) {
            return Ok(offset);
        }

        let offset = self.blob.len();
        if offset + data.len() > u32::MAX as usize {
            return Err(Error::InvalidArgument(
                "blob exceeds the 4 GiB addressable range".to_string(),
            ));
        }
        let offset = offset as Offset;
        self.blob.extend_from_slice(data);
        self.cache.insert(data.to_vec(), offset);
        trace!(offset, len = data.len(), "stored data");
        Ok(offset)
    }

    fn create_entry(&mut self, node: &Node) -> Result<InodeData> {
        match node {
            Node::File(content) => {
                let size = checked_size(content.len())?;
                let data_offset = self.store_data(content)?;
                Ok(InodeData::new(size, data_offset, InodeFlags::empty()))
            }
            Node::Dir(children) => {
                let mut table = Vec::with_capacity(children.len() * DIRENT_SIZE);
                for (name, child) in children {
                    validate_name(name)?;
                    let mut stored = Vec::with_capacity(name.len() + 1);
                    stored.extend_from_slice(name.as_bytes());
                    stored.push(0);

                    let name_offset = self.store_data(&stored)?;
                    let inode = self.create_entry(child)?;
                    Dirent { name_offset, inode }.encode_into(&mut table)?;
                }
                let size = checked_size(children.len())?;
                let data_offset = self.store_data(&table)?;
                Ok(InodeData::new(size, data_offset, InodeFlags::IS_DIR))
            }
        }
    }
}

fn checked_size(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::InvalidArgument(format!("size {} does not fit in 32 bits", len)))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\0']) {
        return Err(Error::InvalidArgument(format!(
            "invalid entry name {:?}",
            name
        )));
    }
    Ok(())
}

/// Builds a blob from an in-memory tree.
pub fn compile(root: &Node) -> Result<Vec<u8>> {
    BlobBuilder::new().build(root)
}

/// Builds a blob from a host directory (or a single file, which becomes the
/// root inode).
pub fn compile_path(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let root = Node::from_path(path).map_err(Error::Backend)?;
    compile(&root)
}
