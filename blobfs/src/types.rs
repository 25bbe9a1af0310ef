use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use rustix::fs::{FileType, RawMode};

use crate::Result;

/// An absolute byte position within the blob.
pub type Offset = u32;

/// The offset of an [`InodeData`] record within the blob.
///
/// Children are identified by the offset of the record embedded in their
/// parent's [`Dirent`], there is no separate inode table.
pub type InodeRef = Offset;

pub const ROOT_INODE: InodeRef = 0;

pub const INODE_DATA_SIZE: usize = 9;
pub const DIRENT_SIZE: usize = 13;

/// Position of the inline [`InodeData`] inside a [`Dirent`] record.
pub const DIRENT_INODE_OFFSET: u32 = 4;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InodeFlags: u8 {
        const IS_DIR = 0b01;
        /// Reserved: content is deflated. Only meaningful on regular files and
        /// not decoded by this crate.
        const COMPRESSED = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct InodeData {
    /// Byte length of a file, or number of entries of a directory.
    pub size: u32,
    /// Start of the file content, or of the directory's entry array.
    pub data_offset: Offset,
    #[br(map = |bits: u8| InodeFlags::from_bits_retain(bits))]
    #[bw(map = |flags: &InodeFlags| flags.bits())]
    pub flags: InodeFlags,
}

impl InodeData {
    pub fn new(size: u32, data_offset: Offset, flags: InodeFlags) -> Self {
        Self {
            size,
            data_offset,
            flags,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(bytes))?)
    }

    /// Appends the packed big-endian record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let end = out.len() as u64;
        let mut cursor = Cursor::new(out);
        cursor.set_position(end);
        self.write(&mut cursor)?;
        Ok(())
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.flags.contains(InodeFlags::IS_DIR)
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        !self.is_dir()
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags.contains(InodeFlags::COMPRESSED)
    }

    pub fn file_type(&self) -> FileType {
        if self.is_dir() {
            FileType::Directory
        } else {
            FileType::RegularFile
        }
    }

    /// `st_mode` as reported to a host VFS: read and execute for everyone.
    pub fn mode(&self) -> RawMode {
        self.file_type().as_raw_mode() | 0o555
    }
}

/// A directory entry record as stored in the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct Dirent {
    /// Offset of the NUL-terminated entry name.
    pub name_offset: Offset,
    pub inode: InodeData,
}

impl Dirent {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(bytes))?)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let end = out.len() as u64;
        let mut cursor = Cursor::new(out);
        cursor.set_position(end);
        self.write(&mut cursor)?;
        Ok(())
    }
}
