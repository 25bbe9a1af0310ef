//! A pure Rust library for reading and writing BlobFS images.
//!
//! BlobFS is a compact read-only filesystem stored in a single contiguous
//! blob, meant for firmware images on devices that cannot afford a full
//! filesystem stack. Records are packed and big-endian; every offset read
//! from the blob is bounds-checked before use.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::Read;
//! use blobfs_rs::BlobFS;
//!
//! // Fully resident blob
//! let blob = std::fs::read("image.blobfs").unwrap();
//! let fs = BlobFS::from_memory(blob).unwrap();
//! let mut content = String::new();
//! fs.open("/etc/motd").unwrap().read_to_string(&mut content).unwrap();
//!
//! // Same image, read 256 bytes at a time
//! let file = File::open("image.blobfs").unwrap();
//! let len = file.metadata().unwrap().len();
//! let fs = BlobFS::from_reader(file, len, 256).unwrap();
//! for entry in fs.read_dir("/etc").unwrap() {
//!     println!("{}", entry.unwrap().file_name());
//! }
//! ```

pub mod builder;
mod dirent;
mod error;
pub mod file;
pub mod filesystem;
pub mod storage;
pub mod types;
pub mod walkdir;

pub use dirent::{DirEntry, ReadDir};
pub use error::*;
pub use file::File;
pub use filesystem::BlobFS;
pub use storage::{ChunkedStorage, MemoryStorage, ReadAt, Storage};
pub use walkdir::{WalkDir, WalkDirEntry};
