use anyhow::{Context, Result};
use blobfs_rs::Storage;
use clap::Args;

use crate::image;

#[derive(Args, Debug)]
pub struct DumpArgs {
    path: String,
}

// Image size:              1024
// Root inode size:         4
// Root inode data offset:  977
// Root inode flags:        IS_DIR
// Directories:             3
// Files:                   12
// Total file bytes:        812

pub fn dump(args: DumpArgs) -> Result<()> {
    let fs = image::open_mapped(&args.path)?;
    let root = fs.root()?;

    println!("Image size:              {}", fs.storage().len());
    println!("Root inode size:         {}", root.size);
    println!("Root inode data offset:  {}", root.data_offset);
    println!("Root inode flags:        {:?}", root.flags);

    let (mut dirs, mut files, mut bytes) = (1u64, 0u64, 0u64);
    if root.is_dir() {
        for entry in fs.walk_dir("/")? {
            let entry = entry.context("failed to read directory entry")?;
            if entry.dir_entry.is_dir() {
                dirs += 1;
            } else {
                files += 1;
                bytes += u64::from(entry.dir_entry.data().size);
            }
        }
    } else {
        (dirs, files, bytes) = (0, 1, u64::from(root.size));
    }

    println!("Directories:             {}", dirs);
    println!("Files:                   {}", files);
    println!("Total file bytes:        {}", bytes);

    Ok(())
}
