use std::io::{self, Write};

use anyhow::{Context, Result};
use blobfs_rs::types::{InodeData, InodeRef};
use blobfs_rs::{BlobFS, Storage};
use clap::{Args, Subcommand};

use crate::image;

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[clap(short, long)]
    image: String,

    /// Read the image through a bounded window of this many bytes instead of
    /// mapping it into memory
    #[clap(long)]
    chunk_size: Option<usize>,

    #[command(subcommand)]
    operation: InspectSubcommands,
}

#[derive(Subcommand, Debug)]
enum InspectSubcommands {
    Ls {
        #[clap(default_value = "/")]
        path: String,
    },
    Cat {
        path: String,
    },
    Stat {
        path: String,
    },
    Tree {
        #[clap(default_value = "/")]
        path: String,
    },
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    match args.chunk_size {
        Some(chunk_size) => {
            let fs = image::open_chunked(&args.image, chunk_size)?;
            run(&fs, args.operation)
        }
        None => {
            let fs = image::open_mapped(&args.image)?;
            run(&fs, args.operation)
        }
    }
}

fn run<S: Storage>(fs: &BlobFS<S>, operation: InspectSubcommands) -> Result<()> {
    match operation {
        InspectSubcommands::Ls { path } => ls(fs, &path),
        InspectSubcommands::Cat { path } => cat(fs, &path),
        InspectSubcommands::Stat { path } => stat(fs, &path),
        InspectSubcommands::Tree { path } => tree(fs, &path),
    }
}

fn format_mode(data: &InodeData) -> String {
    let mut res = String::with_capacity(10);
    res.push(if data.is_dir() { 'd' } else { '-' });

    let masks = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'), // User
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'), // Group
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'), // Other
    ];

    let mode = data.mode();
    for (mask, char) in masks {
        if mode & mask != 0 {
            res.push(char);
        } else {
            res.push('-');
        }
    }

    res
}

fn format_size(data: &InodeData) -> String {
    if data.is_dir() {
        return format!("{} entries", data.size);
    }

    let size = data.size;
    if size < 1024 {
        format!("{}B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1}KiB", size as f64 / 1024.0)
    } else if size < 1024 * 1024 * 1024 {
        format!("{:.1}MiB", size as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GiB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn ls<S: Storage>(fs: &BlobFS<S>, path: &str) -> Result<()> {
    let read_dir = fs
        .read_dir(path)
        .with_context(|| format!("failed to read directory: {}", path))?;

    for entry in read_dir {
        let entry = entry.with_context(|| "failed to read directory entry")?;
        let data = entry.data();
        println!(
            "{} {:>12} {}",
            format_mode(&data),
            format_size(&data),
            entry.file_name()
        );
    }

    Ok(())
}

fn cat<S: Storage>(fs: &BlobFS<S>, path: &str) -> Result<()> {
    let mut file = fs
        .open(path)
        .with_context(|| format!("failed to open file: {}", path))?;

    let mut stdout = io::stdout().lock();
    io::copy(&mut file, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn stat<S: Storage>(fs: &BlobFS<S>, path: &str) -> Result<()> {
    let (inode, data): (InodeRef, InodeData) = fs
        .stat_path(path)
        .with_context(|| format!("failed to stat: {}", path))?;

    println!("Path:        {}", path);
    println!("Inode:       {}", inode);
    println!("Type:        {}", if data.is_dir() { "directory" } else { "regular file" });
    println!("Mode:        {} ({:o})", format_mode(&data), data.mode());
    println!("Size:        {}", data.size);
    println!("Data offset: {}", data.data_offset);
    println!("Flags:       {:?}", data.flags);

    Ok(())
}

fn tree<S: Storage>(fs: &BlobFS<S>, path: &str) -> Result<()> {
    let walk = fs
        .walk_dir(path)
        .with_context(|| format!("failed to read directory: {}", path))?;

    println!("{}", path);
    for entry in walk {
        let entry = entry.with_context(|| "failed to read directory entry")?;
        let indent = "  ".repeat(entry.depth);
        if entry.dir_entry.is_dir() {
            println!("{}{}/", indent, entry.dir_entry.file_name());
        } else {
            println!(
                "{}{} ({})",
                indent,
                entry.dir_entry.file_name(),
                format_size(&entry.dir_entry.data())
            );
        }
    }

    Ok(())
}
