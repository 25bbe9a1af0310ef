use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use blobfs_rs::builder::{BlobBuilder, Node};
use clap::{Args, ValueEnum};
use notify::{RecursiveMode, Watcher};
use tracing::{debug, info, warn};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Directory (or single file) to compile
    source: String,
    /// Output file
    dest: String,
    #[clap(short, long, value_enum, default_value_t = Format::Raw)]
    format: Format,
    /// Text written before the image
    #[clap(long, default_value = "")]
    prefix: String,
    /// Text written after the image
    #[clap(long, default_value = "")]
    suffix: String,
    /// Keep running and rebuild whenever the source changes
    #[clap(short, long)]
    watch: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// The blob bytes as-is
    Raw,
    /// A C string literal, for embedding into firmware sources
    C,
    /// A Python bytes literal
    Py,
}

pub fn create(args: CreateArgs) -> Result<()> {
    build_image(&args)?;
    if args.watch {
        watch(&args)?;
    }
    Ok(())
}

fn build_image(args: &CreateArgs) -> Result<()> {
    let root = Node::from_path(&args.source)
        .with_context(|| format!("failed to read source tree: {}", args.source))?;
    let blob = BlobBuilder::new()
        .build(&root)
        .with_context(|| format!("failed to build image from {}", args.source))?;

    let mut out = Vec::with_capacity(blob.len() * 2);
    out.extend_from_slice(args.prefix.as_bytes());
    match args.format {
        Format::Raw => out.extend_from_slice(&blob),
        Format::C => write_c_literal(&mut out, &blob)?,
        Format::Py => write_py_literal(&mut out, &blob)?,
    }
    out.extend_from_slice(args.suffix.as_bytes());
    fs::write(&args.dest, &out).with_context(|| format!("failed to write {}", args.dest))?;

    info!(dest = %args.dest, size = blob.len(), "created image");
    println!("created {}, size={}", args.dest, blob.len());
    Ok(())
}

/// Rebuilds the image on every change below the source until the watcher
/// goes away. Failed rebuilds are logged and the watch continues.
fn watch(args: &CreateArgs) -> Result<()> {
    let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("failed to create watcher")?;
    watcher
        .watch(Path::new(&args.source), RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", args.source))?;
    info!(source = %args.source, "watching for changes");

    let dest = fs::canonicalize(&args.dest).ok();
    for event in &rx {
        let event = event.context("watch error")?;
        // writing the output inside the watched tree must not retrigger
        if event
            .paths
            .iter()
            .all(|path| fs::canonicalize(path).ok() == dest)
        {
            continue;
        }
        debug!(kind = ?event.kind, paths = ?event.paths, "source changed");
        // one rebuild per burst of events
        for _ in rx.try_iter() {}

        if let Err(err) = build_image(args) {
            warn!("rebuild failed: {:#}", err);
        }
    }
    Ok(())
}

fn write_c_literal(out: &mut impl Write, data: &[u8]) -> std::io::Result<()> {
    out.write_all(b"\"")?;
    // octal escapes greedily take up to three digits, so a digit right after
    // one has to start a new literal
    let mut after_octal = false;
    for &byte in data {
        let escape: Option<&[u8]> = match byte {
            0x07 => Some(b"\\a"),
            0x08 => Some(b"\\b"),
            b'\t' => Some(b"\\t"),
            b'\n' => Some(b"\\n"),
            0x0b => Some(b"\\v"),
            0x0c => Some(b"\\f"),
            b'\r' => Some(b"\\r"),
            b'"' => Some(b"\\\""),
            b'\'' => Some(b"\\'"),
            b'\\' => Some(b"\\\\"),
            _ => None,
        };

        if let Some(escape) = escape {
            out.write_all(escape)?;
            after_octal = false;
        } else if byte == b' ' || byte.is_ascii_graphic() {
            if after_octal && byte.is_ascii_digit() {
                out.write_all(b"\"\"")?;
            }
            out.write_all(&[byte])?;
            after_octal = false;
        } else {
            write!(out, "\\{:o}", byte)?;
            after_octal = true;
        }
    }
    out.write_all(b"\"")
}

fn write_py_literal(out: &mut impl Write, data: &[u8]) -> std::io::Result<()> {
    let quote = if data.contains(&b'\'') && !data.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };

    out.write_all(&[b'b', quote])?;
    for &byte in data {
        match byte {
            b'\\' => out.write_all(b"\\\\")?,
            b'\t' => out.write_all(b"\\t")?,
            b'\n' => out.write_all(b"\\n")?,
            b'\r' => out.write_all(b"\\r")?,
            byte if byte == quote => out.write_all(&[b'\\', quote])?,
            0x20..=0x7e => out.write_all(&[byte])?,
            byte => write!(out, "\\x{:02x}", byte)?,
        }
    }
    out.write_all(&[quote])
}
