use std::fs::File;

use anyhow::{Context, Result};
use clap::Args;
use tar::Header;
use tracing::info;

use crate::image;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    path: String,
    #[clap(short, long, default_value = "/")]
    root: String,
    #[clap(short, long)]
    output: String,
}

pub fn convert(args: ConvertArgs) -> Result<()> {
    let fs = image::open_mapped(&args.path)?;

    let out_file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output))?;
    let mut tar = tar::Builder::new(out_file);

    let mut count = 0usize;
    for entry in fs.walk_dir(&args.root)? {
        let entry = entry.context("read entry failed")?;
        let data = entry.dir_entry.data();
        let path = entry.dir_entry.path();

        let mut header = Header::new_gnu();
        header.set_path(path.trim_start_matches('/'))?;
        header.set_mode(u32::from(data.mode() & 0o7777));

        if data.is_dir() {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_cksum();
            tar.append(&header, std::io::empty())?;
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(u64::from(data.size));
            header.set_cksum();

            let file = fs
                .open_file(entry.dir_entry.inode())
                .with_context(|| format!("failed to open file: {}", path))?;
            tar.append(&header, file)?;
        }
        count += 1;
    }
    tar.finish()?;

    info!(output = %args.output, entries = count, "wrote archive");
    Ok(())
}
