use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

mod convert;
mod create;
mod dump;
mod image;
mod inspect;

#[derive(Subcommand, Debug)]
enum Commands {
    Create(create::CreateArgs),
    Dump(dump::DumpArgs),
    Inspect(inspect::InspectArgs),
    Convert(convert::ConvertArgs),
}

#[derive(Debug, Parser)]
#[command(version, about = "Build and inspect BlobFS images")]
struct Opt {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    init_tracing();
    let opt = Opt::parse();

    match opt.command {
        Commands::Create(args) => create::create(args),
        Commands::Dump(args) => dump::dump(args),
        Commands::Inspect(args) => inspect::inspect(args),
        Commands::Convert(args) => convert::convert(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
