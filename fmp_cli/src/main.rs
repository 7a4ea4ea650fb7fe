#![warn(clippy::all, clippy::pedantic)]

mod dump;
mod stats;

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use tracing::info;

use dump::{dump, Dump};
use fmp_core::format::FmpDocument;
use stats::{stats, Stats};

#[derive(Parser)]
#[clap(version = "0.1.0")]
struct Opts {
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    /// Print a file as json
    Dump(Dump),
    /// Read a file and write it back
    Rewrite(Rewrite),
    /// Print record counts of a file
    Stats(Stats),
}

#[derive(Parser)]
struct Rewrite {
    input: PathBuf,
    output: PathBuf,
}

fn rewrite(opts: Rewrite) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&opts.input)?;
    let document = FmpDocument::read(&bytes)?;
    let written = document.write()?;

    info!(
        "rewrote {} bytes into {} bytes",
        bytes.len(),
        written.len()
    );
    fs::write(&opts.output, written)?;
    Ok(())
}

pub(crate) fn read_document(path: &Path) -> Result<FmpDocument, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    Ok(FmpDocument::read(&bytes)?)
}

fn main() {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let opts = Opts::parse();

    let result = match opts.subcommand {
        SubCommand::Dump(opts) => dump(opts),
        SubCommand::Rewrite(opts) => rewrite(opts),
        SubCommand::Stats(opts) => stats(opts),
    };

    if let Err(err) = result {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
