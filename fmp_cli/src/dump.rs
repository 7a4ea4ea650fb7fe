use std::{error::Error, io, path::PathBuf};

use clap::Parser;
use serde::Serialize;

use crate::read_document;

#[derive(Parser)]
pub struct Dump {
    path: PathBuf,
    /// Only dump the object with this name
    #[clap(short, long)]
    object: Option<String>,
    #[clap(short, long)]
    compact: bool,
}

fn write_json<T: Serialize>(value: &T, compact: bool) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let stdout = stdout.lock();

    if compact {
        serde_json::to_writer(stdout, value)?;
    } else {
        serde_json::to_writer_pretty(stdout, value)?;
    }
    println!();
    Ok(())
}

pub fn dump(opts: Dump) -> Result<(), Box<dyn Error>> {
    let document = read_document(&opts.path)?;

    match &opts.object {
        Some(name) => {
            let index = document
                .find_object(name)
                .ok_or_else(|| format!("no object named `{}`", name))?;
            write_json(&document.objects[index], opts.compact)
        }
        None => write_json(&document, opts.compact),
    }
}
