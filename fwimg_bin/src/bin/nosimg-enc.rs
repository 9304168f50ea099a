// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use fwimg::nosimg::{self, Mode};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Encode/decode "nos.img" images for XikeStor SKS8300 series switches
#[derive(Debug, Parser)]
#[clap(name = "nosimg-enc", max_term_width = 80)]
struct Args {
    /// source file (binary)
    #[clap(short = 'i', long = "in")]
    src_img: PathBuf,
    /// output file (binary)
    #[clap(short = 'o', long = "out")]
    dest_img: PathBuf,
    /// Decode the image instead of encoding it
    #[clap(short = 'd', long)]
    decode: bool,
}

/// Like `Args::parse`, but bad values are followed by the usage line too
fn parse_args() -> Args {
    Args::try_parse().unwrap_or_else(|e| {
        if matches!(e.kind(), ErrorKind::ValueValidation | ErrorKind::InvalidValue) {
            eprint!("{e}");
            eprintln!("\n{}", Args::command().render_usage());
            std::process::exit(e.exit_code());
        }
        e.exit()
    })
}

fn main() -> Result<()> {
    let args = parse_args();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mode = if args.decode {
        Mode::Decode
    } else {
        Mode::Encode
    };

    let input = File::open(&args.src_img)
        .with_context(|| format!("can not open input file {:?}", args.src_img))?;
    let output = File::create(&args.dest_img)
        .with_context(|| format!("can not open output file {:?}", args.dest_img))?;

    let n = nosimg::transform(input, BufWriter::new(output), mode)
        .with_context(|| format!("failed to {mode} {:?}", args.src_img))?;
    info!("{mode}d {n} bytes into {}", args.dest_img.display());

    Ok(())
}
