// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use fwimg::verify;
use log::info;
use std::path::PathBuf;

/// Check an image produced by cvimg, optionally recovering its payload
#[derive(Debug, Parser)]
#[clap(name = "cvimg-verify", max_term_width = 80)]
struct Args {
    #[clap(short, long)]
    verbose: bool,
    /// Write the payload (without header, padding or checksum) to FILE
    #[clap(short = 'x', long = "extract", value_name = "FILE")]
    extract: Option<PathBuf>,
    src_img: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    verify::init_verify_logger(args.verbose);

    let image = std::fs::read(&args.src_img)
        .with_context(|| format!("could not read {:?}", args.src_img))?;
    let verified = verify::verify_image(&image)?;

    let signature = verified.header.signature();
    println!(
        "{}: {} (signature {} [{}], {} byte payload, checksum 0x{:04X})",
        "OK".green(),
        args.src_img.display(),
        signature,
        hex::encode(signature.as_bytes()),
        verified.payload.len(),
        verified.checksum,
    );

    if let Some(dest) = args.extract {
        std::fs::write(&dest, verified.payload)
            .with_context(|| format!("could not write {dest:?}"))?;
        info!("payload written to {}", dest.display());
    }

    Ok(())
}
