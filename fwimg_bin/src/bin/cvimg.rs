// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use clap::builder::{OsStringValueParser, TypedValueParser};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use fwimg::cvimg;
use fwimg::header::{Signature, MAX_PAYLOAD_LEN};
use log::info;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Generate firmware for Realtek based devices with a header and checksum
#[derive(Debug, Parser)]
#[clap(name = "cvimg", max_term_width = 80)]
struct Args {
    /// source file (binary)
    #[clap(short = 'i', long = "in")]
    src_bin: PathBuf,
    /// output file (binary)
    #[clap(short = 'o', long = "out")]
    dest_bin: PathBuf,
    /// Execution start address
    #[arg(short = 's', long, value_parser = parse_addr)]
    start_addr: u32,
    /// Flash address the image is burned to
    #[arg(short = 'b', long, value_parser = parse_addr)]
    burn_addr: u32,
    /// Image signature, exactly 4 bytes
    #[arg(
        short = 'S',
        long,
        default_value = "cs6c",
        value_parser = OsStringValueParser::new().try_map(signature_from_os)
    )]
    signature: Signature,
}

/// Parses an address the way C's `strtoul(s, _, 0)` would: `0x` for hex,
/// a leading `0` for octal, decimal otherwise. `0o` and `0b` prefixes are
/// accepted as well.
fn parse_addr(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix('0') {
        Some(octal) if !octal.is_empty() && octal.bytes().all(|b| b.is_ascii_digit()) => {
            u32::from_str_radix(octal, 8)
        }
        _ => parse_int::parse::<u32>(s),
    }
}

// The signature is raw bytes, so don't insist on UTF-8 where we don't have to
fn signature_from_os(s: OsString) -> Result<Signature, fwimg::Error> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Signature::try_from(s.as_bytes())
    }
    #[cfg(not(unix))]
    {
        Signature::try_from(s.to_string_lossy().as_bytes())
    }
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

    let payload_len = std::fs::metadata(&args.src_bin)
        .with_context(|| format!("cannot stat {:?}", args.src_bin))?
        .len();
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(fwimg::Error::PayloadTooLarge(payload_len))
            .context("input file is too large");
    }

    let input = File::open(&args.src_bin)
        .with_context(|| format!("failed to open input file {:?}", args.src_bin))?;
    let output = File::create(&args.dest_bin)
        .with_context(|| format!("failed to open output file {:?}", args.dest_bin))?;

    let summary = cvimg::frame(
        input,
        payload_len,
        BufWriter::new(output),
        args.signature,
        args.start_addr,
        args.burn_addr,
    )
    .with_context(|| format!("failed to write {:?}", args.dest_bin))?;

    println!("data len : {} bytes", summary.payload_len);
    println!("total len: {} bytes", summary.total_len);
    println!("checksum : 0x{:04X}", summary.checksum);
    info!("image written to {}", args.dest_bin.display());

    Ok(())
}
