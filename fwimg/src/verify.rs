// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::checksum::checksum;
use crate::cvimg::{padded_len, total_len};
use crate::header::{ImageHeader, Signature, CHECKSUM_LEN, HEADER_LEN};
use crate::Error;
use log::{debug as okay, info, trace, warn};
use std::io::Write as _;

/// Logs a failed check and remembers that verification as a whole failed
macro_rules! fail {
    ($failed:ident, $($arg:tt)*) => {
        $failed = true;
        log::error!($($arg)*);
    }
}

/// Label and colour for each level in the verification log. Passed checks
/// are logged at `debug`, section headings at `info`, image details at
/// `trace`.
fn level_label(level: log::Level) -> (&'static str, env_logger::fmt::Color) {
    use env_logger::fmt::Color;
    match level {
        log::Level::Error => ("FAIL", Color::Red),
        log::Level::Warn => ("WARN", Color::Yellow),
        log::Level::Info => ("", Color::Cyan),
        log::Level::Debug => ("OKAY", Color::Green),
        log::Level::Trace => ("-", Color::Blue),
    }
}

/// Sets up a logger that renders the checks made by [`verify_image`] as a
/// report on stderr. Image details are only shown when `verbose` is set.
pub fn init_verify_logger(verbose: bool) {
    env_logger::Builder::new()
        .format(|buf, record| {
            let (label, color) = level_label(record.level());
            let mut style = buf.style();
            style.set_color(color).set_bold(record.level() <= log::Level::Warn);
            let body = record.args().to_string().replace('\n', "\n     | ");
            writeln!(buf, "{: <4} | {body}", style.value(label))
        })
        .filter_level(if verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Debug
        })
        .init();
}

/// A framed image that passed [`verify_image`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedImage<'a> {
    pub header: ImageHeader,
    /// The original payload, without padding
    pub payload: &'a [u8],
    pub checksum: u16,
}

/// Checks an image produced by [`frame`](crate::cvimg::frame). Every check
/// is logged; if any of them fails, [`Error::VerificationFailed`] is
/// returned once all checks that could be run have been.
pub fn verify_image(image: &[u8]) -> Result<VerifiedImage<'_>, Error> {
    let mut failed = false;

    info!("=== Header ===");
    if image.len() < HEADER_LEN + CHECKSUM_LEN {
        log::error!(
            "image is only {} bytes; need at least {} for header and checksum",
            image.len(),
            HEADER_LEN + CHECKSUM_LEN
        );
        return Err(Error::VerificationFailed);
    }
    let header = ImageHeader::from_bytes(image)?;
    let signature = header.signature();

    trace!("signature: {signature}");
    trace!("start address: {:#010x}", header.start_addr);
    trace!("burn address: {:#010x}", header.burn_addr);
    trace!("length: {:#x} ({})", header.len, header.len);

    if signature != Signature::DEFAULT {
        warn!("signature {signature} is not the default {}", Signature::DEFAULT);
    }

    let Some(payload_len) = header.payload_len() else {
        log::error!(
            "header length {} is smaller than the {CHECKSUM_LEN} byte checksum",
            header.len
        );
        return Err(Error::VerificationFailed);
    };
    okay!("header length covers the checksum");

    let payload_len = u64::from(payload_len);
    let expected_len = total_len(payload_len);
    if image.len() as u64 != expected_len {
        fail!(
            failed,
            "image is {} bytes but its header implies {expected_len}",
            image.len()
        );
    } else {
        okay!("image size matches header length");
    }

    info!("=== Payload ===");
    let payload_end = HEADER_LEN as u64 + payload_len;
    let checksum_start = HEADER_LEN as u64 + padded_len(payload_len);
    if (image.len() as u64) < checksum_start + CHECKSUM_LEN as u64 {
        log::error!("image is truncated; cannot locate checksum");
        return Err(Error::VerificationFailed);
    }
    // Bounded by image.len() above
    let payload_end = payload_end as usize;
    let checksum_start = checksum_start as usize;

    let payload = &image[HEADER_LEN..payload_end];
    trace!("payload: {} bytes", payload.len());

    if checksum_start > payload_end {
        match image[payload_end] {
            0 => okay!("padding byte is zero"),
            b => warn!("padding byte is {b:#04x}, expected 0"),
        }
    }

    let stored = u16::from_be_bytes([image[checksum_start], image[checksum_start + 1]]);
    let computed = checksum(payload);
    trace!("stored checksum: {stored:#06x}");
    trace!("computed checksum: {computed:#06x}");
    if stored != computed {
        fail!(
            failed,
            "checksum mismatch: stored {stored:#06x}, computed {computed:#06x}"
        );
    } else {
        okay!("checksum matches");
    }

    if failed {
        Err(Error::VerificationFailed)
    } else {
        Ok(VerifiedImage {
            header,
            payload,
            checksum: stored,
        })
    }
}
