// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image preparation for two firmware loaders:
//!
//! - [`cvimg`] wraps a payload in the 16-byte header and 16-bit checksum
//!   expected by Realtek-based bootloaders.
//! - [`nosimg`] encodes/decodes the first 512 bytes of a XikeStor SKS8300
//!   `nos.img` with a fixed keystream.

pub mod checksum;
pub mod cvimg;
pub mod header;
pub mod nosimg;
pub mod verify;

/// Broad class of an [`Error`], used by callers that only care about what
/// went wrong in general terms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing user input
    InvalidArgument,
    /// Filesystem or stream failure
    Io,
    /// Payload does not fit the header's length field
    Size,
    /// Input too short for the fixed encoded region
    Format,
    /// An existing image failed one or more checks
    Verification,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("signature must be exactly 4 bytes long, got {0}")]
    InvalidSignatureLength(usize),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("input ended early: expected {expected} bytes, read {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("input of {0} bytes is too large for a 32-bit image length")]
    PayloadTooLarge(u64),

    #[error("struct packing error: {0}")]
    PackingError(#[from] packed_struct::PackingError),

    #[error("image too short: need at least {need} bytes, got {have}")]
    ImageTooShort { need: usize, have: usize },

    #[error("verification failed; see log for details")]
    VerificationFailed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidSignatureLength(_) => ErrorKind::InvalidArgument,
            Error::IoError(_) | Error::LengthMismatch { .. } => ErrorKind::Io,
            Error::PayloadTooLarge(_) => ErrorKind::Size,
            Error::PackingError(_) | Error::ImageTooShort { .. } => ErrorKind::Format,
            Error::VerificationFailed => ErrorKind::Verification,
        }
    }
}
