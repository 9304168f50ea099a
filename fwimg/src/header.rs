// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::Error;
use packed_struct::prelude::*;
use std::fmt;
use std::str::FromStr;

pub const HEADER_LEN: usize = 16;
pub const SIGNATURE_LEN: usize = 4;

/// Size of the checksum trailer, which is counted in [`ImageHeader::len`]
pub const CHECKSUM_LEN: usize = 2;

/// Largest payload whose length (plus the checksum) still fits in `len`
pub const MAX_PAYLOAD_LEN: u64 = u32::MAX as u64 - CHECKSUM_LEN as u64;

/// Magic identifying the image to the loader.
///
/// These are raw bytes; nothing requires them to be printable.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    pub const DEFAULT: Signature = Signature(*b"cs6c");

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Error> {
        let raw: [u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| Error::InvalidSignatureLength(bytes.len()))?;
        Ok(Signature(raw))
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Signature::try_from(s.as_bytes())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic()) {
            // All graphic ASCII, so this is valid UTF-8
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

/// The 16-byte header placed in front of the payload. Every integer is
/// big-endian on the wire.
///
/// Note that `len` is the length of the *original* payload plus the two
/// checksum bytes. The zero byte used to pad an odd-length payload is
/// written to the image but is not counted here; loaders in the field
/// expect exactly this value.
#[derive(Clone, Debug, PartialEq, Eq, PackedStruct)]
#[repr(C)]
#[packed_struct(size_bytes = "16", bit_numbering = "msb0", endian = "msb")]
pub struct ImageHeader {
    pub signature: [u8; 4],
    pub start_addr: u32,
    pub burn_addr: u32,
    pub len: u32,
}

impl ImageHeader {
    pub fn new(
        signature: Signature,
        start_addr: u32,
        burn_addr: u32,
        payload_len: u64,
    ) -> Result<ImageHeader, Error> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge(payload_len));
        }
        let len = (payload_len + CHECKSUM_LEN as u64)
            .try_into()
            .map_err(|_| Error::PayloadTooLarge(payload_len))?;
        Ok(ImageHeader {
            signature: signature.0,
            start_addr,
            burn_addr,
            len,
        })
    }

    pub fn signature(&self) -> Signature {
        Signature(self.signature)
    }

    /// Length of the payload as given to the framer, without padding.
    pub fn payload_len(&self) -> Option<u32> {
        self.len.checked_sub(CHECKSUM_LEN as u32)
    }

    pub fn to_bytes(&self) -> Result<[u8; HEADER_LEN], Error> {
        Ok(self.pack()?)
    }

    /// Parses the header from the start of `bytes`; anything after the
    /// first 16 bytes is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<ImageHeader, Error> {
        let raw: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::ImageTooShort {
                need: HEADER_LEN,
                have: bytes.len(),
            })?;
        Ok(ImageHeader::unpack(raw)?)
    }
}
