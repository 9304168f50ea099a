// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Encoding of `nos.img` images for XikeStor SKS8300 series switches.
//!
//! The loader expects the first two 256-byte blocks of the image to be
//! obfuscated by adding a fixed keystream to every byte (mod 256). The rest
//! of the image is stored as is. This is not encryption.

use crate::Error;
use log::{debug, trace};
use std::io::{self, Read, Write};

pub const BLOCK_LEN: usize = 0x100;
pub const BLOCK_COUNT: usize = 2;

/// Bytes at the start of the image that get transformed
pub const ENCODED_LEN: usize = BLOCK_LEN * BLOCK_COUNT;

/// Keystream source, consumed most significant byte first.
pub static PATTERNS: [u32; BLOCK_LEN / 4] = [
    0xeeddcc21, 0x5355eecc, 0xdd55807e, 0x00000000,
    0xcdbddfae, 0xbb9b8901, 0x70e5ccdd, 0xf6fc8364,
    0xecddcef1, 0xe354fed0, 0xbdabdde1, 0xe4b4d583,
    0xedfed0cd, 0xb655cca3, 0xedd5c67e, 0xddcc2153,
    0xec4ddc00, 0x5355cdc3, 0x2201807e, 0xefbc7566,
    0xa6c0cc2f, 0xfed0eecc, 0xdd550101, 0x0101c564,
    0x9945ab32, 0x55807eef, 0x55807eef, 0xbc756689,
    0xe31d83dd, 0xfe558eab, 0x7d55807e, 0xff01ac66,
    0x0ec992d9, 0x73e50101, 0xbde510ce, 0x0101bae8,
    0x3edd81a1, 0x53330101, 0x9ac510aa, 0x01ce8ae1,
    0xb1fb0080, 0x53770000, 0x70dc0001, 0x0000cbb1,
    0xa0300000, 0x55a60000, 0xcabd0101, 0x0000c9b2,
    0x81900100, 0x5a210001, 0x79bc0100, 0x78007bb3,
    0xd4970100, 0x5355a9fc, 0xdda501be, 0xafc175c5,
    0x8ed77700, 0x55d00dac, 0x0155807e, 0xefbc7ee6,
    0xf16c5200, 0x331698cc, 0x01010101, 0x00007988,
];

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    #[default]
    Encode,
    Decode,
}

/// Keystream byte for position `i` within a block.
pub fn keystream_byte(i: usize) -> u8 {
    let i = i % BLOCK_LEN;
    PATTERNS[i / 4].to_be_bytes()[i % 4]
}

pub fn transform_block(block: &mut [u8; BLOCK_LEN], mode: Mode) {
    for (i, b) in block.iter_mut().enumerate() {
        let k = keystream_byte(i);
        *b = match mode {
            Mode::Encode => b.wrapping_add(k),
            Mode::Decode => b.wrapping_sub(k),
        };
    }
}

/// Reads until `buf` is full or the input ends, returning the number of
/// bytes read.
fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Encodes or decodes an image from `input` into `output`, returning the
/// number of bytes processed.
///
/// Blocks are written as soon as they're transformed, so an image that ends
/// inside the second block still leaves the first one in `output` before
/// [`Error::ImageTooShort`] is returned.
pub fn transform<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    mode: Mode,
) -> Result<u64, Error> {
    debug!("{mode} of first {ENCODED_LEN} bytes");

    let mut block = [0u8; BLOCK_LEN];
    for i in 0..BLOCK_COUNT {
        let n = read_full(&mut input, &mut block)?;
        if n < BLOCK_LEN {
            output.flush()?;
            return Err(Error::ImageTooShort {
                need: ENCODED_LEN,
                have: i * BLOCK_LEN + n,
            });
        }
        transform_block(&mut block, mode);
        output.write_all(&block)?;
        trace!("block {i} done");
    }

    let rest = io::copy(&mut input, &mut output)?;
    output.flush()?;
    debug!("copied {rest} trailing bytes");

    Ok(ENCODED_LEN as u64 + rest)
}
