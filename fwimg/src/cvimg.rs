// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Framing of raw payloads for Realtek-based bootloaders.
//!
//! The output image is laid out as:
//!
//! | offset        | size | contents                                  |
//! |---------------|------|-------------------------------------------|
//! | 0             | 16   | [`ImageHeader`]                           |
//! | 16            | P    | payload, padded with one zero to even `P` |
//! | 16 + P        | 2    | big-endian [`checksum`](crate::checksum)  |

use crate::checksum::Checksum;
use crate::header::{ImageHeader, Signature, CHECKSUM_LEN, HEADER_LEN};
use crate::Error;
use log::{debug, trace};
use std::io::{self, Read, Write};

/// Payload is copied through in pieces of this size
pub const BUF_LEN: usize = 0x10000;

/// Payload length rounded up to a whole number of 16-bit words.
pub fn padded_len(payload_len: u64) -> u64 {
    payload_len + payload_len % 2
}

/// Size of the complete framed image for a payload of `payload_len` bytes.
pub fn total_len(payload_len: u64) -> u64 {
    HEADER_LEN as u64 + padded_len(payload_len) + CHECKSUM_LEN as u64
}

/// What [`frame`] wrote
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    pub header: ImageHeader,
    /// Payload bytes taken from the input, excluding padding
    pub payload_len: u64,
    /// Everything written: header, padded payload and checksum
    pub total_len: u64,
    pub checksum: u16,
}

/// Writes a framed image to `output`.
///
/// `payload_len` is the number of bytes `input` will produce; it has to be
/// known up front because it goes into the header. If the input turns out
/// to be shorter or longer, the image written so far is left as is and
/// [`Error::LengthMismatch`] is returned.
pub fn frame<R: Read, W: Write>(
    mut input: R,
    payload_len: u64,
    mut output: W,
    signature: Signature,
    start_addr: u32,
    burn_addr: u32,
) -> Result<FrameSummary, Error> {
    let header = ImageHeader::new(signature, start_addr, burn_addr, payload_len)?;
    debug!(
        "framing {payload_len} byte payload: signature {signature}, \
         start {start_addr:#010x}, burn {burn_addr:#010x}"
    );

    output.write_all(&header.to_bytes()?)?;

    let mut checksum = Checksum::new();
    let mut buf = vec![0u8; BUF_LEN];
    let mut copied: u64 = 0;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        trace!("payload chunk of {n} bytes at offset {copied:#x}");
        checksum.update(&buf[..n]);
        output.write_all(&buf[..n])?;
        copied += n as u64;
        if copied > payload_len {
            break;
        }
    }
    if copied != payload_len {
        return Err(Error::LengthMismatch {
            expected: payload_len,
            actual: copied,
        });
    }

    if payload_len % 2 == 1 {
        output.write_all(&[0])?;
    }

    let checksum = checksum.finish();
    output.write_all(&checksum.to_be_bytes())?;
    output.flush()?;

    Ok(FrameSummary {
        header,
        payload_len,
        total_len: total_len(payload_len),
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;
    use crate::ErrorKind;
    use std::io::Cursor;

    /// Hands out data a few bytes at a time, like a pipe would
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn frame_bytes(payload: &[u8], start: u32, burn: u32) -> (Vec<u8>, FrameSummary) {
        let mut out = Vec::new();
        let summary = frame(
            Cursor::new(payload),
            payload.len() as u64,
            &mut out,
            Signature::DEFAULT,
            start,
            burn,
        )
        .unwrap();
        (out, summary)
    }

    #[test]
    fn empty_payload() {
        let (out, summary) = frame_bytes(&[], 0x8000_0000, 0x20000);
        assert_eq!(
            out,
            [
                b'c', b's', b'6', b'c', 0x80, 0, 0, 0, 0, 0x02, 0, 0, 0, 0, 0, 2, // header
                0, 0, // checksum
            ]
        );
        assert_eq!(summary.checksum, 0);
        assert_eq!(summary.header.len, 2);
        assert_eq!(summary.total_len, 18);
    }

    #[test]
    fn even_payload() {
        let (out, summary) = frame_bytes(&[0x01, 0x02], 0, 0);
        assert_eq!(out.len(), 20);
        assert_eq!(&out[12..16], &[0, 0, 0, 4]);
        assert_eq!(&out[16..], &[0x01, 0x02, 0xfe, 0xfe]);
        assert_eq!(summary.checksum, 0xfefe);
        assert_eq!(summary.payload_len, 2);
    }

    #[test]
    fn odd_payload_is_padded() {
        let payload = [0x11, 0x22, 0x33, 0x44, 0x55];
        let (out, summary) = frame_bytes(&payload, 0, 0);
        assert_eq!(out.len(), 16 + 5 + 1 + 2);
        assert_eq!(summary.total_len, out.len() as u64);
        // Padding is written but not counted
        assert_eq!(summary.header.len, 7);
        assert_eq!(&out[16..21], &payload);
        assert_eq!(out[21], 0);
        assert_eq!(&out[22..], &checksum(&payload).to_be_bytes());
    }

    #[test]
    fn custom_signature() {
        let mut out = Vec::new();
        let sig = Signature([0xff, 0x00, b'x', 0x7f]);
        frame(Cursor::new(&[1u8, 2, 3][..]), 3, &mut out, sig, 1, 2).unwrap();
        assert_eq!(&out[..4], &[0xff, 0x00, b'x', 0x7f]);
        assert_eq!(&out[4..12], &[0, 0, 0, 1, 0, 0, 0, 2]);
    }

    #[test]
    fn multi_chunk_checksum() {
        let payload: Vec<u8> = (0..(BUF_LEN * 2 + 3)).map(|i| (i * 31 + 5) as u8).collect();
        let expected = checksum(&payload);

        for step in [3, 4097, BUF_LEN - 1, BUF_LEN] {
            let mut out = Vec::new();
            let summary = frame(
                Trickle {
                    data: &payload,
                    step,
                },
                payload.len() as u64,
                &mut out,
                Signature::DEFAULT,
                0,
                0,
            )
            .unwrap();
            assert_eq!(summary.checksum, expected, "step {step}");
            assert_eq!(out.len() as u64, total_len(payload.len() as u64));
            assert_eq!(&out[16..16 + payload.len()], &payload[..]);
        }
    }

    #[test]
    fn oversized_payload_writes_nothing() {
        let mut out = Vec::new();
        let err = frame(
            std::io::empty(),
            u64::from(u32::MAX) - 1,
            &mut out,
            Signature::DEFAULT,
            0,
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Size);
        assert!(out.is_empty());
    }

    #[test]
    fn short_input() {
        let mut out = Vec::new();
        let err = frame(Cursor::new(&[1u8, 2, 3][..]), 10, &mut out, Signature::DEFAULT, 0, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 10,
                actual: 3
            }
        ));
        // Header and the bytes that were read stay in the output
        assert_eq!(out.len(), 16 + 3);
    }

    #[test]
    fn sizes() {
        assert_eq!(padded_len(0), 0);
        assert_eq!(padded_len(7), 8);
        assert_eq!(total_len(0), 18);
        assert_eq!(total_len(7), 26);
    }
}
