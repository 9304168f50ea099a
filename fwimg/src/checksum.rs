// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 16-bit checksum used by the Realtek bootloader.
//!
//! The payload is summed as a sequence of big-endian 16-bit words. If the
//! payload has an odd number of bytes, the last byte is added as-is (it is
//! *not* treated as the high half of a word). The stored checksum is the
//! two's-complement negation of the truncated sum, so that adding the
//! checksum back to the sum of the payload gives zero.

use byteorder::{BigEndian, ByteOrder};

/// Streaming checksum accumulator.
///
/// Data may be fed in arbitrarily sized pieces; a byte left over at the end
/// of one call is paired with the first byte of the next one, so the result
/// only depends on the concatenated input.
#[derive(Clone, Debug, Default)]
pub struct Checksum {
    sum: u32,
    pending: Option<u8>,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, mut bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        if let Some(hi) = self.pending.take() {
            self.add(u16::from_be_bytes([hi, bytes[0]]));
            bytes = &bytes[1..];
        }

        let mut words = bytes.chunks_exact(2);
        for word in &mut words {
            self.add(BigEndian::read_u16(word));
        }
        if let [last] = words.remainder() {
            self.pending = Some(*last);
        }
    }

    fn add(&mut self, value: u16) {
        self.sum = self.sum.wrapping_add(u32::from(value));
    }

    /// Number of bytes still waiting for a partner, either 0 or 1.
    pub fn pending_len(&self) -> usize {
        self.pending.map_or(0, |_| 1)
    }

    /// The truncated 16-bit sum of everything seen so far, with a trailing
    /// odd byte counted at its plain value.
    pub fn sum(&self) -> u16 {
        let tail = self.pending.map_or(0, u32::from);
        self.sum.wrapping_add(tail) as u16
    }

    /// The value stored in the image trailer.
    pub fn finish(&self) -> u16 {
        (!self.sum()).wrapping_add(1)
    }
}

/// One-shot checksum of a complete payload.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut c = Checksum::new();
    c.update(bytes);
    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn empty_payload() {
        assert_eq!(checksum(&[]), 0x0000);
    }

    #[test]
    fn single_word() {
        assert_eq!(checksum(&[0x01, 0x02]), 0xfefe);
    }

    #[test]
    fn odd_byte_is_not_shifted() {
        // 0x0102 + 0x03 = 0x0105
        assert_eq!(checksum(&[0x01, 0x02, 0x03]), 0xfefb);
        assert_eq!(checksum(&[0x80]), 0xff80);
    }

    #[test]
    fn sum_is_truncated() {
        // 0xffff + 0xffff = 0x1fffe
        assert_eq!(checksum(&[0xff; 4]), 0x0002);
    }

    #[test]
    fn chunking_does_not_matter() {
        for len in [998, 999] {
            let data = sample(len);
            let expected = checksum(&data);
            for step in [1, 2, 3, 7, 255, 256, 1000] {
                let mut c = Checksum::new();
                for chunk in data.chunks(step) {
                    c.update(chunk);
                }
                assert_eq!(c.finish(), expected, "len {len}, step {step}");
            }
        }
    }

    #[test]
    fn pending_byte_carries_over() {
        let mut c = Checksum::new();
        c.update(&[0x12]);
        assert_eq!(c.pending_len(), 1);
        c.update(&[]);
        assert_eq!(c.pending_len(), 1);
        c.update(&[0x34]);
        assert_eq!(c.pending_len(), 0);
        assert_eq!(c.sum(), 0x1234);
    }

    #[test]
    fn payload_plus_checksum_sums_to_zero() {
        for len in [0, 1, 2, 3, 64, 65, 4097] {
            let data = sample(len);
            let mut c = Checksum::new();
            c.update(&data);
            assert_eq!(c.sum().wrapping_add(c.finish()), 0, "len {len}");
        }

        // With an even payload the trailer is just another word
        let data = sample(300);
        let mut c = Checksum::new();
        c.update(&data);
        c.update(&checksum(&data).to_be_bytes());
        assert_eq!(c.sum(), 0);
    }
}
