// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! CRC-8 guarding every 16-bit word on the bus.

use crate::error::{Error, Result};

/// Size of one word on the wire: two big-endian value bytes plus the CRC.
pub const WORD_LEN: usize = 3;

const POLYNOMIAL: u8 = 0x31;
const INIT: u8 = 0xFF;

/// Checksum function, polynomial 0x31 with 0xFF as the initial value.
/// More info regarding the [algorithm](https://en.wikipedia.org/wiki/Computation_of_cyclic_redundancy_checks)
///
pub fn crc8(message: &[u8]) -> u8 {
    let mut rem = INIT;
    for byte in message {
        rem ^= byte;
        for _ in 0..8 {
            if (rem & 0x80) != 0 {
                rem = (rem << 1) ^ POLYNOMIAL;
            } else {
                rem <<= 1;
            }
        }
    }
    rem
}

/// Serializes a word as `[value_hi, value_lo, crc]`.
pub fn encode_word(value: u16) -> [u8; WORD_LEN] {
    let [hi, lo] = value.to_be_bytes();
    [hi, lo, crc8(&[hi, lo])]
}

/// Validates `N` consecutive words in `buffer` and returns their values.
///
/// Every CRC is checked before any value is handed out. The first mismatching
/// word is reported by its index.
pub fn decode_words<const N: usize>(buffer: &[u8]) -> Result<[u16; N]> {
    debug_assert_eq!(buffer.len(), N * WORD_LEN);
    for (index, word) in buffer.chunks_exact(WORD_LEN).enumerate() {
        let expected = crc8(&word[..2]);
        if expected != word[2] {
            log::debug!("crc mismatch in word {}: expected {:#04x}, got {:#04x}", index, expected, word[2]);
            return Err(Error::Checksum {
                index,
                expected,
                actual: word[2],
            });
        }
    }

    let mut values = [0u16; N];
    for (value, word) in values.iter_mut().zip(buffer.chunks_exact(WORD_LEN)) {
        *value = u16::from_be_bytes([word[0], word[1]]);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(crc8(&[0x00, 0x00]), 0x81);
        // datasheet example
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_single_bit_errors_are_detected() {
        for value in [0x0000u16, 0x0190, 0x4000, 0xBEEF, 0xFFFF] {
            let word = encode_word(value);
            for bit in 0..16 {
                let flipped = value ^ (1 << bit);
                assert_ne!(crc8(&flipped.to_be_bytes()), word[2], "value {value:#06x} bit {bit}");
            }
        }
    }

    #[test]
    fn test_encoded_words_always_validate() {
        for value in (0..=u16::MAX).step_by(97) {
            let word = encode_word(value);
            assert_eq!(decode_words::<1>(&word).unwrap(), [value]);
        }
    }

    #[test]
    fn test_decode_reports_first_bad_word() {
        let mut buffer = [0u8; 9];
        buffer[0..3].copy_from_slice(&encode_word(1));
        buffer[3..6].copy_from_slice(&encode_word(2));
        buffer[6..9].copy_from_slice(&encode_word(3));
        buffer[5] ^= 0x01;
        buffer[8] ^= 0x01;

        match decode_words::<3>(&buffer) {
            Err(Error::Checksum { index, actual, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(actual, buffer[5]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
