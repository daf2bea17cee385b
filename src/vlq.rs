use crate::hint::unlikely;
use crate::{Error, Result};
use std::io;
use std::io::Write;

const BASE64_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const BASE64_VALUES: [i8; 256] = base64_values();

const DIGIT_BITS: u32 = 5;
const DIGIT_MASK: u8 = 0b11111;
const CONTINUATION: u8 = 0b100000;

// 7 digits carry 35 bits, more than any u32 delta needs
const MAX_SHIFT: u32 = 30;
const MAX_DIGITS: usize = 7;

const fn base64_values() -> [i8; 256] {
    let mut res = [-1i8; 256];
    let mut idx = 0;
    while idx < BASE64_CHARS.len() {
        res[BASE64_CHARS[idx] as usize] = idx as i8;
        idx += 1;
    }
    res
}

/// Decodes the fields of one `mappings` segment.
///
/// The returned slice borrows the decoder, so one decoder serves a whole map.
#[derive(Debug, Default)]
pub(crate) struct VlqDecoder {
    fields: [i64; 5],
}

impl VlqDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one segment into 1, 4 or 5 signed values.
    pub fn decode(&mut self, segment: &str) -> Result<&[i64]> {
        let malformed = || Error::MappingMalformed(segment.to_owned());

        let mut count = 0;
        let mut acc = 0i64;
        let mut shift = 0u32;

        for byte in segment.bytes() {
            let digit = BASE64_VALUES[byte as usize];
            if unlikely!(digit < 0 || shift > MAX_SHIFT) {
                return Err(malformed());
            }
            let digit = digit as u8;
            acc |= i64::from(digit & DIGIT_MASK) << shift;

            if digit & CONTINUATION != 0 {
                shift += DIGIT_BITS;
                continue;
            }

            let field = self.fields.get_mut(count).ok_or_else(malformed)?;
            // the lowest bit carries the sign
            *field = if acc & 1 == 1 { -(acc >> 1) } else { acc >> 1 };
            count += 1;
            acc = 0;
            shift = 0;
        }

        if shift != 0 || !matches!(count, 1 | 4 | 5) {
            return Err(malformed());
        }
        Ok(&self.fields[..count])
    }
}

/// Writes `cur - prev` as a single VLQ number.
pub(crate) fn encode_delta<W>(writer: &mut W, prev: u32, cur: u32) -> io::Result<()>
where
    W: Write,
{
    let delta = i64::from(cur) - i64::from(prev);
    let mut rest = (delta.unsigned_abs() << 1) | u64::from(delta < 0);

    let mut digits = [0u8; MAX_DIGITS];
    let mut len = 0;
    loop {
        let mut digit = (rest & u64::from(DIGIT_MASK)) as u8;
        rest >>= DIGIT_BITS;
        if rest != 0 {
            digit |= CONTINUATION;
        }
        digits[len] = BASE64_CHARS[digit as usize];
        len += 1;
        if rest == 0 {
            break;
        }
    }

    writer.write_all(&digits[..len])
}
