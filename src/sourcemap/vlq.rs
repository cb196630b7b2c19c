//! Base64 VLQ codec used by the `mappings` field of a v3 source map.

use super::SourceMapError;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const SHIFT: u32 = 5;
const MASK: u64 = 0b1_1111;
const CONTINUATION: u64 = 0b10_0000;

/// Append the VLQ encoding of `value` to `out`.
pub fn encode(value: i64, out: &mut String) {
    // Sign lives in the least significant bit
    let mut vlq = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = vlq & MASK;
        vlq >>= SHIFT;
        if vlq > 0 {
            digit |= CONTINUATION;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

fn decode_digit(byte: u8) -> Option<u64> {
    let digit = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(digit as u64)
}

/// Decode one value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(i64, usize), SourceMapError> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        let digit = decode_digit(byte).ok_or_else(|| {
            SourceMapError::InvalidVlq(format!("unexpected character '{}'", byte as char))
        })?;
        if shift > 60 {
            return Err(SourceMapError::InvalidVlq("value overflows 64 bits".to_string()));
        }

        result |= (digit & MASK) << shift;
        if digit & CONTINUATION == 0 {
            let magnitude = (result >> 1) as i64;
            let value = if result & 1 == 1 { -magnitude } else { magnitude };
            return Ok((value, i + 1));
        }
        shift += SHIFT;
    }

    Err(SourceMapError::InvalidVlq("unterminated value".to_string()))
}
