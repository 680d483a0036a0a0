//! LEB128 variable-length integer codec.
//!
//! All length and count fields of the WebAssembly binary format are
//! encoded as unsigned LEB128: 7 bits per byte, least-significant group
//! first, high bit set on every byte except the last. Value types inside
//! the Type and Import sections use the signed variant.
//!
//! The encoders always emit the canonical shortest form, so for every
//! value obtained by decoding valid input, `encode(decode(x)) == x`.

use crate::error::{Error, Result};

/// Maximum encoded length of a 64-bit LEB128 value
const MAX_VARINT_BYTES: usize = 10;

/// Decode an unsigned LEB128 value from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_unsigned(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= MAX_VARINT_BYTES {
            return Err(Error::malformed_encoding(i));
        }

        let group = (byte & 0x7F) as u64;

        // The tenth byte may only carry the single remaining bit
        if shift == 63 && group > 1 {
            return Err(Error::malformed_encoding(i));
        }

        result |= group << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::malformed_encoding(data.len()))
}

/// Encode an unsigned value as LEB128, shortest form only.
pub fn encode_unsigned(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2);
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return out;
        }
    }
}

/// Decode a signed LEB128 value from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed.
/// Used for value types, which the format encodes as small negative
/// numbers (e.g. i32 is -1, encoded as `0x7F`).
pub fn decode_signed(data: &[u8]) -> Result<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= MAX_VARINT_BYTES {
            return Err(Error::malformed_encoding(i));
        }

        result |= ((byte & 0x7F) as i64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            // Sign-extend if the sign bit of the final group is set
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Ok((result, i + 1));
        }
    }

    Err(Error::malformed_encoding(data.len()))
}

/// Encode a signed value as LEB128, shortest form only.
pub fn encode_signed(mut value: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2);
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if !done {
            byte |= 0x80;
        }
        out.push(byte);
        if done {
            return out;
        }
    }
}
