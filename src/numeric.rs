//! Fixed-width integer fields read straight from a byte source
//!
//! Reads 1 to 8 bytes at an offset and decodes them as big- or
//! little-endian, signed or unsigned. Nothing here is specific to JPEG
//! markers; any fixed-width field of a raw image can be pulled out the
//! same way.

use crate::error::{CarveError, Result};
use crate::source::ByteSource;
use serde::{Deserialize, Serialize};

pub const MAX_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Layout of a numeric field: how many bytes and how to interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericFormat {
    pub width: usize,
    pub signedness: Signedness,
    pub endianness: Endianness,
}

impl NumericFormat {
    pub const fn new(width: usize, signedness: Signedness, endianness: Endianness) -> Self {
        Self {
            width,
            signedness,
            endianness,
        }
    }

    pub const fn unsigned_be(width: usize) -> Self {
        Self::new(width, Signedness::Unsigned, Endianness::Big)
    }

    pub fn validate(&self) -> Result<()> {
        if (1..=MAX_WIDTH).contains(&self.width) {
            Ok(())
        } else {
            Err(CarveError::InvalidWidth(self.width))
        }
    }
}

/// Reads a `format.width`-byte integer at `offset`.
///
/// A negative offset is rejected with [`CarveError::InvalidOffset`] before
/// the source is touched, so callers can never mistake it for a decoded
/// zero. Short reads are failures, never partially decoded values.
///
/// Signed decoding negates the accumulated magnitude (`!value + 1`) when the
/// most significant bit of the leading byte is set. It does not sign-extend:
/// `FF FE` read as a signed 2-byte field yields `-65534`.
pub fn read_numeric<S: ByteSource + ?Sized>(
    source: &mut S,
    offset: i64,
    format: NumericFormat,
) -> Result<i64> {
    if offset < 0 {
        tracing::warn!("Offset must be non-negative, not {}", offset);
        return Err(CarveError::InvalidOffset(offset));
    }
    format.validate()?;

    let mut bytes = [0u8; MAX_WIDTH];
    let bytes = &mut bytes[..format.width];
    source.read_exact_at(offset as u64, bytes)?;

    Ok(decode(bytes, format))
}

/// Decodes an already-read field. `bytes.len()` is the field width.
pub fn decode(bytes: &mut [u8], format: NumericFormat) -> i64 {
    if format.endianness == Endianness::Little {
        bytes.reverse();
    }

    let negative = format.signedness == Signedness::Signed
        && bytes.first().is_some_and(|b| b & 0x80 != 0);

    let value = bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)) as i64;

    if negative {
        (!value).wrapping_add(1)
    } else {
        value
    }
}

/// Encodes `value` into `width` bytes; the inverse of unsigned decoding.
pub fn encode(value: u64, width: usize, endianness: Endianness) -> Vec<u8> {
    let width = width.min(MAX_WIDTH);
    let be = value.to_be_bytes();
    let mut out = be[MAX_WIDTH - width..].to_vec();
    if endianness == Endianness::Little {
        out.reverse();
    }
    out
}
