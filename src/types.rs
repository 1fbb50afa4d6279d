use crate::error::{CarveError, Result};
use crate::numeric::{self, MAX_WIDTH, NumericFormat};
use serde::Serialize;
use std::fmt;
use std::ops::Range;

pub type Offset = u64;

pub const JPEG_SOI: u64 = 0xFFD8;
pub const JPEG_EOI: u64 = 0xFFD9;

/// A candidate image: the byte range from a header signature through the
/// end of its footer signature.
///
/// `end` and `size` stay zero while the footer is being searched for. The
/// scanner only hands out records once they are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    start: Offset,
    end: Offset,
    size: u64,
}

impl ImageRecord {
    pub(crate) fn pending(start: Offset) -> Self {
        Self {
            start,
            end: 0,
            size: 0,
        }
    }

    pub(crate) fn complete(&mut self, end: Offset) {
        debug_assert!(end > self.start);
        self.end = end;
        self.size = end - self.start;
    }

    pub fn start(&self) -> Offset {
        self.start
    }

    pub fn end(&self) -> Offset {
        self.end
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_complete(&self) -> bool {
        self.end > self.start
    }

    pub fn range(&self) -> Range<Offset> {
        self.start..self.end
    }

    /// True when `other` begins inside this record's byte range.
    pub fn overlaps(&self, other: &ImageRecord) -> bool {
        self.range().contains(&other.start) || other.range().contains(&self.start)
    }
}

impl fmt::Display for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Start: {}  End: {}  Size: {}",
            self.start, self.end, self.size
        )
    }
}

/// A marker value together with the field layout it is compared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerSignature {
    pub value: u64,
    pub format: NumericFormat,
}

impl MarkerSignature {
    pub fn new(value: u64, format: NumericFormat) -> Result<Self> {
        format.validate()?;
        if format.width < MAX_WIDTH && value >> (format.width * 8) != 0 {
            return Err(CarveError::InvalidMarker(format!(
                "{value:#x} does not fit in {} bytes",
                format.width
            )));
        }
        Ok(Self { value, format })
    }

    /// Parses a marker written as hex digits, e.g. `ffd8` or `0xFFD8`.
    /// Each pair of digits is one byte, compared unsigned big-endian.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits = text
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        let bytes = hex::decode(digits)
            .map_err(|e| CarveError::InvalidMarker(format!("{text:?}: {e}")))?;

        if bytes.is_empty() || bytes.len() > MAX_WIDTH {
            return Err(CarveError::InvalidMarker(format!(
                "{text:?}: expected 1 to {MAX_WIDTH} bytes, got {}",
                bytes.len()
            )));
        }

        let value = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        Self::new(value, NumericFormat::unsigned_be(bytes.len()))
    }

    pub fn width(&self) -> usize {
        self.format.width
    }

    /// The marker as it is laid out on disk.
    pub fn bytes(&self) -> Vec<u8> {
        numeric::encode(self.value, self.format.width, self.format.endianness)
    }

    pub fn matches(&self, decoded: i64) -> bool {
        decoded as u64 == self.value
    }
}

impl fmt::Display for MarkerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$X}", self.value, width = self.format.width * 2)
    }
}

/// The header/footer signatures a scan pairs up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerPair {
    pub header: MarkerSignature,
    pub footer: MarkerSignature,
}

impl MarkerPair {
    /// The footer search starts on the header's own bytes, so a footer that
    /// occurs anywhere inside the header would close every record on the
    /// header itself. Such pairs, identical markers included, are rejected.
    pub fn new(header: MarkerSignature, footer: MarkerSignature) -> Result<Self> {
        let pair = Self { header, footer };
        pair.validate()?;
        Ok(pair)
    }

    pub fn validate(&self) -> Result<()> {
        if self.header == self.footer {
            return Err(CarveError::InvalidMarker(format!(
                "header and footer are both {}",
                self.header
            )));
        }

        let header = self.header.bytes();
        let footer = self.footer.bytes();
        if footer.len() <= header.len() && header.windows(footer.len()).any(|w| w == footer) {
            return Err(CarveError::InvalidMarker(format!(
                "footer {} occurs inside header {}",
                self.footer, self.header
            )));
        }

        Ok(())
    }

    /// JPEG start-of-image `FFD8` and end-of-image `FFD9`.
    pub fn jpeg() -> Self {
        let format = NumericFormat::unsigned_be(2);
        Self {
            header: MarkerSignature {
                value: JPEG_SOI,
                format,
            },
            footer: MarkerSignature {
                value: JPEG_EOI,
                format,
            },
        }
    }
}

impl Default for MarkerPair {
    fn default() -> Self {
        Self::jpeg()
    }
}
