use jpeg_carve::carving::{MarkerScanner, ResumePolicy, ScanStats};
use jpeg_carve::error::Result;
use jpeg_carve::numeric::{Endianness, NumericFormat, Signedness, encode, read_numeric};
use jpeg_carve::source::{BufferedSource, ByteSource, DiskReader, MemorySource, MmapSource};
use jpeg_carve::types::ImageRecord;
use proptest::prelude::*;
use std::io::{self, Write};
use std::ops::Range;
use tempfile::NamedTempFile;

fn disk_with_images() -> Vec<u8> {
    let mut disk: Vec<u8> = (0..5000usize)
        .map(|i| ((i.wrapping_mul(97).wrapping_add(13)) % 255) as u8)
        .collect();
    let mut image = vec![0xFF, 0xD8, 0xFF, 0xE0];
    image.extend((0..300u32).map(|i| (i % 200) as u8));
    image.extend_from_slice(&[0xFF, 0xD9]);

    disk[101..101 + image.len()].copy_from_slice(&image);
    disk[2048..2048 + image.len()].copy_from_slice(&image);
    disk
}

fn scan<S: ByteSource + ?Sized>(source: &mut S) -> Vec<ImageRecord> {
    scan_with_stats(source).0
}

fn scan_with_stats<S: ByteSource + ?Sized>(source: &mut S) -> (Vec<ImageRecord>, ScanStats) {
    let mut scanner = MarkerScanner::jpeg(source);
    scanner.scan_all(ResumePolicy::AfterHeader).unwrap();
    let stats = scanner.stats();
    (scanner.into_records(), stats)
}

/// In-memory source whose reads fail with an I/O error over `bad`.
struct BadSectorSource {
    inner: MemorySource<Vec<u8>>,
    bad: Range<u64>,
    position: u64,
}

impl BadSectorSource {
    fn new(data: Vec<u8>, bad: Range<u64>) -> Self {
        Self {
            inner: MemorySource::new(data),
            bad,
            position: 0,
        }
    }
}

impl ByteSource for BadSectorSource {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.position = offset;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.position + buf.len() as u64;
        if self.position < self.bad.end && end > self.bad.start {
            return Err(io::Error::other("bad sector").into());
        }
        self.inner.read_exact_at(self.position, buf)?;
        self.position = end;
        Ok(())
    }
}

#[test]
fn test_sources_agree_on_records() {
    let data = disk_with_images();
    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(&data).unwrap();
    temp.flush().unwrap();

    let expected = scan(&mut MemorySource::new(data));
    assert_eq!(expected.len(), 2);
    assert_eq!(expected[0].start(), 101);
    assert_eq!(expected[1].start(), 2048);

    let mut plain = DiskReader::open(temp.path()).unwrap();
    assert_eq!(scan(&mut plain), expected);

    let mut buffered = BufferedSource::with_capacity(256, DiskReader::open(temp.path()).unwrap());
    assert_eq!(scan(&mut buffered), expected);

    let mut mapped = MmapSource::map(temp.path()).unwrap();
    assert_eq!(scan(&mut mapped), expected);
}

#[test]
fn test_marker_straddling_window_edge() {
    let mut data = vec![0u8; 64];
    data[31] = 0xFF;
    data[32] = 0xD8;
    data[62] = 0xFF;
    data[63] = 0xD9;

    let mut buffered = BufferedSource::with_capacity(32, MemorySource::new(data));
    let records = scan(&mut buffered);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].range(), 31..64);
}

#[test]
fn test_dyn_source() {
    let mut boxed: Box<dyn ByteSource> = Box::new(MemorySource::new(vec![0xFF, 0xD8, 0xFF, 0xD9]));
    let records = scan(boxed.as_mut());
    assert_eq!(records.len(), 1);
}

#[test]
fn test_bad_sector_mid_scan_is_skipped() {
    let mut data = vec![0u8; 1000];
    data[10..12].copy_from_slice(&[0xFF, 0xD8]);
    data[100..102].copy_from_slice(&[0xFF, 0xD9]);

    let mut plain = BadSectorSource::new(data.clone(), 500..510);
    let (records, stats) = scan_with_stats(&mut plain);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].range(), 10..102);
    assert_eq!(records[0].size(), 92);
    // Two-byte reads at 499..=509 touch the bad range
    assert_eq!(stats.unreadable_offsets, 11);

    for capacity in [16, 64, 256, 4096] {
        let mut buffered =
            BufferedSource::with_capacity(capacity, BadSectorSource::new(data.clone(), 500..510));
        let (buffered_records, buffered_stats) = scan_with_stats(&mut buffered);
        assert_eq!(buffered_records, records, "window of {capacity} bytes");
        assert_eq!(buffered_stats, stats, "window of {capacity} bytes");
    }
}

#[test]
fn test_bad_sector_inside_candidate() {
    let mut data = vec![0u8; 600];
    data[10..12].copy_from_slice(&[0xFF, 0xD8]);
    data[400..402].copy_from_slice(&[0xFF, 0xD9]);

    let mut plain = BadSectorSource::new(data.clone(), 200..201);
    let (records, stats) = scan_with_stats(&mut plain);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].range(), 10..402);
    // Missed by the footer search and again by the header search
    assert_eq!(stats.unreadable_offsets, 4);

    let mut buffered = BufferedSource::with_capacity(128, BadSectorSource::new(data, 200..201));
    assert_eq!(scan_with_stats(&mut buffered), (records, stats));
}

proptest! {
    #[test]
    fn numeric_round_trip(width in 1usize..=8, raw in any::<u64>(), offset in 0usize..16) {
        let value = if width == 8 { raw } else { raw & ((1u64 << (width * 8)) - 1) };

        for endianness in [Endianness::Big, Endianness::Little] {
            let mut data = vec![0u8; offset];
            data.extend(encode(value, width, endianness));
            let mut source = MemorySource::new(data);

            let format = NumericFormat::new(width, Signedness::Unsigned, endianness);
            let decoded = read_numeric(&mut source, offset as i64, format).unwrap();
            prop_assert_eq!(decoded as u64, value);
        }
    }

    #[test]
    fn negative_offsets_never_decode(offset in i64::MIN..0) {
        let mut source = MemorySource::new(vec![0xFFu8; 8]);
        prop_assert!(read_numeric(&mut source, offset, NumericFormat::unsigned_be(2)).is_err());
    }
}
