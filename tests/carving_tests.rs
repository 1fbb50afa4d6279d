use jpeg_carve::carving::{MarkerScanner, ResumePolicy};
use jpeg_carve::source::MemorySource;
use jpeg_carve::types::ImageRecord;
use proptest::prelude::*;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

fn scan_records(data: Vec<u8>) -> Vec<ImageRecord> {
    let mut source = MemorySource::new(data);
    let mut scanner = MarkerScanner::jpeg(&mut source);
    scanner.scan_all(ResumePolicy::AfterHeader).unwrap();
    scanner.into_records()
}

// Bytes that can never form part of a marker
fn filler(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..0xFF, 0..max_len)
}

#[test]
fn test_two_images_back_to_back() {
    let data = vec![0xFF, 0xD8, 0x00, 0x11, 0xFF, 0xD9, 0xFF, 0xD8, 0xFF, 0xD9];
    let mut source = MemorySource::new(data);
    let mut scanner = MarkerScanner::jpeg(&mut source);

    assert_eq!(scanner.search_header(0).unwrap(), Some(0));
    assert_eq!(scanner.search_header(1).unwrap(), Some(6));
    assert_eq!(scanner.search_header(7).unwrap(), None);

    let records = scanner.into_records();
    assert_eq!(records.len(), 2);
    assert_eq!((records[0].start(), records[0].end(), records[0].size()), (0, 6, 6));
    assert_eq!((records[1].start(), records[1].end(), records[1].size()), (6, 10, 4));
}

#[test]
fn test_header_without_footer_leaves_nothing() {
    let records = scan_records(vec![0xFF, 0xD8, 0x00, 0x00]);
    assert!(records.is_empty());
}

#[test]
fn test_records_are_always_complete() {
    let mut data = Vec::new();
    data.extend_from_slice(&SOI);
    data.extend_from_slice(&[1, 2, 3]);
    data.extend_from_slice(&EOI);
    data.extend_from_slice(&SOI);
    data.extend_from_slice(&[4, 5]);

    for record in scan_records(data) {
        assert!(record.end() > record.start());
        assert_eq!(record.size(), record.end() - record.start());
    }
}

#[test]
fn test_independent_scanners_do_not_share_records() {
    let mut a = MemorySource::new(vec![0xFF, 0xD8, 0xFF, 0xD9]);
    let mut b = MemorySource::new(vec![0x00, 0x00]);

    let mut scan_a = MarkerScanner::jpeg(&mut a);
    let mut scan_b = MarkerScanner::jpeg(&mut b);
    scan_a.scan_all(ResumePolicy::AfterHeader).unwrap();
    scan_b.scan_all(ResumePolicy::AfterHeader).unwrap();

    assert_eq!(scan_a.records().len(), 1);
    assert!(scan_b.records().is_empty());
}

proptest! {
    #[test]
    fn header_search_returns_only_match(
        prefix in filler(64),
        suffix in filler(64),
        skip in 0usize..64,
    ) {
        let p = prefix.len();
        let start = skip.min(p) as u64;
        let mut data = prefix;
        data.extend_from_slice(&SOI);
        data.extend_from_slice(&suffix);

        let mut source = MemorySource::new(data);
        let mut scanner = MarkerScanner::jpeg(&mut source);
        prop_assert_eq!(scanner.search_header(start).unwrap(), Some(p as u64));
    }

    #[test]
    fn header_search_without_header_appends_nothing(
        data in filler(128),
        start in 0u64..160,
    ) {
        let mut source = MemorySource::new(data);
        let mut scanner = MarkerScanner::jpeg(&mut source);
        prop_assert_eq!(scanner.search_header(start).unwrap(), None);
        prop_assert!(scanner.records().is_empty());
    }

    #[test]
    fn unterminated_header_is_net_zero(
        prefix in filler(32),
        suffix in filler(64),
    ) {
        let mut data = vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9];
        data.extend_from_slice(&prefix);
        let header_at = data.len() as u64;
        data.extend_from_slice(&SOI);
        data.extend_from_slice(&suffix);

        let mut source = MemorySource::new(data);
        let mut scanner = MarkerScanner::jpeg(&mut source);
        scanner.search_header(0).unwrap();
        let before = scanner.records().len();

        prop_assert_eq!(scanner.search_header(1).unwrap(), Some(header_at));
        prop_assert_eq!(scanner.records().len(), before);
    }

    #[test]
    fn header_pairs_with_nearest_footer(
        prefix in filler(32),
        body in filler(64),
        tail in filler(32),
    ) {
        let p = prefix.len() as u64;
        let mut data = prefix;
        data.extend_from_slice(&SOI);
        data.extend_from_slice(&body);
        let q = data.len() as u64 + 2;
        data.extend_from_slice(&EOI);
        data.extend_from_slice(&tail);
        data.extend_from_slice(&EOI);

        let records = scan_records(data);
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(records[0].start(), p);
        prop_assert_eq!(records[0].end(), q);
        prop_assert_eq!(records[0].size(), q - p);
    }
}
