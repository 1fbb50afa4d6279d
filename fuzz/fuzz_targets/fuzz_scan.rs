#![no_main]

use jpeg_carve::carving::{MarkerScanner, ResumePolicy};
use jpeg_carve::source::{BufferedSource, MemorySource};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut plain = MemorySource::new(data);
    let mut scanner = MarkerScanner::jpeg(&mut plain);
    let expected = scanner.scan_all(ResumePolicy::AfterHeader).unwrap().to_vec();

    for record in &expected {
        assert!(record.end() > record.start());
        assert!(record.end() <= data.len() as u64);
        assert_eq!(&data[record.start() as usize..][..2], &[0xFF, 0xD8]);
        assert_eq!(&data[..record.end() as usize][record.end() as usize - 2..], &[0xFF, 0xD9]);
    }

    let mut buffered = BufferedSource::with_capacity(7, MemorySource::new(data));
    let mut scanner = MarkerScanner::jpeg(&mut buffered);
    let records = scanner.scan_all(ResumePolicy::AfterHeader).unwrap();
    assert_eq!(records, expected.as_slice());
});
