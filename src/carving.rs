//! Header/footer pairing over a raw byte source
//!
//! The scanner walks the source one byte at a time looking for the header
//! signature. Every header it finds opens a record that is resolved right
//! away by a footer search starting at the header's own offset: the record
//! is completed at the first footer, or dropped if the source ends first.
//!
//! Resuming is left to the caller. The conventional driver restarts the
//! header search at `match + 1` rather than at the previous record's end,
//! so a header inside an earlier candidate still opens its own record.
//! Nested and overlapping candidates are therefore all reported.

use crate::error::Result;
use crate::numeric::read_numeric;
use crate::source::ByteSource;
use crate::types::{ImageRecord, MarkerPair, MarkerSignature, Offset};
use serde::Serialize;

/// Counters describing what a scanner has seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub headers_found: usize,
    pub completed: usize,
    pub discarded: usize,
    pub unreadable_offsets: u64,
}

/// Where the driver restarts the header search after a match.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    /// One byte past the matched header; finds nested candidates.
    #[default]
    AfterHeader,
    /// At the end of the record just completed, or one byte past the
    /// header if it was discarded.
    AfterRecord,
}

/// Index of a speculatively appended record awaiting its footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordHandle(usize);

/// Position callback fired every `interval` bytes of header search.
struct ProgressHook<'a> {
    interval: u64,
    callback: Box<dyn FnMut(Offset) + 'a>,
}

/// Scan context over one borrowed byte source.
///
/// Owns the record list until [`MarkerScanner::into_records`] hands it to
/// the caller. Independent scanners over different sources share nothing.
pub struct MarkerScanner<'a, S: ByteSource + ?Sized> {
    source: &'a mut S,
    markers: MarkerPair,
    records: Vec<ImageRecord>,
    stats: ScanStats,
    progress: Option<ProgressHook<'a>>,
}

impl<'a, S: ByteSource + ?Sized> MarkerScanner<'a, S> {
    pub fn new(source: &'a mut S, markers: MarkerPair) -> Self {
        Self {
            source,
            markers,
            records: Vec::new(),
            stats: ScanStats::default(),
            progress: None,
        }
    }

    /// Reports the header search position to `callback` at every multiple
    /// of `interval`, and the source size once a driver scan finishes.
    /// Positions only move forward; footer searches are not reported.
    pub fn with_progress<F>(mut self, interval: u64, callback: F) -> Self
    where
        F: FnMut(Offset) + 'a,
    {
        self.progress = Some(ProgressHook {
            interval: interval.max(1),
            callback: Box::new(callback),
        });
        self
    }

    /// Scanner for JPEG start/end-of-image markers.
    pub fn jpeg(source: &'a mut S) -> Self {
        Self::new(source, MarkerPair::jpeg())
    }

    pub fn markers(&self) -> &MarkerPair {
        &self.markers
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ImageRecord> {
        self.records
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn source_size(&self) -> u64 {
        self.source.size()
    }

    /// Finds the first header at or after `start` and resolves its footer.
    ///
    /// Returns the header offset, or `None` when the source holds no
    /// further header. A header without a footer still returns its offset
    /// but leaves no record behind.
    pub fn search_header(&mut self, start: Offset) -> Result<Option<Offset>> {
        let header = self.markers.header;

        let Some(offset) = self.find_marker(header, start, true)? else {
            tracing::trace!("No header at or after {}", start);
            return Ok(None);
        };

        self.stats.headers_found += 1;
        self.records.push(ImageRecord::pending(offset));
        let handle = RecordHandle(self.records.len() - 1);

        tracing::debug!("Header {} at offset {}", header, offset);

        self.search_footer(handle, offset)?;

        Ok(Some(offset))
    }

    /// Runs the driver loop from offset 0 until no header remains.
    pub fn scan_all(&mut self, policy: ResumePolicy) -> Result<&[ImageRecord]> {
        self.scan_with(policy, |_| {})
    }

    /// Like [`MarkerScanner::scan_all`], reporting each header offset to
    /// `on_header` as the scan advances.
    pub fn scan_with<F>(&mut self, policy: ResumePolicy, mut on_header: F) -> Result<&[ImageRecord]>
    where
        F: FnMut(Offset),
    {
        let mut next = 0;

        while let Some(offset) = self.search_header(next)? {
            on_header(offset);

            next = match policy {
                ResumePolicy::AfterHeader => offset + 1,
                ResumePolicy::AfterRecord => self
                    .records
                    .last()
                    .filter(|r| r.start() == offset)
                    .map_or(offset + 1, |r| r.end()),
            };
        }

        tracing::info!(
            "Scan complete: {} headers, {} images, {} unterminated",
            self.stats.headers_found,
            self.stats.completed,
            self.stats.discarded
        );

        let size = self.source.size();
        if let Some(progress) = self.progress.as_mut() {
            (progress.callback)(size);
        }

        Ok(&self.records)
    }

    fn search_footer(&mut self, handle: RecordHandle, header_offset: Offset) -> Result<()> {
        let footer = self.markers.footer;

        match self.find_marker(footer, header_offset, false)? {
            Some(offset) => {
                let record = &mut self.records[handle.0];
                record.complete(offset + footer.width() as u64);
                self.stats.completed += 1;
                tracing::debug!("Footer {} at offset {}: {}", footer, offset, record);
            }
            None => {
                self.records.remove(handle.0);
                self.stats.discarded += 1;
                tracing::debug!("Discarding unterminated header at {}", header_offset);
            }
        }

        Ok(())
    }

    /// Linear search advancing one byte per failed comparison so markers at
    /// odd offsets are never skipped. A read that fails at one offset is a
    /// miss at that offset, not the end of the scan.
    fn find_marker(
        &mut self,
        marker: MarkerSignature,
        start: Offset,
        report_progress: bool,
    ) -> Result<Option<Offset>> {
        let size = self.source.size();
        let mut current = start;

        while current < size {
            if report_progress {
                if let Some(progress) = self.progress.as_mut() {
                    if current % progress.interval == 0 {
                        (progress.callback)(current);
                    }
                }
            }

            let Ok(offset) = i64::try_from(current) else {
                break;
            };

            match read_numeric(&mut *self.source, offset, marker.format) {
                Ok(value) if marker.matches(value) => return Ok(Some(current)),
                Ok(_) => {}
                Err(e) if e.is_end_of_source() => {}
                Err(e) => {
                    self.stats.unreadable_offsets += 1;
                    tracing::debug!("Unreadable offset {}: {}", current, e);
                }
            }

            current += 1;
        }

        Ok(None)
    }
}
