//! Recovery driver
//!
//! Opens the input, runs the header search from offset 0 until it comes
//! back empty, then writes every completed record. Extraction only starts
//! once scanning is over since records can still be discarded mid-scan.

use crate::carving::MarkerScanner;
use crate::config::CarveOptions;
use crate::error::Result;
use crate::extraction::extract_all;
use crate::report::RecoveryReport;
use crate::source::{BufferedSource, ByteSource, DiskReader, MmapSource};
use crate::types::Offset;
use anyhow::Context;
use std::fs;
use std::time::Instant;

/// How often, in scanned bytes, progress is reported.
pub const PROGRESS_INTERVAL: u64 = 1024 * 1024;

/// Opens the input the way `options` asks for: memory-mapped, buffered
/// through a read window, or one read per request.
///
/// Inputs with no mappable length (empty files, block devices) are read
/// through the file instead, so `--mmap` never changes the outcome.
pub fn open_source(options: &CarveOptions) -> Result<Box<dyn ByteSource>> {
    if options.use_mmap {
        if fs::metadata(&options.input)?.len() > 0 {
            return Ok(Box::new(MmapSource::map(&options.input)?));
        }
        tracing::debug!(
            "{} has no mappable length, reading it directly",
            options.input.display()
        );
    }

    let reader = DiskReader::open(&options.input)?;

    if options.window_size == 0 {
        Ok(Box::new(reader))
    } else {
        Ok(Box::new(BufferedSource::with_capacity(
            options.window_size,
            reader,
        )))
    }
}

/// Runs a full scan-and-extract pass.
///
/// `on_progress` receives `(scan_position, source_size)` every
/// [`PROGRESS_INTERVAL`] bytes and once more with the source size when the
/// scan is over.
pub fn recover<F>(options: &CarveOptions, mut on_progress: F) -> anyhow::Result<RecoveryReport>
where
    F: FnMut(Offset, u64),
{
    options.validate().context("Invalid options")?;

    let started = Instant::now();

    let mut source = open_source(options)
        .with_context(|| format!("Failed to open {}", options.input.display()))?;
    let source_size = source.size();

    tracing::info!(
        "Scanning {} ({} bytes) for {} .. {}",
        options.input.display(),
        source_size,
        options.markers.header,
        options.markers.footer
    );

    let mut scanner = MarkerScanner::new(source.as_mut(), options.markers)
        .with_progress(PROGRESS_INTERVAL, |offset| on_progress(offset, source_size));
    scanner
        .scan_all(options.resume)
        .with_context(|| format!("Scan of {} failed", options.input.display()))?;

    let stats = scanner.stats();
    let records = scanner.into_records();

    let extractions = if options.scan_only {
        Vec::new()
    } else {
        extract_all(source.as_mut(), &records, &options.layout).with_context(|| {
            format!(
                "Failed to prepare output directory {}",
                options.layout.dir.display()
            )
        })?
    };

    Ok(RecoveryReport {
        input: options.input.clone(),
        source_size,
        markers: options.markers,
        resume: options.resume,
        stats,
        records,
        extractions,
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}
