use crate::error::{CarveError, Result};
use crate::source::ByteSource;
use crate::types::ImageRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const COPY_CHUNK: usize = 64 * 1024;

/// Where and under which names recovered images are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub prefix: String,
    pub extension: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prefix: "Image".to_string(),
            extension: "jpeg".to_string(),
        }
    }
}

impl OutputLayout {
    pub fn file_name(&self, index: usize) -> String {
        format!("{}{}.{}", self.prefix, index, self.extension)
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(self.file_name(index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub bytes_written: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionStatus {
    Written(ExtractedFile),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionOutcome {
    pub index: usize,
    pub file_name: String,
    pub record: ImageRecord,
    #[serde(flatten)]
    pub status: ExtractionStatus,
}

impl ExtractionOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, ExtractionStatus::Written(_))
    }
}

/// Copies exactly `record.size()` bytes starting at `record.start()` into a
/// newly created file at `output_path`.
pub fn extract_record<S: ByteSource + ?Sized>(
    source: &mut S,
    record: &ImageRecord,
    output_path: &Path,
) -> Result<ExtractedFile> {
    if !record.is_complete() {
        return Err(CarveError::IncompleteRecord(record.start()));
    }

    let mut out = File::create(output_path)?;

    match copy_range(source, record, &mut out) {
        Ok(sha256) => Ok(ExtractedFile {
            path: output_path.to_path_buf(),
            bytes_written: record.size(),
            sha256,
        }),
        Err(e) => {
            drop(out);
            // Never leave a truncated image behind
            let _ = fs::remove_file(output_path);
            Err(e)
        }
    }
}

fn copy_range<S: ByteSource + ?Sized>(
    source: &mut S,
    record: &ImageRecord,
    out: &mut File,
) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_CHUNK.min(record.size() as usize)];

    source.seek_to(record.start())?;

    let mut remaining = record.size();
    while remaining > 0 {
        let n = remaining.min(buffer.len() as u64) as usize;
        source.read_exact(&mut buffer[..n])?;
        out.write_all(&buffer[..n])?;
        hasher.update(&buffer[..n]);
        remaining -= n as u64;
    }
    out.sync_all()?;

    Ok(hex::encode(hasher.finalize()))
}

/// Writes every record to `layout`, numbering files by position.
///
/// A record that fails to extract is reported in its outcome and does not
/// stop the remaining records. Only failure to create the output directory
/// aborts the batch.
pub fn extract_all<S: ByteSource + ?Sized>(
    source: &mut S,
    records: &[ImageRecord],
    layout: &OutputLayout,
) -> Result<Vec<ExtractionOutcome>> {
    fs::create_dir_all(&layout.dir)?;

    let mut outcomes = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let file_name = layout.file_name(index);
        let path = layout.dir.join(&file_name);

        let status = match extract_record(source, record, &path) {
            Ok(file) => {
                tracing::debug!("Wrote {} ({} bytes)", path.display(), file.bytes_written);
                ExtractionStatus::Written(file)
            }
            Err(e) => {
                tracing::warn!("Failed to extract {}: {}", file_name, e);
                ExtractionStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        outcomes.push(ExtractionOutcome {
            index,
            file_name,
            record: *record,
            status,
        });
    }

    let written = outcomes.iter().filter(|o| o.is_written()).count();
    tracing::info!(
        "Extracted {} of {} images to {}",
        written,
        records.len(),
        layout.dir.display()
    );

    Ok(outcomes)
}
