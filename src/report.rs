use crate::carving::{ResumePolicy, ScanStats};
use crate::extraction::{ExtractionOutcome, ExtractionStatus};
use crate::types::{ImageRecord, MarkerPair};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

/// Result of one recovery run over one input.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub input: PathBuf,
    pub source_size: u64,
    pub markers: MarkerPair,
    pub resume: ResumePolicy,
    pub stats: ScanStats,
    pub records: Vec<ImageRecord>,
    pub extractions: Vec<ExtractionOutcome>,
    pub elapsed_secs: f64,
}

impl RecoveryReport {
    pub fn written(&self) -> usize {
        self.extractions.iter().filter(|o| o.is_written()).count()
    }

    pub fn failed(&self) -> usize {
        self.extractions.len() - self.written()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One line per image, followed by a summary line.
    pub fn render_table(&self) -> String {
        let mut out = String::new();

        if self.extractions.is_empty() {
            for (i, record) in self.records.iter().enumerate() {
                let _ = writeln!(out, "Candidate {:<5}  {}", i, record);
            }
        } else {
            for outcome in &self.extractions {
                let record = &outcome.record;
                let _ = write!(
                    out,
                    "File name: {:<13}  Start: {:<8}  End: {:<8}  Size: {:<8}",
                    outcome.file_name,
                    record.start(),
                    record.end(),
                    record.size()
                );
                match &outcome.status {
                    ExtractionStatus::Written(file) => {
                        let _ = writeln!(out, "  SHA-256: {}", file.sha256);
                    }
                    ExtractionStatus::Failed { error } => {
                        let _ = writeln!(out, "  FAILED: {}", error);
                    }
                }
            }
        }

        let (count, outcome) = if self.extractions.is_empty() {
            (self.records.len(), "candidates found in")
        } else {
            (self.written(), "images recovered from")
        };

        let _ = writeln!(
            out,
            "\n{} {} {} ({} bytes, {} headers, {} unterminated) in {:.2}s",
            count,
            outcome,
            self.input.display(),
            self.source_size,
            self.stats.headers_found,
            self.stats.discarded,
            self.elapsed_secs
        );

        out
    }
}
