//! Carve options

use crate::carving::ResumePolicy;
use crate::error::{CarveError, Result};
use crate::extraction::OutputLayout;
use crate::source::DEFAULT_WINDOW_SIZE;
use crate::types::MarkerPair;
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "unalloc.img";

/// Everything a recovery run needs before it touches the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarveOptions {
    /// Disk image, memory dump or block device to scan
    pub input: PathBuf,
    /// Output directory and file naming
    pub layout: OutputLayout,
    /// Header/footer signatures to pair
    pub markers: MarkerPair,
    /// Read window in bytes; 0 reads the source once per offset
    pub window_size: usize,
    /// Read through a memory map instead of file I/O
    pub use_mmap: bool,
    /// Report candidates without writing any files
    pub scan_only: bool,
    pub resume: ResumePolicy,
}

impl Default for CarveOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            layout: OutputLayout::default(),
            markers: MarkerPair::jpeg(),
            window_size: DEFAULT_WINDOW_SIZE,
            use_mmap: false,
            scan_only: false,
            resume: ResumePolicy::AfterHeader,
        }
    }
}

impl CarveOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layout.dir = dir.into();
        self
    }

    pub fn with_file_naming(mut self, prefix: &str, extension: &str) -> Self {
        self.layout.prefix = prefix.to_string();
        self.layout.extension = extension.to_string();
        self
    }

    pub fn with_markers(mut self, markers: MarkerPair) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    pub fn with_resume(mut self, resume: ResumePolicy) -> Self {
        self.resume = resume;
        self
    }

    pub fn mmap(mut self) -> Self {
        self.use_mmap = true;
        self
    }

    pub fn scan_only(mut self) -> Self {
        self.scan_only = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.markers.validate()?;

        for (what, value) in [
            ("prefix", &self.layout.prefix),
            ("extension", &self.layout.extension),
        ] {
            if value.contains(['/', '\\']) {
                return Err(CarveError::InvalidConfig(format!(
                    "file {what} {value:?} must not contain a path separator"
                )));
            }
        }

        if self.layout.extension.is_empty() {
            return Err(CarveError::InvalidConfig(
                "file extension must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
