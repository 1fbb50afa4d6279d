use std::io;
use thiserror::Error;

/// Errors produced while reading markers from a byte source or writing
/// recovered images.
#[derive(Debug, Error)]
pub enum CarveError {
    #[error("Offset must be non-negative, not {0}")]
    InvalidOffset(i64),

    #[error("Invalid numeric width: {0} (expected 1..=8 bytes)")]
    InvalidWidth(usize),

    #[error("Invalid marker configuration: {0}")]
    InvalidMarker(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Record at offset {0} has no footer")]
    IncompleteRecord(u64),

    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CarveError {
    /// True when the failure only means the source ended before the
    /// requested bytes were available.
    pub fn is_end_of_source(&self) -> bool {
        match self {
            CarveError::ShortRead { .. } => true,
            CarveError::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CarveError>;
