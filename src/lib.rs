pub mod carving;
pub mod config;
pub mod error;
pub mod extraction;
pub mod numeric;
pub mod recovery;
pub mod report;
pub mod source;
pub mod types;

pub use carving::{MarkerScanner, ResumePolicy, ScanStats};
pub use config::CarveOptions;
pub use error::{CarveError, Result};
pub use numeric::{Endianness, NumericFormat, Signedness, read_numeric};
pub use source::{BufferedSource, ByteSource, DiskReader, MemorySource, MmapSource};
pub use types::{ImageRecord, MarkerPair, MarkerSignature, Offset};
