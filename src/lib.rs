//! textfmt: detect and convert text file encodings and line endings
//!
//! A file is scanned once to find its [`FormatInfo`]. Comparing that with a
//! target yields a [`TransformChain`] (or nothing, when the file already
//! conforms), which [`convert`] streams into a staging file that atomically
//! replaces the original.
//!
//! The main binary is at src/main.rs.

pub mod cli;
pub mod codec;
pub mod config;
pub mod convert;
pub mod detect;
pub mod eol;
pub mod error;
pub mod format;
pub mod logger;
pub mod processor;
pub mod transform;

// Re-export commonly used types for convenience
pub use codec::{DecodeTransform, EncodeTransform};
pub use convert::{convert, temp_path};
pub use detect::{
    BinaryEncodingDetector, Detector, DetectorSet, EncodingDetector, LineEndingDetector, detect,
    detect_with,
};
pub use eol::LineEndingRewriter;
pub use error::{Error, Result};
pub use format::{Encoding, FormatInfo, LineEnding, Step};
pub use processor::{FileProcessor, Options, Outcome, Report};
pub use transform::{Progress, Status, Transform, TransformChain};
