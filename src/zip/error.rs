//! Format-level failures.
//!
//! None of these escape the public API as errors: the extractor turns
//! them into a warning and skips the affected archive or entry.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZipError {
    /// A fixed-size record ran past the end of its input.
    #[error("{0} truncated")]
    Truncated(&'static str),

    /// A record did not start with its expected signature.
    #[error("{0} signature mismatch")]
    BadSignature(&'static str),

    /// The archive spans several disks.
    #[error("multi-disk zip is not supported")]
    MultiDisk,

    /// The Zip64 locator or record could not be trusted.
    #[error("Zip64 {0}")]
    Zip64(&'static str),

    /// The resolved central directory coordinates do not fit the buffer.
    #[error("central directory {0}")]
    InvalidDirectory(&'static str),

    /// An entry's local header or payload lies outside the archive data.
    #[error("entry {what} out of range \"{name}\"")]
    EntryOutOfRange { name: String, what: &'static str },

    /// The local file header of an entry has the wrong signature.
    #[error("local file header signature mismatch \"{name}\"")]
    LocalHeader { name: String },

    #[error("unresolved Zip64 sizes/offsets; skip \"{name}\"")]
    UnresolvedZip64 { name: String },

    #[error("skip \"{name}\" (unsupported compression {method})")]
    UnsupportedCompression { name: String, method: u16 },

    #[error("deflate failed \"{name}\": {source}")]
    Decompression {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Reading a field from an already bounds-checked slice failed.
    #[error("malformed record: {0}")]
    Read(#[from] io::Error),
}
