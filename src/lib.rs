//! # nuget-notices
//!
//! Pull license and notice files out of NuGet packages (`.nupkg`) and
//! other ZIP-family archives by reading the container format directly.
//!
//! The archive reader locates the End of Central Directory record,
//! resolves Zip64 extensions when the classic fields overflow, walks the
//! central directory and extracts members through their local headers.
//! Every offset read from the archive is bounds-checked, so truncated or
//! hostile input produces warnings rather than panics.
//!
//! ## Features
//!
//! - ZIP and Zip64 archives held in memory, parsed without copying
//! - STORED and DEFLATE members
//! - License-like member selection (`LICENSE`, `LICENCE`, `COPYING`, `NOTICE`)
//! - BOM-aware text decoding (UTF-8, UTF-16LE, UTF-16BE)
//! - Diagnostics through an injected [`WarningSink`], never global state
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use nuget_notices::{StderrSink, license_texts_from_file};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sink = StderrSink::with_prefix("demo.1.0.0.nupkg: ");
//!     let texts = license_texts_from_file(Path::new("demo.1.0.0.nupkg"), &sink).await?;
//!     for license in &texts {
//!         println!("{}\n{}", license.name, license.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod text;
pub mod zip;

use std::path::Path;

pub use cli::Cli;
pub use io::LocalArchive;
pub use zip::{
    ArchiveState, DirectoryEntry, ExtractedMember, LicenseText, NullSink, StderrSink,
    WarningSink, ZipExtractor,
};

/// List the entries of an archive held in memory.
pub fn list_entries(data: &[u8], sink: &dyn WarningSink) -> Vec<DirectoryEntry> {
    ZipExtractor::open(data, sink).list_files().to_vec()
}

/// Extract every license-like member of an archive held in memory.
pub fn read_license_members<'a>(data: &'a [u8], sink: &dyn WarningSink) -> Vec<ExtractedMember<'a>> {
    ZipExtractor::open(data, sink).extract_matching(&zip::LicenseSelector, sink)
}

/// Read an archive file and return its license-like members as text.
///
/// # Errors
///
/// Only a failure to read the file is an error. Problems with the archive
/// itself are reported to `sink` and yield fewer or no results.
pub async fn license_texts_from_file(
    path: &Path,
    sink: &dyn WarningSink,
) -> anyhow::Result<Vec<LicenseText>> {
    let archive = LocalArchive::open(path).await?;
    Ok(archive.extractor(sink).license_texts(sink))
}
