//! ZIP archive parsing and extraction.
//!
//! This module reads ZIP and Zip64 archives held entirely in memory,
//! without a general-purpose archive library.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP format records (EOCD, Zip64 locator and record, entries)
//! - [`parser`]: EOCD location, Zip64 resolution and the central directory walk
//! - [`extractor`]: per-entry extraction and the archive-level API
//! - [`selector`]: predicates choosing which members to surface
//! - [`warning`]: the injected sink for non-fatal diagnostics
//!
//! ## Error Policy
//!
//! The lower-level [`ZipParser`] steps (`resolve_directory`,
//! `read_zip64_eocd`, `parse_cdfh`, `get_data_range`) and
//! [`ZipExtractor::extract_data`] return a [`ZipError`] describing what is
//! wrong with the input.
//!
//! [`ZipExtractor`] turns those errors into warnings and degrades
//! gracefully. An archive-level problem (no usable Zip64 record, multi-disk
//! archive, central directory out of range) leaves no entries; a damaged
//! directory header stops the walk but keeps what was parsed before it; an
//! entry that cannot be extracted, or that inflates past its declared size,
//! is skipped. Each case reports one warning. `ZipExtractor::open`,
//! `extract`, `extract_matching` and `license_texts` never panic and never
//! return an error for bad input.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions, including per-entry extended information
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support (detected and rejected)
//! - No BZIP2, LZMA, or other compression methods

pub mod error;
pub mod extractor;
pub mod parser;
pub mod selector;
pub mod structures;
pub mod warning;

pub use error::ZipError;
pub use extractor::{ArchiveState, LicenseText, ZipExtractor};
pub use parser::ZipParser;
pub use selector::{GlobSelector, LicenseSelector, MemberSelector, is_license_path};
pub use structures::*;
pub use warning::{NullSink, StderrSink, WarningSink};
