use flate2::{Decompress, FlushDecompress, Status};
use std::borrow::Cow;
use std::io;

use super::error::ZipError;
use super::parser::ZipParser;
use super::selector::{LicenseSelector, MemberSelector};
use super::structures::{CompressionMethod, DirectoryEntry, ExtractedMember};
use super::warning::WarningSink;
use crate::text::decode_text;

/// Largest up-front allocation made for an inflated member.
const MAX_PREALLOC: usize = 1 << 20;

/// How far an archive got through parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    /// No End of Central Directory record was found.
    NotFound,
    /// An archive-level check failed; there are no entries.
    Skipped,
    /// The central directory was walked. `complete` is false if the walk
    /// stopped early on a damaged header.
    Parsed { zip64: bool, complete: bool },
}

/// A license-like member decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseText {
    pub name: String,
    pub text: String,
}

/// ZIP file extractor over an in-memory archive.
///
/// Opening never fails: problems with the archive are reported to the
/// warning sink and leave the extractor with fewer (or no) entries.
pub struct ZipExtractor<'a> {
    parser: ZipParser<'a>,
    state: ArchiveState,
    eocd_offset: u64,
    entries: Vec<DirectoryEntry>,
}

impl<'a> ZipExtractor<'a> {
    pub fn open(data: &'a [u8], sink: &dyn WarningSink) -> Self {
        let parser = ZipParser::new(data);
        let mut extractor = Self {
            parser,
            state: ArchiveState::NotFound,
            eocd_offset: 0,
            entries: Vec::new(),
        };

        let Some(eocd_offset) = parser.find_eocd() else {
            return extractor;
        };
        extractor.eocd_offset = eocd_offset;

        let location = match parser.resolve_directory(eocd_offset) {
            Ok(location) => location,
            Err(err) => {
                sink.warn(&format!("zip: {err}; skipping."));
                extractor.state = ArchiveState::Skipped;
                return extractor;
            }
        };

        let (entries, complete) = parser.read_central_directory(&location, sink);
        extractor.entries = entries;
        extractor.state = ArchiveState::Parsed {
            zip64: location.zip64,
            complete,
        };
        extractor
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    /// Offset of the End of Central Directory record, if one was found.
    pub fn eocd_offset(&self) -> Option<u64> {
        match self.state {
            ArchiveState::NotFound => None,
            _ => Some(self.eocd_offset),
        }
    }

    /// All entries in central directory order
    pub fn list_files(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Extract one entry to memory.
    ///
    /// Returns `None` after warning if the entry cannot be extracted:
    /// unresolved Zip64 fields, headers or data out of range, an
    /// unsupported compression method, or a corrupt deflate stream.
    pub fn extract(&self, entry: &DirectoryEntry, sink: &dyn WarningSink) -> Option<ExtractedMember<'a>> {
        match self.extract_data(entry) {
            Ok(data) => Some(ExtractedMember {
                name: entry.file_name.clone(),
                data,
            }),
            Err(err) => {
                sink.warn(&format!("zip: {err}"));
                None
            }
        }
    }

    /// Extract the payload of `entry`, borrowing it when it is stored.
    pub fn extract_data(&self, entry: &DirectoryEntry) -> Result<Cow<'a, [u8]>, ZipError> {
        // Payloads precede the central directory, so nothing may reach past the EOCD.
        let limit = match self.state {
            ArchiveState::Parsed { .. } => self.eocd_offset,
            _ => 0,
        };
        let range = self.parser.get_data_range(entry, limit)?;
        let raw = &self.parser.data()[range];

        match entry.compression_method {
            CompressionMethod::Stored => Ok(Cow::Borrowed(raw)),
            CompressionMethod::Deflate => inflate_raw(raw, entry.uncompressed_size)
                .map(Cow::Owned)
                .map_err(|source| ZipError::Decompression {
                    name: entry.file_name.clone(),
                    source,
                }),
            CompressionMethod::Unknown(method) => Err(ZipError::UnsupportedCompression {
                name: entry.file_name.clone(),
                method,
            }),
        }
    }

    /// Extract every file entry the selector accepts, in central directory order.
    ///
    /// Entries that fail to extract are skipped with a warning; the rest
    /// are still returned.
    pub fn extract_matching(
        &self,
        selector: &dyn MemberSelector,
        sink: &dyn WarningSink,
    ) -> Vec<ExtractedMember<'a>> {
        self.entries
            .iter()
            .filter(|e| !e.is_directory && selector.matches(&e.file_name))
            .filter_map(|e| self.extract(e, sink))
            .collect()
    }

    /// Extract license-like members and decode them to text.
    pub fn license_texts(&self, sink: &dyn WarningSink) -> Vec<LicenseText> {
        self.extract_matching(&LicenseSelector, sink)
            .into_iter()
            .map(|member| LicenseText {
                text: decode_text(&member.data),
                name: member.name,
            })
            .collect()
    }
}

/// Inflate a raw deflate stream (no zlib or gzip wrapper).
///
/// Fails on corrupt data, on streams that end before their final block,
/// and on streams that produce more than `limit` bytes.
fn inflate_raw(raw: &[u8], limit: u64) -> io::Result<Vec<u8>> {
    // One byte past the limit is enough to tell that the stream overruns it.
    let ceiling = usize::try_from(limit).unwrap_or(usize::MAX).saturating_add(1);
    let mut inflater = Decompress::new(false);
    let mut out = Vec::with_capacity(ceiling.min(MAX_PREALLOC));

    loop {
        if out.len() as u64 > limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("inflated size exceeds declared {limit} bytes"),
            ));
        }
        if out.len() == out.capacity() {
            let room = out.capacity().max(64).min(ceiling - out.len());
            out.reserve_exact(room);
        }

        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        let status = inflater
            .decompress_vec(&raw[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        match status {
            Status::StreamEnd if out.len() as u64 <= limit => return Ok(out),
            Status::StreamEnd => {}
            Status::Ok | Status::BufError => {
                let stalled = inflater.total_in() as usize == consumed && inflater.total_out() == produced;
                if stalled && out.len() < out.capacity() {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "deflate stream ended early",
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflate_round_trip() {
        let text = "Permission is hereby granted, free of charge, ".repeat(200);
        let packed = deflate(text.as_bytes());
        assert_eq!(inflate_raw(&packed, text.len() as u64).unwrap(), text.as_bytes());
        assert_eq!(inflate_raw(&packed, u64::MAX).unwrap(), text.as_bytes());
    }

    #[test]
    fn inflate_empty_stream_with_zero_limit() {
        let packed = deflate(b"");
        assert!(inflate_raw(&packed, 0).unwrap().is_empty());
    }

    #[test]
    fn inflate_stops_at_declared_size() {
        let packed = deflate(&vec![0u8; 256 * 1024]);
        let err = inflate_raw(&packed, 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("exceeds declared 16 bytes"));

        let err = inflate_raw(&packed, 256 * 1024 - 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn inflate_rejects_reserved_block_type() {
        let err = inflate_raw(&[0xFF, 0xFF, 0xFF], 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn inflate_rejects_truncated_stream() {
        let packed = deflate("Apache License\nVersion 2.0\n".repeat(50).as_bytes());
        let err = inflate_raw(&packed[..packed.len() / 2], u64::MAX).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn open_non_zip_is_not_found() {
        let warnings = std::cell::RefCell::new(Vec::new());
        let sink = |m: &str| warnings.borrow_mut().push(m.to_string());
        let extractor = ZipExtractor::open(b"plain text, not an archive", &sink);
        assert_eq!(extractor.state(), ArchiveState::NotFound);
        assert_eq!(extractor.eocd_offset(), None);
        assert!(extractor.list_files().is_empty());
        assert!(warnings.borrow().is_empty());
    }
}
