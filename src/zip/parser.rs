//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures
//! from an in-memory archive buffer.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the buffer's end
//! 2. If ZIP64, locate and validate the ZIP64 EOCD for 64-bit coordinates
//! 3. Walk the Central Directory to get metadata for all entries
//! 4. For extraction, read each entry's Local File Header to find its data
//!
//! Every offset and length read from the archive is checked against the
//! buffer before it is used, so crafted headers can at worst produce a
//! warning, never an out-of-bounds read.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::ops::Range;

use super::error::ZipError;
use super::structures::*;
use super::warning::WarningSink;

/// Low-level ZIP parser over a borrowed archive buffer.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
///
/// ## Example
///
/// ```
/// use nuget_notices::zip::ZipParser;
///
/// let parser = ZipParser::new(b"not a zip");
/// assert_eq!(parser.find_eocd(), None);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ZipParser<'a> {
    /// The whole archive
    data: &'a [u8],
}

impl<'a> ZipParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// The archive buffer this parser reads from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Borrow `len` bytes at `offset`, or `None` if any of them is outside the buffer.
    fn slice(&self, offset: u64, len: u64) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        if end > self.size() {
            return None;
        }
        // Both bounds are at most data.len(), so they fit in usize.
        Some(&self.data[offset as usize..end as usize])
    }

    /// Find the End of Central Directory record.
    ///
    /// Scans backwards from the last position an EOCD can start at, over
    /// at most the maximum comment length. A candidate is accepted only if
    /// its comment runs exactly to the end of the buffer, its central
    /// directory fits before it and it belongs to disk zero. The first
    /// match from the end wins, which keeps signatures that happen to occur
    /// inside member data (nested archives, binary blobs) from being picked.
    ///
    /// Returns `None` if the buffer holds no valid EOCD. That is a normal
    /// outcome for non-ZIP input, not an error.
    pub fn find_eocd(&self) -> Option<u64> {
        let record = EndOfCentralDirectory::SIZE as u64;
        let last = self.size().checked_sub(record)?;
        let first = last.saturating_sub(EndOfCentralDirectory::MAX_COMMENT_SIZE);

        (first..=last)
            .rev()
            .find(|&offset| self.is_valid_eocd(offset))
    }

    fn is_valid_eocd(&self, offset: u64) -> bool {
        let Some(bytes) = self.slice(offset, EndOfCentralDirectory::SIZE as u64) else {
            return false;
        };
        if &bytes[0..4] != EndOfCentralDirectory::SIGNATURE {
            return false;
        }
        let Ok(eocd) = EndOfCentralDirectory::from_bytes(bytes) else {
            return false;
        };

        if offset + EndOfCentralDirectory::SIZE as u64 + eocd.comment_len as u64 != self.size() {
            return false;
        }

        // A saturated field defers to the Zip64 record and is checked there.
        if eocd.cd_offset != SENTINEL_U32 && eocd.cd_size != SENTINEL_U32 {
            let cd_end = eocd.cd_offset as u64 + eocd.cd_size as u64;
            if cd_end > offset {
                return false;
            }
        }

        eocd.disk_number == 0 && eocd.disk_with_cd == 0
    }

    /// Parse the EOCD record at `eocd_offset`.
    pub fn read_eocd(&self, eocd_offset: u64) -> Result<EndOfCentralDirectory, ZipError> {
        let bytes = self
            .slice(eocd_offset, EndOfCentralDirectory::SIZE as u64)
            .ok_or(ZipError::Truncated("end of central directory"))?;
        EndOfCentralDirectory::from_bytes(bytes)
    }

    /// Search for the ZIP64 EOCD Locator.
    ///
    /// Well-formed archives put the locator immediately before the EOCD,
    /// but a little padding in between is tolerated.
    fn find_zip64_locator(&self, eocd_offset: u64) -> Option<u64> {
        let last = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64)?;
        let first = eocd_offset.saturating_sub(Zip64EOCDLocator::SEARCH_WINDOW);

        (first..=last).rev().find(|&offset| {
            self.slice(offset, 4)
                .is_some_and(|sig| sig == Zip64EOCDLocator::SIGNATURE)
        })
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    ///
    /// # Errors
    ///
    /// Any failure here invalidates the whole archive: the entry count that
    /// bounds the directory walk comes from this record.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD, ZipError> {
        let locator_offset = self
            .find_zip64_locator(eocd_offset)
            .ok_or(ZipError::Zip64("locator not found"))?;
        let locator_bytes = self
            .slice(locator_offset, Zip64EOCDLocator::SIZE as u64)
            .ok_or(ZipError::Truncated("Zip64 locator"))?;
        let locator = Zip64EOCDLocator::from_bytes(locator_bytes)?;

        if !locator.is_single_disk() {
            return Err(ZipError::MultiDisk);
        }

        let record = self
            .slice(locator.eocd64_offset, Zip64EOCD::MIN_SIZE as u64)
            .ok_or(ZipError::Zip64("EOCD record is out of range"))?;
        let eocd64 = Zip64EOCD::from_bytes(record)?;

        let declared_len = eocd64
            .declared_len()
            .ok_or(ZipError::Zip64("EOCD record too large"))?;
        if declared_len < Zip64EOCD::MIN_SIZE as u64 {
            return Err(ZipError::Zip64("EOCD record too short"));
        }
        if self.slice(locator.eocd64_offset, declared_len).is_none() {
            return Err(ZipError::Zip64("EOCD record truncated"));
        }

        if eocd64.disk_number != 0 || eocd64.disk_with_cd != 0 {
            return Err(ZipError::MultiDisk);
        }

        Ok(eocd64)
    }

    /// Work out where the central directory is and how many entries it holds.
    ///
    /// Once Zip64 is engaged the legacy 16/32-bit EOCD fields are ignored.
    pub fn resolve_directory(&self, eocd_offset: u64) -> Result<CentralDirectoryLocation, ZipError> {
        let eocd = self.read_eocd(eocd_offset)?;

        if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
            return Err(ZipError::MultiDisk);
        }

        let location = if eocd.is_zip64() {
            CentralDirectoryLocation::from(&self.read_zip64_eocd(eocd_offset)?)
        } else {
            CentralDirectoryLocation::from(&eocd)
        };

        if location.cd_offset >= self.size() {
            return Err(ZipError::InvalidDirectory("offset out of range"));
        }
        if location.cd_size > 0 {
            let fits = location
                .cd_offset
                .checked_add(location.cd_size)
                .is_some_and(|end| end <= eocd_offset);
            if !fits {
                return Err(ZipError::InvalidDirectory("range invalid"));
            }
        }

        Ok(location)
    }

    /// Walk the Central Directory.
    ///
    /// Reads exactly `total_entries` headers starting at `cd_offset`. A
    /// truncated or mismatched header stops the walk: the entries parsed so
    /// far are kept, a warning is emitted and the returned flag is `false`.
    pub fn read_central_directory(
        &self,
        location: &CentralDirectoryLocation,
        sink: &dyn WarningSink,
    ) -> (Vec<DirectoryEntry>, bool) {
        // The declared count is untrusted; never reserve more than the directory can hold.
        let capacity = location
            .total_entries
            .min(location.cd_size / CDFH_MIN_SIZE as u64)
            .min(self.size() / CDFH_MIN_SIZE as u64);
        let mut entries = Vec::with_capacity(capacity as usize);
        let mut offset = location.cd_offset;

        for _ in 0..location.total_entries {
            match self.parse_cdfh(offset) {
                Ok((entry, next)) => {
                    entries.push(entry);
                    offset = next;
                }
                Err(err) => {
                    sink.warn(&format!("zip: {err}; stopping."));
                    return (entries, false);
                }
            }
        }

        (entries, true)
    }

    /// Parse a Central Directory File Header at `offset`.
    ///
    /// Returns the entry and the offset of the next header.
    pub fn parse_cdfh(&self, offset: u64) -> Result<(DirectoryEntry, u64), ZipError> {
        let header = self
            .slice(offset, CDFH_MIN_SIZE as u64)
            .ok_or(ZipError::Truncated("central directory entry header"))?;

        if &header[0..4] != CDFH_SIGNATURE {
            return Err(ZipError::BadSignature("central directory"));
        }

        let mut cursor = Cursor::new(&header[4..]);
        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;
        let file_comment_length = cursor.read_u16::<LittleEndian>()? as u64;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let truncated = ZipError::Truncated("central directory entry fields");
        let name_offset = offset + CDFH_MIN_SIZE as u64;
        let extra_offset = name_offset + file_name_length;
        let comment_offset = extra_offset + extra_field_length;
        let name_bytes = self.slice(name_offset, file_name_length);
        let extra = self.slice(extra_offset, extra_field_length);
        let comment = self.slice(comment_offset, file_comment_length);
        let (Some(name_bytes), Some(extra), Some(_)) = (name_bytes, extra, comment) else {
            return Err(truncated);
        };

        let file_name = decode_name(name_bytes, flags & FLAG_UTF8 != 0);
        let is_directory = file_name.ends_with('/');

        let mut entry = DirectoryEntry {
            file_name,
            flags,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            is_directory,
            resolved: true,
        };

        if entry.has_zip64_sentinel() {
            entry.resolved = apply_zip64_extra(extra, &mut entry);
        }

        Ok((entry, comment_offset + file_comment_length))
    }

    /// Locate the compressed data of an entry.
    ///
    /// Reads the Local File Header, whose name and extra lengths may differ
    /// from the central directory copy, and returns the byte range of the
    /// payload. Both the header and the payload must end at or before
    /// `limit` (the EOCD offset), checked before anything is read.
    pub fn get_data_range(&self, entry: &DirectoryEntry, limit: u64) -> Result<Range<usize>, ZipError> {
        if !entry.resolved {
            return Err(ZipError::UnresolvedZip64 {
                name: entry.file_name.clone(),
            });
        }

        let limit = limit.min(self.size());
        let out_of_range = |what| ZipError::EntryOutOfRange {
            name: entry.file_name.clone(),
            what,
        };

        let header_end = entry
            .lfh_offset
            .checked_add(LFH_SIZE as u64)
            .filter(|&end| end <= limit)
            .ok_or_else(|| out_of_range("local header"))?;
        let header = self
            .slice(entry.lfh_offset, LFH_SIZE as u64)
            .ok_or_else(|| out_of_range("local header"))?;

        if &header[0..4] != LFH_SIGNATURE {
            return Err(ZipError::LocalHeader {
                name: entry.file_name.clone(),
            });
        }

        let mut cursor = Cursor::new(header);
        cursor.set_position(LFH_NAME_LEN_OFFSET);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        let data_start = header_end + file_name_length + extra_field_length;
        let data_end = data_start
            .checked_add(entry.compressed_size)
            .filter(|&end| end <= limit)
            .ok_or_else(|| out_of_range("data"))?;

        // data_end <= limit <= data.len()
        Ok(data_start as usize..data_end as usize)
    }
}

/// Resolve sentinel fields of `entry` from its Zip64 extra field.
///
/// Values appear in the fixed order uncompressed size, compressed size,
/// local header offset, and only the fields that were saturated in the
/// fixed header take up space. Returns `false` if some saturated field
/// could not be resolved.
pub fn apply_zip64_extra(extra: &[u8], entry: &mut DirectoryEntry) -> bool {
    let sentinel = SENTINEL_U32 as u64;
    let need_uncompressed = entry.uncompressed_size == sentinel;
    let need_compressed = entry.compressed_size == sentinel;
    let need_offset = entry.lfh_offset == sentinel;

    let mut pos = 0usize;
    while pos + 4 <= extra.len() {
        let header_id = u16::from_le_bytes([extra[pos], extra[pos + 1]]);
        let field_size = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;
        let data_start = pos + 4;
        let data_end = data_start + field_size;
        if data_end > extra.len() {
            break;
        }

        if header_id == ZIP64_EXTRA_ID {
            let mut fields = Cursor::new(&extra[data_start..data_end]);
            let mut resolved = true;
            for (needed, target) in [
                (need_uncompressed, &mut entry.uncompressed_size),
                (need_compressed, &mut entry.compressed_size),
                (need_offset, &mut entry.lfh_offset),
            ] {
                if !needed {
                    continue;
                }
                match fields.read_u64::<LittleEndian>() {
                    Ok(value) => *target = value,
                    Err(_) => resolved = false,
                }
            }
            return resolved;
        }

        pos = data_end;
    }

    false
}
