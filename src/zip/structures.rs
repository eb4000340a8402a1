use byteorder::{LittleEndian, ReadBytesExt};
use std::borrow::Cow;
use std::io::Cursor;

use super::error::ZipError;

/// Value stored in a 16-bit field whose real value lives in the Zip64 record.
pub const SENTINEL_U16: u16 = 0xFFFF;
/// Value stored in a 32-bit field whose real value lives in a Zip64 record or extra field.
pub const SENTINEL_U32: u32 = 0xFFFFFFFF;

/// General purpose flag bit 11: file name is UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;

/// Header ID of the Zip64 extended information extra field.
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }

    /// Short label used in verbose listings.
    pub fn label(&self) -> Cow<'static, str> {
        match self {
            CompressionMethod::Stored => Cow::Borrowed("Stored"),
            CompressionMethod::Deflate => Cow::Borrowed("Defl:N"),
            CompressionMethod::Unknown(v) => Cow::Owned(format!("Unk:{v:03}")),
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;
    /// The comment length field is 16 bits wide.
    pub const MAX_COMMENT_SIZE: u64 = 65535;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::SIZE {
            return Err(ZipError::Truncated("end of central directory"));
        }

        if &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::BadSignature("end of central directory"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == SENTINEL_U16
            || self.total_entries == SENTINEL_U16
            || self.cd_size == SENTINEL_U32
            || self.cd_offset == SENTINEL_U32
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;
    /// How far before the EOCD the locator is searched for.
    pub const SEARCH_WINDOW: u64 = 1024;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::SIZE {
            return Err(ZipError::Truncated("Zip64 locator"));
        }

        if &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::BadSignature("Zip64 locator"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Single-disk writers record either zero or one total disks.
    pub fn is_single_disk(&self) -> bool {
        self.disk_with_eocd64 == 0 && self.total_disks <= 1
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
#[derive(Debug, Clone)]
pub struct Zip64EOCD {
    /// Size of the remaining record, excluding the signature and this field.
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;
    /// Bytes preceding the data counted by `eocd64_size`.
    pub const LEADING_SIZE: u64 = 12;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::MIN_SIZE {
            return Err(ZipError::Truncated("Zip64 end of central directory"));
        }

        if &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::BadSignature("Zip64 end of central directory"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }

    /// Total on-disk length of the record as declared by its size field.
    pub fn declared_len(&self) -> Option<u64> {
        self.eocd64_size.checked_add(Self::LEADING_SIZE)
    }
}

/// Where the central directory lives and how many entries it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryLocation {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    /// Whether the values came from the Zip64 record.
    pub zip64: bool,
}

impl From<&EndOfCentralDirectory> for CentralDirectoryLocation {
    fn from(eocd: &EndOfCentralDirectory) -> Self {
        Self {
            total_entries: eocd.total_entries as u64,
            cd_size: eocd.cd_size as u64,
            cd_offset: eocd.cd_offset as u64,
            zip64: false,
        }
    }
}

impl From<&Zip64EOCD> for CentralDirectoryLocation {
    fn from(eocd64: &Zip64EOCD) -> Self {
        Self {
            total_entries: eocd64.total_entries,
            cd_size: eocd64.cd_size,
            cd_offset: eocd64.cd_offset,
            zip64: true,
        }
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;
/// Offset of the file name length field inside the LFH.
pub const LFH_NAME_LEN_OFFSET: u64 = 26;

/// Parsed central directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub file_name: String,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
    /// False when a sentinel field had no matching Zip64 extra value.
    /// Such entries are never extracted.
    pub resolved: bool,
}

impl DirectoryEntry {
    /// Whether the name was stored as UTF-8 (flag bit 11).
    pub fn is_utf8(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    /// Whether any of the fixed 32-bit fields carry the Zip64 sentinel.
    pub fn has_zip64_sentinel(&self) -> bool {
        self.compressed_size == SENTINEL_U32 as u64
            || self.uncompressed_size == SENTINEL_U32 as u64
            || self.lfh_offset == SENTINEL_U32 as u64
    }

    /// The part of the name after the last `/`.
    pub fn basename(&self) -> &str {
        basename(&self.file_name)
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// The payload of one extracted member.
///
/// Stored members borrow straight from the archive buffer; inflated
/// members own their decompressed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMember<'a> {
    pub name: String,
    pub data: Cow<'a, [u8]>,
}

impl ExtractedMember<'_> {
    pub fn into_owned(self) -> ExtractedMember<'static> {
        ExtractedMember {
            name: self.name,
            data: Cow::Owned(self.data.into_owned()),
        }
    }
}

/// Decode a raw entry name.
///
/// UTF-8 names are decoded lossily. Anything else is the legacy DOS code
/// page, kept as Latin-1 so every byte maps to exactly one char.
pub fn decode_name(bytes: &[u8], utf8: bool) -> String {
    if utf8 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

pub(crate) fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
