//! In-memory ZIP writer for tests.
//!
//! Produces classic or Zip64 archives with exact control over the header
//! fields the reader cares about, so malformed variants can be derived by
//! patching bytes afterwards.

#![allow(dead_code, clippy::unwrap_used)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::cell::RefCell;
use std::io::Write;

pub const SENTINEL: u32 = 0xFFFF_FFFF;

/// Which fixed fields of an entry are saturated and moved into its Zip64 extra field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip64Fields {
    pub uncompressed: bool,
    pub compressed: bool,
    pub offset: bool,
}

impl Zip64Fields {
    pub const ALL: Self = Self {
        uncompressed: true,
        compressed: true,
        offset: true,
    };
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: Vec<u8>,
    pub flags: u16,
    pub method: u16,
    pub payload: Vec<u8>,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub zip64: Zip64Fields,
    /// Extra bytes written into the local header only.
    pub local_extra: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ZipBuilder {
    members: Vec<Member>,
    comment: Vec<u8>,
    zip64: bool,
    locator_padding: usize,
    declared_entries: Option<u64>,
}

/// Byte positions of the records in a built archive.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub local_offsets: Vec<usize>,
    pub central_offsets: Vec<usize>,
    pub cd_offset: usize,
    pub zip64_eocd_offset: Option<usize>,
    pub locator_offset: Option<usize>,
    pub eocd_offset: usize,
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, body: &[u8]) -> Self {
        self.raw(name, 0, body.to_vec(), body)
    }

    pub fn deflated(self, name: &str, body: &[u8]) -> Self {
        self.raw(name, 8, deflate(body), body)
    }

    /// Add a member with an arbitrary method and pre-encoded payload.
    pub fn raw(mut self, name: &str, method: u16, payload: Vec<u8>, original: &[u8]) -> Self {
        self.members.push(Member {
            name: name.as_bytes().to_vec(),
            flags: if name.is_ascii() { 0 } else { 1 << 11 },
            method,
            payload,
            uncompressed_size: original.len() as u64,
            crc32: crc32(original),
            zip64: Zip64Fields::default(),
            local_extra: Vec::new(),
        });
        self
    }

    /// Add a stored member whose name bytes are written verbatim without the UTF-8 flag.
    pub fn legacy_name(mut self, name: &[u8], body: &[u8]) -> Self {
        self = self.stored("placeholder", body);
        let member = self.members.last_mut().unwrap();
        member.name = name.to_vec();
        member.flags = 0;
        self
    }

    /// Saturate fields of the last member and move them into a Zip64 extra field.
    pub fn zip64_fields(mut self, fields: Zip64Fields) -> Self {
        self.members.last_mut().unwrap().zip64 = fields;
        self
    }

    pub fn local_extra(mut self, extra: Vec<u8>) -> Self {
        self.members.last_mut().unwrap().local_extra = extra;
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Write a Zip64 record and locator and saturate the EOCD fields.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    /// Zero bytes inserted between the Zip64 locator and the EOCD.
    pub fn locator_padding(mut self, padding: usize) -> Self {
        self.locator_padding = padding;
        self
    }

    /// Override the entry count written to the EOCD (or Zip64 record).
    pub fn declared_entries(mut self, count: u64) -> Self {
        self.declared_entries = Some(count);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, Layout) {
        let mut out: Vec<u8> = Vec::new();
        let mut layout = Layout::default();

        for member in &self.members {
            layout.local_offsets.push(out.len());
            out.write_all(b"PK\x03\x04").unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(member.flags).unwrap();
            out.write_u16::<LittleEndian>(member.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0x21).unwrap();
            out.write_u32::<LittleEndian>(member.crc32).unwrap();
            out.write_u32::<LittleEndian>(member.payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(member.uncompressed_size as u32).unwrap();
            out.write_u16::<LittleEndian>(member.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(member.local_extra.len() as u16).unwrap();
            out.write_all(&member.name).unwrap();
            out.write_all(&member.local_extra).unwrap();
            out.write_all(&member.payload).unwrap();
        }

        layout.cd_offset = out.len();
        for (member, &local_offset) in self.members.iter().zip(&layout.local_offsets) {
            layout.central_offsets.push(out.len());

            let mut extra = Vec::new();
            let mut compressed = member.payload.len() as u32;
            let mut uncompressed = member.uncompressed_size as u32;
            let mut offset = local_offset as u32;
            let z = member.zip64;
            if z.uncompressed || z.compressed || z.offset {
                let mut data = Vec::new();
                if z.uncompressed {
                    data.write_u64::<LittleEndian>(member.uncompressed_size).unwrap();
                    uncompressed = SENTINEL;
                }
                if z.compressed {
                    data.write_u64::<LittleEndian>(member.payload.len() as u64).unwrap();
                    compressed = SENTINEL;
                }
                if z.offset {
                    data.write_u64::<LittleEndian>(local_offset as u64).unwrap();
                    offset = SENTINEL;
                }
                extra.write_u16::<LittleEndian>(0x0001).unwrap();
                extra.write_u16::<LittleEndian>(data.len() as u16).unwrap();
                extra.extend(data);
            }

            out.write_all(b"PK\x01\x02").unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(member.flags).unwrap();
            out.write_u16::<LittleEndian>(member.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0x21).unwrap();
            out.write_u32::<LittleEndian>(member.crc32).unwrap();
            out.write_u32::<LittleEndian>(compressed).unwrap();
            out.write_u32::<LittleEndian>(uncompressed).unwrap();
            out.write_u16::<LittleEndian>(member.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(offset).unwrap();
            out.write_all(&member.name).unwrap();
            out.write_all(&extra).unwrap();
        }

        let cd_size = out.len() - layout.cd_offset;
        let entries = self.declared_entries.unwrap_or(self.members.len() as u64);

        if self.zip64 {
            let record_offset = out.len();
            layout.zip64_eocd_offset = Some(record_offset);
            out.write_all(b"PK\x06\x06").unwrap();
            out.write_u64::<LittleEndian>(44).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(entries).unwrap();
            out.write_u64::<LittleEndian>(entries).unwrap();
            out.write_u64::<LittleEndian>(cd_size as u64).unwrap();
            out.write_u64::<LittleEndian>(layout.cd_offset as u64).unwrap();

            layout.locator_offset = Some(out.len());
            out.write_all(b"PK\x06\x07").unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(record_offset as u64).unwrap();
            out.write_u32::<LittleEndian>(1).unwrap();
            out.extend(std::iter::repeat_n(0u8, self.locator_padding));
        }

        layout.eocd_offset = out.len();
        out.write_all(b"PK\x05\x06").unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        if self.zip64 {
            out.write_u16::<LittleEndian>(0xFFFF).unwrap();
            out.write_u16::<LittleEndian>(0xFFFF).unwrap();
            out.write_u32::<LittleEndian>(SENTINEL).unwrap();
            out.write_u32::<LittleEndian>(SENTINEL).unwrap();
        } else {
            out.write_u16::<LittleEndian>(entries as u16).unwrap();
            out.write_u16::<LittleEndian>(entries as u16).unwrap();
            out.write_u32::<LittleEndian>(cd_size as u32).unwrap();
            out.write_u32::<LittleEndian>(layout.cd_offset as u32).unwrap();
        }
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.write_all(&self.comment).unwrap();

        (out, layout)
    }
}

pub fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

/// A warning sink that records every message.
#[derive(Debug, Default)]
pub struct Recorder {
    messages: RefCell<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|m| m.contains(needle))
    }
}

impl nuget_notices::WarningSink for Recorder {
    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
