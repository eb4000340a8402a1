//! Decoding of extracted member payloads into text.
//!
//! License files in packages come as UTF-8 (with or without a BOM) and,
//! now and then, UTF-16 written by Windows tooling. The byte-order mark
//! decides; without one the payload is taken as UTF-8. Decoding is always
//! lossy and never fails.

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Detect the encoding from a leading byte-order mark.
///
/// Returns the encoding and the length of the BOM to skip.
pub fn detect_bom(data: &[u8]) -> (TextEncoding, usize) {
    if data.starts_with(UTF8_BOM) {
        (TextEncoding::Utf8, UTF8_BOM.len())
    } else if data.starts_with(UTF16LE_BOM) {
        (TextEncoding::Utf16Le, UTF16LE_BOM.len())
    } else if data.starts_with(UTF16BE_BOM) {
        (TextEncoding::Utf16Be, UTF16BE_BOM.len())
    } else {
        (TextEncoding::Utf8, 0)
    }
}

pub fn decode_text(data: &[u8]) -> String {
    let (encoding, bom_len) = detect_bom(data);
    let body = &data[bom_len..];
    match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(body).into_owned(),
        TextEncoding::Utf16Le => decode_utf16(body, u16::from_le_bytes),
        TextEncoding::Utf16Be => decode_utf16(body, u16::from_be_bytes),
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = body.chunks_exact(2);
    let dangling = !chunks.remainder().is_empty();
    let mut text: String = char::decode_utf16(chunks.map(|pair| unit([pair[0], pair[1]])))
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if dangling {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}
