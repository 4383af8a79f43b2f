//! Text decoding for uploaded files
//!
//! Encodings are tried in a fixed order and the first successful decode wins.
//! Bytes that no decoder accepts are converted lossily instead of rejected.

use serde::{Deserialize, Serialize};

/// Encoding that produced a file's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "latin-1")]
    Latin1,
    #[serde(rename = "cp1252")]
    Cp1252,
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
    /// Lossy UTF-8 conversion, replacement characters included
    #[serde(rename = "lossy")]
    Lossy,
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf-8"),
            TextEncoding::Latin1 => write!(f, "latin-1"),
            TextEncoding::Cp1252 => write!(f, "cp1252"),
            TextEncoding::Iso8859_1 => write!(f, "iso-8859-1"),
            TextEncoding::Lossy => write!(f, "lossy"),
        }
    }
}

/// Decode order
pub const DECODE_ORDER: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Cp1252,
    TextEncoding::Iso8859_1,
];

impl TextEncoding {
    /// Strict decode. `None` when the bytes are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            // Every byte maps to the code point of the same value.
            TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
                Some(bytes.iter().map(|&b| b as char).collect())
            }
            TextEncoding::Cp1252 => bytes.iter().map(|&b| cp1252_char(b)).collect(),
            TextEncoding::Lossy => Some(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Decode raw bytes, returning the text and the encoding that succeeded
pub fn decode_bytes(bytes: &[u8]) -> (String, TextEncoding) {
    for encoding in DECODE_ORDER {
        if let Some(text) = encoding.decode(bytes) {
            return (text, encoding);
        }
    }
    (String::from_utf8_lossy(bytes).into_owned(), TextEncoding::Lossy)
}

/// Windows-1252. Five bytes in 0x80..=0x9F are undefined.
fn cp1252_char(b: u8) -> Option<char> {
    const HIGH: [Option<char>; 32] = [
        Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
        Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
        Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
        Some('\u{0152}'), None, Some('\u{017D}'), None,
        None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
        Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
        Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
        Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
    ];
    match b {
        0x80..=0x9F => HIGH[(b - 0x80) as usize],
        _ => Some(b as char),
    }
}
