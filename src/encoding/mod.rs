//! Byte transcoding between UTF-8 text and the script runtime's encodings.
//!
//! Every function here is pure. Decoding writes into a fixed-size scratch
//! buffer and grows it when the transcoder reports that it ran out of room;
//! callers only ever see the final string.

use std::fmt;

#[cfg(test)]
mod encoding_test;

/// Encodings understood by `encoding convertto/convertfrom` and `source -encoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    /// One byte per code point below 256. Also the byte-array view of a value.
    Iso8859_1,
    Ascii,
    /// UTF-8 with NUL stored as the overlong pair `C0 80`.
    Internal,
}

const NAMES: &[(&str, Encoding)] = &[
    ("utf-8", Encoding::Utf8),
    ("utf8", Encoding::Utf8),
    ("iso8859-1", Encoding::Iso8859_1),
    ("latin1", Encoding::Iso8859_1),
    ("binary", Encoding::Iso8859_1),
    ("ascii", Encoding::Ascii),
    ("identity", Encoding::Internal),
];

const INITIAL_SCRATCH: usize = 64;

impl Encoding {
    pub fn from_name(name: &str) -> Option<Encoding> {
        let lower = name.to_ascii_lowercase();
        NAMES
            .iter()
            .find(|(candidate, _)| *candidate == lower)
            .map(|(_, enc)| *enc)
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Iso8859_1 => "iso8859-1",
            Encoding::Ascii => "ascii",
            Encoding::Internal => "identity",
        }
    }

    pub fn names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = NAMES.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encode text into bytes. Characters the encoding cannot represent become `?`.
pub fn convert_to(encoding: Encoding, text: &str) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 => text.as_bytes().to_vec(),
        Encoding::Internal => {
            let mut out = Vec::with_capacity(text.len());
            for byte in text.bytes() {
                if byte == 0 {
                    out.extend_from_slice(&[0xC0, 0x80]);
                } else {
                    out.push(byte);
                }
            }
            out
        }
        Encoding::Iso8859_1 => text
            .chars()
            .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
            .collect(),
        Encoding::Ascii => text
            .chars()
            .map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' })
            .collect(),
    }
}

/// Decode bytes into text.
///
/// Malformed UTF-8 never fails: each byte that does not start a valid
/// sequence is taken as the code point of the same value.
pub fn convert_from(encoding: Encoding, bytes: &[u8]) -> String {
    let mut scratch = vec![0u8; INITIAL_SCRATCH.max(bytes.len())];
    let mut out = String::with_capacity(bytes.len());
    let mut consumed = 0;

    while consumed < bytes.len() {
        let step = decode_step(encoding, &bytes[consumed..], &mut scratch);
        // decode_step only emits whole UTF-8 sequences
        out.push_str(std::str::from_utf8(&scratch[..step.written]).unwrap_or_default());
        consumed += step.consumed;

        if step.no_space {
            let grown = scratch.len() * 2;
            scratch.resize(grown, 0);
        }
    }

    out
}

/// Byte-array view of text: every code point is truncated to its low byte.
pub fn to_byte_array(text: &str) -> Vec<u8> {
    text.chars().map(|ch| (u32::from(ch) & 0xFF) as u8).collect()
}

/// Inverse of [`to_byte_array`]: one code point per byte.
pub fn from_byte_array(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

struct Step {
    consumed: usize,
    written: usize,
    no_space: bool,
}

fn decode_step(encoding: Encoding, src: &[u8], dst: &mut [u8]) -> Step {
    let mut consumed = 0;
    let mut written = 0;

    while consumed < src.len() {
        let (ch, width) = match encoding {
            Encoding::Iso8859_1 => (char::from(src[consumed]), 1),
            Encoding::Ascii => {
                let byte = src[consumed];
                (if byte.is_ascii() { char::from(byte) } else { '?' }, 1)
            }
            Encoding::Utf8 => next_utf8(&src[consumed..]),
            Encoding::Internal => {
                if src[consumed..].starts_with(&[0xC0, 0x80]) {
                    ('\0', 2)
                } else {
                    next_utf8(&src[consumed..])
                }
            }
        };

        let needed = ch.len_utf8();
        if written + needed > dst.len() {
            return Step {
                consumed,
                written,
                no_space: true,
            };
        }

        ch.encode_utf8(&mut dst[written..written + needed]);
        written += needed;
        consumed += width;
    }

    Step {
        consumed,
        written,
        no_space: false,
    }
}

fn next_utf8(src: &[u8]) -> (char, usize) {
    let width = match src[0] {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    };

    if width > 0
        && src.len() >= width
        && let Ok(text) = std::str::from_utf8(&src[..width])
        && let Some(ch) = text.chars().next()
    {
        return (ch, width);
    }

    (char::from(src[0]), 1)
}
