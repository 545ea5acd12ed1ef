// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Body classification and content decoding.

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::har::Content;

/// Share of control bytes above which valid UTF-8 is still treated as binary.
const MAX_CONTROL_RATIO: f64 = 0.1;

/// How a body can be stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Valid UTF-8 text, stored verbatim.
    Text,
    /// Stored base64-encoded with `encoding: "base64"`.
    Binary,
    /// Nothing to classify; no text is stored.
    Unknown,
}

/// Sniff a buffer instead of trusting its declared content type.
pub fn classify(body: &[u8]) -> Classification {
    if body.is_empty() {
        return Classification::Unknown;
    }
    let Ok(text) = std::str::from_utf8(body) else {
        return Classification::Binary;
    };
    if text.contains('\0') {
        return Classification::Binary;
    }
    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x1b'))
        .count();
    if control as f64 / text.chars().count() as f64 > MAX_CONTROL_RATIO {
        Classification::Binary
    } else {
        Classification::Text
    }
}

/// Content codings that can be reversed before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Brotli,
    Deflate,
}

impl Codec {
    /// Registry lookup by `Content-Encoding` token.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Some(Self::Gzip),
            "br" => Some(Self::Brotli),
            "deflate" => Some(Self::Deflate),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Brotli => "br",
            Self::Deflate => "deflate",
        }
    }

    /// Fully decode an encoded body.
    pub fn decode(self, encoded: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::Gzip => {
                flate2::read::MultiGzDecoder::new(encoded).read_to_end(&mut out)?;
            }
            Self::Brotli => {
                brotli::Decompressor::new(encoded, 4096).read_to_end(&mut out)?;
            }
            Self::Deflate => {
                // zlib-wrapped is what the token means; raw deflate is common in the wild
                if flate2::read::ZlibDecoder::new(encoded)
                    .read_to_end(&mut out)
                    .is_err()
                {
                    out.clear();
                    flate2::read::DeflateDecoder::new(encoded).read_to_end(&mut out)?;
                }
            }
        }
        Ok(out)
    }
}

/// Text or base64 representation of a body, according to its classification.
///
/// Returns `(text, encoding)`; both are `None` for unclassifiable bodies.
pub fn encode_text(body: &[u8]) -> (Option<String>, Option<String>) {
    match classify(body) {
        Classification::Text => (Some(String::from_utf8_lossy(body).into_owned()), None),
        Classification::Binary => (Some(BASE64.encode(body)), Some("base64".into())),
        Classification::Unknown => (None, None),
    }
}

/// Populate `content` from a response body as received on the wire.
///
/// Returns the wire size of the body, which is always the encoded length.
/// An unregistered or corrupt content coding leaves `content` untouched.
pub fn fill_content(content: &mut Content, wire: &[u8], content_encoding: Option<&str>) -> i64 {
    let wire_size = wire.len() as i64;

    let Some(coding) = content_encoding.filter(|c| !c.trim().is_empty()) else {
        content.size = wire_size;
        (content.text, content.encoding) = encode_text(wire);
        return wire_size;
    };

    let Some(codec) = Codec::from_name(coding) else {
        tracing::debug!(coding, "unsupported content-encoding, content not decoded");
        return wire_size;
    };

    match codec.decode(wire) {
        Ok(decoded) => {
            let size = decoded.len() as i64;
            content.size = size;
            content.compression = Some(size - wire_size);
            (content.text, content.encoding) = encode_text(&decoded);
        }
        Err(e) => {
            tracing::warn!(codec = codec.name(), error = %e, "failed to decode response body");
        }
    }
    wire_size
}
