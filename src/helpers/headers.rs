// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use std::borrow::Cow;

use hyper::header::HeaderValue;
use hyper::{HeaderMap, Version};

use crate::har::Header;

/// Header value as text. Bytes outside UTF-8 (obs-text in another charset)
/// become U+FFFD instead of dropping the value.
pub fn header_value_str(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

/// Retrieve the first value of a header as text, if present.
pub fn get_header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<Cow<'a, str>> {
    headers.get(name).map(header_value_str)
}

/// Iterate every value of a possibly repeated header as text.
pub fn get_all_header_str<'a>(
    headers: &'a HeaderMap,
    name: &str,
) -> impl Iterator<Item = Cow<'a, str>> + 'a {
    headers.get_all(name).into_iter().map(header_value_str)
}

/// Convert a header map into HAR name/value pairs plus an approximate wire size.
///
/// Repeated headers produce one pair per value, in map order. The size starts
/// at 2 for the blank line ending the head and adds `name: value\r\n` (name,
/// value and 4 framing bytes) for every value, counting the value as sent on
/// the wire. A header carrying several values is also charged its name length
/// once more per value. It is an estimate, not a byte exact reproduction of
/// what was written.
pub fn to_har_headers(headers: &HeaderMap) -> (Vec<Header>, i64) {
    let mut size: i64 = 2;
    let mut converted = Vec::with_capacity(headers.len());
    for name in headers.keys() {
        let mut count = 0;
        for value in headers.get_all(name) {
            size += (name.as_str().len() + 4 + value.len()) as i64;
            converted.push(Header {
                name: name.as_str().to_string(),
                value: header_value_str(value).into_owned(),
                comment: None,
            });
            count += 1;
        }
        if count > 1 {
            size += (name.as_str().len() * count) as i64;
        }
    }
    (converted, size)
}

/// Convert hyper::Version into the textual HTTP-version token used in start/status lines.
pub fn format_http_version(v: Version) -> String {
    match v {
        Version::HTTP_09 => "HTTP/0.9".to_string(),
        Version::HTTP_10 => "HTTP/1.0".to_string(),
        Version::HTTP_11 => "HTTP/1.1".to_string(),
        Version::HTTP_2 => "HTTP/2.0".to_string(),
        Version::HTTP_3 => "HTTP/3.0".to_string(),
        _ => "HTTP/1.1".to_string(),
    }
}

/// Represents a parsed Media Type (e.g. "text/html; charset=utf-8").
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedMediaType<'a> {
    pub type_: &'a str,
    pub subtype: &'a str,
    pub params: Option<&'a str>,
}

impl ParsedMediaType<'_> {
    /// True when `type/subtype` matches `essence`, ignoring case and parameters.
    pub fn is(&self, essence: &str) -> bool {
        let Some((t, s)) = essence.split_once('/') else {
            return false;
        };
        self.type_.eq_ignore_ascii_case(t) && self.subtype.eq_ignore_ascii_case(s)
    }
}

/// Parse a Media Type string into type, subtype, and optional params.
///
/// This does NOT fully validate the tokens (e.g. wildcards or invalid chars),
/// but it separates the structure.
/// Returns an error message if the structure is invalid (missing slash, empty parts).
pub fn parse_media_type(val: &str) -> Result<ParsedMediaType<'_>, String> {
    let trimmed = val.trim();
    if trimmed.is_empty() {
        return Err("Empty media-type".into());
    }

    let (media, params) = match trimmed.split_once(';') {
        Some((m, p)) => (m.trim(), Some(p.trim()).filter(|p| !p.is_empty())),
        None => (trimmed, None),
    };

    let Some((type_, subtype)) = media.split_once('/') else {
        return Err(format!(
            "Invalid media-type '{}': missing '/' between type and subtype",
            val
        ));
    };
    let (type_, subtype) = (type_.trim(), subtype.trim());

    if type_.is_empty() || subtype.is_empty() {
        return Err(format!(
            "Invalid media-type '{}': empty type or subtype",
            val
        ));
    }

    Ok(ParsedMediaType {
        type_,
        subtype,
        params,
    })
}
