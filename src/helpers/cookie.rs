// SPDX-FileCopyrightText: 2026 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Cookie parsing for request `Cookie` and response `Set-Cookie` headers.
//!
//! Parsing is lenient: malformed pieces become empty names or values rather
//! than errors, and nothing is unquoted or decoded.

use hyper::header::{COOKIE, SET_COOKIE};
use hyper::HeaderMap;

use crate::har::Cookie;
use crate::helpers::headers::get_all_header_str;

fn split_pair(s: &str) -> (&str, &str) {
    s.split_once('=').unwrap_or((s, ""))
}

/// Parse a request `Cookie` header value (`a=1; b=2`).
pub fn parse_cookie_header(val: &str) -> Vec<Cookie> {
    val.split("; ")
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| {
            let (name, value) = split_pair(piece);
            Cookie {
                name: name.trim().to_string(),
                value: value.to_string(),
                ..Default::default()
            }
        })
        .collect()
}

/// Parse one `Set-Cookie` value.
///
/// Recognized attributes are `Path`, `Domain`, `Expires` (kept verbatim),
/// `HttpOnly` and `Secure`; anything else is ignored.
pub fn parse_set_cookie(val: &str) -> Cookie {
    let mut parts = val.split(';');
    let (name, value) = split_pair(parts.next().unwrap_or_default());
    let mut cookie = Cookie {
        name: name.trim().to_string(),
        value: value.to_string(),
        ..Default::default()
    };

    for attr in parts {
        let (attr_name, attr_value) = match attr.split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (attr, None),
        };
        match attr_name.trim().to_ascii_lowercase().as_str() {
            "path" => cookie.path = attr_value,
            "domain" => cookie.domain = attr_value,
            "expires" => cookie.expires = attr_value,
            "httponly" => cookie.http_only = Some(true),
            "secure" => cookie.secure = Some(true),
            _ => {}
        }
    }

    cookie
}

/// Cookies sent with a request, from every `Cookie` header present.
pub fn request_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    get_all_header_str(headers, COOKIE.as_str())
        .flat_map(|v| parse_cookie_header(&v))
        .collect()
}

/// Cookies set by a response, one per `Set-Cookie` header.
pub fn response_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    get_all_header_str(headers, SET_COOKIE.as_str())
        .map(|v| parse_set_cookie(&v))
        .collect()
}
