// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Query string and form body decoding.

use url::form_urlencoded;
use url::Url;

use crate::har::{PostParam, QueryString};

/// Decoded query parameters of a URL, in order, repeats included.
pub fn query_string(url: &Url) -> Vec<QueryString> {
    url.query_pairs()
        .map(|(name, value)| QueryString {
            name: name.into_owned(),
            value: value.into_owned(),
            comment: None,
        })
        .collect()
}

/// Decode an `application/x-www-form-urlencoded` body into post params.
pub fn form_params(body: &[u8]) -> Vec<PostParam> {
    form_urlencoded::parse(body)
        .map(|(name, value)| PostParam {
            name: name.into_owned(),
            value: Some(value.into_owned()),
            ..Default::default()
        })
        .collect()
}

/// Origin-form request target (`/path?query`) for a URL.
pub fn request_target(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

/// Value for the `Host` header: the host, plus the port when it is not the
/// scheme default.
pub fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
