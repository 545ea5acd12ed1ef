// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Shared test utilities to reduce duplication across test modules.

use std::io::Write;
use std::path::PathBuf;

use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;

use crate::exporter::HarExporter;

/// Build a HeaderMap from name/value pairs. Repeated names are appended.
pub fn make_headers_from_pairs(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut hm = HeaderMap::new();
    for (k, v) in pairs {
        hm.append(
            HeaderName::from_bytes(k.as_bytes()).expect("valid header name"),
            HeaderValue::from_str(v).expect("valid header value"),
        );
    }
    hm
}

/// Exporter with a fixed creator whose path is never written by unit tests.
pub fn make_test_exporter() -> HarExporter {
    HarExporter::new("test", "1.0.0", make_temp_trace_path("unit"))
}

/// Unique file path under the system temp dir.
pub fn make_temp_trace_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("har_tracer_{}_{}.har", name, uuid::Uuid::new_v4()))
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).expect("gzip write");
    enc.finish().expect("gzip finish")
}
