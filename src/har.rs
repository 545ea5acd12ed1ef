// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! HAR 1.2 archive data model.
//!
//! Field names follow the HAR schema (camelCase); optional members are
//! omitted from the output instead of being written as `null`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const HAR_VERSION: &str = "1.2";

macro_rules! har_data {
    ($name:ident, { $($field:tt)* }) => {
        #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $($field)*
        }
    };
}

har_data!(Har, {
    pub log: Log,
});

har_data!(Log, {
    pub version: String,
    pub creator: Creator,
    #[serde(default)]
    pub pages: Vec<Page>,
    pub entries: Vec<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(Creator, {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

// Never populated by the tracer; kept so archives from other tools load.
har_data!(Page, {
    pub started_date_time: String,
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub page_timings: serde_json::Value,
});

har_data!(Entry, {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pageref: Option<String>,
    pub started_date_time: String,
    pub time: f64,
    pub request: Request,
    pub response: Response,
    pub cache: Cache,
    pub timings: Timings,
    #[serde(rename = "serverIPAddress", default)]
    pub server_ip_address: String,
    #[serde(default)]
    pub connection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(Request, {
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub cookies: Vec<Cookie>,
    pub headers: Vec<Header>,
    pub query_string: Vec<QueryString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostData>,
    pub headers_size: i64,
    pub body_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(Response, {
    pub status: u16,
    pub status_text: String,
    pub http_version: String,
    pub cookies: Vec<Cookie>,
    pub headers: Vec<Header>,
    pub content: Content,
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
    pub headers_size: i64,
    pub body_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(Cookie, {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(Header, {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(QueryString, {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(PostData, {
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<PostParam>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(PostParam, {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
});

har_data!(Content, {
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<i64>,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

// Caching is not tracked; the schema still requires the object.
har_data!(Cache, {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

har_data!(Timings, {
    pub blocked: f64,
    pub dns: f64,
    pub connect: f64,
    pub send: f64,
    pub wait: f64,
    pub receive: f64,
    pub ssl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
});

impl Har {
    /// Empty archive for the given creator.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            log: Log {
                version: HAR_VERSION.to_string(),
                creator: Creator {
                    name: name.to_string(),
                    version: version.to_string(),
                    comment: None,
                },
                pages: Vec::new(),
                entries: Vec::new(),
                comment: None,
            },
        }
    }
}

impl Entry {
    /// Fresh entry for a request that started at `started`.
    ///
    /// Sizes start at `-1` and optional phases at the `-1` sentinel until the
    /// corresponding lifecycle events fill them in.
    pub fn new(method: &str, url: &Url, started: DateTime<Utc>) -> Self {
        Self {
            pageref: None,
            started_date_time: started.to_rfc3339_opts(SecondsFormat::Millis, true),
            time: 0.0,
            request: Request {
                method: method.to_string(),
                url: url.to_string(),
                http_version: "HTTP/1.1".into(),
                headers_size: -1,
                body_size: -1,
                ..Default::default()
            },
            response: Response {
                http_version: "HTTP/1.1".into(),
                headers_size: -1,
                body_size: -1,
                ..Default::default()
            },
            cache: Cache::default(),
            timings: Timings {
                blocked: -1.0,
                dns: -1.0,
                connect: -1.0,
                ssl: -1.0,
                ..Default::default()
            },
            server_ip_address: String::new(),
            connection: String::new(),
            comment: None,
        }
    }
}

impl Timings {
    /// Sum of all phases with the `-1` sentinel counted as zero.
    pub fn total(&self) -> f64 {
        [
            self.blocked,
            self.dns,
            self.connect,
            self.ssl,
            self.send,
            self.wait,
            self.receive,
        ]
        .iter()
        .map(|v| v.max(0.0))
        .sum()
    }
}
