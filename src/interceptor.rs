// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Per-request capture state machine.
//!
//! An [`Interceptor`] owns one HAR [`Entry`] while its request is in flight.
//! The transport reports lifecycle events in causal order, each with the
//! monotonic instant at which it happened; every event fills in part of the
//! entry. [`Interceptor::complete`] consumes the interceptor and hands the
//! finished entry to the archive. An interceptor dropped before completion
//! (for example because the request was aborted) leaves no trace.
//!
//! Capture never fails: malformed headers, unknown codings and corrupt
//! bodies degrade to default values.

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::{HeaderMap, StatusCode, Version};
use url::Url;
use uuid::Uuid;

use crate::content;
use crate::exporter::EntrySink;
use crate::har::{Entry, PostData};
use crate::helpers::cookie::{request_cookies, response_cookies};
use crate::helpers::headers::{format_http_version, get_header_str, parse_media_type, to_har_headers};
use crate::helpers::uri::{form_params, query_string};
use crate::timing::{duration_ms, Phase, PhaseClock};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Lifecycle position of an interceptor. Stages may be skipped, never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Created,
    RequestHeadersSent,
    SocketCreated,
    DnsResolved,
    Connected,
    SecureConnected,
    RequestBodySent,
    ResponseHeadersReceived,
    ResponseFirstByte,
    ResponseBodyComplete,
}

pub struct Interceptor {
    id: Uuid,
    url: Url,
    entry: Entry,
    clock: PhaseClock,
    stage: Stage,
    sink: EntrySink,
}

impl Interceptor {
    pub(crate) fn new(entry: Entry, url: Url, start: Instant, sink: EntrySink) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            entry,
            clock: PhaseClock::new(start),
            stage: Stage::Created,
            sink,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The entry as captured so far.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Move to `next` if it lies ahead of the current stage.
    ///
    /// Late or repeated events are logged and ignored so a misbehaving
    /// transport cannot corrupt already recorded phases.
    fn advance(&mut self, next: Stage) -> bool {
        if next <= self.stage {
            tracing::warn!(
                id = %self.id,
                current = ?self.stage,
                event = ?next,
                "out-of-order lifecycle event ignored"
            );
            return false;
        }
        self.stage = next;
        true
    }

    fn record(&mut self, phase: Phase, at: Instant) {
        self.clock.record(phase, at);
        self.entry.timings = self.clock.to_har();
    }

    /// Request head handed to the transport.
    pub fn on_request_sent(&mut self, headers: &HeaderMap, version: Version) {
        if !self.advance(Stage::RequestHeadersSent) {
            return;
        }
        let request = &mut self.entry.request;
        let (converted, size) = to_har_headers(headers);
        request.headers = converted;
        request.headers_size = size;
        request.http_version = format_http_version(version);
        request.query_string = query_string(&self.url);
        request.cookies = request_cookies(headers);
    }

    /// A socket was assigned to the request. `local` is unknown until connect
    /// for fresh sockets.
    pub fn on_socket_created(&mut self, local: Option<SocketAddr>, at: Instant) {
        if !self.advance(Stage::SocketCreated) {
            return;
        }
        self.record(Phase::Blocked, at);
        if let Some(port) = local.map(|a| a.port()).filter(|p| *p != 0) {
            self.entry.connection = port.to_string();
        }
    }

    pub fn on_dns_resolved(&mut self, address: IpAddr, at: Instant) {
        if !self.advance(Stage::DnsResolved) {
            return;
        }
        self.record(Phase::Dns, at);
        self.entry.server_ip_address = address.to_string();
    }

    /// TCP connect finished. `connection` records the port of the `local`
    /// end of the socket, which identifies the connection among those open
    /// to the same server.
    pub fn on_connected(&mut self, local: SocketAddr, at: Instant) {
        if !self.advance(Stage::Connected) {
            return;
        }
        self.record(Phase::Connect, at);
        if local.port() != 0 {
            self.entry.connection = local.port().to_string();
        }
    }

    /// TLS handshake finished. Only reported for secure transports.
    pub fn on_secure_connected(&mut self, at: Instant) {
        if !self.advance(Stage::SecureConnected) {
            return;
        }
        self.record(Phase::Ssl, at);
    }

    /// The request body was fully flushed. `headers` are the request headers
    /// that describe it.
    pub fn on_request_body_sent(&mut self, headers: &HeaderMap, body: &[u8], at: Instant) {
        if !self.advance(Stage::RequestBodySent) {
            return;
        }
        self.record(Phase::Send, at);
        self.entry.request.body_size = body.len() as i64;

        let Some(content_type) = get_header_str(headers, CONTENT_TYPE.as_str()) else {
            return;
        };
        let mut post_data = PostData {
            mime_type: content_type.to_string(),
            ..Default::default()
        };
        if let Ok(media) = parse_media_type(&content_type) {
            if media.is(FORM_URLENCODED) {
                post_data.params = Some(form_params(body));
            } else if media.is(MULTIPART_FORM_DATA) {
                post_data.params = Some(Vec::new());
            }
        }
        if content::classify(body) == content::Classification::Text {
            post_data.text = Some(String::from_utf8_lossy(body).into_owned());
        }
        self.entry.request.post_data = Some(post_data);
    }

    /// Response head arrived. `reason` is the phrase the server put on the
    /// status line; the registered phrase for `status` is used when it is absent.
    pub fn on_response_headers_received(
        &mut self,
        status: StatusCode,
        reason: Option<&str>,
        version: Version,
        headers: &HeaderMap,
    ) {
        if !self.advance(Stage::ResponseHeadersReceived) {
            return;
        }
        let response = &mut self.entry.response;
        response.status = status.as_u16();
        response.status_text = reason
            .or(status.canonical_reason())
            .unwrap_or_default()
            .to_string();
        response.http_version = format_http_version(version);
        response.redirect_url = get_header_str(headers, LOCATION.as_str())
            .map(Cow::into_owned)
            .unwrap_or_default();
        response.content.mime_type = get_header_str(headers, CONTENT_TYPE.as_str())
            .map(Cow::into_owned)
            .unwrap_or_default();
        let (converted, size) = to_har_headers(headers);
        response.headers = converted;
        response.headers_size = size;
        response.cookies = response_cookies(headers);
    }

    /// First byte of the response arrived.
    pub fn on_response_first_byte(&mut self, at: Instant) {
        if !self.advance(Stage::ResponseFirstByte) {
            return;
        }
        self.record(Phase::Wait, at);
    }

    /// The whole response body was received, still content-encoded.
    pub fn on_response_body_complete(
        &mut self,
        body: &[u8],
        content_encoding: Option<&str>,
        at: Instant,
    ) {
        if !self.advance(Stage::ResponseBodyComplete) {
            return;
        }
        self.record(Phase::Receive, at);
        self.entry.time = duration_ms(self.clock.total());
        self.entry.response.body_size =
            content::fill_content(&mut self.entry.response.content, body, content_encoding);
    }

    /// Hand the entry to the archive. Consumes the interceptor.
    pub fn complete(self) {
        tracing::debug!(
            id = %self.id,
            method = %self.entry.request.method,
            url = %self.entry.request.url,
            status = self.entry.response.status,
            time_ms = self.entry.time,
            "request captured"
        );
        self.sink.push(self.entry);
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}
