// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! HTTP client decorator that records every call into the archive.
//!
//! [`TracingClient::send`] performs the request itself (DNS lookup, TCP
//! connect, optional TLS handshake, HTTP/1.1 exchange on a fresh connection)
//! so that each phase can be observed, and returns the response exactly as the
//! server sent it. Capturing never changes the outcome of the call.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Instant;

use anyhow::{anyhow, bail, Context as _};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, HOST};
use hyper::ext::ReasonPhrase;
use hyper::{Request, Response, Version};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;
use url::{Host, Url};

use crate::exporter::HarExporter;
use crate::helpers::headers::get_header_str;
use crate::helpers::uri::{host_header, request_target};

trait Io: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

/// Instants of application-level traffic on one connection.
#[derive(Debug, Default, Clone, Copy)]
struct WireMarks {
    /// Last successful write before anything was read back.
    last_write: Option<Instant>,
    first_read: Option<Instant>,
}

/// Stream wrapper noting when the request finished flushing and when the
/// first response byte arrived.
struct MarkedStream<S> {
    inner: S,
    marks: Arc<Mutex<WireMarks>>,
}

impl<S> MarkedStream<S> {
    fn new(inner: S, marks: Arc<Mutex<WireMarks>>) -> Self {
        Self { inner, marks }
    }

    fn update(&self, f: impl FnOnce(&mut WireMarks)) {
        if let Ok(mut marks) = self.marks.lock() {
            f(&mut marks);
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for MarkedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let res = Pin::new(&mut this.inner).poll_read(cx, buf);
        if matches!(res, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            let now = Instant::now();
            this.update(|m| {
                m.first_read.get_or_insert(now);
            });
        }
        res
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for MarkedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let res = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = res {
            if n > 0 {
                let now = Instant::now();
                this.update(|m| {
                    if m.first_read.is_none() {
                        m.last_write = Some(now);
                    }
                });
            }
        }
        res
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// TLS client configuration trusting the Mozilla root set, speaking HTTP/1.1.
pub fn default_tls_config() -> anyhow::Result<Arc<ClientConfig>> {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let mut config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// Where to connect for a URL: lookup name, port and whether TLS is used.
fn resolve_target(url: &Url) -> anyhow::Result<(String, u16, bool)> {
    let secure = match url.scheme() {
        "https" => true,
        "http" => false,
        other => bail!("unsupported scheme '{}'", other),
    };
    let host = match url.host() {
        Some(Host::Domain(d)) => d.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => bail!("request URL has no host: {}", url),
    };
    let port = url
        .port_or_known_default()
        .unwrap_or(if secure { 443 } else { 80 });
    Ok((host, port, secure))
}

/// Request-issuing function that records each call as a HAR entry.
#[derive(Clone)]
pub struct TracingClient {
    exporter: HarExporter,
    tls: TlsConnector,
}

impl TracingClient {
    pub fn new(exporter: HarExporter) -> anyhow::Result<Self> {
        Ok(Self::with_tls_config(exporter, default_tls_config()?))
    }

    pub fn with_tls_config(exporter: HarExporter, tls: Arc<ClientConfig>) -> Self {
        exporter.on_instrumented();
        Self {
            exporter,
            tls: TlsConnector::from(tls),
        }
    }

    pub fn exporter(&self) -> &HarExporter {
        &self.exporter
    }

    /// Send a request with an absolute `http`/`https` URI.
    ///
    /// Returns the response with its body fully read. Transport failures are
    /// returned as errors and leave no entry in the archive.
    pub async fn send(&self, req: Request<Bytes>) -> anyhow::Result<Response<Bytes>> {
        let start = Instant::now();
        let (mut parts, body) = req.into_parts();
        let url = Url::parse(&parts.uri.to_string())
            .with_context(|| format!("request URI must be absolute: {}", parts.uri))?;
        let (host, port, secure) = resolve_target(&url)?;

        // hyper's connection API adds neither of these; capture what goes on the wire
        if !parts.headers.contains_key(HOST) {
            if let Some(h) = host_header(&url) {
                parts.headers.insert(HOST, HeaderValue::from_str(&h)?);
            }
        }
        if !body.is_empty() && !parts.headers.contains_key(CONTENT_LENGTH) {
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let mut interceptor = self
            .exporter
            .create_interceptor(parts.method.as_str(), &url, start);
        let id = interceptor.id();
        interceptor.on_request_sent(&parts.headers, Version::HTTP_11);
        interceptor.on_socket_created(None, Instant::now());

        let addr: SocketAddr = tokio::net::lookup_host((host.as_str(), port))
            .await
            .with_context(|| format!("resolving {}", host))?
            .next()
            .ok_or_else(|| anyhow!("no addresses found for {}", host))?;
        interceptor.on_dns_resolved(addr.ip(), Instant::now());

        let tcp = TcpStream::connect(addr)
            .await
            .with_context(|| format!("connecting to {}", addr))?;
        interceptor.on_connected(tcp.local_addr()?, Instant::now());

        let io: Box<dyn Io> = if secure {
            let server_name = ServerName::try_from(host.clone())
                .with_context(|| format!("invalid TLS server name {}", host))?;
            let tls = self
                .tls
                .connect(server_name, tcp)
                .await
                .with_context(|| format!("TLS handshake with {}", host))?;
            interceptor.on_secure_connected(Instant::now());
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        let marks = Arc::new(Mutex::new(WireMarks::default()));
        let stream = MarkedStream::new(io, marks.clone());
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(%id, error = %e, "connection closed with error");
            }
        });

        parts.uri = request_target(&url).parse()?;
        parts.version = Version::HTTP_11;
        let req_headers = parts.headers.clone();
        let response = sender
            .send_request(Request::from_parts(parts, Full::new(body.clone())))
            .await?;
        let head_at = Instant::now();
        let observed = marks.lock().map(|m| *m).unwrap_or_default();

        interceptor.on_request_body_sent(
            &req_headers,
            &body,
            observed.last_write.unwrap_or(head_at),
        );
        let (resp_parts, resp_body) = response.into_parts();
        // hyper only keeps the phrase when it differs from the registered one
        let reason = resp_parts
            .extensions
            .get::<ReasonPhrase>()
            .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned());
        interceptor.on_response_headers_received(
            resp_parts.status,
            reason.as_deref(),
            resp_parts.version,
            &resp_parts.headers,
        );
        interceptor.on_response_first_byte(observed.first_read.unwrap_or(head_at));

        let resp_bytes = resp_body.collect().await?.to_bytes();
        let encoding = get_header_str(&resp_parts.headers, CONTENT_ENCODING.as_str());
        interceptor.on_response_body_complete(&resp_bytes, encoding.as_deref(), Instant::now());
        interceptor.complete();

        Ok(Response::from_parts(resp_parts, resp_bytes))
    }
}
