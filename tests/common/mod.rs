// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

#![allow(dead_code)]

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use hyper::Request;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use har_tracer::{HarExporter, TracingClient};

/// A client recording into a fresh exporter whose export path is unique.
pub fn make_traced_client(name: &str) -> anyhow::Result<(TracingClient, HarExporter)> {
    let path = temp_trace_path(name);
    let exporter = HarExporter::new("integration", "0.0.1", path);
    let client = TracingClient::new(exporter.clone())?;
    Ok((client, exporter))
}

pub fn temp_trace_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("har_tracer_it_{}_{}.har", name, uuid::Uuid::new_v4()))
}

pub fn get(url: &str) -> anyhow::Result<Request<Bytes>> {
    Ok(Request::get(url).body(Bytes::new())?)
}

/// Port on localhost with nothing listening.
pub fn closed_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

pub fn gzip(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

pub fn brotli(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut enc = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
        enc.write_all(data)?;
    }
    Ok(out)
}

/// Read one request head from `stream`, then answer with `response` verbatim.
async fn answer_raw<S>(mut stream: S, response: &[u8]) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut head = Vec::new();
    let mut tmp = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&tmp[..n]);
    }
    stream.write_all(response).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Plain TCP server answering a single connection with a fixed response.
pub async fn spawn_raw_server(response: &'static [u8]) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let _ = answer_raw(stream, response).await;
        }
    });
    Ok(addr)
}

/// TLS server on 127.0.0.1 with a fresh self-signed certificate, answering a
/// single connection with a fixed response. Returns a client config trusting
/// that certificate.
pub async fn spawn_tls_server(
    response: &'static [u8],
) -> anyhow::Result<(SocketAddr, Arc<ClientConfig>)> {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new())?;
    params.subject_alt_names = vec![rcgen::SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST))];
    let cert = params.self_signed(&key_pair)?;
    let cert_der = cert.der().clone();
    let key_der = PrivateKeyDer::from(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let server_cfg = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(vec![cert_der.clone()], key_der)?;
    let acceptor = TlsAcceptor::from(Arc::new(server_cfg));

    let mut roots = RootCertStore::empty();
    roots.add(cert_der)?;
    let client_cfg = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Ok((tcp, _)) = listener.accept().await {
            if let Ok(tls) = acceptor.accept(tcp).await {
                let _ = answer_raw(tls, response).await;
            }
        }
    });
    Ok((addr, Arc::new(client_cfg)))
}
