// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use bytes::Bytes;
use clap::Parser;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Method, Request};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use har_tracer::config::TracerConfig;
use har_tracer::{HarExporter, TracingClient};

#[derive(Parser, Debug)]
#[command(name = "har-tracer", version)]
struct Args {
    /// URLs to fetch, all concurrently
    #[arg(required = true)]
    urls: Vec<String>,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long)]
    data: Option<String>,

    /// Where to write the HAR file
    #[arg(long)]
    trace_export: Option<PathBuf>,

    /// Collect nothing to disk
    #[arg(long)]
    no_trace: bool,

    /// Optional config TOML path
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Defaults, then the config file, then the environment, then flags.
async fn resolve_config<F>(args: &Args, env: F) -> TracerConfig
where
    F: Fn(&str) -> Option<String>,
{
    let cfg = if let Some(ref p) = args.config {
        TracerConfig::load_from_path(p).await.unwrap_or_else(|e| {
            warn!(path = %p.display(), error = %format!("{:#}", e), "failed to load config, using defaults");
            TracerConfig::default()
        })
    } else {
        TracerConfig::default()
    };
    let mut cfg = cfg.with_env_from(env);
    if let Some(ref p) = args.trace_export {
        cfg.export.path = p.clone();
    }
    if args.no_trace {
        cfg.export.enabled = false;
    }
    cfg
}

fn parse_header(raw: &str) -> anyhow::Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header '{}' is not NAME:VALUE", raw))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("invalid header name in '{}'", raw))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("invalid header value in '{}'", raw))?;
    Ok((name, value))
}

fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    data: Option<&str>,
) -> anyhow::Result<Request<Bytes>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{}'", method))?;
    let mut builder = Request::builder().method(method).uri(url);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        builder = builder.header(name, value);
    }
    let body = data.map(|d| Bytes::copy_from_slice(d.as_bytes())).unwrap_or_default();
    Ok(builder.body(body)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let cfg = resolve_config(&args, |k| std::env::var(k).ok()).await;
    let exporter = HarExporter::from_config(&cfg);
    let client = TracingClient::new(exporter.clone())?;

    let mut tasks = JoinSet::new();
    for url in &args.urls {
        let req = match build_request(&args.method, url, &args.headers, args.data.as_deref()) {
            Ok(req) => req,
            Err(e) => {
                error!(%url, error = %format!("{:#}", e), "invalid request");
                continue;
            }
        };
        let client = client.clone();
        let url = url.clone();
        tasks.spawn(async move {
            match client.send(req).await {
                Ok(resp) => info!(
                    %url,
                    status = resp.status().as_u16(),
                    bytes = resp.body().len(),
                    "request finished"
                ),
                Err(e) => error!(%url, error = %format!("{:#}", e), "request failed"),
            }
        });
    }
    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            error!(%e, "request task failed");
        }
    }

    if cfg.export.enabled {
        exporter.export().await?;
    } else {
        info!("trace export disabled");
    }
    Ok(())
}
