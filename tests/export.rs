// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

mod common;

use tokio::fs;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use har_tracer::exporter::load_archive;
use har_tracer::{HarExporter, TracingClient};

use common::{get, make_traced_client, temp_trace_path};

async fn ok_server() -> MockServer {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock)
        .await;
    mock
}

#[tokio::test]
async fn export_round_trips_through_disk() -> anyhow::Result<()> {
    let mock = ok_server().await;
    let (client, exporter) = make_traced_client("roundtrip")?;
    client.send(get(&format!("{}/one", mock.uri()))?).await?;
    client.send(get(&format!("{}/two", mock.uri()))?).await?;

    exporter.export().await?;
    let har = load_archive(exporter.export_path()).await?;
    assert_eq!(har, exporter.snapshot());
    assert_eq!(har.log.version, "1.2");
    assert_eq!(har.log.creator.name, "integration");
    assert_eq!(har.log.entries.len(), 2);
    assert!(har.log.entries[0].request.url.ends_with("/one"));
    assert!(har.log.entries[1].request.url.ends_with("/two"));

    let raw = fs::read_to_string(exporter.export_path()).await?;
    assert!(raw.contains("\"serverIPAddress\": \"127.0.0.1\""));
    assert!(raw.contains("\"startedDateTime\""));

    let _ = fs::remove_file(exporter.export_path()).await;
    Ok(())
}

#[tokio::test]
async fn repeated_export_is_idempotent() -> anyhow::Result<()> {
    let mock = ok_server().await;
    let (client, exporter) = make_traced_client("idempotent")?;
    client.send(get(&mock.uri())?).await?;

    exporter.export().await?;
    let first = fs::read(exporter.export_path()).await?;
    exporter.export().await?;
    let second = fs::read(exporter.export_path()).await?;
    assert_eq!(first, second);

    // a later completion shows up in the next export
    client.send(get(&mock.uri())?).await?;
    exporter.export().await?;
    let har = load_archive(exporter.export_path()).await?;
    assert_eq!(har.log.entries.len(), 2);

    let _ = fs::remove_file(exporter.export_path()).await;
    Ok(())
}

#[tokio::test]
async fn unwritable_export_path_is_reported() -> anyhow::Result<()> {
    let mock = ok_server().await;
    let blocker = temp_trace_path("blocker");
    fs::write(&blocker, "not a directory").await?;

    let exporter = HarExporter::new("integration", "0.0.1", blocker.join("trace.har"));
    let client = TracingClient::new(exporter.clone())?;
    // capture keeps working even though the archive cannot be written
    let resp = client.send(get(&mock.uri())?).await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(exporter.snapshot().log.entries.len(), 1);

    assert!(exporter.export().await.is_err());

    let _ = fs::remove_file(&blocker).await;
    Ok(())
}

#[tokio::test]
async fn empty_archive_exports() -> anyhow::Result<()> {
    let path = temp_trace_path("empty");
    let exporter = HarExporter::new("integration", "0.0.1", &path);
    exporter.export().await?;

    let har = load_archive(&path).await?;
    assert!(har.log.entries.is_empty());
    assert!(har.log.pages.is_empty());

    let _ = fs::remove_file(&path).await;
    Ok(())
}
