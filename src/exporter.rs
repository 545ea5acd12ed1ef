// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! In-memory HAR archive and its export to disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use url::Url;

use crate::config::TracerConfig;
use crate::har::{Entry, Har};
use crate::interceptor::Interceptor;

type SharedArchive = Arc<Mutex<Har>>;

fn lock(archive: &Mutex<Har>) -> MutexGuard<'_, Har> {
    match archive.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("archive lock poisoned, continuing with inner state");
            poisoned.into_inner()
        }
    }
}

/// Append-only handle to the archive's entry list held by each interceptor.
///
/// Entries land in completion order.
#[derive(Clone)]
pub(crate) struct EntrySink {
    archive: SharedArchive,
}

impl EntrySink {
    pub(crate) fn push(&self, entry: Entry) {
        lock(&self.archive).log.entries.push(entry);
    }
}

/// Owns the archive for a traced process.
///
/// Cloning is cheap and every clone shares the same archive, so one exporter
/// can be handed to many concurrent requests.
#[derive(Clone)]
pub struct HarExporter {
    archive: SharedArchive,
    export_path: PathBuf,
}

impl HarExporter {
    pub fn new<P: Into<PathBuf>>(name: &str, version: &str, export_path: P) -> Self {
        Self {
            archive: Arc::new(Mutex::new(Har::new(name, version))),
            export_path: export_path.into(),
        }
    }

    pub fn from_config(cfg: &TracerConfig) -> Self {
        Self::new(&cfg.creator.name, &cfg.creator.version, &cfg.export.path)
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Called by an interception seam once it is in place. Has no effect on
    /// the archive.
    pub fn on_instrumented(&self) {
        tracing::debug!(path = %self.export_path.display(), "request instrumentation installed");
    }

    /// Start capturing a request that began at `start`.
    pub fn create_interceptor(&self, method: &str, url: &Url, start: Instant) -> Interceptor {
        let entry = Entry::new(method, url, Utc::now());
        let sink = EntrySink {
            archive: self.archive.clone(),
        };
        Interceptor::new(entry, url.clone(), start, sink)
    }

    /// Copy of the archive with every entry completed so far.
    pub fn snapshot(&self) -> Har {
        lock(&self.archive).clone()
    }

    /// Pretty-printed (2-space indent) JSON for the current archive.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let har = self.snapshot();
        Ok(serde_json::to_string_pretty(&har)?)
    }

    /// Write the archive to the export path, creating parent directories.
    ///
    /// Requests still in flight are not waited for. Exporting again without
    /// new completions writes identical bytes.
    pub async fn export(&self) -> anyhow::Result<()> {
        let contents = self.to_json()?;
        let path = &self.export_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating trace directory {}", dir.display()))?;
        }
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("writing trace to {}", path.display()))?;
        tracing::info!(path = %path.display(), "trace exported");
        Ok(())
    }
}

/// Read a HAR file back into the data model.
pub async fn load_archive<P: AsRef<Path>>(path: P) -> anyhow::Result<Har> {
    let path = path.as_ref();
    let s = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading trace {}", path.display()))?;
    Ok(serde_json::from_str(&s)?)
}
