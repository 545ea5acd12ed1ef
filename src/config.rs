// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Tracer configuration: defaults, TOML file and environment overrides.

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_CREATOR_NAME: &str = "HAR_CREATOR_NAME";
pub const ENV_CREATOR_VERSION: &str = "HAR_CREATOR_VERSION";
pub const ENV_EXPORT_PATH: &str = "HAR_EXPORT_PATH";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatorConfig {
    /// Name written to `log.creator.name`
    #[serde(default = "default_creator_name")]
    pub name: String,

    /// Version written to `log.creator.version`
    #[serde(default = "default_creator_version")]
    pub version: String,
}

fn default_creator_name() -> String {
    "har-tracer".to_string()
}

fn default_creator_version() -> String {
    "1.0.0".to_string()
}

fn default_export_path() -> PathBuf {
    PathBuf::from("./trace.har")
}

fn default_enabled() -> bool {
    true
}

impl Default for CreatorConfig {
    fn default() -> Self {
        Self {
            name: default_creator_name(),
            version: default_creator_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExportConfig {
    /// Destination of the HAR file
    #[serde(default = "default_export_path")]
    pub path: PathBuf,

    /// When false the archive is collected but never written
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: default_export_path(),
            enabled: default_enabled(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct TracerConfig {
    #[serde(default)]
    pub creator: CreatorConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

impl TracerConfig {
    /// Load configuration from a TOML file.
    ///
    /// ```toml
    /// [creator]
    /// name = "har-tracer"
    /// version = "1.0.0"
    ///
    /// [export]
    /// path = "./trace.har"
    /// enabled = true
    /// ```
    ///
    /// Missing keys fall back to their defaults.
    pub async fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let s = tokio::fs::read_to_string(path_ref)
            .await
            .with_context(|| format!("reading config {}", path_ref.display()))?;
        let cfg: Self = toml::from_str(&s)
            .with_context(|| format!("parsing config {}", path_ref.display()))?;
        Ok(cfg)
    }

    /// Apply `HAR_CREATOR_NAME`, `HAR_CREATOR_VERSION` and `HAR_EXPORT_PATH`
    /// from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(name) = get(ENV_CREATOR_NAME) {
            self.creator.name = name;
        }
        if let Some(version) = get(ENV_CREATOR_VERSION) {
            self.creator.version = version;
        }
        if let Some(path) = get(ENV_EXPORT_PATH) {
            self.export.path = PathBuf::from(path);
        }
        self
    }
}
