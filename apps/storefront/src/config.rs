use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use serde::Deserialize;
use storefront_core::SelectionPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "storefront.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub cdn_url: String,
    pub bidder_tag: String,
    pub selection_policy: SelectionPolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api/weblarek".into(),
            cdn_url: "http://localhost:3000/content/weblarek".into(),
            bidder_tag: "me".into(),
            selection_policy: SelectionPolicy::default(),
            log_filter: "info".into(),
        }
    }
}

/// Keys accepted in `storefront.toml`. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    cdn_url: Option<String>,
    bidder_tag: Option<String>,
    selection_policy: Option<SelectionPolicy>,
    log_filter: Option<String>,
}

/// Defaults, then the config file, then `APP__*` environment variables.
///
/// An explicit `path` must exist; the default `storefront.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if required || path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        apply_file(&mut settings, file_cfg);
    }

    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__CDN_URL") {
        settings.cdn_url = v;
    }
    if let Some(v) = env("APP__BIDDER_TAG") {
        settings.bidder_tag = v;
    }
    if let Some(v) = env("APP__SELECTION_POLICY") {
        settings.selection_policy =
            parse_selection_policy(&v).context("invalid APP__SELECTION_POLICY")?;
    }
    if let Some(v) = env("APP__LOG") {
        settings.log_filter = v;
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.cdn_url {
        settings.cdn_url = v;
    }
    if let Some(v) = file_cfg.bidder_tag {
        settings.bidder_tag = v;
    }
    if let Some(v) = file_cfg.selection_policy {
        settings.selection_policy = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

pub fn parse_selection_policy(raw: &str) -> anyhow::Result<SelectionPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "won_lots_only" | "won" => Ok(SelectionPolicy::WonLotsOnly),
        "any_closed" | "any" => Ok(SelectionPolicy::AnyClosed),
        other => bail!("unknown selection policy '{other}'"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
