use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::EvergreenItem;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Root of the static site; artifacts land under `{site_dir}/data`
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Below this many fresh items the previous artifact and evergreen set are blended in
    #[serde(default = "default_fallback_floor")]
    pub fallback_floor: usize,
    /// Number of days kept in the archive index
    #[serde(default = "default_archive_retention")]
    pub archive_retention: usize,
    #[serde(default = "default_resolve_images")]
    pub resolve_images: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    pub feeds: Vec<FeedConfig>,
    #[serde(default = "EvergreenItem::defaults")]
    pub evergreen: Vec<EvergreenItem>,
}

fn default_site_dir() -> PathBuf {
    PathBuf::from("site")
}

fn default_user_agent() -> String {
    "RetirementBot-News/1.3 (+github-actions)".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_items() -> usize {
    10
}

fn default_fallback_floor() -> usize {
    6
}

fn default_archive_retention() -> usize {
    120
}

fn default_resolve_images() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

impl FeedConfig {
    /// Name used in log lines; falls back to the URL
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.site_dir.join("data")
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_dir().join("news.json")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir().join("archive")
    }

    pub fn archive_index_path(&self) -> PathBuf {
        self.archive_dir().join("index.json")
    }

    /// Base URL of the deployed site, checked against the process environment
    /// before the value from the config file.
    pub fn resolve_base_url(&self) -> Option<String> {
        let repo = std::env::var("GITHUB_REPOSITORY").ok();
        let site = std::env::var("SITE_BASE_URL").ok();
        resolve_base_url(repo.as_deref(), site.as_deref(), self.base_url.as_deref())
    }
}

/// `owner/repo` maps to `https://{owner}.github.io/{repo}`; otherwise the first
/// non-empty override wins.
pub fn resolve_base_url(
    repository: Option<&str>,
    env_override: Option<&str>,
    file_override: Option<&str>,
) -> Option<String> {
    if let Some((owner, name)) = repository.and_then(|r| r.trim().split_once('/')) {
        if !owner.is_empty() && !name.is_empty() {
            return Some(format!("https://{}.github.io/{}", owner, name));
        }
    }

    [env_override, file_override]
        .into_iter()
        .flatten()
        .map(|u| u.trim().trim_end_matches('/'))
        .find(|u| !u.is_empty())
        .map(str::to_string)
}

/// Location of the published artifact on the deployed site
pub fn live_artifact_url(base_url: &str) -> String {
    format!("{}/data/news.json", base_url.trim_end_matches('/'))
}
