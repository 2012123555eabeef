use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::model::{Candidate, Payload};
use crate::normalize::hostname;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("cannot create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Overwrites `path` with the pretty-printed payload, creating parent directories.
pub fn write_payload(path: &Path, payload: &Payload) -> Result<(), PublishError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PublishError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let body = serde_json::to_string_pretty(payload)?;
    fs::write(path, body).map_err(|source| PublishError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!("wrote {} items -> {}", payload.total, path.display());
    Ok(())
}

/// Item shape as found in an earlier artifact; every field may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredItem {
    title: Option<String>,
    url: Option<String>,
    source: Option<String>,
    summary: Option<String>,
    published_ts: Option<i64>,
    image: Option<String>,
}

impl StoredItem {
    fn into_candidate(self) -> Option<Candidate> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        let url = self.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
        let source = self
            .source
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| hostname(&url));

        Some(Candidate {
            title,
            source,
            url,
            summary: self.summary.unwrap_or_default(),
            published_ts: self.published_ts.unwrap_or(0),
            image: self.image.filter(|i| !i.is_empty()),
        })
    }
}

/// Items of the artifact previously written to `path` that carry both a title
/// and a url. Missing or malformed files read as empty.
pub fn load_previous_items(path: &Path) -> Vec<Candidate> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let items = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(mut map)) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => {
            debug!("Ignoring malformed previous artifact {}", path.display());
            Vec::new()
        }
    };

    items
        .into_iter()
        .filter_map(|v| serde_json::from_value::<StoredItem>(v).ok())
        .filter_map(StoredItem::into_candidate)
        .collect()
}
