use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::model::{Candidate, Item};

/// Identity of an entry: trimmed, lowercased title and url, hashed.
pub fn dedup_key(title: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.trim().to_lowercase().as_bytes());
    hasher.update(b"||");
    hasher.update(url.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Tracks identities already seen; the first occurrence wins.
#[derive(Debug, Default)]
pub struct Dedup {
    seen: HashSet<String>,
}

impl Dedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time an identity is offered
    pub fn insert(&mut self, title: &str, url: &str) -> bool {
        self.seen.insert(dedup_key(title, url))
    }
}

pub fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = Dedup::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(&c.title, &c.url))
        .collect()
}

/// Newest first, capped at `limit`. Only the retained candidates get a
/// `published` timestamp.
pub fn rank(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Item> {
    // stable sort keeps feed order among equal timestamps
    candidates.sort_by(|a, b| b.published_ts.cmp(&a.published_ts));
    candidates.truncate(limit);
    candidates.into_iter().map(Candidate::finalize).collect()
}
