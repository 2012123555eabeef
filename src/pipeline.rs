use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::archive::{Archive, ArchiveOutcome};
use crate::config::Config;
use crate::fallback::{blend, needs_fallback};
use crate::fetcher::{SnapshotSource, Source};
use crate::model::{Candidate, Payload};
use crate::normalize::{normalize_entry, resolve_image};
use crate::publish::{load_previous_items, write_payload};
use crate::rank::{rank, Dedup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub url: String,
    pub reason: String,
}

/// Unique candidates from all reachable feeds, in feed order.
#[derive(Debug, Default)]
pub struct Collection {
    pub items: Vec<Candidate>,
    pub failures: Vec<FeedFailure>,
    pub feeds_ok: usize,
}

#[derive(Debug)]
pub struct RunReport {
    pub payload: Payload,
    pub archive: Option<ArchiveOutcome>,
    pub failures: Vec<FeedFailure>,
    pub feeds_ok: usize,
    pub fresh: usize,
    pub blended: bool,
}

pub struct Pipeline<'a, S> {
    config: &'a Config,
    source: &'a S,
}

impl<'a, S: Source> Pipeline<'a, S> {
    pub fn new(config: &'a Config, source: &'a S) -> Self {
        Self { config, source }
    }

    /// Fetches every configured feed in order. A feed that fails contributes
    /// nothing and is reported in `failures`.
    pub async fn collect(&self, now: DateTime<Utc>) -> Collection {
        let fetched_ts = now.timestamp();
        let mut collection = Collection::default();
        let mut seen = Dedup::new();

        for feed_config in &self.config.feeds {
            let feed = match self.source.fetch_feed(&feed_config.url).await {
                Ok(feed) => feed,
                Err(e) => {
                    warn!("feed failed {}: {}", feed_config.label(), e);
                    collection.failures.push(FeedFailure {
                        url: feed_config.url.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            collection.feeds_ok += 1;

            let mut count = 0;
            for entry in &feed.entries {
                let Some(mut candidate) = normalize_entry(entry, fetched_ts) else {
                    continue;
                };
                if !seen.insert(&candidate.title, &candidate.url) {
                    continue;
                }
                candidate.image = resolve_image(
                    self.source,
                    entry,
                    &candidate.url,
                    self.config.resolve_images,
                )
                .await;
                collection.items.push(candidate);
                count += 1;
            }

            info!("Collected {} items from '{}'", count, feed_config.label());
        }

        collection
    }

    /// One full pass: archive the deployed artifact if it is from an earlier
    /// day, collect, backfill when sparse, rank and publish.
    pub async fn run<P: SnapshotSource>(
        &self,
        snapshot: Option<&P>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RunReport> {
        let archive = match snapshot {
            Some(source) => {
                let archive = Archive::from_config(self.config);
                match archive
                    .write_archive_if_needed(source, now.date_naive())
                    .await
                {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        warn!("Archiving skipped: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let collection = self.collect(now).await;
        let fresh = collection.items.len();
        let output_path = self.config.output_path();

        let blended = needs_fallback(fresh, self.config.fallback_floor);
        let candidates = if blended {
            info!(
                "Only {} fresh items (floor {}), blending previous output",
                fresh, self.config.fallback_floor
            );
            blend(
                collection.items,
                load_previous_items(&output_path),
                &self.config.evergreen,
                now.timestamp(),
                self.config.max_items,
            )
        } else {
            collection.items
        };

        let payload = Payload::new(rank(candidates, self.config.max_items), now);
        write_payload(&output_path, &payload)?;

        Ok(RunReport {
            payload,
            archive,
            failures: collection.failures,
            feeds_ok: collection.feeds_ok,
            fresh,
            blended,
        })
    }
}
