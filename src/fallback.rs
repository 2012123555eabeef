//! Degraded-mode backfill for runs where most feeds failed.
//!
//! When fewer than `fallback_floor` fresh items were collected, the previously
//! published items and then the evergreen set are appended behind them. The
//! result goes through the usual dedup pass; ranking happens afterwards.

use tracing::info;

use crate::model::{Candidate, EvergreenItem};
use crate::normalize::hostname;
use crate::rank::dedup;

const DAY_SECS: i64 = 86_400;

pub fn needs_fallback(fresh: usize, floor: usize) -> bool {
    fresh < floor
}

/// Evergreen records dated one day apart going back from `now_ts`, so any
/// fresh news outranks them.
pub fn evergreen_candidates(set: &[EvergreenItem], now_ts: i64) -> Vec<Candidate> {
    set.iter()
        .enumerate()
        .map(|(i, e)| Candidate {
            title: e.title.clone(),
            url: e.url.clone(),
            source: e.source.clone().unwrap_or_else(|| hostname(&e.url)),
            summary: e.summary.clone(),
            published_ts: now_ts - (i as i64 + 1) * DAY_SECS,
            image: None,
        })
        .collect()
}

pub fn blend(
    fresh: Vec<Candidate>,
    previous: Vec<Candidate>,
    evergreen: &[EvergreenItem],
    now_ts: i64,
    limit: usize,
) -> Vec<Candidate> {
    let fresh_count = fresh.len();
    let previous_count = previous.len();

    let mut combined = fresh;
    combined.extend(
        previous
            .into_iter()
            .filter(|c| !c.title.trim().is_empty() && !c.url.trim().is_empty()),
    );

    let with_evergreen = combined.len() < limit;
    if with_evergreen {
        combined.extend(evergreen_candidates(evergreen, now_ts));
    }

    let blended = dedup(combined);
    info!(
        "Fallback blend: {} fresh, {} previous, evergreen {}, {} after dedup",
        fresh_count,
        previous_count,
        if with_evergreen { "added" } else { "skipped" },
        blended.len()
    );
    blended
}
