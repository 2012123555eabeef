//! Conversion of raw feed entries into [`Candidate`] records.
//!
//! Everything here is pure except [`resolve_image`], whose last stage fetches
//! the article page through a [`Source`] and looks for an Open Graph image.

use feed_rs::model::Entry;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::fetcher::Source;
use crate::model::Candidate;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static OG_PROPERTY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#).unwrap()
});

static OG_CONTENT_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+content=["']([^"']+)["'][^>]+property=["']og:image["']"#).unwrap()
});

/// Builds a candidate from an entry, or `None` when the title or link is blank.
/// The image is left unset; see [`resolve_image`].
pub fn normalize_entry(entry: &Entry, fetched_ts: i64) -> Option<Candidate> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim())
        .unwrap_or_default();
    let link = entry_link(entry).unwrap_or_default();

    if title.is_empty() || link.is_empty() {
        debug!("Skipping entry {:?}: missing title or link", entry.id);
        return None;
    }

    Some(Candidate {
        title: title.to_string(),
        url: link.to_string(),
        source: hostname(link),
        summary: entry_summary(entry),
        published_ts: entry_timestamp(entry, fetched_ts),
        image: None,
    })
}

/// The entry's primary link: the first one without a relation or marked
/// `alternate`, else the first link of any kind.
pub fn entry_link(entry: &Entry) -> Option<&str> {
    entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim())
        .filter(|href| !href.is_empty())
}

/// Host of `link` without a leading `www.`; empty when the link does not parse.
pub fn hostname(link: &str) -> String {
    Url::parse(link.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|h| match h.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => h,
        })
        .unwrap_or_default()
}

pub fn clean_html(s: &str) -> String {
    TAG_RE
        .replace_all(s, " ")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn entry_summary(entry: &Entry) -> String {
    let summary = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .filter(|s| !s.trim().is_empty());
    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .filter(|s| !s.trim().is_empty());

    summary.or(body).map(clean_html).unwrap_or_default()
}

fn entry_timestamp(entry: &Entry, fetched_ts: i64) -> i64 {
    entry
        .published
        .or(entry.updated)
        .map(|dt| dt.timestamp())
        .unwrap_or(fetched_ts)
}

/// Image URL carried by the feed itself: media content, then media
/// thumbnails, then an `enclosure` link with an image type. Media content
/// with a declared non-image type (podcast audio, video) is ignored.
pub fn structured_image(entry: &Entry) -> Option<String> {
    let media_content = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter(|c| {
            c.content_type
                .as_ref()
                .map_or(true, |t| t.to_string().starts_with("image/"))
        })
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()));
    if media_content.is_some() {
        return media_content;
    }

    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.trim())
        .find(|uri| !uri.is_empty());
    if let Some(uri) = thumbnail {
        return Some(uri.to_string());
    }

    entry
        .links
        .iter()
        .find(|l| {
            l.rel.as_deref() == Some("enclosure")
                && l.media_type.as_deref().unwrap_or("").contains("image")
        })
        .map(|l| l.href.clone())
}

/// `og:image` from an HTML page, in either attribute order
pub fn og_image(html: &str) -> Option<String> {
    OG_PROPERTY_FIRST
        .captures(html)
        .or_else(|| OG_CONTENT_FIRST.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Walks the image fallback chain. Page fetch failures yield `None`.
pub async fn resolve_image<S: Source>(
    source: &S,
    entry: &Entry,
    page_url: &str,
    fetch_pages: bool,
) -> Option<String> {
    if let Some(image) = structured_image(entry) {
        return Some(image);
    }
    if !fetch_pages || page_url.is_empty() {
        return None;
    }

    match source.fetch_page(page_url).await {
        Ok(html) => og_image(&html),
        Err(e) => {
            debug!("No page image for {}: {}", page_url, e);
            None
        }
    }
}
