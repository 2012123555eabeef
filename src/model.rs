use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized entry that has not been selected for publication yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub source: String,
    pub summary: String,
    pub published_ts: i64,
    pub image: Option<String>,
}

impl Candidate {
    /// Attach the ISO timestamp, turning the candidate into a publishable item
    pub fn finalize(self) -> Item {
        let published = iso_from_ts(self.published_ts);
        Item {
            title: self.title,
            url: self.url,
            source: self.source,
            summary: self.summary,
            published_ts: self.published_ts,
            published,
            image: self.image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub url: String,
    pub source: String,
    pub summary: String,
    pub published_ts: i64,
    pub published: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub fetched_at: String,
    pub total: usize,
    pub items: Vec<Item>,
}

impl Payload {
    pub fn new(items: Vec<Item>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at: fetched_at.to_rfc3339_opts(SecondsFormat::Micros, false),
            total: items.len(),
            items,
        }
    }
}

/// One line of the archive index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub date: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: u64,
}

/// Counts written by older runs may be null, fractional or strings; anything
/// unusable reads as 0.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// A hardcoded record used to backfill sparse runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvergreenItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub summary: String,
}

impl EvergreenItem {
    fn new(title: &str, url: &str, summary: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            source: None,
            summary: summary.to_string(),
        }
    }

    pub fn defaults() -> Vec<EvergreenItem> {
        vec![
            EvergreenItem::new(
                "Social Security Retirement Benefits",
                "https://www.ssa.gov/benefits/retirement/",
                "How benefits are calculated, when to apply, and how to estimate your payment.",
            ),
            EvergreenItem::new(
                "Medicare: Get Started",
                "https://www.medicare.gov/basics/get-started-with-medicare",
                "Enrollment periods, coverage parts, and choosing a plan.",
            ),
            EvergreenItem::new(
                "Avoiding Scams Targeting Older Adults",
                "https://consumer.ftc.gov/features/pass-it-on",
                "Common fraud tactics and how to report them.",
            ),
            EvergreenItem::new(
                "Healthy Aging Tips",
                "https://www.nia.nih.gov/health/healthy-aging",
                "Research-based guidance on exercise, nutrition, and staying connected.",
            ),
            EvergreenItem::new(
                "Benefits CheckUp",
                "https://www.ncoa.org/article/benefitscheckup",
                "Find programs that help pay for food, medicine, and utilities.",
            ),
        ]
    }
}

/// A previously deployed payload, kept as raw JSON so it can be archived verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    raw: Value,
}

impl Snapshot {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn fetched_at(&self) -> Option<&str> {
        self.raw.get("fetched_at").and_then(Value::as_str)
    }

    /// UTC calendar day the snapshot was generated on
    pub fn fetched_day(&self) -> Option<NaiveDate> {
        parse_day(self.fetched_at()?)
    }

    pub fn total(&self) -> u64 {
        self.raw.get("total").and_then(Value::as_u64).unwrap_or(0)
    }
}

pub fn iso_from_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
